mod health;
mod stats;
mod url;
mod user;

pub use health::{health_handler, ping_handler};
pub use stats::stats_handler;
pub use url::{create_batch_handler, create_json_handler, create_text_handler, redirect_handler};
pub use user::{delete_user_urls_handler, user_urls_handler};
