//! URL shortener service.
//!
//! Ties a [`Store`](snip_core::Store) backend to a code
//! [`Generator`](snip_generator::Generator) and composes the public short URLs
//! handed back to clients.

pub mod error;
pub mod model;
pub mod service;

pub use error::{Result, ShortenerError};
pub use model::{BatchRequest, BatchShortUrl, UserUrl};
pub use service::{DeletionHandle, ShortenerService, MAX_ATTEMPTS};
