use std::sync::Arc;

use snip_shortener::ShortenerService;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<ShortenerService>,
}

impl AppState {
    pub fn new(shortener: ShortenerService) -> Self {
        Self {
            shortener: Arc::new(shortener),
        }
    }

    pub fn shortener(&self) -> &ShortenerService {
        &self.shortener
    }
}
