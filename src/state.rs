use std::sync::Arc;

use crate::{jwt::TokenIssuer, media::MediaStore, store::Store};

/// Everything a request handler needs, cheap to clone into each filter.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
    pub media: Arc<MediaStore>,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, media: MediaStore) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            media: Arc::new(media),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
