//! Registry of ephemeral `blob:` URLs handed out for cached media
//!
//! Every issued URL stays resolvable until it is revoked. Revoking twice is a
//! no-op that reports `false`.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const URL_SCHEME: &str = "blob:lime/";

#[derive(Default)]
pub struct ObjectUrls {
    live: Mutex<HashMap<String, Bytes>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return its URL
    pub fn issue(&self, data: Bytes) -> String {
        let url = format!("{URL_SCHEME}{}", Uuid::new_v4());
        self.live.lock().insert(url.clone(), data);
        url
    }

    /// Release a URL; returns whether it was live
    pub fn revoke(&self, url: &str) -> bool {
        let released = self.live.lock().remove(url).is_some();
        if !released {
            debug!("Revoke of unknown object URL {}", url);
        }
        released
    }

    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.live.lock().get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}
