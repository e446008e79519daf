use crate::core::cache::KeyValueCollection;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// Process-lifetime collection backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<HashMap<Vec<u8>, Entry>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut entries = self.inner.lock().await;
        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Instant::now()),
            None => {
                debug!(key = %String::from_utf8_lossy(key), "Cache MISS");
                return None;
            }
        };
        if expired {
            debug!(key = %String::from_utf8_lossy(key), "Cache entry expired");
            entries.remove(key);
            return None;
        }
        debug!(key = %String::from_utf8_lossy(key), "Cache HIT");
        entries.get(key).map(|entry| entry.value.clone())
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.inner.lock().await.insert(key.to_vec(), entry);
        debug!(key = %String::from_utf8_lossy(key), "Cache PUT");
    }

    async fn remove(&self, key: &[u8]) {
        self.inner.lock().await.remove(key);
    }
}
