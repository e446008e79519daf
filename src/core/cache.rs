//! Key-value caching abstractions shared by the providers

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A byte-keyed collection with optional per-entry expiry.
///
/// Cache failures are never fatal to a caller: implementations log and
/// degrade to a miss instead of returning errors.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>);
    async fn remove(&self, key: &[u8]);
}

/// Hands out named collections, either persisted to disk or held in memory.
pub trait Store: Send + Sync {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;

    fn remove_collection(&self, name: &str) -> bool;
}
