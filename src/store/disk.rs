use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::PartitionHandle;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<SystemTime>,
}

/// Collection persisted in a `fjall` partition; survives across runs.
pub struct DiskCollection {
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(partition: PartitionHandle) -> Self {
        Self { partition }
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.partition.get(key)? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(&raw)?;
        if entry
            .expires_at
            .is_some_and(|expires_at| SystemTime::now() > expires_at)
        {
            debug!(key = %String::from_utf8_lossy(key), "Cache entry expired");
            self.partition.remove(key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.read(key) {
            Ok(Some(value)) => {
                debug!(key = %String::from_utf8_lossy(key), "Cache HIT");
                Some(value)
            }
            Ok(None) => {
                debug!(key = %String::from_utf8_lossy(key), "Cache MISS");
                None
            }
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) {
        let res: Result<()> = (|| {
            let entry = CacheEntry {
                value: value.to_vec(),
                expires_at: ttl.map(|d| SystemTime::now() + d),
            };
            self.partition.insert(key, serde_json::to_vec(&entry)?)?;
            Ok(())
        })();
        match res {
            Ok(()) => debug!(key = %String::from_utf8_lossy(key), "Cache PUT"),
            Err(e) => debug!("DiskCollection put error: {}", e),
        }
    }

    async fn remove(&self, key: &[u8]) {
        if let Err(e) = self.partition.remove(key) {
            debug!("DiskCollection remove error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;
    use tokio::time::sleep;

    fn open_collection(dir: &std::path::Path) -> DiskCollection {
        let keyspace = fjall::Config::new(dir).open().unwrap();
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(partition)
    }

    #[tokio::test]
    async fn test_disk_get_put_remove() {
        let dir = tempdir().unwrap();
        let cache = open_collection(dir.path());

        assert!(cache.get(b"table").await.is_none());
        cache.put(b"table", b"Symbol,Industry", None).await;
        assert_eq!(cache.get(b"table").await, Some(b"Symbol,Industry".to_vec()));

        cache.remove(b"table").await;
        assert!(cache.get(b"table").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_ttl_expiration() {
        let dir = tempdir().unwrap();
        let cache = open_collection(dir.path());

        cache
            .put(b"table", b"rows", Some(Duration::from_millis(10)))
            .await;
        assert!(cache.get(b"table").await.is_some());

        sleep(Duration::from_millis(20)).await;
        assert!(cache.get(b"table").await.is_none());
    }
}
