pub mod disk;
pub mod files;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// A thread-safe key-value store that can hold multiple collections.
///
/// Persistent collections live in a single `fjall` keyspace. When the
/// keyspace cannot be opened the store still hands out in-memory
/// collections, but requests for persistent ones yield `None`.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Keyspace>,
}

impl KeyValueStore {
    /// Opens (or creates) the on-disk keyspace under `cache_dir`.
    pub fn open(cache_dir: &Path) -> Self {
        let keyspace = match fjall::Config::new(cache_dir).open() {
            Ok(keyspace) => Some(keyspace),
            Err(e) => {
                warn!(
                    "Could not open cache at {}: {}. Persistent caching disabled",
                    cache_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store with no disk backing at all.
    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    fn create_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>> {
        if !persist {
            return Some(Arc::new(MemoryCollection::new()));
        }
        let keyspace = self.keyspace.as_ref()?;
        match keyspace.open_partition(name, PartitionCreateOptions::default()) {
            Ok(partition) => Some(Arc::new(DiskCollection::new(partition))),
            Err(e) => {
                warn!("Could not open cache partition {}: {}", name, e);
                None
            }
        }
    }
}

impl Store for KeyValueStore {
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>> {
        if let Some(existing) = self
            .collections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return Some(Arc::clone(existing));
        }
        if !create_if_missing {
            return None;
        }

        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = collections.get(name) {
            return Some(Arc::clone(existing));
        }
        let collection = self.create_collection(name, persist)?;
        debug!(name, persist, "Created cache collection");
        collections.insert(name.to_string(), Arc::clone(&collection));
        Some(collection)
    }

    fn remove_collection(&self, name: &str) -> bool {
        self.collections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_collections_are_shared_by_name() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path());

        let first = store.get_collection("taxonomy", true, true).unwrap();
        first.put(b"k", b"v", None).await;

        let second = store.get_collection("taxonomy", true, false).unwrap();
        assert_eq!(second.get(b"k").await, Some(b"v".to_vec()));
    }

    #[test]
    fn test_missing_collection_without_create() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("prices", false, false).is_none());
        assert!(store.get_collection("prices", false, true).is_some());
        assert!(store.remove_collection("prices"));
        assert!(!store.remove_collection("prices"));
    }

    #[test]
    fn test_in_memory_store_refuses_persistent_collections() {
        let store = KeyValueStore::in_memory();
        assert!(store.get_collection("taxonomy", true, true).is_none());
    }
}
