use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::application::ports::Caches;

use super::{
    CacheError,
    lock::{rw_read, rw_write},
    store::{CacheStore, CachedResponse},
};

const SOURCE: &str = "cache::storage";

/// Name and entry count of one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub name: String,
    pub entries: usize,
}

/// The set of named stores, kept in creation order.
///
/// Lookups across stores (`match_request`) consult them in that order, so
/// the oldest store holding a key wins.
#[derive(Debug, Default)]
pub struct CacheStorage {
    stores: RwLock<Vec<Arc<CacheStore>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the named store, creating it if needed.
    pub fn open(&self, name: &str) -> Arc<CacheStore> {
        if let Some(store) = self.find(name) {
            return store;
        }

        let mut stores = rw_write(&self.stores, SOURCE, "open");
        // Another caller may have created it between the read and write locks.
        if let Some(store) = stores.iter().find(|store| store.name() == name) {
            return store.clone();
        }
        let store = Arc::new(CacheStore::new(name));
        stores.push(store.clone());
        store
    }

    pub fn find(&self, name: &str) -> Option<Arc<CacheStore>> {
        rw_read(&self.stores, SOURCE, "find")
            .iter()
            .find(|store| store.name() == name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        rw_read(&self.stores, SOURCE, "names")
            .iter()
            .map(|store| store.name().to_string())
            .collect()
    }

    /// Remove a whole store. Returns `false` when no store had that name.
    pub fn remove(&self, name: &str) -> bool {
        let mut stores = rw_write(&self.stores, SOURCE, "remove");
        let before = stores.len();
        stores.retain(|store| store.name() != name);
        stores.len() != before
    }

    /// First cached response for `key`, searching stores in creation order.
    pub fn lookup(&self, key: &str) -> Option<CachedResponse> {
        let stores = rw_read(&self.stores, SOURCE, "lookup").clone();
        stores.iter().find_map(|store| store.get(key))
    }

    pub fn info(&self) -> Vec<StoreInfo> {
        rw_read(&self.stores, SOURCE, "info")
            .iter()
            .map(|store| StoreInfo {
                name: store.name().to_string(),
                entries: store.len(),
            })
            .collect()
    }

    pub(crate) fn stores(&self) -> Vec<Arc<CacheStore>> {
        rw_read(&self.stores, SOURCE, "stores").clone()
    }

    pub(crate) fn from_stores(stores: Vec<CacheStore>) -> Self {
        Self {
            stores: RwLock::new(stores.into_iter().map(Arc::new).collect()),
        }
    }
}

#[async_trait]
impl Caches for CacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<CacheStore>, CacheError> {
        Ok(CacheStorage::open(self, name))
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.names())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.remove(name))
    }

    async fn match_request(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        Ok(self.lookup(key))
    }

    async fn describe(&self) -> Result<Vec<StoreInfo>, CacheError> {
        Ok(self.info())
    }
}
