use crate::cache::CacheStamp;
use crate::db::Store;

/// Shared per-process state handed to every handler. The store is an
/// explicitly constructed handle owned here (not a global), so tests can run
/// against isolated in-memory stores.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub catalog_stamp: CacheStamp,
    pub orders_stamp: CacheStamp,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            catalog_stamp: CacheStamp::new(),
            orders_stamp: CacheStamp::new(),
        }
    }
}
