//! Cache-invalidation contract for the UI layer.
//!
//! Listing responses carry the current generation in the
//! `x-cache-generation` header; every mutation bumps it. A client that
//! cached a listing drops it as soon as it sees a newer generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const CACHE_GENERATION_HEADER: &str = "x-cache-generation";

#[derive(Clone, Debug, Default)]
pub struct CacheStamp(Arc<AtomicU64>);

impl CacheStamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn invalidate(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
