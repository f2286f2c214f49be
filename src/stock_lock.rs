use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::entities::inventory_batch::LocationType;

/// The unit of serialization: one product's batch set at one location.
pub type StockKey = (Uuid, LocationType);

/// Process-wide registry of async mutexes keyed by `(product, location)`.
/// Every mutating inventory operation takes the locks for the keys it will
/// touch before opening its transaction, so two requests can never both read
/// the same availability and overconsume it.
#[derive(Debug, Default)]
pub struct StockLockRegistry {
    locks: DashMap<StockKey, Arc<Mutex<()>>>,
}

impl StockLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: StockKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires a single key.
    pub async fn acquire(&self, key: StockKey) -> OwnedMutexGuard<()> {
        self.lock_for(key).lock_owned().await
    }

    /// Acquires several keys. Keys are sorted and deduplicated first so two
    /// operations touching overlapping key sets always lock in the same
    /// order and cannot deadlock each other.
    pub async fn acquire_all(&self, keys: &[StockKey]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<StockKey> = keys.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock_for(key).lock_owned().await);
        }
        guards
    }
}
