//! Per-pool write locks.
//!
//! Every write path (join, close, reconcile) holds the lock of the pool it
//! touches for the whole load-check-save sequence. Writes on different pools
//! never share a lock. Entries are held weakly so idle pools do not pin
//! memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::PoolId;

/// Guard proving the holder has exclusive write access to one pool.
pub type PoolWriteGuard = OwnedMutexGuard<()>;

/// Registry of async mutexes keyed by pool id.
#[derive(Debug, Default)]
pub struct PoolLocks {
    entries: Mutex<HashMap<PoolId, Weak<AsyncMutex<()>>>>,
}

impl PoolLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `pool_id`.
    pub async fn acquire(&self, pool_id: PoolId) -> PoolWriteGuard {
        let lock = self.lock_for(pool_id);
        lock.lock_owned().await
    }

    /// Number of pools currently locked or awaited.
    pub fn tracked(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.len()
    }

    fn lock_for(&self, pool_id: PoolId) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = entries.get(&pool_id).and_then(Weak::upgrade) {
            return lock;
        }

        entries.retain(|_, weak| weak.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        entries.insert(pool_id, Arc::downgrade(&lock));
        lock
    }
}
