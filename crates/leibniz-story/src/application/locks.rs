//! Per-reader mutual exclusion around progress read-modify-write cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async lock per user id.
///
/// Entries are dropped once nobody holds or waits on them, so the map only
/// grows with the number of readers active at the same time.
#[derive(Debug, Clone, Default)]
pub struct ProgressLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ProgressLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user_id`'s progress.
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(map.entry(user_id.to_owned()).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of users with a held or awaited lock.
    #[must_use]
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}
