use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tourney_api::id::StageItemId;

use super::{Error, Result};

/// Unused locks are dropped once the map grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// The guard of a locked stage item. The lock is released when the guard is dropped.
pub type StageGuard = OwnedMutexGuard<()>;

/// Serializes all mutating operations on the same stage item.
#[derive(Debug)]
pub struct StageLocks {
    locks: Mutex<HashMap<StageItemId, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

impl StageLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Locks the stage item with the given `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConcurrencyConflict`] if the lock cannot be acquired within the
    /// configured timeout.
    pub async fn lock(&self, id: StageItemId) -> Result<StageGuard> {
        let lock = {
            let mut locks = self.locks.lock();

            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            locks.entry(id).or_default().clone()
        };

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                log::warn!(
                    "Failed to lock stage item {} within {}ms",
                    id,
                    self.timeout.as_millis()
                );

                Err(Error::ConcurrencyConflict)
            }
        }
    }
}
