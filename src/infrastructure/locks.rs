use crate::domain::account::AccountId;
use crate::error::{LedgerError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-account exclusive locks shared by every writer of a store.
///
/// A guard is held by a transaction until it commits or rolls back, and by a
/// plain update or delete for the duration of the write. Waiting is bounded by
/// the timeout so a stuck holder surfaces as a transient conflict instead of a
/// hang.
#[derive(Debug, Default)]
pub struct RowLocks {
    rows: DashMap<AccountId, Arc<Mutex<()>>>,
}

pub type RowGuard = OwnedMutexGuard<()>;

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: AccountId, timeout: Duration) -> Result<RowGuard> {
        // Clone the Arc out so no map shard stays locked across the await.
        let row = self.rows.entry(id).or_default().clone();
        tokio::time::timeout(timeout, row.lock_owned())
            .await
            .map_err(|_| {
                LedgerError::Conflict(format!(
                    "timed out after {}ms waiting for lock on account {id}",
                    timeout.as_millis()
                ))
            })
    }

    /// Releases a guard taken on an id that turned out not to exist, and drops
    /// the entry unless another task still holds or waits on it.
    pub fn discard(&self, id: AccountId, guard: RowGuard) {
        drop(guard);
        self.rows.remove_if(&id, |_, row| Arc::strong_count(row) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Drops the entry for a deleted account. Ids are never reused, so a
    /// waiter still holding the old mutex will simply find the row gone.
    pub fn forget(&self, id: AccountId) {
        self.rows.remove(&id);
    }
}
