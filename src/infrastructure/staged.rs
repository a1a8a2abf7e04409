use super::locks::{RowGuard, RowLocks};
use crate::domain::account::{AccountId, Balance};
use crate::domain::ports::StoreTransaction;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// The committed-state side of a store, as seen by its transactions.
#[async_trait]
pub trait RowSource: Send + Sync + 'static {
    /// Committed balance of a row, `None` if the account does not exist.
    async fn load_balance(&self, id: AccountId) -> Result<Option<Balance>>;

    /// Publishes every write at once, or none of them.
    async fn apply_balances(&self, writes: &BTreeMap<AccountId, Balance>) -> Result<()>;
}

/// Transaction handle shared by the store backends.
///
/// Each touched row is locked on first access and stays locked until the
/// transaction ends. Balance changes are staged locally and only reach the
/// backend through a single [`RowSource::apply_balances`] on commit, so no
/// other reader can ever see them half-applied. Dropping the handle without
/// committing discards the staged writes and releases the locks.
pub struct StagedTransaction<S: RowSource> {
    source: S,
    locks: Arc<RowLocks>,
    lock_timeout: Duration,
    guards: HashMap<AccountId, RowGuard>,
    staged: BTreeMap<AccountId, Balance>,
    finished: bool,
}

impl<S: RowSource> StagedTransaction<S> {
    pub fn new(source: S, locks: Arc<RowLocks>, lock_timeout: Duration) -> Self {
        Self {
            source,
            locks,
            lock_timeout,
            guards: HashMap::new(),
            staged: BTreeMap::new(),
            finished: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            Err(LedgerError::StoreUnavailable(
                "transaction already finished".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn lock_row(&mut self, id: AccountId) -> Result<Balance> {
        self.ensure_open()?;
        if let Some(balance) = self.staged.get(&id) {
            return Ok(*balance);
        }
        if !self.guards.contains_key(&id) {
            let guard = self.locks.acquire(id, self.lock_timeout).await?;
            self.guards.insert(id, guard);
        }
        // Read under the lock: the committed value cannot change until we release it.
        let Some(balance) = self.source.load_balance(id).await? else {
            if let Some(guard) = self.guards.remove(&id) {
                self.locks.discard(id, guard);
            }
            return Err(LedgerError::NotFound(id));
        };
        self.staged.insert(id, balance);
        Ok(balance)
    }

    fn release(&mut self) {
        self.finished = true;
        self.staged.clear();
        self.guards.clear();
    }
}

#[async_trait]
impl<S: RowSource> StoreTransaction for StagedTransaction<S> {
    async fn balance(&mut self, id: AccountId) -> Result<Balance> {
        self.lock_row(id).await
    }

    async fn adjust_balance(&mut self, id: AccountId, delta: i64) -> Result<Balance> {
        let current = self.lock_row(id).await?;
        let next = current.checked_apply(delta)?;
        if next.is_negative() {
            return Err(LedgerError::InsufficientFunds {
                account: id,
                balance: current.value(),
                requested: delta.saturating_neg(),
            });
        }
        self.staged.insert(id, next);
        Ok(next)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let result = self.source.apply_balances(&self.staged).await;
        match &result {
            Ok(()) => tracing::trace!(rows = self.staged.len(), "transaction committed"),
            Err(err) => tracing::warn!(error = %err, "commit failed, rolling back"),
        }
        self.release();
        result
    }

    async fn rollback(&mut self) {
        if !self.finished {
            tracing::trace!(rows = self.guards.len(), "transaction rolled back");
        }
        self.release();
    }
}

impl<S: RowSource> Drop for StagedTransaction<S> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                rows = self.guards.len(),
                "transaction dropped before commit, discarding staged writes"
            );
        }
    }
}
