use super::account::{Account, AccountDraft, AccountId, Balance};
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Durable, concurrency-safe persistence of accounts.
///
/// This is the only storage capability the ledger depends on; every backend
/// implements it and nothing above it knows which one is in use.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, id: AccountId) -> Result<Account>;

    /// Stores a new account under a freshly assigned id.
    async fn insert(&self, draft: AccountDraft) -> Result<Account>;

    /// Overwrites name, contact and balance. Waits for the row lock, so it
    /// never interleaves with an open transaction on the same account.
    async fn update(&self, id: AccountId, draft: AccountDraft) -> Result<Account>;

    /// Removes an account. Refused while it still holds a balance.
    async fn delete(&self, id: AccountId) -> Result<()>;

    /// All accounts, ordered by id.
    async fn list(&self) -> Result<Vec<Account>>;

    /// Opens a transaction. Prefer [`run_transaction`], which guarantees the
    /// handle is committed or rolled back.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// A unit of work against the store.
///
/// Rows touched through the handle stay locked until the transaction ends.
/// Writes are invisible to other readers until [`commit`](Self::commit)
/// publishes all of them at once. Dropping an unfinished handle rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Locks the row and returns its balance as seen by this transaction.
    async fn balance(&mut self, id: AccountId) -> Result<Balance>;

    /// Atomic read-modify-write of one row's balance. Rejects a result below
    /// zero with `InsufficientFunds`.
    async fn adjust_balance(&mut self, id: AccountId, delta: i64) -> Result<Balance>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self);
}

pub type AccountStoreRef = Arc<dyn AccountStore>;

/// Runs `body` inside one transaction: commit if it returns `Ok`, rollback if
/// it returns `Err`. If the task is cancelled or `body` panics, dropping the
/// handle rolls back. A failed commit leaves nothing visible.
pub async fn run_transaction<T, F>(store: &dyn AccountStore, body: F) -> Result<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn StoreTransaction) -> BoxFuture<'t, Result<T>> + Send,
{
    let mut tx = store.begin().await?;
    match body(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await;
            Err(err)
        }
    }
}
