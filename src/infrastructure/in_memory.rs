use super::locks::RowLocks;
use super::staged::{RowSource, StagedTransaction};
use crate::domain::account::{Account, AccountDraft, AccountId, Balance};
use crate::domain::ports::{AccountStore, StoreTransaction};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Committed rows plus the id counter, shared between the store and its
/// open transactions.
#[derive(Debug, Default)]
struct Rows {
    accounts: RwLock<HashMap<AccountId, Account>>,
    next_id: AtomicU64,
}

/// A thread-safe in-memory account store.
///
/// Committed state lives in an `Arc<RwLock<HashMap>>`; reads take the read
/// lock only briefly and never wait on an open transaction. Writers serialize
/// per row through [`RowLocks`].
#[derive(Clone)]
pub struct InMemoryAccountStore {
    rows: Arc<Rows>,
    locks: Arc<RowLocks>,
    lock_timeout: Duration,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            rows: Arc::new(Rows::default()),
            locks: Arc::new(RowLocks::new()),
            lock_timeout,
        }
    }
}

#[async_trait]
impl RowSource for Arc<Rows> {
    async fn load_balance(&self, id: AccountId) -> Result<Option<Balance>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id).map(|account| account.balance))
    }

    async fn apply_balances(&self, writes: &BTreeMap<AccountId, Balance>) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        // Check every row before touching any of them.
        if let Some(missing) = writes.keys().find(|id| !accounts.contains_key(id)) {
            return Err(LedgerError::NotFound(*missing));
        }
        for (id, balance) in writes {
            if let Some(account) = accounts.get_mut(id) {
                account.balance = *balance;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, id: AccountId) -> Result<Account> {
        let accounts = self.rows.accounts.read().await;
        accounts.get(&id).cloned().ok_or(LedgerError::NotFound(id))
    }

    async fn insert(&self, draft: AccountDraft) -> Result<Account> {
        let id = AccountId(self.rows.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let account = draft.into_account(id);
        let mut accounts = self.rows.accounts.write().await;
        accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn update(&self, id: AccountId, draft: AccountDraft) -> Result<Account> {
        let guard = self.locks.acquire(id, self.lock_timeout).await?;
        let mut accounts = self.rows.accounts.write().await;
        if !accounts.contains_key(&id) {
            drop(accounts);
            self.locks.discard(id, guard);
            return Err(LedgerError::NotFound(id));
        }
        let account = draft.into_account(id);
        accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let guard = self.locks.acquire(id, self.lock_timeout).await?;
        let mut accounts = self.rows.accounts.write().await;
        if !accounts.contains_key(&id) {
            drop(accounts);
            self.locks.discard(id, guard);
            return Err(LedgerError::NotFound(id));
        }
        let account = &accounts[&id];
        if account.balance != Balance::ZERO {
            return Err(LedgerError::ValidationError(format!(
                "Account {id} still holds a balance of {}",
                account.balance
            )));
        }
        accounts.remove(&id);
        drop(accounts);
        self.locks.forget(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let accounts = self.rows.accounts.read().await;
        let mut all: Vec<Account> = accounts.values().cloned().collect();
        all.sort_by_key(|account| account.id);
        Ok(all)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(StagedTransaction::new(
            self.rows.clone(),
            self.locks.clone(),
            self.lock_timeout,
        )))
    }
}
