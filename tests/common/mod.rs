#![allow(dead_code)]

use async_trait::async_trait;
use ledger::application::ledger::Ledger;
use ledger::config::{LedgerConfig, RetryConfig};
use ledger::domain::account::{Account, AccountDraft, AccountId, Balance};
use ledger::domain::ports::{AccountStore, StoreTransaction};
use ledger::error::{LedgerError, Result};
use ledger::infrastructure::in_memory::InMemoryAccountStore;
use ledger::telemetry::LedgerMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub fn draft(name: &str, balance: i64) -> AccountDraft {
    AccountDraft::new(name, format!("{}@example.com", name.to_lowercase()), balance)
}

pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        lock_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            ..Default::default()
        },
        request_timeout: None,
    }
}

pub fn ledger_over(store: Arc<dyn AccountStore>) -> (Ledger, Arc<LedgerMetrics>) {
    let metrics = Arc::new(LedgerMetrics::new());
    let ledger = Ledger::new(store, &test_config(), metrics.clone());
    (ledger, metrics)
}

pub async fn seed(store: &dyn AccountStore, balances: &[i64]) -> Vec<AccountId> {
    let mut ids = Vec::new();
    for (i, balance) in balances.iter().enumerate() {
        let account = store.insert(draft(&format!("user{i}"), *balance)).await.unwrap();
        ids.push(account.id);
    }
    ids
}

pub fn total(accounts: &[Account]) -> i64 {
    accounts.iter().map(|a| a.balance.value()).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Conflict,
    Unavailable,
}

impl Fault {
    fn error(&self) -> LedgerError {
        match self {
            Fault::Conflict => LedgerError::Conflict("injected conflict".to_string()),
            Fault::Unavailable => LedgerError::StoreUnavailable("injected outage".to_string()),
        }
    }
}

/// Wraps the in-memory store and injects failures into its transactions.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryAccountStore,
    /// Every `adjust_balance` on this account fails.
    pub fail_adjust_on: Option<(AccountId, Fault)>,
    /// The next N commits fail with a conflict.
    pub failing_commits: AtomicU32,
    /// Deleted by a concurrent writer as soon as a commit lands.
    pub delete_after_commit: Option<AccountId>,
    pub begins: AtomicU32,
    pub adjustments: Arc<AtomicU32>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_adjust_on(id: AccountId, fault: Fault, inner: InMemoryAccountStore) -> Self {
        Self {
            inner,
            fail_adjust_on: Some((id, fault)),
            ..Default::default()
        }
    }

    pub fn deleting_after_commit(id: AccountId, inner: InMemoryAccountStore) -> Self {
        Self {
            inner,
            delete_after_commit: Some(id),
            ..Default::default()
        }
    }

    pub fn failing_commits(n: u32, inner: InMemoryAccountStore) -> Self {
        Self {
            inner,
            failing_commits: AtomicU32::new(n),
            ..Default::default()
        }
    }
}

struct FaultyTransaction {
    inner: Box<dyn StoreTransaction>,
    fail_adjust_on: Option<(AccountId, Fault)>,
    fail_commit: bool,
    delete_after_commit: Option<(AccountId, InMemoryAccountStore)>,
    adjustments: Arc<AtomicU32>,
}

#[async_trait]
impl StoreTransaction for FaultyTransaction {
    async fn balance(&mut self, id: AccountId) -> Result<Balance> {
        self.inner.balance(id).await
    }

    async fn adjust_balance(&mut self, id: AccountId, delta: i64) -> Result<Balance> {
        if let Some((target, fault)) = self.fail_adjust_on
            && target == id
        {
            return Err(fault.error());
        }
        let balance = self.inner.adjust_balance(id, delta).await?;
        self.adjustments.fetch_add(1, Ordering::SeqCst);
        Ok(balance)
    }

    async fn commit(&mut self) -> Result<()> {
        if self.fail_commit {
            self.inner.rollback().await;
            return Err(LedgerError::Conflict("injected commit conflict".to_string()));
        }
        self.inner.commit().await?;
        if let Some((id, store)) = &self.delete_after_commit {
            store.delete(*id).await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) {
        self.inner.rollback().await
    }
}

#[async_trait]
impl AccountStore for FaultyStore {
    async fn get(&self, id: AccountId) -> Result<Account> {
        self.inner.get(id).await
    }

    async fn insert(&self, draft: AccountDraft) -> Result<Account> {
        self.inner.insert(draft).await
    }

    async fn update(&self, id: AccountId, draft: AccountDraft) -> Result<Account> {
        self.inner.update(id, draft).await
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<Account>> {
        self.inner.list().await
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let fail_commit = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fail_adjust_on: self.fail_adjust_on,
            fail_commit,
            delete_after_commit: self.delete_after_commit.map(|id| (id, self.inner.clone())),
            adjustments: self.adjustments.clone(),
        }))
    }
}
