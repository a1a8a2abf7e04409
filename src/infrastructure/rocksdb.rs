use super::locks::RowLocks;
use super::staged::{RowSource, StagedTransaction};
use crate::domain::account::{Account, AccountDraft, AccountId, Balance};
use crate::domain::ports::{AccountStore, StoreTransaction};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Column Family for storing account records.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for store bookkeeping (the id counter).
pub const CF_META: &str = "meta";

const NEXT_ID_KEY: &[u8] = b"next_id";
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::StoreUnavailable(err.to_string())
    }
}

/// A persistent account store on RocksDB.
///
/// Accounts are JSON values keyed by big-endian id, so iteration yields them
/// in id order. The last assigned id is persisted next to them, which keeps
/// ids unique across restarts. Transactions stage their writes and publish
/// them with one atomic `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    locks: Arc<RowLocks>,
    next_id: Arc<Mutex<u64>>,
    lock_timeout: Duration,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and restores the id
    /// counter.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_accounts = ColumnFamilyDescriptor::new(CF_ACCOUNTS, Options::default());
        let cf_meta = ColumnFamilyDescriptor::new(CF_META, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_accounts, cf_meta])?;

        let next_id = {
            let meta = column_family(&db, CF_META)?;
            match db.get_cf(meta, NEXT_ID_KEY)? {
                Some(bytes) => decode_id(&bytes)?,
                None => 0,
            }
        };
        tracing::debug!(next_id, "opened rocksdb account store");

        Ok(Self {
            db: Arc::new(db),
            locks: Arc::new(RowLocks::new()),
            next_id: Arc::new(Mutex::new(next_id)),
            lock_timeout,
        })
    }

    fn accounts_cf(&self) -> Result<&ColumnFamily> {
        column_family(&self.db, CF_ACCOUNTS)
    }

    fn read_account(&self, id: AccountId) -> Result<Option<Account>> {
        let bytes = self.db.get_cf(self.accounts_cf()?, id.0.to_be_bytes())?;
        bytes.map(|bytes| decode_account(&bytes)).transpose()
    }

    fn write_account(&self, account: &Account) -> Result<()> {
        let value = encode_account(account)?;
        self.db
            .put_cf(self.accounts_cf()?, account.id.0.to_be_bytes(), value)?;
        Ok(())
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        LedgerError::StoreUnavailable(format!("{name} column family not found"))
    })
}

fn encode_account(account: &Account) -> Result<Vec<u8>> {
    serde_json::to_vec(account)
        .map_err(|e| LedgerError::StoreUnavailable(format!("Serialization error: {e}")))
}

fn decode_account(bytes: &[u8]) -> Result<Account> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::StoreUnavailable(format!("Deserialization error: {e}")))
}

fn decode_id(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::StoreUnavailable("corrupt id counter".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

#[async_trait]
impl RowSource for RocksDBStore {
    async fn load_balance(&self, id: AccountId) -> Result<Option<Balance>> {
        Ok(self.read_account(id)?.map(|account| account.balance))
    }

    async fn apply_balances(&self, writes: &BTreeMap<AccountId, Balance>) -> Result<()> {
        let cf = self.accounts_cf()?;
        let mut batch = WriteBatch::default();
        for (id, balance) in writes {
            let mut account = self.read_account(*id)?.ok_or(LedgerError::NotFound(*id))?;
            account.balance = *balance;
            batch.put_cf(cf, id.0.to_be_bytes(), encode_account(&account)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn get(&self, id: AccountId) -> Result<Account> {
        self.read_account(id)?.ok_or(LedgerError::NotFound(id))
    }

    async fn insert(&self, draft: AccountDraft) -> Result<Account> {
        let mut next_id = self.next_id.lock().await;
        let id = AccountId(*next_id + 1);
        let account = draft.into_account(id);

        // The counter and the row land together or not at all.
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.accounts_cf()?,
            id.0.to_be_bytes(),
            encode_account(&account)?,
        );
        batch.put_cf(
            column_family(&self.db, CF_META)?,
            NEXT_ID_KEY,
            id.0.to_be_bytes(),
        );
        self.db.write(batch)?;

        *next_id = id.0;
        Ok(account)
    }

    async fn update(&self, id: AccountId, draft: AccountDraft) -> Result<Account> {
        let guard = self.locks.acquire(id, self.lock_timeout).await?;
        if self.read_account(id)?.is_none() {
            self.locks.discard(id, guard);
            return Err(LedgerError::NotFound(id));
        }
        let account = draft.into_account(id);
        self.write_account(&account)?;
        Ok(account)
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let guard = self.locks.acquire(id, self.lock_timeout).await?;
        let Some(account) = self.read_account(id)? else {
            self.locks.discard(id, guard);
            return Err(LedgerError::NotFound(id));
        };
        if account.balance != Balance::ZERO {
            return Err(LedgerError::ValidationError(format!(
                "Account {id} still holds a balance of {}",
                account.balance
            )));
        }
        self.db.delete_cf(self.accounts_cf()?, id.0.to_be_bytes())?;
        self.locks.forget(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(self.accounts_cf()?, IteratorMode::Start) {
            let (_key, value) = item?;
            accounts.push(decode_account(&value)?);
        }
        Ok(accounts)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(StagedTransaction::new(
            self.clone(),
            self.locks.clone(),
            self.lock_timeout,
        )))
    }
}
