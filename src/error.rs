use crate::domain::account::AccountId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Account {0} not found")]
    NotFound(AccountId),
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        requested: i64,
    },
    #[error("Transfer failed after {attempts} attempt(s): {reason}")]
    TransferFailed { attempts: u32, reason: String },
    #[error("Transaction conflict: {0}")]
    Conflict(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Deadline exceeded")]
    DeadlineExceeded,
    #[error("Request cancelled")]
    Cancelled,
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether the failure came from contention or an aborted attempt rather
    /// than from the request itself. A transient failure never left a partial
    /// effect behind, so the caller may issue the same request again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::Conflict(_) | LedgerError::TransferFailed { .. }
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LedgerError::ValidationError(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
