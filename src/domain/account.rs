use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an account.
///
/// Assigned by the store at creation and never reused, even after the account
/// is deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A balance in the smallest indivisible unit of value.
///
/// Signed so that arithmetic can be checked before it is committed; the store
/// never commits a negative value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Balance(pub i64);

impl Balance {
    pub const ZERO: Self = Self(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a signed delta, failing instead of wrapping on overflow.
    pub fn checked_apply(self, delta: i64) -> Result<Self> {
        self.0
            .checked_add(delta)
            .map(Self)
            .ok_or_else(|| LedgerError::validation("Balance overflow"))
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A strictly positive quantity to move between accounts. Only obtainable
/// through [`Amount::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(LedgerError::validation("Amount must be positive"))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// A balance-holding record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub contact: String,
    pub balance: Balance,
}

/// The mutable attributes of an account, as supplied on create and update.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct AccountDraft {
    pub name: String,
    pub contact: String,
    pub balance: Balance,
}

impl AccountDraft {
    pub fn new(name: impl Into<String>, contact: impl Into<String>, balance: i64) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            balance: Balance::new(balance),
        }
    }

    /// Checks argument shape only; nothing here touches the store.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::validation("Name must not be empty"));
        }
        if !is_well_formed_contact(&self.contact) {
            return Err(LedgerError::ValidationError(format!(
                "Malformed contact '{}'",
                self.contact
            )));
        }
        if self.balance.is_negative() {
            return Err(LedgerError::validation("Balance must not be negative"));
        }
        Ok(())
    }

    pub(crate) fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            name: self.name,
            contact: self.contact,
            balance: self.balance,
        }
    }
}

/// `local@domain.tld`: one `@`, no whitespace, and a dotted domain.
fn is_well_formed_contact(contact: &str) -> bool {
    if contact.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = contact.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// The `{id, balance}` view of an account returned by a transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct AccountBalance {
    pub id: AccountId,
    pub balance: Balance,
}

/// Authoritative post-commit balances of both sides of a transfer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct TransferReceipt {
    pub from: AccountBalance,
    pub to: AccountBalance,
}
