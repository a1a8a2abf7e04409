use super::account::{Account, AccountDraft, AccountId, TransferReceipt};
use crate::error::{LedgerError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Create,
    Update,
    Delete,
    Transfer,
}

/// One row of a command batch, as it appears on the wire.
///
/// Which columns are required depends on `type`; see [`LedgerCommand`].
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    pub account: Option<u64>,
    pub counterparty: Option<u64>,
    pub amount: Option<i64>,
    pub name: Option<String>,
    pub contact: Option<String>,
}

/// A fully-formed request against the ledger.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum LedgerCommand {
    Create(AccountDraft),
    Update { id: AccountId, draft: AccountDraft },
    Delete(AccountId),
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: i64,
    },
}

/// What a successfully executed command produced.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CommandOutcome {
    Created(Account),
    Updated(Account),
    Deleted(AccountId),
    Transferred(TransferReceipt),
}

impl TryFrom<CommandRecord> for LedgerCommand {
    type Error = LedgerError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let account = || required(record.account, "account").map(AccountId);
        let draft = || -> Result<AccountDraft> {
            Ok(AccountDraft::new(
                required(record.name.clone(), "name")?,
                required(record.contact.clone(), "contact")?,
                required(record.amount, "amount")?,
            ))
        };

        match record.r#type {
            CommandType::Create => Ok(LedgerCommand::Create(draft()?)),
            CommandType::Update => Ok(LedgerCommand::Update {
                id: account()?,
                draft: draft()?,
            }),
            CommandType::Delete => Ok(LedgerCommand::Delete(account()?)),
            CommandType::Transfer => Ok(LedgerCommand::Transfer {
                from: account()?,
                to: required(record.counterparty, "counterparty").map(AccountId)?,
                amount: required(record.amount, "amount")?,
            }),
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| LedgerError::ValidationError(format!("Missing field '{field}'")))
}
