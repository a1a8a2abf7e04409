use super::context::RequestContext;
use crate::config::RetryConfig;
use crate::domain::account::{AccountBalance, AccountId, Amount, TransferReceipt};
use crate::domain::ports::{AccountStoreRef, run_transaction};
use crate::error::{LedgerError, Result};
use crate::telemetry::LedgerObserver;
use std::sync::Arc;

/// Executes transfers as single all-or-nothing units of work.
///
/// Each attempt runs in exactly one store transaction. Both rows are locked in
/// ascending id order whatever the direction of the transfer, so two transfers
/// over the same pair of accounts always contend on the same row first and
/// cannot wait on each other in a cycle. The store's row locks are the only
/// serialization point; the engine holds no state between calls.
pub struct TransferEngine {
    store: AccountStoreRef,
    retry: RetryConfig,
    observer: Arc<dyn LedgerObserver>,
}

impl TransferEngine {
    pub fn new(store: AccountStoreRef, retry: RetryConfig, observer: Arc<dyn LedgerObserver>) -> Self {
        Self {
            store,
            retry,
            observer,
        }
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Transient conflicts re-run the whole transaction from scratch, up to
    /// the configured number of attempts. If they run out, or the context
    /// fires mid-attempt, the result is `TransferFailed` and neither balance
    /// has changed. Validation, missing accounts and insufficient funds fail
    /// immediately.
    pub async fn transfer(
        &self,
        ctx: &RequestContext,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferReceipt> {
        if from == to {
            return Err(LedgerError::validation(
                "Source and destination accounts must differ",
            ));
        }
        let amount = Amount::new(amount)?;
        let max_attempts = self.retry.max_attempts.max(1);

        let mut attempt = 0;
        let receipt = loop {
            attempt += 1;
            match ctx.run(self.attempt(from, to, amount)).await {
                Ok(receipt) => break receipt,
                Err(LedgerError::Conflict(reason)) if attempt < max_attempts => {
                    self.observer
                        .retry(attempt, &LedgerError::Conflict(reason));
                    let backoff = self.retry.backoff_for_attempt(attempt - 1);
                    let waited = ctx
                        .run(async {
                            tokio::time::sleep(backoff).await;
                            Ok(())
                        })
                        .await;
                    if let Err(abort) = waited {
                        return Err(LedgerError::TransferFailed {
                            attempts: attempt,
                            reason: abort.to_string(),
                        });
                    }
                }
                Err(LedgerError::Conflict(reason)) => {
                    return Err(LedgerError::TransferFailed {
                        attempts: attempt,
                        reason,
                    });
                }
                Err(abort @ (LedgerError::DeadlineExceeded | LedgerError::Cancelled)) => {
                    return Err(LedgerError::TransferFailed {
                        attempts: attempt,
                        reason: abort.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        };

        tracing::debug!(%from, %to, amount = amount.value(), attempt, "transfer committed");
        Ok(receipt)
    }

    /// The receipt is read inside the transaction while both rows are still
    /// locked, so it holds exactly the committed balances.
    async fn attempt(&self, from: AccountId, to: AccountId, amount: Amount) -> Result<TransferReceipt> {
        run_transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let (first, second) = if from < to { (from, to) } else { (to, from) };
                tx.balance(first).await?;
                tx.balance(second).await?;

                let available = tx.balance(from).await?;
                if available.value() < amount.value() {
                    return Err(LedgerError::InsufficientFunds {
                        account: from,
                        balance: available.value(),
                        requested: amount.value(),
                    });
                }
                let source = tx.adjust_balance(from, -amount.value()).await?;
                let destination = tx.adjust_balance(to, amount.value()).await?;
                Ok(TransferReceipt {
                    from: AccountBalance { id: from, balance: source },
                    to: AccountBalance { id: to, balance: destination },
                })
            })
        })
        .await
    }
}
