use super::context::RequestContext;
use super::engine::TransferEngine;
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountDraft, AccountId, TransferReceipt};
use crate::domain::command::{CommandOutcome, LedgerCommand};
use crate::domain::ports::AccountStoreRef;
use crate::error::Result;
use crate::telemetry::{LedgerObserver, Operation};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// The application-facing ledger API.
///
/// Validates argument shape, delegates to the store or the transfer engine
/// and reports every call to the injected observer. Holds no state across
/// calls, so one instance can be shared by any number of concurrent tasks.
pub struct Ledger {
    store: AccountStoreRef,
    engine: TransferEngine,
    observer: Arc<dyn LedgerObserver>,
}

impl Ledger {
    pub fn new(
        store: AccountStoreRef,
        config: &LedgerConfig,
        observer: Arc<dyn LedgerObserver>,
    ) -> Self {
        let engine = TransferEngine::new(store.clone(), config.retry.clone(), observer.clone());
        Self {
            store,
            engine,
            observer,
        }
    }

    async fn observe<T, F>(&self, op: Operation, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.observer.request(op);
        let started = Instant::now();
        let result = fut.await;
        match &result {
            Ok(_) => self.observer.completed(op, started.elapsed()),
            Err(err) => self.observer.failed(op, err),
        }
        result
    }

    pub async fn create_account(&self, ctx: &RequestContext, draft: AccountDraft) -> Result<Account> {
        self.observe(Operation::CreateAccount, async {
            draft.validate()?;
            let account = ctx.run(self.store.insert(draft)).await?;
            tracing::info!(id = %account.id, balance = %account.balance, "account created");
            Ok(account)
        })
        .await
    }

    pub async fn get_account(&self, ctx: &RequestContext, id: AccountId) -> Result<Account> {
        self.observe(Operation::GetAccount, ctx.run(self.store.get(id)))
            .await
    }

    pub async fn update_account(
        &self,
        ctx: &RequestContext,
        id: AccountId,
        draft: AccountDraft,
    ) -> Result<Account> {
        self.observe(Operation::UpdateAccount, async {
            draft.validate()?;
            let account = ctx.run(self.store.update(id, draft)).await?;
            tracing::info!(%id, "account updated");
            Ok(account)
        })
        .await
    }

    pub async fn delete_account(&self, ctx: &RequestContext, id: AccountId) -> Result<()> {
        self.observe(Operation::DeleteAccount, async {
            ctx.run(self.store.delete(id)).await?;
            tracing::info!(%id, "account deleted");
            Ok(())
        })
        .await
    }

    pub async fn list_accounts(&self, ctx: &RequestContext) -> Result<Vec<Account>> {
        self.observe(Operation::ListAccounts, ctx.run(self.store.list()))
            .await
    }

    pub async fn transfer(
        &self,
        ctx: &RequestContext,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferReceipt> {
        self.observe(
            Operation::Transfer,
            self.engine.transfer(ctx, from, to, amount),
        )
        .await
    }

    /// Dispatches a parsed command to the matching operation.
    pub async fn execute(&self, ctx: &RequestContext, command: LedgerCommand) -> Result<CommandOutcome> {
        match command {
            LedgerCommand::Create(draft) => self
                .create_account(ctx, draft)
                .await
                .map(CommandOutcome::Created),
            LedgerCommand::Update { id, draft } => self
                .update_account(ctx, id, draft)
                .await
                .map(CommandOutcome::Updated),
            LedgerCommand::Delete(id) => self
                .delete_account(ctx, id)
                .await
                .map(|()| CommandOutcome::Deleted(id)),
            LedgerCommand::Transfer { from, to, amount } => self
                .transfer(ctx, from, to, amount)
                .await
                .map(CommandOutcome::Transferred),
        }
    }
}
