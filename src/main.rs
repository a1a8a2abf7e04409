use clap::Parser;
use ledger::application::context::RequestContext;
use ledger::application::ledger::Ledger;
use ledger::config::{LedgerConfig, RetryConfig};
use ledger::domain::ports::AccountStoreRef;
use ledger::infrastructure::in_memory::InMemoryAccountStore;
use ledger::interfaces::csv::account_writer::AccountWriter;
use ledger::interfaces::csv::command_reader::CommandReader;
use ledger::telemetry::{self, LedgerMetrics};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// How long a transaction waits for a row lock before reporting a conflict
    #[arg(long, default_value_t = 2000)]
    lock_timeout_ms: u64,

    /// Attempts per transfer, including the first one
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Backoff before the first transfer retry; doubles on each further retry
    #[arg(long, default_value_t = 10)]
    retry_backoff_ms: u64,

    /// Deadline for each command (optional)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(self.retry_backoff_ms),
                ..Default::default()
            },
            request_timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

fn in_memory_store(config: &LedgerConfig) -> AccountStoreRef {
    Arc::new(InMemoryAccountStore::with_lock_timeout(config.lock_timeout))
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>, config: &LedgerConfig) -> Result<AccountStoreRef> {
    use ledger::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(db_path) => {
            let store = RocksDBStore::open_with_lock_timeout(db_path, config.lock_timeout)
                .into_diagnostic()?;
            Ok(Arc::new(store))
        }
        None => Ok(in_memory_store(config)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>, config: &LedgerConfig) -> Result<AccountStoreRef> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_store(config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(&cli.log_level);

    let config = cli.config();
    let store = open_store(cli.db_path, &config)?;
    let metrics = Arc::new(LedgerMetrics::new());
    let ledger = Ledger::new(store, &config, metrics.clone());

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                let ctx = match config.request_timeout {
                    Some(timeout) => RequestContext::with_timeout(timeout),
                    None => RequestContext::background(),
                };
                if let Err(e) = ledger.execute(&ctx, command).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    let accounts = ledger
        .list_accounts(&RequestContext::background())
        .await
        .into_diagnostic()?;
    metrics.log_summary();

    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}
