use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use ledger::application::context::RequestContext;
use ledger::domain::account::Balance;
use ledger::error::LedgerError;
use ledger::infrastructure::in_memory::InMemoryAccountStore;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;

mod common;

#[test]
fn test_boundary_numerical_values() {
    let max = i64::MAX.to_string();
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "type, account, counterparty, amount, name, contact").unwrap();
    writeln!(csv, "create, , , {max}, Whale, whale@example.com").unwrap();
    writeln!(csv, "create, , , 0, Minnow, minnow@example.com").unwrap();
    writeln!(csv, "transfer, 1, 2, {max}, ,").unwrap();

    let mut cmd = Command::new(cargo_bin!("ledger"));
    cmd.arg(csv.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,Whale,whale@example.com,0"))
        .stdout(predicate::str::contains(format!("2,Minnow,minnow@example.com,{max}")));
}

#[tokio::test]
async fn test_credit_overflow_is_rejected_atomically() {
    let store = Arc::new(InMemoryAccountStore::new());
    let ids = common::seed(store.as_ref(), &[i64::MAX, 10]).await;
    let (ledger, _) = common::ledger_over(store.clone());

    let err = ledger
        .transfer(&RequestContext::background(), ids[1], ids[0], 1)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ValidationError(ref msg) if msg.contains("overflow")));
    assert_eq!(
        ledger.get_account(&RequestContext::background(), ids[1]).await.unwrap().balance,
        Balance(10)
    );
    assert_eq!(
        ledger.get_account(&RequestContext::background(), ids[0]).await.unwrap().balance,
        Balance(i64::MAX)
    );
}

#[tokio::test]
async fn test_smallest_transfer_moves_one_unit() {
    let store = Arc::new(InMemoryAccountStore::new());
    let ids = common::seed(store.as_ref(), &[1, 0]).await;
    let (ledger, _) = common::ledger_over(store);

    let receipt = ledger
        .transfer(&RequestContext::background(), ids[0], ids[1], 1)
        .await
        .unwrap();
    assert_eq!(receipt.from.balance, Balance::ZERO);
    assert_eq!(receipt.to.balance, Balance(1));
}
