//! Application layer orchestrating the ledger.
//!
//! `Ledger` is the entry point used by callers; it validates requests and
//! hands transfers to the `TransferEngine`, which owns the transactional
//! protocol. Every call carries a `RequestContext` with the caller's deadline
//! and cancellation signal.

pub mod context;
pub mod engine;
pub mod ledger;
