//! Outer adapters that feed commands into the ledger and render its state.

pub mod csv;
