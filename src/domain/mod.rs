//! Domain types and the storage port the application layer is written against.

pub mod account;
pub mod command;
pub mod ports;
