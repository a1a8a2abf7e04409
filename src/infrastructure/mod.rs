//! Storage adapters implementing [`AccountStore`](crate::domain::ports::AccountStore).

pub mod in_memory;
pub mod locks;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod staged;
