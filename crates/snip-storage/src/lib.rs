//! Storage backends for snip.
//!
//! - [`MemoryStore`]: a lock-guarded map persisted to a line-delimited JSON
//!   snapshot when the store is closed.
//! - [`PostgresStore`]: a durable backend built on upserts and a worker-pool
//!   batch deletion pipeline.
//!
//! [`open_store`] picks one of them from a [`StoreConfig`].

pub mod config;
pub mod delete;
pub mod memory;
pub mod postgres;
pub mod snapshot;

pub use config::{open_store, StoreConfig};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use snip_core::{Result, Store, StoreError};
