//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the record model, the error taxonomy and the [`Store`]
//! contract shared by the storage backends, the shortener service and the
//! HTTP gateway.

pub mod error;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use record::{BatchCode, BatchItem, OwnedUrl, ShortUrlRecord, Stats, Upsert};
pub use store::Store;
