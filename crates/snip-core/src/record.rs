use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// A stored short URL.
///
/// `deleted` is a tombstone: once set it is never cleared, and the record
/// keeps its code so that later lookups can report it as gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortUrlRecord {
    /// The short identifier, unique within the store.
    pub code: String,
    /// The full target URL.
    pub original_url: String,
    /// The user that created the record.
    pub owner_id: String,
    /// Soft-delete marker.
    pub deleted: bool,
}

/// Outcome of a deduplicating write.
///
/// A write that hits an already stored URL is not a failure: the caller still
/// receives a usable value (the pre-existing code) and has to build its
/// response from it rather than from the code it proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert<T> {
    /// Every item was stored under the proposed code.
    Inserted(T),
    /// At least one item matched an active record; the value carries the
    /// codes that are actually stored.
    AlreadyExists(T),
}

impl<T> Upsert<T> {
    /// Builds an outcome from a "hit an existing record" flag.
    pub fn from_conflict(value: T, conflict: bool) -> Self {
        if conflict {
            Upsert::AlreadyExists(value)
        } else {
            Upsert::Inserted(value)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Upsert::AlreadyExists(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Upsert::Inserted(value) | Upsert::AlreadyExists(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Upsert::Inserted(value) | Upsert::AlreadyExists(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Upsert<U> {
        match self {
            Upsert::Inserted(value) => Upsert::Inserted(f(value)),
            Upsert::AlreadyExists(value) => Upsert::AlreadyExists(f(value)),
        }
    }
}

impl Upsert<String> {
    /// Turns a dedup hit into [`StoreError::AlreadyExists`] carrying the
    /// stored code, for callers that prefer error semantics.
    pub fn into_result(self) -> Result<String> {
        match self {
            Upsert::Inserted(code) => Ok(code),
            Upsert::AlreadyExists(code) => Err(StoreError::AlreadyExists(code)),
        }
    }
}

/// One entry of a batch write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Caller-side identifier echoed back in the result.
    pub correlation_id: String,
    pub original_url: String,
    /// The code proposed for this item.
    pub code: String,
}

/// The code finally stored for one batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCode {
    pub correlation_id: String,
    pub code: String,
}

/// An active record as listed for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedUrl {
    pub code: String,
    pub original_url: String,
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub urls: u64,
    pub users: u64,
}
