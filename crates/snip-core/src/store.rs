use crate::error::{Result, StoreError};
use crate::record::{BatchCode, BatchItem, OwnedUrl, Upsert};
use async_trait::async_trait;

/// Storage contract for short URLs.
///
/// Implementations deduplicate on the original URL: writing a URL that
/// already has an active record yields [`Upsert::AlreadyExists`] with the
/// stored code instead of creating a second record. Records are scoped to
/// the owner that created them and are only ever soft-deleted.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Stores `original_url` under `code` for `owner_id`.
    ///
    /// Returns the code that is actually stored, which differs from `code`
    /// when the URL was already shortened.
    async fn put(&self, code: &str, original_url: &str, owner_id: &str) -> Result<Upsert<String>>;

    /// Stores a batch of URLs for `owner_id`.
    ///
    /// An item with an empty code or URL rejects the whole batch. When any
    /// item hits an existing URL the outcome is [`Upsert::AlreadyExists`],
    /// still carrying a usable code for every item.
    async fn put_batch(&self, items: &[BatchItem], owner_id: &str)
        -> Result<Upsert<Vec<BatchCode>>>;

    /// Resolves a code to its original URL.
    ///
    /// Fails with [`StoreError::NotFound`] for unknown codes and
    /// [`StoreError::Gone`] for soft-deleted ones.
    async fn get(&self, code: &str) -> Result<String>;

    /// Lists the active records of an owner.
    ///
    /// Fails with [`StoreError::NotFound`] when the owner has none.
    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>>;

    /// Marks the given codes as deleted.
    ///
    /// Codes that are unknown, already deleted or owned by someone else are
    /// skipped without being reported.
    async fn soft_delete(&self, owner_id: &str, codes: Vec<String>) -> Result<()>;

    /// Number of records ever stored, deleted ones included.
    async fn count_records(&self) -> Result<u64>;

    /// Number of distinct owners.
    async fn count_owners(&self) -> Result<u64>;

    /// Connectivity check for health endpoints.
    async fn ping(&self) -> Result<()>;

    /// Flushes pending state and releases the backend.
    async fn close(&self) -> Result<()>;
}

/// Checks the arguments of [`Store::put`].
pub fn validate_put(code: &str, original_url: &str, owner_id: &str) -> Result<()> {
    if code.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    if original_url.is_empty() {
        return Err(StoreError::EmptyValue);
    }
    if owner_id.is_empty() {
        return Err(StoreError::EmptyOwner);
    }
    Ok(())
}

/// Checks the arguments of [`Store::put_batch`].
pub fn validate_batch(items: &[BatchItem], owner_id: &str) -> Result<()> {
    if owner_id.is_empty() {
        return Err(StoreError::EmptyOwner);
    }
    if items.is_empty() {
        return Err(StoreError::EmptyValue);
    }
    for item in items {
        if item.code.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if item.original_url.is_empty() {
            return Err(StoreError::EmptyValue);
        }
    }
    Ok(())
}

/// Checks the arguments of [`Store::soft_delete`].
pub fn validate_delete(owner_id: &str, codes: &[String]) -> Result<()> {
    if owner_id.is_empty() {
        return Err(StoreError::EmptyOwner);
    }
    if codes.is_empty() {
        return Err(StoreError::EmptyCodeList);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: &str, url: &str) -> BatchItem {
        BatchItem {
            correlation_id: "1".to_string(),
            original_url: url.to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn put_rejects_empty_fields_in_order() {
        assert_eq!(validate_put("", "", ""), Err(StoreError::EmptyKey));
        assert_eq!(validate_put("abc", "", ""), Err(StoreError::EmptyValue));
        assert_eq!(
            validate_put("abc", "https://example.com", ""),
            Err(StoreError::EmptyOwner)
        );
        assert!(validate_put("abc", "https://example.com", "alice").is_ok());
    }

    #[test]
    fn batch_rejects_empty_input() {
        assert_eq!(validate_batch(&[], "alice"), Err(StoreError::EmptyValue));
        assert_eq!(
            validate_batch(&[item("abc", "https://x")], ""),
            Err(StoreError::EmptyOwner)
        );
    }

    #[test]
    fn batch_rejects_any_empty_item() {
        let items = vec![item("abc", "https://x"), item("def", "")];
        assert_eq!(validate_batch(&items, "alice"), Err(StoreError::EmptyValue));

        let items = vec![item("", "https://x")];
        assert_eq!(validate_batch(&items, "alice"), Err(StoreError::EmptyKey));
    }

    #[test]
    fn delete_requires_owner_and_codes() {
        assert_eq!(
            validate_delete("", &["abc".to_string()]),
            Err(StoreError::EmptyOwner)
        );
        assert_eq!(validate_delete("alice", &[]), Err(StoreError::EmptyCodeList));
        assert!(validate_delete("alice", &["abc".to_string()]).is_ok());
    }
}
