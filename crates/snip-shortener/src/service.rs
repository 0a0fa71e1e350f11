use crate::error::{Result, ShortenerError};
use crate::model::{BatchRequest, BatchShortUrl, UserUrl};
use snip_core::store::validate_delete;
use snip_core::{BatchItem, Stats, Store, StoreError, Upsert};
use snip_generator::Generator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How many codes are tried before giving up on a write.
pub const MAX_ATTEMPTS: usize = 5;

/// Shortens, resolves and deletes URLs on top of a [`Store`].
///
/// Generated codes carry no uniqueness guarantee. When the store reports a
/// [`StoreError::CodeConflict`] a fresh code is generated and the write is
/// retried, up to [`MAX_ATTEMPTS`] times.
#[derive(Clone)]
pub struct ShortenerService {
    store: Arc<dyn Store>,
    generator: Arc<dyn Generator>,
    base_url: String,
}

impl ShortenerService {
    pub fn new(
        store: Arc<dyn Store>,
        generator: impl Generator,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            store,
            generator: Arc::new(generator),
            base_url,
        }
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Shortens `original_url` for `owner_id`.
    ///
    /// Yields [`Upsert::AlreadyExists`] with the existing short URL when the
    /// URL is already stored.
    pub async fn create(&self, original_url: &str, owner_id: &str) -> Result<Upsert<String>> {
        for attempt in 1..=MAX_ATTEMPTS {
            let code = self.generator.shorten(original_url)?;

            match self.store.put(&code, original_url, owner_id).await {
                Ok(outcome) => {
                    debug!(code = %outcome.value(), conflict = outcome.is_conflict(), "shortened url");
                    return Ok(outcome.map(|code| self.short_url(&code)));
                }
                Err(StoreError::CodeConflict(code)) => {
                    warn!(%code, attempt, "generated code is taken, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::CodeSpaceExhausted(MAX_ATTEMPTS))
    }

    /// Shortens several URLs at once.
    ///
    /// The batch is stored as a whole: on a code conflict every code is
    /// regenerated and the batch is retried.
    pub async fn create_batch(
        &self,
        requests: &[BatchRequest],
        owner_id: &str,
    ) -> Result<Upsert<Vec<BatchShortUrl>>> {
        for attempt in 1..=MAX_ATTEMPTS {
            let items = requests
                .iter()
                .map(|request| {
                    Ok(BatchItem {
                        correlation_id: request.correlation_id.clone(),
                        original_url: request.original_url.clone(),
                        code: self.generator.shorten(&request.original_url)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            match self.store.put_batch(&items, owner_id).await {
                Ok(outcome) => {
                    debug!(items = items.len(), conflict = outcome.is_conflict(), "shortened batch");
                    return Ok(outcome.map(|codes| {
                        codes
                            .into_iter()
                            .map(|code| BatchShortUrl {
                                correlation_id: code.correlation_id,
                                short_url: self.short_url(&code.code),
                            })
                            .collect()
                    }));
                }
                Err(StoreError::CodeConflict(code)) => {
                    warn!(%code, attempt, "generated batch code is taken, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::CodeSpaceExhausted(MAX_ATTEMPTS))
    }

    /// Resolves a code to its original URL.
    pub async fn resolve(&self, code: &str) -> Result<String> {
        Ok(self.store.get(code).await?)
    }

    /// Lists the live short URLs of `owner_id`.
    pub async fn user_urls(&self, owner_id: &str) -> Result<Vec<UserUrl>> {
        let urls = self.store.get_by_owner(owner_id).await?;
        Ok(urls
            .into_iter()
            .map(|url| UserUrl {
                short_url: self.short_url(&url.code),
                original_url: url.original_url,
            })
            .collect())
    }

    /// Schedules the soft deletion of `codes` owned by `owner_id`.
    ///
    /// Arguments are checked before anything is scheduled. The deletion runs
    /// on a detached task whose outcome is only logged; the returned handle
    /// may be dropped.
    pub fn delete(&self, owner_id: &str, codes: Vec<String>) -> Result<DeletionHandle> {
        validate_delete(owner_id, &codes)?;

        let store = Arc::clone(&self.store);
        let owner_id = owner_id.to_string();
        let task = tokio::spawn(async move {
            let requested = codes.len();
            let result = store.soft_delete(&owner_id, codes).await;
            match &result {
                Ok(()) => info!(%owner_id, requested, "deleted urls"),
                Err(err) => error!(%owner_id, requested, error = %err, "failed to delete urls"),
            }
            result
        });

        Ok(DeletionHandle { task })
    }

    /// Checks that the store is reachable.
    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }

    pub async fn stats(&self) -> Result<Stats> {
        let urls = self.store.count_records().await?;
        let users = self.store.count_owners().await?;
        Ok(Stats { urls, users })
    }
}

/// Completion of a scheduled deletion.
///
/// Dropping the handle leaves the deletion running.
#[derive(Debug)]
pub struct DeletionHandle {
    task: JoinHandle<snip_core::Result<()>>,
}

impl DeletionHandle {
    /// Waits for the deletion to finish.
    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => Ok(result?),
            Err(err) => Err(ShortenerError::DeletionAborted(err.to_string())),
        }
    }
}
