use crate::snapshot;
use async_trait::async_trait;
use parking_lot::RwLock;
use snip_core::store::{validate_batch, validate_delete, validate_put};
use snip_core::{
    BatchCode, BatchItem, OwnedUrl, Result, ShortUrlRecord, Store, StoreError, Upsert,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
struct Entry {
    original_url: String,
    owner_id: String,
    deleted: bool,
    /// Insertion order, used for listings and snapshots.
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Every record ever stored, keyed by code.
    records: HashMap<String, Entry>,
    /// Active URLs and the code they are stored under.
    by_url: HashMap<String, String>,
    next_seq: u64,
}

impl MemoryState {
    /// Rebuilds the state from snapshot records.
    ///
    /// Snapshots written without deduplication may hold the same URL as
    /// active under several codes. The first one stays active, the later
    /// ones are loaded as deleted. Returns the state and the number of
    /// records demoted that way.
    fn from_records(records: Vec<ShortUrlRecord>) -> (Self, usize) {
        let mut state = Self::default();
        let mut demoted = 0;
        for record in records {
            let mut deleted = record.deleted;
            if !deleted {
                if let Some(active) = state.by_url.get(&record.original_url) {
                    if *active != record.code {
                        debug!(
                            code = %record.code,
                            active = %active,
                            "duplicate active url in snapshot, loading as deleted"
                        );
                        deleted = true;
                        demoted += 1;
                    }
                }
            }
            state.insert(record.code, record.original_url, record.owner_id, deleted);
        }
        (state, demoted)
    }

    fn insert(&mut self, code: String, original_url: String, owner_id: String, deleted: bool) {
        // A code repeated in a snapshot: the later line wins.
        if let Some(previous) = self.records.get(&code) {
            if self.by_url.get(&previous.original_url) == Some(&code) {
                self.by_url.remove(&previous.original_url);
            }
        }
        if !deleted {
            self.by_url.insert(original_url.clone(), code.clone());
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            code,
            Entry {
                original_url,
                owner_id,
                deleted,
                seq,
            },
        );
    }

    fn put(&mut self, code: &str, original_url: &str, owner_id: &str) -> Result<Upsert<String>> {
        if let Some(existing) = self.by_url.get(original_url) {
            return Ok(Upsert::AlreadyExists(existing.clone()));
        }
        if self.records.contains_key(code) {
            return Err(StoreError::CodeConflict(code.to_string()));
        }

        self.insert(
            code.to_string(),
            original_url.to_string(),
            owner_id.to_string(),
            false,
        );
        Ok(Upsert::Inserted(code.to_string()))
    }

    /// Plans the whole batch before touching the maps so that a code
    /// conflict leaves the state unchanged.
    fn put_batch(&mut self, items: &[BatchItem], owner_id: &str) -> Result<Upsert<Vec<BatchCode>>> {
        let mut pending: Vec<(&str, &str)> = Vec::new();
        let mut pending_urls: HashMap<&str, &str> = HashMap::new();
        let mut pending_codes: HashSet<&str> = HashSet::new();
        let mut codes = Vec::with_capacity(items.len());
        let mut conflict = false;

        for item in items {
            let url = item.original_url.as_str();
            let stored = self
                .by_url
                .get(url)
                .map(String::as_str)
                .or_else(|| pending_urls.get(url).copied());

            let code = match stored {
                Some(code) => {
                    conflict = true;
                    code
                }
                None => {
                    let code = item.code.as_str();
                    if self.records.contains_key(code) || !pending_codes.insert(code) {
                        return Err(StoreError::CodeConflict(code.to_string()));
                    }
                    pending_urls.insert(url, code);
                    pending.push((code, url));
                    code
                }
            };

            codes.push(BatchCode {
                correlation_id: item.correlation_id.clone(),
                code: code.to_string(),
            });
        }

        for (code, url) in pending {
            self.insert(code.to_string(), url.to_string(), owner_id.to_string(), false);
        }

        Ok(Upsert::from_conflict(codes, conflict))
    }

    fn get(&self, code: &str) -> Result<String> {
        match self.records.get(code) {
            None => Err(StoreError::NotFound),
            Some(entry) if entry.deleted => Err(StoreError::Gone),
            Some(entry) => Ok(entry.original_url.clone()),
        }
    }

    /// Records in insertion order.
    fn ordered(&self) -> Vec<(&String, &Entry)> {
        let mut entries: Vec<_> = self.records.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
    }

    fn get_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        let urls: Vec<OwnedUrl> = self
            .ordered()
            .into_iter()
            .filter(|(_, entry)| !entry.deleted && entry.owner_id == owner_id)
            .map(|(code, entry)| OwnedUrl {
                code: code.clone(),
                original_url: entry.original_url.clone(),
            })
            .collect();

        if urls.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(urls)
    }

    fn soft_delete(&mut self, owner_id: &str, codes: &[String]) -> usize {
        let mut deleted = 0;
        for code in codes {
            let Some(entry) = self.records.get_mut(code) else {
                continue;
            };
            if entry.deleted || entry.owner_id != owner_id {
                continue;
            }

            entry.deleted = true;
            deleted += 1;
            if self.by_url.get(&entry.original_url) == Some(code) {
                self.by_url.remove(&entry.original_url);
            }
        }
        deleted
    }

    fn count_owners(&self) -> usize {
        self.records
            .values()
            .map(|entry| entry.owner_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    fn to_records(&self) -> Vec<ShortUrlRecord> {
        self.ordered()
            .into_iter()
            .map(|(code, entry)| ShortUrlRecord {
                code: code.clone(),
                original_url: entry.original_url.clone(),
                owner_id: entry.owner_id.clone(),
                deleted: entry.deleted,
            })
            .collect()
    }
}

/// In-memory implementation of the [`Store`] trait.
///
/// All records live behind a single reader/writer lock: writes take it
/// exclusively for their whole duration, reads share it. When a snapshot
/// path is configured the records are loaded from it on [`open`] and written
/// back on [`close`]; nothing is persisted in between, so a crash loses every
/// change made since the last successful snapshot.
///
/// After [`close`] the store is shut and every operation fails with
/// [`StoreError::NotInitialized`].
///
/// [`open`]: MemoryStore::open
/// [`close`]: Store::close
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<Option<MemoryState>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Creates an empty store without snapshot persistence.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Some(MemoryState::default())),
            snapshot_path: None,
        }
    }

    /// Creates a store backed by the snapshot at `snapshot_path`.
    ///
    /// A missing file is treated as an empty store and corrupt lines are
    /// skipped. A file that exists but cannot be read is an error, so that
    /// closing the store never overwrites a snapshot it did not load.
    pub async fn open(snapshot_path: impl Into<PathBuf>) -> Result<Self> {
        let snapshot_path = snapshot_path.into();
        let decoded = snapshot::load(&snapshot_path).await?;
        let records = decoded.records.len();
        let (state, demoted) = MemoryState::from_records(decoded.records);

        if decoded.skipped > 0 {
            warn!(
                path = %snapshot_path.display(),
                skipped = decoded.skipped,
                "skipped corrupt snapshot lines"
            );
        }
        if demoted > 0 {
            warn!(
                path = %snapshot_path.display(),
                demoted,
                "loaded duplicate active urls as deleted"
            );
        }
        info!(path = %snapshot_path.display(), records, "loaded snapshot");

        Ok(Self {
            state: RwLock::new(Some(state)),
            snapshot_path: Some(snapshot_path),
        })
    }

    /// Writes the current records to the snapshot without closing the store.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };
        let records = self.read(|state| Ok(state.to_records()))?;
        snapshot::save(path, &records).await?;
        debug!(path = %path.display(), records = records.len(), "flushed snapshot");
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> Result<T>) -> Result<T> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        f(state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        f(state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, code: &str, original_url: &str, owner_id: &str) -> Result<Upsert<String>> {
        validate_put(code, original_url, owner_id)?;
        let outcome = self.write(|state| state.put(code, original_url, owner_id))?;
        trace!(code = %outcome.value(), conflict = outcome.is_conflict(), "stored url");
        Ok(outcome)
    }

    async fn put_batch(
        &self,
        items: &[BatchItem],
        owner_id: &str,
    ) -> Result<Upsert<Vec<BatchCode>>> {
        validate_batch(items, owner_id)?;
        let outcome = self.write(|state| state.put_batch(items, owner_id))?;
        trace!(items = items.len(), conflict = outcome.is_conflict(), "stored url batch");
        Ok(outcome)
    }

    async fn get(&self, code: &str) -> Result<String> {
        self.read(|state| state.get(code))
    }

    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        self.read(|state| state.get_by_owner(owner_id))
    }

    async fn soft_delete(&self, owner_id: &str, codes: Vec<String>) -> Result<()> {
        validate_delete(owner_id, &codes)?;
        let deleted = self.write(|state| Ok(state.soft_delete(owner_id, &codes)))?;
        debug!(owner_id, requested = codes.len(), deleted, "soft-deleted urls");
        Ok(())
    }

    async fn count_records(&self) -> Result<u64> {
        self.read(|state| Ok(state.records.len() as u64))
    }

    async fn count_owners(&self) -> Result<u64> {
        self.read(|state| Ok(state.count_owners() as u64))
    }

    async fn ping(&self) -> Result<()> {
        self.read(|_| Ok(()))
    }

    async fn close(&self) -> Result<()> {
        let taken = self.state.write().take();
        let Some(state) = taken else {
            debug!("memory store already closed");
            return Ok(());
        };

        let Some(path) = self.snapshot_path.as_deref() else {
            return Ok(());
        };

        let records = state.to_records();
        if let Err(err) = snapshot::save(path, &records).await {
            // Keep the data so the caller can retry.
            *self.state.write() = Some(state);
            return Err(err);
        }

        info!(path = %path.display(), records = records.len(), "wrote snapshot");
        Ok(())
    }
}
