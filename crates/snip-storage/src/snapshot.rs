//! Line-oriented snapshot codec used by the in-memory backend.
//!
//! Each line is one JSON object:
//!
//! ```text
//! {"user_id":"alice","short_url":"aB3dE9xZ","original_url":"https://example.com"}
//! {"user_id":"bob","short_url":"Qw12Er34","original_url":"https://rust-lang.org","is_deleted":true}
//! ```
//!
//! `is_deleted` is only written for tombstones and defaults to `false`, so
//! files written without it still load.

use serde::{Deserialize, Serialize};
use snip_core::{Result, ShortUrlRecord, StoreError};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotLine {
    user_id: String,
    short_url: String,
    original_url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    is_deleted: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl SnapshotLine {
    fn into_record(self) -> Option<ShortUrlRecord> {
        if self.short_url.is_empty() || self.original_url.is_empty() || self.user_id.is_empty() {
            return None;
        }
        Some(ShortUrlRecord {
            code: self.short_url,
            original_url: self.original_url,
            owner_id: self.user_id,
            deleted: self.is_deleted,
        })
    }
}

impl From<&ShortUrlRecord> for SnapshotLine {
    fn from(record: &ShortUrlRecord) -> Self {
        Self {
            user_id: record.owner_id.clone(),
            short_url: record.code.clone(),
            original_url: record.original_url.clone(),
            is_deleted: record.deleted,
        }
    }
}

/// Records recovered from a snapshot.
#[derive(Debug, Default)]
pub struct Decoded {
    pub records: Vec<ShortUrlRecord>,
    /// Lines that could not be parsed or had an empty field.
    pub skipped: usize,
}

/// Parses snapshot content, skipping lines that are not valid records.
pub fn decode(input: &[u8]) -> Decoded {
    let mut decoded = Decoded::default();

    for line in input.split(|byte| *byte == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<SnapshotLine>(line)
            .ok()
            .and_then(SnapshotLine::into_record)
        {
            Some(record) => decoded.records.push(record),
            None => decoded.skipped += 1,
        }
    }

    decoded
}

/// Serializes records, one JSON object per line.
pub fn encode<'a>(records: impl IntoIterator<Item = &'a ShortUrlRecord>) -> Result<String> {
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(&SnapshotLine::from(record))
            .map_err(|e| StoreError::Snapshot(format!("failed to encode record: {e}")))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Reads and decodes the snapshot at `path`.
///
/// A missing file means there is no prior state and yields no records.
pub async fn load(path: &Path) -> Result<Decoded> {
    match tokio::fs::read(path).await {
        Ok(content) => Ok(decode(&content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Decoded::default()),
        Err(err) => Err(StoreError::Snapshot(format!(
            "failed to read {}: {err}",
            path.display()
        ))),
    }
}

/// Replaces the snapshot at `path` with `records`.
///
/// The content is written to a sibling temporary file first and then renamed
/// over the target.
pub async fn save<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a ShortUrlRecord>,
) -> Result<()> {
    let content = encode(records)?;
    let tmp = temp_path(path);

    tokio::fs::write(&tmp, content).await.map_err(|e| {
        StoreError::Snapshot(format!("failed to write {}: {e}", tmp.display()))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        StoreError::Snapshot(format!("failed to replace {}: {e}", path.display()))
    })?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
