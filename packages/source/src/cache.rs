//! Append-only cache of raw upstream responses.
//!
//! Every fiber run stores the verbatim Overpass payload under
//! `data/raw/<prefix>-<timestamp>-<hash>.json` so a published dataset can
//! be traced back to (and re-derived from) the exact response it came
//! from. The pipelines never read these files back.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sha2::{Digest as _, Sha256};

use crate::SourceError;

/// Number of hex characters of the query digest kept in file names.
pub const HASH_PREFIX_LEN: usize = 12;

/// `strftime` pattern of the file name timestamp: ISO-8601 with `:` and
/// `.` replaced by `-` so the name is portable.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

/// Returns the truncated SHA-256 hex digest of a query.
///
/// Stable across runs as long as the query text is unchanged.
#[must_use]
pub fn query_hash(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_PREFIX_LEN);
    hex
}

/// Writer for raw response files in a single directory.
#[derive(Debug, Clone)]
pub struct RawCache {
    dir: PathBuf,
    prefix: String,
}

impl RawCache {
    /// Creates a cache rooted at `dir`, naming files `<prefix>-...`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Builds the file name for a response to `query` fetched at `at`.
    #[must_use]
    pub fn file_name(&self, query: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}-{}-{}.json",
            self.prefix,
            at.format(TIMESTAMP_FORMAT),
            query_hash(query)
        )
    }

    /// Writes `body` pretty-printed and returns the new file's path.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the directory cannot be created or the
    /// file cannot be written.
    pub async fn write(
        &self,
        query: &str,
        body: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, SourceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(self.file_name(query, at));
        tokio::fs::write(&path, serde_json::to_string_pretty(body)?).await?;
        log::info!("Cached raw response to {}", path.display());
        Ok(path)
    }
}
