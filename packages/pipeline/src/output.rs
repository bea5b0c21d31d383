//! Output file writer.

use std::path::Path;

use serde::Serialize;

use crate::PipelineError;

/// Writes `value` as pretty-printed JSON to `path`, replacing any existing
/// file atomically.
///
/// The document is written to `<path>.tmp` and renamed into place, so a
/// reader never observes a partially written file. Parent directories are
/// created as needed.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be written, or
/// [`PipelineError::Json`] if serialization fails.
pub async fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(value)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    tokio::fs::write(tmp, json).await?;
    tokio::fs::rename(tmp, path).await?;

    log::info!("Wrote {}", path.display());
    Ok(())
}
