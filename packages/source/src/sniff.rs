//! Format sniffing for official dataset payloads.
//!
//! An official dataset may be a `GeoJSON` `FeatureCollection`, an object
//! wrapping a `features` list, a bare JSON array, or delimited text. The
//! payload is classified once here into an [`OfficialPayload`] and never
//! handled as an untyped blob afterwards.

use crate::SourceError;
use crate::delimited::{CsvTable, parse_csv};

/// A classified official dataset payload.
#[derive(Debug, Clone, PartialEq)]
pub enum OfficialPayload {
    /// Feature objects from a `FeatureCollection` or a `features` wrapper.
    GeoJson(Vec<serde_json::Value>),
    /// Items of a bare JSON array (features or flat row objects).
    Array(Vec<serde_json::Value>),
    /// Delimited text rows.
    CsvRows(CsvTable),
}

impl OfficialPayload {
    /// Number of records in the payload.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::GeoJson(features) => features.len(),
            Self::Array(items) => items.len(),
            Self::CsvRows(table) => table.rows.len(),
        }
    }

    /// Returns `true` if the payload holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the payload was parsed as delimited text.
    #[must_use]
    pub const fn is_csv(&self) -> bool {
        matches!(self, Self::CsvRows(_))
    }
}

/// Classifies an already-decoded JSON payload.
///
/// Documents with none of the recognized shapes yield an empty
/// [`OfficialPayload::GeoJson`].
#[must_use]
pub fn classify_json(value: serde_json::Value) -> OfficialPayload {
    match value {
        serde_json::Value::Array(items) => OfficialPayload::Array(items),
        serde_json::Value::Object(mut object) => {
            let is_collection = object.get("type").and_then(serde_json::Value::as_str)
                == Some("FeatureCollection");
            match object.remove("features") {
                Some(serde_json::Value::Array(features)) => OfficialPayload::GeoJson(features),
                _ => {
                    if is_collection {
                        log::warn!("FeatureCollection without a features list");
                    }
                    OfficialPayload::GeoJson(Vec::new())
                }
            }
        }
        _ => OfficialPayload::GeoJson(Vec::new()),
    }
}

/// Classifies a text payload: JSON first, delimited text otherwise.
///
/// # Errors
///
/// Returns [`SourceError`] if the text is neither JSON nor parseable
/// delimited text.
pub fn sniff(text: &str) -> Result<OfficialPayload, SourceError> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => Ok(classify_json(value)),
        Err(json_err) => {
            log::debug!("Payload is not JSON ({json_err}), parsing as delimited text");
            parse_csv(trimmed).map(OfficialPayload::CsvRows)
        }
    }
}
