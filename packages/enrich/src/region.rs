//! District to region resolution.
//!
//! A [`DistrictRegionMap`] is built once per run, either from the
//! built-in Uganda table or from a lookup document, and is read-only
//! afterwards. Lookup keys are normalized with [`normalize_district`] so
//! case, whitespace, punctuation, and a "District" suffix do not matter.
//!
//! Supported lookup document shapes:
//!
//! - `{"Kampala": "Central", ...}` (district to region)
//! - `{"Central": ["Kampala", ...], ...}` (region to districts)
//! - `[{"region": "Central", "districts": ["Kampala", ...]}, ...]`, also
//!   accepting `name`/`Region`/`region_name`/`regionName` and
//!   `Districts`/`district_list`/`districtList`
//! - `[{"district": "Kampala", "region": "Central"}, ...]`
//! - any of the above wrapped under `districtToRegion`, `mapping`,
//!   `regions` or `districts`
//!
//! A document that yields no districts at all is rejected.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::EnrichError;

/// Built-in Uganda lookup, region to districts.
const BUILTIN_LOOKUP: &str = include_str!("../data/district_regions.json");

/// Keys under which a lookup object may be wrapped.
const WRAPPER_KEYS: &[&str] = &["districtToRegion", "mapping", "regions", "districts"];

static DISTRICT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdistrict\b").expect("valid regex"));

/// Normalizes a district name to its lookup key.
///
/// Lower-cases, removes the word "district", and drops every
/// non-alphabetic character.
#[must_use]
pub fn normalize_district(raw: &str) -> String {
    DISTRICT_WORD_RE
        .replace_all(&raw.to_lowercase(), "")
        .chars()
        .filter(char::is_ascii_alphabetic)
        .collect()
}

#[derive(Debug, Deserialize)]
struct RegionEntry {
    #[serde(alias = "name", alias = "Region", alias = "region_name", alias = "regionName")]
    region: String,
    #[serde(
        default,
        alias = "Districts",
        alias = "district_list",
        alias = "districtList"
    )]
    districts: Vec<String>,
    #[serde(
        default,
        alias = "District",
        alias = "district_name",
        alias = "districtName"
    )]
    district: Option<String>,
}

/// Immutable normalized district to region table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistrictRegionMap {
    entries: BTreeMap<String, String>,
}

impl DistrictRegionMap {
    /// Builds the built-in Uganda table.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the embedded table fails to parse.
    pub fn builtin() -> Result<Self, EnrichError> {
        Self::from_json(&serde_json::from_str(BUILTIN_LOOKUP)?)
    }

    /// Loads a lookup document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file cannot be read, is not JSON, or
    /// has an unsupported shape.
    pub fn from_path(path: &Path) -> Result<Self, EnrichError> {
        let text = std::fs::read_to_string(path)?;
        let map = Self::from_json(&serde_json::from_str(&text)?)?;
        log::info!(
            "Loaded {} district mappings from {}",
            map.len(),
            path.display()
        );
        Ok(map)
    }

    /// Builds a table from any supported document shape.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::UnsupportedShape`] if the document is neither
    /// an object nor a list of region entries, or if no district could be
    /// read from it.
    pub fn from_json(document: &serde_json::Value) -> Result<Self, EnrichError> {
        let mut map = Self::default();
        map.collect(document)?;
        if map.is_empty() {
            return Err(EnrichError::UnsupportedShape {
                message: format!("no district mappings found in {}", json_kind(document)),
            });
        }
        Ok(map)
    }

    fn collect(&mut self, document: &serde_json::Value) -> Result<(), EnrichError> {
        match document {
            serde_json::Value::Object(object) => {
                if let Some(inner) = WRAPPER_KEYS.iter().find_map(|key| {
                    object
                        .get(*key)
                        .filter(|v| v.is_object() || v.is_array())
                }) {
                    return self.collect(inner);
                }
                for (key, value) in object {
                    match value {
                        serde_json::Value::String(region) => self.insert(key, region),
                        serde_json::Value::Array(districts) => {
                            for district in districts.iter().filter_map(serde_json::Value::as_str) {
                                self.insert(district, key);
                            }
                        }
                        _ => log::debug!("Ignoring region lookup entry {key:?}"),
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    match RegionEntry::deserialize(item) {
                        Ok(entry) => {
                            for district in entry.districts.iter().chain(&entry.district) {
                                self.insert(district, &entry.region);
                            }
                        }
                        Err(e) => log::debug!("Ignoring region lookup item: {e}"),
                    }
                }
            }
            other => {
                return Err(EnrichError::UnsupportedShape {
                    message: format!("expected object or array, found {}", json_kind(other)),
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, district: &str, region: &str) {
        let key = normalize_district(district);
        let region = region.trim();
        if key.is_empty() || region.is_empty() {
            return;
        }
        self.entries.insert(key, region.to_string());
    }

    /// Looks up the region of a district name.
    #[must_use]
    pub fn region_of(&self, district: &str) -> Option<&str> {
        self.entries
            .get(&normalize_district(district))
            .map(String::as_str)
    }

    /// Number of districts in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a record's region: an explicit region wins, otherwise the
    /// district is looked up. `None` is a valid result.
    #[must_use]
    pub fn resolve_region(&self, explicit: Option<&str>, district: Option<&str>) -> Option<String> {
        if let Some(region) = explicit.map(str::trim).filter(|r| !r.is_empty()) {
            return Some(region.to_string());
        }
        district
            .and_then(|district| self.region_of(district))
            .map(str::to_string)
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
