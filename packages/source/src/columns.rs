//! Column detection for arbitrary-schema school datasets.
//!
//! Each semantic field accepts a prioritized list of synonym names. Header
//! matching ignores case and surrounding whitespace and treats runs of
//! spaces, dashes, and underscores alike, so `"School Name"`,
//! `"school_name"` and `" SCHOOL-NAME "` all match the same synonym.

use crate::SourceError;

/// A semantic field of a school record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// School name.
    Name,
    /// Latitude (WGS84).
    Latitude,
    /// Longitude (WGS84).
    Longitude,
    /// District name.
    District,
    /// Region name.
    Region,
    /// Free-text ownership.
    Ownership,
    /// Free-text gender.
    Gender,
}

impl Column {
    /// Every column, in detection order.
    pub const ALL: &[Self] = &[
        Self::Name,
        Self::Latitude,
        Self::Longitude,
        Self::District,
        Self::Region,
        Self::Ownership,
        Self::Gender,
    ];

    /// Accepted header names in priority order (already normalized).
    #[must_use]
    pub const fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::Name => &[
                "name",
                "school_name",
                "schoolname",
                "school",
                "institution",
                "institution_name",
            ],
            Self::Latitude => &["lat", "latitude", "y", "lat_dd", "gps_latitude", "gps_lat"],
            Self::Longitude => &[
                "lng",
                "lon",
                "long",
                "longitude",
                "x",
                "lon_dd",
                "gps_longitude",
                "gps_lng",
                "gps_lon",
            ],
            Self::District => &["district", "district_name", "dist", "adm2", "admin2"],
            Self::Region => &["region", "region_name", "sub_region", "subregion"],
            Self::Ownership => &[
                "ownership",
                "owner",
                "ownership_type",
                "operator_type",
                "founding_body",
                "founder",
                "funding",
                "authority",
            ],
            Self::Gender => &[
                "gender",
                "school_gender",
                "sex",
                "gender_type",
                "students_gender",
            ],
        }
    }

    /// Human-readable field name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::District => "district",
            Self::Region => "region",
            Self::Ownership => "ownership",
            Self::Gender => "gender",
        }
    }
}

/// Normalizes a header or key for synonym comparison.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Finds the index of `column` among `headers`.
///
/// Synonyms are tried in priority order; the first synonym that matches
/// any header wins.
#[must_use]
pub fn find_column<S: AsRef<str>>(headers: &[S], column: Column) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h.as_ref()))
        .collect();
    column
        .synonyms()
        .iter()
        .find_map(|synonym| normalized.iter().position(|h| h == synonym))
}

/// Resolved column positions of a tabular dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Latitude column index.
    pub latitude: usize,
    /// Longitude column index.
    pub longitude: usize,
    /// Name column index.
    pub name: Option<usize>,
    /// District column index.
    pub district: Option<usize>,
    /// Region column index.
    pub region: Option<usize>,
    /// Ownership column index.
    pub ownership: Option<usize>,
    /// Gender column index.
    pub gender: Option<usize>,
}

impl ColumnMap {
    /// Detects every column in `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingColumn`] when the latitude or
    /// longitude column cannot be found.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Result<Self, SourceError> {
        let require = |column: Column| {
            find_column(headers, column).ok_or(SourceError::MissingColumn {
                field: column.label(),
            })
        };

        Ok(Self {
            latitude: require(Column::Latitude)?,
            longitude: require(Column::Longitude)?,
            name: find_column(headers, Column::Name),
            district: find_column(headers, Column::District),
            region: find_column(headers, Column::Region),
            ownership: find_column(headers, Column::Ownership),
            gender: find_column(headers, Column::Gender),
        })
    }
}

/// Looks up `column` among the keys of a JSON object.
///
/// Returns the first non-null value whose key matches, honoring synonym
/// priority.
#[must_use]
pub fn lookup<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
    column: Column,
) -> Option<&'a serde_json::Value> {
    column.synonyms().iter().find_map(|synonym| {
        object
            .iter()
            .find(|(key, value)| !value.is_null() && normalize_header(key) == *synonym)
            .map(|(_, value)| value)
    })
}

/// Looks up `column` and renders it as trimmed, non-empty text.
///
/// Numbers and booleans are rendered with their JSON representation.
#[must_use]
pub fn lookup_text(
    object: &serde_json::Map<String, serde_json::Value>,
    column: Column,
) -> Option<String> {
    let text = match lookup(object, column)? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Looks up `column` and parses it as a finite number.
#[must_use]
pub fn lookup_f64(
    object: &serde_json::Map<String, serde_json::Value>,
    column: Column,
) -> Option<f64> {
    let value = match lookup(object, column)? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
