#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` output types for the fiber and schools datasets.
//!
//! Both pipelines emit a `FeatureCollection` consumed as a static asset by
//! the map front end. The front end performs no validation of its own, so
//! these types are the single definition of the published schema.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A `[longitude, latitude]` coordinate pair (WGS84, `GeoJSON` axis order).
pub type Position = [f64; 2];

/// Canonical output geometry.
///
/// Fiber features use all three variants; school features are always
/// collapsed to [`Geometry::Point`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Position),
    /// An ordered chain of positions.
    LineString(Vec<Position>),
    /// Several independent position chains.
    MultiLineString(Vec<Vec<Position>>),
}

impl Geometry {
    /// Returns the geometry kind of this value.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::LineString(_) => GeometryKind::LineString,
            Self::MultiLineString(_) => GeometryKind::MultiLineString,
        }
    }

    /// Iterates over every position in the geometry, in order.
    pub fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Self::Point(p) => Box::new(std::iter::once(p)),
            Self::LineString(line) => Box::new(line.iter()),
            Self::MultiLineString(lines) => Box::new(lines.iter().flatten()),
        }
    }

    /// Returns `true` when the geometry has at least one position and every
    /// coordinate leaf is a finite number.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mut positions = self.positions().peekable();
        positions.peek().is_some()
            && positions.all(|[lon, lat]| lon.is_finite() && lat.is_finite())
    }
}

/// The `type` discriminator of a [`Geometry`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum GeometryKind {
    /// `Point`
    Point,
    /// `LineString`
    LineString,
    /// `MultiLineString`
    MultiLineString,
}

/// Serializes as the literal `"Feature"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    /// The only value.
    #[default]
    Feature,
}

/// Serializes as the literal `"FeatureCollection"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    /// The only value.
    #[default]
    FeatureCollection,
}

/// A `GeoJSON` feature with typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature<P> {
    /// Always `"Feature"`.
    #[serde(rename = "type", default)]
    pub tag: FeatureTag,
    /// Optional stable identifier (e.g. `"way/123"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Never null in emitted output.
    pub geometry: Geometry,
    /// Typed attribute record.
    pub properties: P,
}

impl<P> Feature<P> {
    /// Creates a feature without an identifier.
    #[must_use]
    pub const fn new(geometry: Geometry, properties: P) -> Self {
        Self {
            tag: FeatureTag::Feature,
            id: None,
            geometry,
            properties,
        }
    }

    /// Sets the feature identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// OSM element kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered vertex chain.
    Way,
    /// A group of member elements.
    Relation,
}

/// Classification of a telecom feature.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureType {
    /// A way or relation carrying fibre-optic cable.
    FiberLine,
    /// Exchange, central office, or data centre.
    TelecomSite,
    /// Street cabinet or distribution point.
    TelecomCabinet,
    /// Pole carrying telecom cable.
    TelecomPole,
}

/// Attribute record of a fiber dataset feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiberProperties {
    /// OSM element identifier.
    pub osm_id: i64,
    /// OSM element kind.
    pub osm_type: ElementKind,
    /// `name` tag.
    pub name: Option<String>,
    /// `operator` tag.
    pub operator: Option<String>,
    /// `owner` tag.
    pub owner: Option<String>,
    /// `telecom` tag.
    pub telecom: Option<String>,
    /// Cable medium (`telecom:medium`, `cable:medium`, or `cable`).
    pub cable_medium: Option<String>,
    /// Communication medium (`communication:medium` or `communication`).
    pub communication_medium: Option<String>,
    /// Derived classification; `None` when no predicate matched.
    pub feature_type: Option<FeatureType>,
    /// Upstream dataset name.
    pub source: String,
    /// Upstream licence identifier.
    pub licence: String,
    /// Required attribution text.
    pub attribution: String,
    /// Original upstream tag set, verbatim.
    pub tags: BTreeMap<String, String>,
}

/// Provenance block attached to the fiber dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiberMetadata {
    /// When the dataset was assembled.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock time spent fetching from Overpass, in milliseconds.
    pub fetch_duration_ms: u64,
    /// Full Overpass QL text that produced the raw response.
    pub query: String,
    /// Endpoint used by each attempt, in attempt order.
    pub endpoints_tried: Vec<String>,
    /// Human-readable assumptions baked into the derivation.
    pub assumptions: Vec<String>,
    /// Licence of the derived data.
    pub license: String,
    /// Required attribution text.
    pub attribution: String,
    /// Path of the raw response this dataset was derived from.
    pub raw_cache_path: String,
}

/// The published fiber dataset document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type", default)]
    pub tag: CollectionTag,
    /// Dataset name.
    pub name: String,
    /// Provenance block.
    pub metadata: FiberMetadata,
    /// Telecom features.
    pub features: Vec<Feature<FiberProperties>>,
}

/// Which sourcing strategy produced the schools dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SchoolsSource {
    /// Curated file on local disk.
    OfficialLocal,
    /// Curated JSON document fetched from a URL.
    OfficialRemote,
    /// Curated CSV document fetched from a URL.
    OfficialRemoteCsv,
    /// Crowd-sourced fallback from `OpenStreetMap`.
    Overpass,
}

/// Ownership classification of a school.
///
/// Unrecognized non-empty input is kept as [`Ownership::Other`] holding the
/// lower-cased raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Ownership {
    /// Government or public school.
    Government,
    /// Privately owned school.
    Private,
    /// Founded by a religious body.
    Religious,
    /// No ownership information.
    Unknown,
    /// Unclassified free text.
    Other(String),
}

impl Ownership {
    /// Returns the serialized label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Government => "government",
            Self::Private => "private",
            Self::Religious => "religious",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Ownership {
    fn from(value: String) -> Self {
        match value.as_str() {
            "government" => Self::Government,
            "private" => Self::Private,
            "religious" => Self::Religious,
            "" | "unknown" => Self::Unknown,
            _ => Self::Other(value),
        }
    }
}

impl From<Ownership> for String {
    fn from(value: Ownership) -> Self {
        match value {
            Ownership::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// Gender classification of a school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    /// Boys only.
    Boys,
    /// Girls only.
    Girls,
    /// Co-educational.
    Mixed,
    /// No gender information.
    Unknown,
    /// Unclassified free text.
    Other(String),
}

impl Gender {
    /// Returns the serialized label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Boys => "boys",
            Self::Girls => "girls",
            Self::Mixed => "mixed",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        match value.as_str() {
            "boys" => Self::Boys,
            "girls" => Self::Girls,
            "mixed" => Self::Mixed,
            "" | "unknown" => Self::Unknown,
            _ => Self::Other(value),
        }
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        match value {
            Gender::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// Attribute record of a schools dataset feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolProperties {
    /// School name.
    pub name: Option<String>,
    /// Administrative region, explicit or derived from the district.
    pub region: Option<String>,
    /// Ownership classification.
    pub ownership: Ownership,
    /// Gender classification.
    pub gender: Gender,
    /// District name as provided upstream.
    pub district: Option<String>,
}

/// Top-level `meta` block of the schools dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolsMeta {
    /// When the dataset was assembled.
    pub generated_at: DateTime<Utc>,
    /// Which sourcing strategy produced the features.
    pub source: SchoolsSource,
}

/// The published schools dataset document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolsCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type", default)]
    pub tag: CollectionTag,
    /// Generation metadata.
    pub meta: SchoolsMeta,
    /// School point features.
    pub features: Vec<Feature<SchoolProperties>>,
}
