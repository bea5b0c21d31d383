//! Typed Overpass JSON elements.
//!
//! Overpass `out geom` / `out center` responses carry three element kinds,
//! discriminated by `type`. Elements are decoded one at a time so a single
//! malformed or unexpected element (e.g. an `area`) is skipped instead of
//! failing the whole response.

use std::collections::BTreeMap;

use serde::Deserialize;
use uganda_map_feature_models::ElementKind;

use crate::OsmError;

/// OSM tag set.
pub type Tags = BTreeMap<String, String>;

/// A vertex as emitted by Overpass (`{"lat": .., "lon": ..}`).
///
/// Either coordinate may be missing in damaged data; such vertices fail
/// geometry reconstruction rather than decoding.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Vertex {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
}

impl Vertex {
    /// Returns `[lon, lat]` when both coordinates are finite numbers.
    #[must_use]
    pub fn position(&self) -> Option<[f64; 2]> {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some([lon, lat]),
            _ => None,
        }
    }
}

/// A node element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OsmNode {
    /// Element id.
    pub id: i64,
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lon: Option<f64>,
    /// Tags.
    #[serde(default)]
    pub tags: Tags,
}

/// A way element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OsmWay {
    /// Element id.
    pub id: i64,
    /// Ordered vertices (`out geom`).
    #[serde(default)]
    pub geometry: Vec<Option<Vertex>>,
    /// Representative point (`out center`).
    pub center: Option<Vertex>,
    /// Tags.
    #[serde(default)]
    pub tags: Tags,
}

/// A relation member.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationMember {
    /// Member kind.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Referenced element id.
    #[serde(rename = "ref")]
    pub reference: i64,
    /// Member role.
    #[serde(default)]
    pub role: String,
    /// Vertices of a way member (`out geom`).
    pub geometry: Option<Vec<Option<Vertex>>>,
}

/// A relation element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OsmRelation {
    /// Element id.
    pub id: i64,
    /// Members in upstream order.
    #[serde(default)]
    pub members: Vec<RelationMember>,
    /// Representative point (`out center`).
    pub center: Option<Vertex>,
    /// Tags.
    #[serde(default)]
    pub tags: Tags,
}

/// Any Overpass element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OsmElement {
    /// A node.
    Node(OsmNode),
    /// A way.
    Way(OsmWay),
    /// A relation.
    Relation(OsmRelation),
}

impl OsmElement {
    /// Element id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(n) => n.id,
            Self::Way(w) => w.id,
            Self::Relation(r) => r.id,
        }
    }

    /// Element kind.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Node(_) => ElementKind::Node,
            Self::Way(_) => ElementKind::Way,
            Self::Relation(_) => ElementKind::Relation,
        }
    }

    /// Element tags.
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(n) => &n.tags,
            Self::Way(w) => &w.tags,
            Self::Relation(r) => &r.tags,
        }
    }

    /// Returns the first non-empty value among `keys`.
    #[must_use]
    pub fn first_tag(&self, keys: &[&str]) -> Option<&str> {
        first_tag(self.tags(), keys)
    }
}

/// Returns the first non-empty, trimmed value among `keys`.
#[must_use]
pub fn first_tag<'a>(tags: &'a Tags, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Decodes the `elements` array of an Overpass response.
///
/// Elements that cannot be decoded are skipped and logged at debug level.
///
/// # Errors
///
/// Returns [`OsmError::MissingElements`] if the body has no `elements`
/// array.
pub fn parse_elements(body: &serde_json::Value) -> Result<Vec<OsmElement>, OsmError> {
    let raw = body
        .get("elements")
        .and_then(serde_json::Value::as_array)
        .ok_or(OsmError::MissingElements)?;

    let mut elements = Vec::with_capacity(raw.len());
    for value in raw {
        match OsmElement::deserialize(value) {
            Ok(element) => elements.push(element),
            Err(e) => log::debug!(
                "Skipping undecodable element {}/{}: {e}",
                value["type"].as_str().unwrap_or("?"),
                value["id"]
            ),
        }
    }

    if elements.len() < raw.len() {
        log::info!(
            "Decoded {} of {} Overpass elements",
            elements.len(),
            raw.len()
        );
    }

    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_all_three_kinds() {
        let body = serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 0.31, "lon": 32.58, "tags": {"telecom": "exchange"}},
                {"type": "way", "id": 2, "geometry": [{"lat": 0.1, "lon": 32.1}, {"lat": 0.2, "lon": 32.2}]},
                {"type": "relation", "id": 3, "members": [
                    {"type": "way", "ref": 20, "role": "", "geometry": [{"lat": 1.0, "lon": 33.0}]},
                    {"type": "node", "ref": 21, "role": "stop"}
                ]}
            ]
        });
        let elements = parse_elements(&body).unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].kind(), ElementKind::Node);
        assert_eq!(elements[0].first_tag(&["telecom"]), Some("exchange"));
        assert_eq!(elements[1].id(), 2);
        match &elements[2] {
            OsmElement::Relation(r) => {
                assert_eq!(r.members.len(), 2);
                assert!(r.members[1].geometry.is_none());
            }
            other => panic!("expected relation, got {other:?}"),
        }
    }

    #[test]
    fn skips_unknown_element_types() {
        let body = serde_json::json!({
            "elements": [
                {"type": "area", "id": 3_600_192_796_i64},
                {"type": "node", "id": 5, "lat": 1.0, "lon": 32.0}
            ]
        });
        let elements = parse_elements(&body).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id(), 5);
    }

    #[test]
    fn missing_elements_array_is_an_error() {
        let err = parse_elements(&serde_json::json!({"remark": "x"})).unwrap_err();
        assert!(matches!(err, OsmError::MissingElements));
    }

    #[test]
    fn null_vertices_decode_as_none() {
        let body = serde_json::json!({
            "elements": [{"type": "way", "id": 9, "geometry": [null, {"lat": 0.5, "lon": 32.5}]}]
        });
        let elements = parse_elements(&body).unwrap();
        let OsmElement::Way(way) = &elements[0] else {
            panic!("expected way");
        };
        assert_eq!(way.geometry[0], None);
        assert_eq!(way.geometry[1].and_then(|v| v.position()), Some([32.5, 0.5]));
    }

    #[test]
    fn first_tag_skips_blank_values() {
        let mut tags = Tags::new();
        tags.insert("operator:type".to_string(), "  ".to_string());
        tags.insert("operator".to_string(), "Ministry of Education".to_string());
        assert_eq!(
            first_tag(&tags, &["operator:type", "operator"]),
            Some("Ministry of Education")
        );
    }
}
