//! Canonical geometry reconstruction.
//!
//! Maps one Overpass element to zero or one [`Geometry`], and collapses
//! arbitrary `GeoJSON` geometries to a single point where a point-only
//! schema is required.

use uganda_map_feature_models::{Geometry, Position};

use crate::element::{OsmElement, OsmNode, OsmRelation, OsmWay, Vertex};

/// Builds the geometry of an element, or `None` when it has none usable.
#[must_use]
pub fn element_geometry(element: &OsmElement) -> Option<Geometry> {
    match element {
        OsmElement::Node(node) => node_geometry(node),
        OsmElement::Way(way) => way_geometry(way),
        OsmElement::Relation(relation) => relation_geometry(relation),
    }
}

/// Point from the node's own coordinates.
#[must_use]
pub fn node_geometry(node: &OsmNode) -> Option<Geometry> {
    Vertex {
        lat: node.lat,
        lon: node.lon,
    }
    .position()
    .map(Geometry::Point)
}

/// `LineString` from the way's ordered vertices, falling back to its
/// center point when no vertices were returned.
///
/// A way with any unusable vertex yields no geometry.
#[must_use]
pub fn way_geometry(way: &OsmWay) -> Option<Geometry> {
    if way.geometry.is_empty() {
        return way
            .center
            .and_then(|center| center.position())
            .map(Geometry::Point);
    }
    line_from_vertices(&way.geometry).map(Geometry::LineString)
}

/// `LineString` for a relation with one geometric member way,
/// `MultiLineString` for several, in member order.
///
/// Members without geometry (or with unusable vertices) are skipped.
#[must_use]
pub fn relation_geometry(relation: &OsmRelation) -> Option<Geometry> {
    let mut lines: Vec<Vec<Position>> = relation
        .members
        .iter()
        .filter_map(|member| member.geometry.as_deref())
        .filter(|vertices| !vertices.is_empty())
        .filter_map(line_from_vertices)
        .collect();

    match lines.len() {
        0 => None,
        1 => lines.pop().map(Geometry::LineString),
        _ => Some(Geometry::MultiLineString(lines)),
    }
}

/// Converts vertices to positions verbatim. Any unusable vertex rejects
/// the whole line.
fn line_from_vertices(vertices: &[Option<Vertex>]) -> Option<Vec<Position>> {
    if vertices.is_empty() {
        return None;
    }
    vertices
        .iter()
        .map(|vertex| vertex.as_ref().and_then(Vertex::position))
        .collect()
}

/// Representative point of an element: a node's own position, else the
/// Overpass `center`, else the centroid of its reconstructed geometry.
#[must_use]
pub fn element_point(element: &OsmElement) -> Option<Position> {
    let center = match element {
        OsmElement::Node(node) => {
            return Vertex {
                lat: node.lat,
                lon: node.lon,
            }
            .position();
        }
        OsmElement::Way(way) => way.center,
        OsmElement::Relation(relation) => relation.center,
    };
    center
        .and_then(|vertex| vertex.position())
        .or_else(|| element_geometry(element).as_ref().and_then(geometry_centroid))
}

/// Arithmetic mean of all positions of a geometry.
#[must_use]
pub fn geometry_centroid(geometry: &Geometry) -> Option<Position> {
    let points: Vec<Position> = geometry.positions().copied().collect();
    mean(&points)
}

fn mean(points: &[Position]) -> Option<Position> {
    if points.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let [x, y] = points
        .iter()
        .fold([0.0_f64, 0.0_f64], |[x, y], [px, py]| [x + px, y + py]);
    Some([x / n, y / n])
}

/// Arithmetic mean of every numeric coordinate pair found anywhere in a
/// (possibly nested) `GeoJSON` coordinate structure.
///
/// Returns `None` when no pair is found.
#[must_use]
pub fn centroid_of_coordinates(coordinates: &serde_json::Value) -> Option<Position> {
    let mut points = Vec::new();
    collect_pairs(coordinates, &mut |pair| points.push(pair));
    mean(&points)
}

fn collect_pairs(value: &serde_json::Value, sink: &mut impl FnMut(Position)) {
    let serde_json::Value::Array(items) = value else {
        return;
    };
    if let Some(pair) = numeric_pair(items) {
        sink(pair);
        return;
    }
    for item in items {
        collect_pairs(item, sink);
    }
}

fn numeric_pair(items: &[serde_json::Value]) -> Option<Position> {
    let x = items.first()?.as_f64()?;
    let y = items.get(1)?.as_f64()?;
    (x.is_finite() && y.is_finite()).then_some([x, y])
}

/// Collapses a `GeoJSON` geometry object to a point.
///
/// Points keep their coordinates; every other type (including
/// `GeometryCollection`) becomes the centroid of all its coordinate
/// pairs.
#[must_use]
pub fn collapse_to_point(geometry: &serde_json::Value) -> Option<Position> {
    match geometry.get("type").and_then(serde_json::Value::as_str) {
        Some("GeometryCollection") => {
            let members = geometry.get("geometries")?.as_array()?;
            let points: Vec<Position> = members.iter().filter_map(collapse_to_point).collect();
            mean(&points)
        }
        Some("Point") => geometry
            .get("coordinates")
            .and_then(serde_json::Value::as_array)
            .and_then(|items| numeric_pair(items)),
        _ => geometry
            .get("coordinates")
            .and_then(centroid_of_coordinates),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::element::parse_elements;

    fn single(element: serde_json::Value) -> OsmElement {
        parse_elements(&json!({ "elements": [element] }))
            .unwrap()
            .pop()
            .unwrap()
    }

    fn vertices(points: &[(f64, f64)]) -> serde_json::Value {
        points
            .iter()
            .map(|(lon, lat)| json!({"lat": lat, "lon": lon}))
            .collect()
    }

    #[test]
    fn node_becomes_point() {
        let node = single(json!({"type": "node", "id": 1, "lat": 0.31, "lon": 32.58}));
        assert_eq!(element_geometry(&node), Some(Geometry::Point([32.58, 0.31])));
    }

    #[test]
    fn node_without_coordinates_has_no_geometry() {
        let node = single(json!({"type": "node", "id": 1, "lat": 0.31}));
        assert_eq!(element_geometry(&node), None);
    }

    #[test]
    fn way_keeps_every_vertex_in_order() {
        let points = [
            (32.1, 0.1),
            (32.2, 0.2),
            (32.2, 0.2),
            (32.1, 0.1),
            (32.5, 0.4),
        ];
        let way = single(json!({"type": "way", "id": 2, "geometry": vertices(&points)}));
        let Some(Geometry::LineString(line)) = element_geometry(&way) else {
            panic!("expected LineString");
        };
        assert_eq!(line.len(), points.len());
        for (position, (lon, lat)) in line.iter().zip(points) {
            assert_eq!(*position, [lon, lat]);
        }
    }

    #[test]
    fn way_without_vertices_uses_center() {
        let way = single(json!({"type": "way", "id": 3, "center": {"lat": 1.5, "lon": 33.0}}));
        assert_eq!(element_geometry(&way), Some(Geometry::Point([33.0, 1.5])));
    }

    #[test]
    fn way_with_broken_vertex_is_dropped() {
        let way = single(json!({
            "type": "way", "id": 4,
            "geometry": [{"lat": 0.1, "lon": 32.1}, null, {"lat": 0.3, "lon": 32.3}]
        }));
        assert_eq!(element_geometry(&way), None);
    }

    #[test]
    fn relation_with_one_member_is_line_string() {
        let relation = single(json!({
            "type": "relation", "id": 5,
            "members": [
                {"type": "way", "ref": 10, "role": "", "geometry": vertices(&[(32.0, 0.0), (32.1, 0.1)])},
                {"type": "node", "ref": 11, "role": "terminal"}
            ]
        }));
        assert_eq!(
            element_geometry(&relation).map(|g| g.kind()),
            Some(uganda_map_feature_models::GeometryKind::LineString)
        );
    }

    #[test]
    fn relation_with_two_members_is_multi_line_string_in_member_order() {
        let first = [(32.0, 0.0), (32.1, 0.1)];
        let second = [(33.0, 1.0), (33.1, 1.1), (33.2, 1.2)];
        let relation = single(json!({
            "type": "relation", "id": 6,
            "members": [
                {"type": "way", "ref": 10, "role": "", "geometry": vertices(&first)},
                {"type": "way", "ref": 12, "role": "", "geometry": vertices(&second)}
            ]
        }));
        let Some(Geometry::MultiLineString(lines)) = element_geometry(&relation) else {
            panic!("expected MultiLineString");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[1].len(), 3);
        assert_eq!(lines[1][2], [33.2, 1.2]);
    }

    #[test]
    fn relation_without_geometric_members_has_no_geometry() {
        let relation = single(json!({
            "type": "relation", "id": 7,
            "center": {"lat": 0.5, "lon": 32.5},
            "members": [{"type": "way", "ref": 10, "role": ""}]
        }));
        assert_eq!(element_geometry(&relation), None);
    }

    #[test]
    fn element_point_prefers_center() {
        let way = single(json!({
            "type": "way", "id": 8,
            "center": {"lat": 0.5, "lon": 32.5},
            "geometry": vertices(&[(32.0, 0.0), (34.0, 2.0)])
        }));
        assert_eq!(element_point(&way), Some([32.5, 0.5]));

        let bare = single(json!({
            "type": "way", "id": 9,
            "geometry": vertices(&[(32.0, 0.0), (34.0, 2.0)])
        }));
        assert_eq!(element_point(&bare), Some([33.0, 1.0]));

        let relation = single(json!({
            "type": "relation", "id": 10, "center": {"lat": 1.0, "lon": 31.0}, "members": []
        }));
        assert_eq!(element_point(&relation), Some([31.0, 1.0]));
    }

    #[test]
    fn centroid_averages_nested_pairs() {
        let polygon = json!([[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]]);
        assert_eq!(centroid_of_coordinates(&polygon), Some([1.0, 1.0]));
    }

    #[test]
    fn centroid_ignores_non_numeric_leaves() {
        let coords = json!([[1.0, 1.0], ["x", 2.0], [3.0, 3.0]]);
        assert_eq!(centroid_of_coordinates(&coords), Some([2.0, 2.0]));
        assert_eq!(centroid_of_coordinates(&json!([[], ["a", "b"]])), None);
    }

    #[test]
    fn collapse_keeps_points_and_averages_the_rest() {
        assert_eq!(
            collapse_to_point(&json!({"type": "Point", "coordinates": [32.5, 0.3]})),
            Some([32.5, 0.3])
        );
        assert_eq!(
            collapse_to_point(&json!({"type": "LineString", "coordinates": [[32.0, 0.0], [33.0, 1.0]]})),
            Some([32.5, 0.5])
        );
        assert_eq!(
            collapse_to_point(&json!({"type": "GeometryCollection", "geometries": [
                {"type": "Point", "coordinates": [30.0, 0.0]},
                {"type": "Point", "coordinates": [32.0, 2.0]}
            ]})),
            Some([31.0, 1.0])
        );
        assert_eq!(collapse_to_point(&json!({"type": "Polygon", "coordinates": []})), None);
    }
}
