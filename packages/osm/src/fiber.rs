//! Fiber feature construction from Overpass elements.

use uganda_map_feature_models::{Feature, FiberProperties};

use crate::classify::{cable_medium, classify, communication_medium};
use crate::element::OsmElement;
use crate::geometry::element_geometry;

/// Data source label stamped on every fiber feature.
pub const SOURCE: &str = "OpenStreetMap";

/// Data licence identifier.
pub const LICENCE: &str = "ODbL-1.0";

/// Required attribution text.
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Builds the feature for one element, or `None` if it has no usable
/// geometry.
#[must_use]
pub fn fiber_feature(element: &OsmElement) -> Option<Feature<FiberProperties>> {
    let Some(geometry) = element_geometry(element) else {
        log::debug!(
            "Dropping {}/{}: no usable geometry",
            element.kind(),
            element.id()
        );
        return None;
    };

    let tags = element.tags();
    let text = |keys: &[&str]| element.first_tag(keys).map(str::to_string);

    let properties = FiberProperties {
        osm_id: element.id(),
        osm_type: element.kind(),
        name: text(&["name"]),
        operator: text(&["operator"]),
        owner: text(&["owner"]),
        telecom: text(&["telecom"]),
        cable_medium: cable_medium(tags).map(str::to_string),
        communication_medium: communication_medium(tags).map(str::to_string),
        feature_type: classify(element.kind(), tags),
        source: SOURCE.to_string(),
        licence: LICENCE.to_string(),
        attribution: ATTRIBUTION.to_string(),
        tags: tags.clone(),
    };

    Some(Feature::new(geometry, properties).with_id(format!("{}/{}", element.kind(), element.id())))
}

/// Builds features for all elements, dropping those without geometry.
#[must_use]
pub fn fiber_features(elements: &[OsmElement]) -> Vec<Feature<FiberProperties>> {
    let features: Vec<_> = elements.iter().filter_map(fiber_feature).collect();
    let dropped = elements.len() - features.len();
    if dropped > 0 {
        log::info!(
            "Normalized {} fiber features ({dropped} dropped without geometry)",
            features.len()
        );
    }
    features
}
