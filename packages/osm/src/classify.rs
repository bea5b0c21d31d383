//! Telecom feature classification.
//!
//! Ways and relations are fiber lines when their medium tags mention
//! fibre. Nodes are matched against an ordered predicate table; the first
//! predicate that holds decides the type.

use uganda_map_feature_models::{ElementKind, FeatureType};

use crate::element::{Tags, first_tag};

/// Tag keys consulted for the cable medium, in priority order.
pub const CABLE_MEDIUM_KEYS: &[&str] = &["telecom:medium", "cable:medium", "cable"];

/// Tag keys consulted for the communication medium, in priority order.
pub const COMMUNICATION_MEDIUM_KEYS: &[&str] = &["communication:medium", "communication"];

/// A node predicate and the type it assigns.
type NodeRule = (FeatureType, fn(&Tags) -> bool);

/// Node rules, evaluated in order.
const NODE_RULES: &[NodeRule] = &[
    (FeatureType::TelecomSite, is_site),
    (FeatureType::TelecomCabinet, is_cabinet),
    (FeatureType::TelecomPole, is_pole),
];

/// Cable medium of a tag set.
#[must_use]
pub fn cable_medium(tags: &Tags) -> Option<&str> {
    first_tag(tags, CABLE_MEDIUM_KEYS)
}

/// Communication medium of a tag set.
#[must_use]
pub fn communication_medium(tags: &Tags) -> Option<&str> {
    first_tag(tags, COMMUNICATION_MEDIUM_KEYS)
}

/// Returns `true` if either medium mentions fibre (any spelling or case).
#[must_use]
pub fn is_fiber_medium(tags: &Tags) -> bool {
    [cable_medium(tags), communication_medium(tags)]
        .into_iter()
        .flatten()
        .any(|medium| contains_any(&medium.to_lowercase(), &["fibre", "fiber"]))
}

/// Classifies an element. Unmatched elements get `None`.
#[must_use]
pub fn classify(kind: ElementKind, tags: &Tags) -> Option<FeatureType> {
    match kind {
        ElementKind::Way | ElementKind::Relation => {
            is_fiber_medium(tags).then_some(FeatureType::FiberLine)
        }
        ElementKind::Node => NODE_RULES
            .iter()
            .find(|(_, predicate)| predicate(tags))
            .map(|(feature_type, _)| *feature_type),
    }
}

fn is_site(tags: &Tags) -> bool {
    tag_in(
        tags,
        "telecom",
        &["exchange", "central_office", "data_center", "datacenter"],
    ) || tag_is(tags, "building", "telecommunication")
}

fn is_cabinet(tags: &Tags) -> bool {
    let street_cabinet = tag_is(tags, "man_made", "street_cabinet")
        && (tag_contains(tags, "street_cabinet", "telecom")
            || tag_contains(tags, "utility", "telecom"));
    street_cabinet
        || tag_in(
            tags,
            "telecom",
            &[
                "cabinet",
                "connection_point",
                "distribution_point",
                "service_device",
            ],
        )
}

fn is_pole(tags: &Tags) -> bool {
    tag_is(tags, "telecom", "pole")
        || ((tag_is(tags, "man_made", "utility_pole") || tag_is(tags, "power", "pole"))
            && tag_contains(tags, "utility", "telecom"))
}

fn tag_value(tags: &Tags, key: &str) -> Option<String> {
    tags.get(key).map(|value| value.trim().to_lowercase())
}

fn tag_is(tags: &Tags, key: &str, expected: &str) -> bool {
    tag_value(tags, key).is_some_and(|value| value == expected)
}

fn tag_in(tags: &Tags, key: &str, expected: &[&str]) -> bool {
    tag_value(tags, key).is_some_and(|value| expected.contains(&value.as_str()))
}

fn tag_contains(tags: &Tags, key: &str, needle: &str) -> bool {
    tag_value(tags, key).is_some_and(|value| value.contains(needle))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn fiber_medium_matches_both_spellings_case_insensitively() {
        assert!(is_fiber_medium(&tags(&[("telecom:medium", "Fibre")])));
        assert!(is_fiber_medium(&tags(&[("cable", "optical_FIBER")])));
        assert!(is_fiber_medium(&tags(&[("communication", "fibre;copper")])));
        assert!(!is_fiber_medium(&tags(&[("telecom:medium", "copper")])));
    }

    #[test]
    fn cable_medium_follows_key_priority() {
        let t = tags(&[("cable", "copper"), ("telecom:medium", "fibre")]);
        assert_eq!(cable_medium(&t), Some("fibre"));
    }

    #[test]
    fn only_ways_and_relations_can_be_fiber_lines() {
        let t = tags(&[("telecom:medium", "fibre")]);
        assert_eq!(classify(ElementKind::Way, &t), Some(FeatureType::FiberLine));
        assert_eq!(
            classify(ElementKind::Relation, &t),
            Some(FeatureType::FiberLine)
        );
        assert_eq!(classify(ElementKind::Node, &t), None);
        assert_eq!(classify(ElementKind::Way, &tags(&[("telecom", "line")])), None);
    }

    #[test]
    fn node_types() {
        assert_eq!(
            classify(ElementKind::Node, &tags(&[("telecom", "exchange")])),
            Some(FeatureType::TelecomSite)
        );
        assert_eq!(
            classify(ElementKind::Node, &tags(&[("building", "telecommunication")])),
            Some(FeatureType::TelecomSite)
        );
        assert_eq!(
            classify(
                ElementKind::Node,
                &tags(&[("man_made", "street_cabinet"), ("street_cabinet", "telecom")])
            ),
            Some(FeatureType::TelecomCabinet)
        );
        assert_eq!(
            classify(ElementKind::Node, &tags(&[("telecom", "distribution_point")])),
            Some(FeatureType::TelecomCabinet)
        );
        assert_eq!(
            classify(
                ElementKind::Node,
                &tags(&[("power", "pole"), ("utility", "power;telecom")])
            ),
            Some(FeatureType::TelecomPole)
        );
        assert_eq!(
            classify(ElementKind::Node, &tags(&[("man_made", "street_cabinet")])),
            None
        );
    }

    #[test]
    fn site_check_wins_over_later_rules() {
        let t = tags(&[
            ("building", "telecommunication"),
            ("man_made", "street_cabinet"),
            ("utility", "telecom"),
        ]);
        assert_eq!(
            classify(ElementKind::Node, &t),
            Some(FeatureType::TelecomSite)
        );
    }
}
