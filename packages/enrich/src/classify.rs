//! Free-text ownership and gender classification.
//!
//! Each vocabulary is an ordered rule table of `(category, pattern)`
//! pairs. The first matching pattern wins; non-empty text that matches
//! nothing passes through lower-cased, and empty or absent text is
//! `unknown`.

use std::sync::LazyLock;

use regex::Regex;
use uganda_map_feature_models::{Gender, Ownership};

/// Ownership rules. Religious founders are checked first so that
/// "Catholic (government aided)" stays religious.
static OWNERSHIP_RULES: LazyLock<Vec<(Ownership, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Ownership::Religious,
            Regex::new(
                r"(?i)church|mosque|islam|muslim|catholic|anglican|adventist|religious|faith|mission|diocese|seventh[- ]?day",
            )
            .expect("valid regex"),
        ),
        (
            Ownership::Government,
            Regex::new(r"(?i)\bgov|public|\bstate\b|uneb|ministry|district local|municipal")
                .expect("valid regex"),
        ),
        (
            Ownership::Private,
            Regex::new(r"(?i)private|proprietor|individual|company|community|\bngo\b|parent")
                .expect("valid regex"),
        ),
    ]
});

/// Gender rules. Text naming both sexes is mixed; girls precede boys so
/// "female" never matches "male".
static GENDER_RULES: LazyLock<Vec<(Gender, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Gender::Mixed,
            Regex::new(r"(?i)mixed|co-?ed|co-?educational|\bboth\b|boy.*girl|girl.*boy")
                .expect("valid regex"),
        ),
        (
            Gender::Girls,
            Regex::new(r"(?i)girl|female|wom[ae]n").expect("valid regex"),
        ),
        (
            Gender::Boys,
            Regex::new(r"(?i)boy|\bmale\b|\bmen\b").expect("valid regex"),
        ),
    ]
});

/// Classifies an ownership tag.
#[must_use]
pub fn classify_ownership(raw: Option<&str>) -> Ownership {
    classify_with(&OWNERSHIP_RULES, raw, Ownership::Unknown, Ownership::from)
}

/// Classifies a gender tag.
#[must_use]
pub fn classify_gender(raw: Option<&str>) -> Gender {
    classify_with(&GENDER_RULES, raw, Gender::Unknown, Gender::from)
}

fn classify_with<C: Clone>(
    rules: &[(C, Regex)],
    raw: Option<&str>,
    unknown: C,
    passthrough: impl FnOnce(String) -> C,
) -> C {
    let Some(text) = raw.map(str::trim).filter(|text| !text.is_empty()) else {
        return unknown;
    };
    rules
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map_or_else(
            || passthrough(text.to_lowercase()),
            |(category, _)| category.clone(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_keyword_families() {
        assert_eq!(classify_ownership(Some("Government")), Ownership::Government);
        assert_eq!(classify_ownership(Some("Govt. Aided")), Ownership::Government);
        assert_eq!(classify_ownership(Some("public")), Ownership::Government);
        assert_eq!(classify_ownership(Some("Private")), Ownership::Private);
        assert_eq!(classify_ownership(Some("NGO")), Ownership::Private);
        assert_eq!(classify_ownership(Some("Church of Uganda")), Ownership::Religious);
        assert_eq!(classify_ownership(Some("Seventh-day Adventist")), Ownership::Religious);
    }

    #[test]
    fn religious_wins_over_government() {
        assert_eq!(
            classify_ownership(Some("Catholic (Government aided)")),
            Ownership::Religious
        );
    }

    #[test]
    fn ownership_is_never_empty() {
        for raw in [None, Some(""), Some("   "), Some("unknown"), Some("Cooperative X")] {
            let label = classify_ownership(raw).to_string();
            assert!(!label.is_empty());
            assert_eq!(label, label.to_lowercase());
        }
        assert_eq!(classify_ownership(None), Ownership::Unknown);
        assert_eq!(classify_ownership(Some("Unknown")), Ownership::Unknown);
        assert_eq!(
            classify_ownership(Some("Cooperative X")),
            Ownership::Other("cooperative x".to_string())
        );
    }

    #[test]
    fn gender_rules() {
        assert_eq!(classify_gender(Some("Mixed")), Gender::Mixed);
        assert_eq!(classify_gender(Some("co-ed")), Gender::Mixed);
        assert_eq!(classify_gender(Some("Boys and Girls")), Gender::Mixed);
        assert_eq!(classify_gender(Some("Boys & Girls")), Gender::Mixed);
        assert_eq!(classify_gender(Some("girls/boys")), Gender::Mixed);
        assert_eq!(classify_gender(Some("Female")), Gender::Girls);
        assert_eq!(classify_gender(Some("Girls only")), Gender::Girls);
        assert_eq!(classify_gender(Some("male")), Gender::Boys);
        assert_eq!(classify_gender(Some("BOYS")), Gender::Boys);
        assert_eq!(classify_gender(None), Gender::Unknown);
        assert_eq!(
            classify_gender(Some("Day")),
            Gender::Other("day".to_string())
        );
    }
}
