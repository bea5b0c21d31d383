//! Overpass QL query builders.

use serde::{Deserialize, Serialize};

/// A latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude.
    pub south: f64,
    /// Western longitude.
    pub west: f64,
    /// Northern latitude.
    pub north: f64,
    /// Eastern longitude.
    pub east: f64,
}

impl BoundingBox {
    /// Overpass bbox filter text: `south,west,north,east`.
    #[must_use]
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// Escapes a value for use inside a double-quoted Overpass string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Tag filters selecting telecom features. Each is combined with the
/// element selector and the area filter.
const FIBER_FILTERS: &[(&str, &str)] = &[
    ("way", r#"["telecom"="line"]"#),
    ("relation", r#"["telecom"="line"]"#),
    ("way", r#"["telecom:medium"~"fibre|fiber",i]"#),
    ("way", r#"["cable:medium"~"fibre|fiber",i]"#),
    ("way", r#"["cable"~"fibre|fiber",i]"#),
    ("way", r#"["communication:medium"~"fibre|fiber",i]"#),
    ("relation", r#"["telecom:medium"~"fibre|fiber",i]"#),
    ("relation", r#"["communication:medium"~"fibre|fiber",i]"#),
    (
        "node",
        r#"["telecom"~"^(exchange|central_office|data_center|datacenter)$"]"#,
    ),
    ("node", r#"["building"="telecommunication"]"#),
    ("node", r#"["man_made"="street_cabinet"]["street_cabinet"~"telecom",i]"#),
    ("node", r#"["man_made"="street_cabinet"]["utility"~"telecom",i]"#),
    (
        "node",
        r#"["telecom"~"^(cabinet|connection_point|distribution_point|service_device)$"]"#,
    ),
    ("node", r#"["telecom"="pole"]"#),
    ("node", r#"["man_made"="utility_pole"]["utility"~"telecom",i]"#),
    ("node", r#"["power"="pole"]["utility"~"telecom",i]"#),
];

/// Tag filters selecting secondary schools.
const SCHOOL_FILTERS: &[&str] = &[
    r#"["amenity"="school"]["isced:level"~"(^|;) *(2|3)"]"#,
    r#"["amenity"="school"]["school:level"~"secondary",i]"#,
    r#"["amenity"="school"]["name"~"secondary|high school|college|seminary",i]"#,
];

/// Builds the fiber query for the administrative area named `country`.
#[must_use]
pub fn fiber_query(country: &str, admin_level: u8, timeout_secs: u32) -> String {
    let statements: String = FIBER_FILTERS
        .iter()
        .map(|(selector, filter)| format!("  {selector}{filter}(area.searchArea);\n"))
        .collect();
    format!(
        "[out:json][timeout:{timeout_secs}];\n\
         area[\"boundary\"=\"administrative\"][\"admin_level\"=\"{admin_level}\"][\"name\"=\"{}\"]->.searchArea;\n(\n\
         {statements});\nout body geom;\n",
        quote(country)
    )
}

/// Builds the secondary-schools query for `bbox`.
#[must_use]
pub fn schools_query(bbox: &BoundingBox, timeout_secs: u32) -> String {
    let bbox = bbox.to_overpass();
    let statements: String = SCHOOL_FILTERS
        .iter()
        .map(|filter| format!("  nwr{filter}({bbox});\n"))
        .collect();
    format!("[out:json][timeout:{timeout_secs}];\n(\n{statements});\nout center tags;\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const UGANDA: BoundingBox = BoundingBox {
        south: -1.48,
        west: 29.57,
        north: 4.23,
        east: 35.0,
    };

    #[test]
    fn bbox_is_south_west_north_east() {
        assert_eq!(UGANDA.to_overpass(), "-1.48,29.57,4.23,35");
    }

    #[test]
    fn fiber_query_is_scoped_to_country_area() {
        let query = fiber_query("Uganda", 2, 900);
        assert!(query.starts_with("[out:json][timeout:900];"));
        assert!(query.contains(r#"["admin_level"="2"]["name"="Uganda"]"#));
        assert!(query.contains(r#"way["telecom:medium"~"fibre|fiber",i](area.searchArea);"#));
        assert!(query.trim_end().ends_with("out body geom;"));
        let statements: Vec<&str> = query
            .lines()
            .filter(|line| line.ends_with("(area.searchArea);"))
            .collect();
        assert_eq!(statements.len(), FIBER_FILTERS.len());
    }

    #[test]
    fn country_names_are_escaped() {
        let query = fiber_query(r#"Odd "Name""#, 2, 60);
        assert!(query.contains(r#"["name"="Odd \"Name\""]"#));
    }

    #[test]
    fn schools_query_uses_bbox_and_center_output() {
        let query = schools_query(&UGANDA, 180);
        assert!(query.contains(r#"nwr["amenity"="school"]["school:level"~"secondary",i](-1.48,29.57,4.23,35);"#));
        assert!(query.trim_end().ends_with("out center tags;"));
        assert_eq!(
            query.lines().filter(|line| line.starts_with("  nwr")).count(),
            SCHOOL_FILTERS.len()
        );
    }
}
