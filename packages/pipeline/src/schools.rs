//! Secondary schools dataset assembler.
//!
//! Sources are tried in trust order, local official file, then remote
//! official dataset, then the Overpass fallback. The first source that
//! parses and yields at least one located school wins and labels the
//! output. A failing source is logged and skipped; only exhausting all of
//! them fails the run.

use std::sync::Arc;

use chrono::Utc;
use strum_macros::{AsRefStr, Display};
use uganda_map_enrich::classify::{classify_gender, classify_ownership};
use uganda_map_enrich::region::DistrictRegionMap;
use uganda_map_feature_models::{
    CollectionTag, Feature, Geometry, Position, SchoolProperties, SchoolsCollection, SchoolsMeta,
    SchoolsSource,
};
use uganda_map_osm::element::{OsmElement, parse_elements};
use uganda_map_osm::geometry::{collapse_to_point, element_point};
use uganda_map_osm::query::schools_query;
use uganda_map_source::SourceError;
use uganda_map_source::columns::{Column, ColumnMap, lookup_f64, lookup_text};
use uganda_map_source::delimited::CsvTable;
use uganda_map_source::http::{Transport, fetch_text};
use uganda_map_source::progress::ProgressCallback;
use uganda_map_source::retry::query_overpass;
use uganda_map_source::sniff::{OfficialPayload, sniff};

use crate::PipelineError;
use crate::config::PipelineConfig;
use crate::output::write_json_atomic;

type SchoolFeature = Feature<SchoolProperties>;

/// Outcome of one sourcing state: `None` when the state is not configured.
type Sourced = Option<(SchoolsSource, Vec<SchoolFeature>)>;

/// Sourcing states, in trust order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SourcingState {
    /// Curated file on disk.
    LocalOfficial,
    /// Curated dataset at a URL.
    RemoteOfficial,
    /// Crowd-sourced `OpenStreetMap` data.
    FallbackOverpass,
}

impl SourcingState {
    /// All states in the order they are attempted.
    pub const ORDER: &[Self] = &[
        Self::LocalOfficial,
        Self::RemoteOfficial,
        Self::FallbackOverpass,
    ];
}

/// A school before enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
struct SchoolRecord {
    position: Option<Position>,
    name: Option<String>,
    district: Option<String>,
    region: Option<String>,
    ownership: Option<String>,
    gender: Option<String>,
}

/// Builds the schools collection from the first usable source.
pub struct SchoolsAssembler<'a> {
    config: &'a PipelineConfig,
    transport: &'a dyn Transport,
    regions: DistrictRegionMap,
}

impl<'a> SchoolsAssembler<'a> {
    /// Creates an assembler, building the district to region table once.
    ///
    /// A configured lookup document that cannot be loaded is logged and
    /// replaced by the built-in table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Enrich`] if the built-in table is invalid.
    pub fn new(
        config: &'a PipelineConfig,
        transport: &'a dyn Transport,
    ) -> Result<Self, PipelineError> {
        let regions = match &config.schools.region_lookup {
            Some(path) => DistrictRegionMap::from_path(path).or_else(|e| {
                log::warn!(
                    "Ignoring region lookup {}: {e}; using built-in table",
                    path.display()
                );
                DistrictRegionMap::builtin()
            })?,
            None => DistrictRegionMap::builtin()?,
        };
        Ok(Self {
            config,
            transport,
            regions,
        })
    }

    /// Runs the sourcing state machine.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoUsableSource`] if no state yields a
    /// non-empty collection.
    pub async fn assemble(
        &self,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<SchoolsCollection, PipelineError> {
        let mut attempted = Vec::with_capacity(SourcingState::ORDER.len());

        for &state in SourcingState::ORDER {
            attempted.push(state.to_string());
            progress.set_message(format!("Schools: trying {state}"));
            log::info!("Schools: trying {state}");

            let outcome = match state {
                SourcingState::LocalOfficial => self.try_local().await,
                SourcingState::RemoteOfficial => self.try_remote().await,
                SourcingState::FallbackOverpass => self.try_overpass(progress).await,
            };

            match outcome {
                Ok(Some((source, features))) if !features.is_empty() => {
                    log::info!("Schools: {state} yielded {} schools", features.len());
                    return Ok(SchoolsCollection {
                        tag: CollectionTag::FeatureCollection,
                        meta: SchoolsMeta {
                            generated_at: Utc::now(),
                            source,
                        },
                        features,
                    });
                }
                Ok(Some(_)) => log::info!("Schools: {state} yielded no located schools"),
                Ok(None) => log::info!("Schools: {state} not configured"),
                Err(e) => log::warn!("Schools: {state} failed: {e}"),
            }
        }

        Err(PipelineError::NoUsableSource { attempted })
    }

    async fn try_local(&self) -> Result<Sourced, SourceError> {
        let Some(path) = self
            .config
            .schools
            .official_candidates
            .iter()
            .find(|path| path.is_file())
        else {
            return Ok(None);
        };
        log::info!("Reading official schools from {}", path.display());
        let text = tokio::fs::read_to_string(path).await?;
        let payload = sniff(&text)?;
        Ok(Some((SchoolsSource::OfficialLocal, self.features(payload)?)))
    }

    async fn try_remote(&self) -> Result<Sourced, SourceError> {
        let Some(url) = self.config.schools.official_url.as_deref() else {
            return Ok(None);
        };
        log::info!("Fetching official schools from {url}");
        let payload = sniff(&fetch_text(self.transport, url).await?)?;
        let source = if payload.is_csv() {
            SchoolsSource::OfficialRemoteCsv
        } else {
            SchoolsSource::OfficialRemote
        };
        Ok(Some((source, self.features(payload)?)))
    }

    async fn try_overpass(
        &self,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Sourced, SourceError> {
        let schools = &self.config.schools;
        let query = schools_query(&schools.bbox, schools.query_timeout_secs);
        let response = query_overpass(
            self.transport,
            &self.config.overpass.endpoints,
            &query,
            &self.config.retry_policy(),
            progress,
        )
        .await?;
        let elements = parse_elements(&response.body).map_err(|e| SourceError::Normalization {
            message: e.to_string(),
        })?;
        let records = elements.iter().map(osm_record).collect();
        Ok(Some((SchoolsSource::Overpass, self.enrich(records))))
    }

    fn features(&self, payload: OfficialPayload) -> Result<Vec<SchoolFeature>, SourceError> {
        let records = match payload {
            OfficialPayload::CsvRows(table) => csv_records(&table)?,
            OfficialPayload::GeoJson(features) => features.iter().map(geojson_record).collect(),
            OfficialPayload::Array(items) => items.iter().map(array_record).collect(),
        };
        Ok(self.enrich(records))
    }

    /// Enriches located records into features; unlocated ones are dropped.
    fn enrich(&self, records: Vec<SchoolRecord>) -> Vec<SchoolFeature> {
        let total = records.len();
        let features: Vec<SchoolFeature> = records
            .into_iter()
            .filter_map(|record| {
                let Some(position) = record.position else {
                    log::debug!("Dropping school {:?}: no usable location", record.name);
                    return None;
                };
                let region = self
                    .regions
                    .resolve_region(record.region.as_deref(), record.district.as_deref());
                let properties = SchoolProperties {
                    name: record.name,
                    region,
                    ownership: classify_ownership(record.ownership.as_deref()),
                    gender: classify_gender(record.gender.as_deref()),
                    district: record.district,
                };
                Some(Feature::new(Geometry::Point(position), properties))
            })
            .collect();
        if features.len() < total {
            log::info!(
                "Dropped {} of {total} school records without a location",
                total - features.len()
            );
        }
        features
    }
}

/// Accepts a `[lon, lat]` position only within valid coordinate ranges.
fn valid_position(lon: f64, lat: f64) -> Option<Position> {
    ((-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)).then_some([lon, lat])
}

fn csv_records(table: &CsvTable) -> Result<Vec<SchoolRecord>, SourceError> {
    let columns = ColumnMap::detect(&table.headers)?;
    let text = |row: &[String], index: Option<usize>| {
        index
            .and_then(|i| CsvTable::cell(row, i))
            .map(str::to_string)
    };
    let number = |row: &[String], index: usize| {
        CsvTable::cell(row, index).and_then(|cell| cell.parse::<f64>().ok())
    };

    Ok(table
        .rows
        .iter()
        .map(|row| SchoolRecord {
            position: number(row, columns.longitude)
                .zip(number(row, columns.latitude))
                .and_then(|(lon, lat)| valid_position(lon, lat)),
            name: text(row, columns.name),
            district: text(row, columns.district),
            region: text(row, columns.region),
            ownership: text(row, columns.ownership),
            gender: text(row, columns.gender),
        })
        .collect())
}

fn object_record(
    object: &serde_json::Map<String, serde_json::Value>,
    position: Option<Position>,
) -> SchoolRecord {
    let position = position.or_else(|| {
        lookup_f64(object, Column::Longitude)
            .zip(lookup_f64(object, Column::Latitude))
            .and_then(|(lon, lat)| valid_position(lon, lat))
    });
    SchoolRecord {
        position,
        name: lookup_text(object, Column::Name),
        district: lookup_text(object, Column::District),
        region: lookup_text(object, Column::Region),
        ownership: lookup_text(object, Column::Ownership),
        gender: lookup_text(object, Column::Gender),
    }
}

/// A `GeoJSON` feature: geometry collapsed to a point, falling back to
/// coordinate properties.
fn geojson_record(feature: &serde_json::Value) -> SchoolRecord {
    let position = feature
        .get("geometry")
        .and_then(collapse_to_point)
        .and_then(|[lon, lat]| valid_position(lon, lat));
    let empty = serde_json::Map::new();
    let properties = feature
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .unwrap_or(&empty);
    object_record(properties, position)
}

/// A bare array item: either a feature or a flat row object.
fn array_record(item: &serde_json::Value) -> SchoolRecord {
    let Some(object) = item.as_object() else {
        return SchoolRecord::default();
    };
    let is_feature = object.contains_key("geometry")
        || object.get("type").and_then(serde_json::Value::as_str) == Some("Feature");
    if is_feature {
        geojson_record(item)
    } else {
        object_record(object, None)
    }
}

fn osm_record(element: &OsmElement) -> SchoolRecord {
    let tag = |keys: &[&str]| element.first_tag(keys).map(str::to_string);
    SchoolRecord {
        position: element_point(element).and_then(|[lon, lat]| valid_position(lon, lat)),
        name: tag(&["name", "name:en"]),
        district: tag(&["addr:district", "is_in:district"]),
        region: tag(&["addr:region", "is_in:region"]),
        ownership: tag(&["operator:type", "ownership", "operator"]),
        gender: tag(&["gender", "school:gender"]),
    }
}

/// Runs the schools pipeline and writes the output file.
///
/// Nothing is written if no source yields schools.
///
/// # Errors
///
/// Returns [`PipelineError`] if every source fails or the output cannot
/// be written.
pub async fn run_schools(
    config: &PipelineConfig,
    transport: &dyn Transport,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<SchoolsCollection, PipelineError> {
    let collection = SchoolsAssembler::new(config, transport)?
        .assemble(progress)
        .await?;
    write_json_atomic(&config.schools.output, &collection).await?;
    progress.finish(format!(
        "Schools: {} features ({}) -> {}",
        collection.features.len(),
        collection.meta.source,
        config.schools.output.display()
    ));
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::json;
    use uganda_map_feature_models::{Gender, Ownership};
    use uganda_map_source::progress::null_progress;

    use super::*;
    use crate::testing::CannedTransport;

    const OVERPASS: &str = "https://overpass.example/api/interpreter";
    const OFFICIAL_URL: &str = "https://data.example/schools.csv";
    const OFFICIAL_JSON_URL: &str = "https://data.example/schools.geojson";

    fn config(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::embedded().unwrap();
        config.overpass.endpoints = vec![OVERPASS.to_string()];
        config.overpass.max_attempts = 2;
        config.overpass.base_delay_ms = 0;
        config.schools.official_candidates = vec![
            dir.join("schools.geojson"),
            dir.join("schools.json"),
            dir.join("schools.csv"),
        ];
        config.schools.output = dir.join("public/data/schools.geojson");
        config
    }

    #[tokio::test]
    async fn local_csv_produces_official_local_collection() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(
            dir.path().join("schools.csv"),
            "Name,Lat,Lng,Ownership\n\"St. Mary's\",0.3,32.5,Government\n",
        )
        .unwrap();
        let transport = CannedTransport::default();

        run_schools(&config, &transport, &null_progress())
            .await
            .unwrap();

        assert!(transport.requests().is_empty());
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&config.schools.output).unwrap())
                .unwrap();
        assert_eq!(written["meta"]["source"], "official-local");
        let features = written["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["geometry"]["coordinates"], json!([32.5, 0.3]));
        assert_eq!(features[0]["properties"]["name"], "St. Mary's");
        assert_eq!(features[0]["properties"]["ownership"], "government");
        assert_eq!(features[0]["properties"]["gender"], "unknown");
        assert_eq!(features[0]["properties"]["region"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn geojson_candidate_wins_over_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        std::fs::write(
            dir.path().join("schools.geojson"),
            json!({"type": "FeatureCollection", "features": [{
                "type": "Feature",
                "geometry": {"type": "Polygon", "coordinates": [[[32.0, 0.0], [33.0, 0.0], [33.0, 1.0], [32.0, 1.0]]]},
                "properties": {"School Name": "Gulu High", "District": "Gulu District", "Sex": "Boys"}
            }]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("schools.csv"), "Name,Lat,Lng\nX,1,2\n").unwrap();

        let collection = SchoolsAssembler::new(&config, &CannedTransport::default())
            .unwrap()
            .assemble(&null_progress())
            .await
            .unwrap();

        assert_eq!(collection.meta.source, SchoolsSource::OfficialLocal);
        let feature = &collection.features[0];
        assert_eq!(feature.geometry, Geometry::Point([32.5, 0.5]));
        assert_eq!(feature.properties.region.as_deref(), Some("Northern"));
        assert_eq!(feature.properties.gender, Gender::Boys);
    }

    #[tokio::test]
    async fn broken_local_file_falls_through_to_remote_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.schools.official_url = Some(OFFICIAL_URL.to_string());
        std::fs::write(dir.path().join("schools.csv"), "Name,District\nA,Kampala\n").unwrap();
        let transport = CannedTransport::default().with(
            OFFICIAL_URL,
            200,
            "name;latitude;longitude;district;owner\nKololo SS;0.33;32.59;Kampala;Private\n",
        );

        let collection = SchoolsAssembler::new(&config, &transport)
            .unwrap()
            .assemble(&null_progress())
            .await
            .unwrap();

        assert_eq!(collection.meta.source, SchoolsSource::OfficialRemoteCsv);
        assert_eq!(collection.features.len(), 1);
        let properties = &collection.features[0].properties;
        assert_eq!(properties.region.as_deref(), Some("Central"));
        assert_eq!(properties.ownership, Ownership::Private);
    }

    #[tokio::test]
    async fn falls_back_to_overpass() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.schools.official_url = Some(OFFICIAL_URL.to_string());
        let body = json!({"elements": [
            {"type": "node", "id": 1, "lat": 2.77, "lon": 32.3,
             "tags": {"amenity": "school", "name": "Sir Samuel Baker", "addr:district": "Gulu", "operator:type": "government"}},
            {"type": "way", "id": 2, "center": {"lat": 0.61, "lon": 30.65},
             "tags": {"amenity": "school", "name": "Ntare School", "school:gender": "boys"}},
            {"type": "node", "id": 3, "tags": {"amenity": "school"}}
        ]});
        let transport = CannedTransport::default()
            .with(OFFICIAL_URL, 404, "not found")
            .with(OVERPASS, 200, &body.to_string());

        let collection = SchoolsAssembler::new(&config, &transport)
            .unwrap()
            .assemble(&null_progress())
            .await
            .unwrap();

        assert_eq!(transport.requests(), vec![OFFICIAL_URL, OVERPASS]);
        assert_eq!(collection.meta.source, SchoolsSource::Overpass);
        assert_eq!(collection.features.len(), 2);
        assert_eq!(
            collection.features[0].properties.region.as_deref(),
            Some("Northern")
        );
        assert_eq!(collection.features[1].geometry, Geometry::Point([30.65, 0.61]));
        assert_eq!(collection.features[1].properties.ownership, Ownership::Unknown);
    }

    #[tokio::test]
    async fn exhausting_every_source_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let transport = CannedTransport::default();

        let err = run_schools(&config, &transport, &null_progress())
            .await
            .unwrap_err();

        match err {
            PipelineError::NoUsableSource { attempted } => assert_eq!(
                attempted,
                vec!["local-official", "remote-official", "fallback-overpass"]
            ),
            other => panic!("expected NoUsableSource, got {other}"),
        }
        assert!(!config.schools.output.exists());
    }

    #[tokio::test]
    async fn bad_region_lookup_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.schools.region_lookup = Some(PathBuf::from("/nonexistent/lookup.json"));
        let transport = CannedTransport::default();
        let assembler = SchoolsAssembler::new(&config, &transport).unwrap();
        assert_eq!(assembler.regions.region_of("Mbarara"), Some("Western"));
    }

    #[tokio::test]
    async fn lookup_without_districts_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        let lookup = dir.path().join("lookup.json");
        std::fs::write(&lookup, json!({"regions": [{"region": "Central"}]}).to_string()).unwrap();
        config.schools.region_lookup = Some(lookup);
        let transport = CannedTransport::default();
        let assembler = SchoolsAssembler::new(&config, &transport).unwrap();
        assert_eq!(assembler.regions.region_of("Kampala"), Some("Central"));
    }

    #[tokio::test]
    async fn local_file_without_located_rows_falls_through_to_remote_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.schools.official_url = Some(OFFICIAL_JSON_URL.to_string());
        std::fs::write(
            dir.path().join("schools.csv"),
            "Name,Lat,Lng\nA,n/a,n/a\nB,,\n",
        )
        .unwrap();
        let body = json!({"type": "FeatureCollection", "features": [{
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [33.2, 0.45]},
            "properties": {"name": "Jinja College", "district": "Jinja", "gender": "Boys and Girls"}
        }]});
        let transport = CannedTransport::default().with(OFFICIAL_JSON_URL, 200, &body.to_string());

        let collection = SchoolsAssembler::new(&config, &transport)
            .unwrap()
            .assemble(&null_progress())
            .await
            .unwrap();

        assert_eq!(transport.requests(), vec![OFFICIAL_JSON_URL]);
        assert_eq!(collection.meta.source, SchoolsSource::OfficialRemote);
        assert_eq!(collection.features.len(), 1);
        let properties = &collection.features[0].properties;
        assert_eq!(properties.region.as_deref(), Some("Eastern"));
        assert_eq!(properties.gender, Gender::Mixed);
    }

    #[test]
    fn array_items_may_be_rows_or_features() {
        let row = array_record(&json!({"name": "A", "lat": "0.5", "lon": 32.0}));
        assert_eq!(row.position, Some([32.0, 0.5]));
        let feature = array_record(&json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [31.0, 1.0]},
            "properties": {"name": "B"}
        }));
        assert_eq!(feature.position, Some([31.0, 1.0]));
        assert_eq!(feature.name.as_deref(), Some("B"));
        assert_eq!(array_record(&json!("text")).position, None);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert_eq!(valid_position(32.5, 0.3), Some([32.5, 0.3]));
        assert_eq!(valid_position(0.3, 132.5), None);
    }
}
