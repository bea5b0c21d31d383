//! Telecom fiber pipeline.
//!
//! Query Overpass once (with endpoint rotation and backoff), persist the
//! raw response, normalize every element, and write the collection with
//! its provenance metadata.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uganda_map_feature_models::{CollectionTag, FiberCollection, FiberMetadata};
use uganda_map_osm::element::parse_elements;
use uganda_map_osm::fiber::{ATTRIBUTION, LICENCE, fiber_features};
use uganda_map_osm::query::fiber_query;
use uganda_map_source::cache::RawCache;
use uganda_map_source::http::Transport;
use uganda_map_source::progress::ProgressCallback;
use uganda_map_source::retry::query_overpass;

use crate::PipelineError;
use crate::config::PipelineConfig;
use crate::output::write_json_atomic;

/// Collection name of the fiber dataset.
pub const COLLECTION_NAME: &str = "uganda_telecom_fiber";

/// Caveats recorded in the output metadata.
const ASSUMPTIONS: &[&str] = &[
    "Fiber lines are ways or relations whose telecom:medium, cable:medium, cable, \
     communication:medium or communication tag mentions fibre or fiber.",
    "Telecom sites, cabinets and poles are classified from node tags; unmatched \
     elements are kept with a null feature_type.",
    "Relation geometry follows upstream member order; segments are not reordered \
     or joined.",
    "OpenStreetMap coverage is incomplete; a missing feature does not imply missing \
     infrastructure.",
];

/// Result of a fiber run.
#[derive(Debug, Clone)]
pub struct FiberRun {
    /// The normalized collection.
    pub collection: FiberCollection,
    /// Raw response cache file.
    pub raw_cache_path: PathBuf,
}

/// Fetches and normalizes the fiber dataset without writing the output.
///
/// # Errors
///
/// Returns [`PipelineError`] if every Overpass attempt fails, the raw
/// response cannot be cached, or the response has no elements.
pub async fn build_fiber(
    config: &PipelineConfig,
    transport: &dyn Transport,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<FiberRun, PipelineError> {
    let fiber = &config.fiber;
    let query = fiber_query(&fiber.country, fiber.admin_level, fiber.query_timeout_secs);

    progress.set_message(format!("Querying Overpass for {} telecom data", fiber.country));
    let started = Instant::now();
    let response = query_overpass(
        transport,
        &config.overpass.endpoints,
        &query,
        &config.retry_policy(),
        progress,
    )
    .await?;
    let fetch_duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let generated_at = Utc::now();

    log::info!(
        "Overpass answered from {} after {} attempt(s) in {fetch_duration_ms} ms",
        response.endpoint,
        response.attempts
    );

    progress.set_message("Caching raw response".to_string());
    let cache = RawCache::new(&fiber.cache_dir, fiber.cache_prefix.as_str());
    let raw_cache_path = cache
        .write(&query, &response.body, generated_at)
        .await?;

    progress.set_message("Normalizing elements".to_string());
    let elements = parse_elements(&response.body)?;
    let features = fiber_features(&elements);

    log::info!(
        "Fiber dataset: {} features from {} elements",
        features.len(),
        elements.len()
    );

    let collection = FiberCollection {
        tag: CollectionTag::FeatureCollection,
        name: COLLECTION_NAME.to_string(),
        metadata: FiberMetadata {
            generated_at,
            fetch_duration_ms,
            query,
            endpoints_tried: response.endpoints_tried,
            assumptions: ASSUMPTIONS.iter().map(ToString::to_string).collect(),
            license: LICENCE.to_string(),
            attribution: ATTRIBUTION.to_string(),
            raw_cache_path: raw_cache_path.display().to_string(),
        },
        features,
    };

    Ok(FiberRun {
        collection,
        raw_cache_path,
    })
}

/// Runs the fiber pipeline and writes the output file.
///
/// Nothing is written if the run fails.
///
/// # Errors
///
/// Returns [`PipelineError`] from [`build_fiber`] or if the output cannot
/// be written.
pub async fn run_fiber(
    config: &PipelineConfig,
    transport: &dyn Transport,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<FiberRun, PipelineError> {
    let run = build_fiber(config, transport, progress).await?;
    write_json_atomic(&config.fiber.output, &run.collection).await?;
    progress.finish(format!(
        "Fiber: {} features -> {}",
        run.collection.features.len(),
        config.fiber.output.display()
    ));
    Ok(run)
}
