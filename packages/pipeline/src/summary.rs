//! Read-back summary of the published datasets.
//!
//! Loads both output files the way the map front end does and counts
//! features by geometry type and by their main attributes. Each document
//! sits behind a [`SharedCache`], so the report sections can request it
//! concurrently while the file is read exactly once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::de::DeserializeOwned;
use uganda_map_feature_models::{FiberCollection, SchoolsCollection, SchoolsSource};
use uganda_map_source::SourceError;
use uganda_map_source::memo::{SharedCache, SharedError};

use crate::PipelineError;

/// Label used for a missing attribute.
const NONE_LABEL: &str = "(none)";

/// Lazily loaded, shared copies of the two published documents.
pub struct DatasetLoader {
    fiber_path: PathBuf,
    schools_path: PathBuf,
    fiber: SharedCache<Arc<FiberCollection>>,
    schools: SharedCache<Arc<SchoolsCollection>>,
    reads: Arc<AtomicUsize>,
}

impl DatasetLoader {
    /// Creates a loader for the given files. Nothing is read yet.
    #[must_use]
    pub fn new(fiber_path: impl Into<PathBuf>, schools_path: impl Into<PathBuf>) -> Self {
        Self {
            fiber_path: fiber_path.into(),
            schools_path: schools_path.into(),
            fiber: SharedCache::new(),
            schools: SharedCache::new(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The fiber document.
    ///
    /// # Errors
    ///
    /// Returns the shared read or parse error.
    pub async fn fiber(&self) -> Result<Arc<FiberCollection>, SharedError> {
        let path = self.fiber_path.clone();
        let reads = Arc::clone(&self.reads);
        self.fiber
            .get_or_load(move || read_document(path, reads))
            .await
    }

    /// The schools document.
    ///
    /// # Errors
    ///
    /// Returns the shared read or parse error.
    pub async fn schools(&self) -> Result<Arc<SchoolsCollection>, SharedError> {
        let path = self.schools_path.clone();
        let reads = Arc::clone(&self.reads);
        self.schools
            .get_or_load(move || read_document(path, reads))
            .await
    }

    /// Number of file reads performed so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

async fn read_document<T: DeserializeOwned>(
    path: PathBuf,
    reads: Arc<AtomicUsize>,
) -> Result<Arc<T>, SourceError> {
    reads.fetch_add(1, Ordering::SeqCst);
    log::debug!("Reading {}", path.display());
    let text = tokio::fs::read_to_string(&path).await?;
    Ok(Arc::new(serde_json::from_str(&text)?))
}

/// Feature counts of the fiber dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiberSummary {
    /// Total features.
    pub total: usize,
    /// Counts by geometry type.
    pub by_geometry: BTreeMap<String, usize>,
    /// Counts by `feature_type`.
    pub by_feature_type: BTreeMap<String, usize>,
}

/// Feature counts of the schools dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolsSummary {
    /// Total features.
    pub total: usize,
    /// Which source produced the dataset.
    pub source: SchoolsSource,
    /// Counts by geometry type.
    pub by_geometry: BTreeMap<String, usize>,
    /// Counts by region.
    pub by_region: BTreeMap<String, usize>,
    /// Counts by ownership.
    pub by_ownership: BTreeMap<String, usize>,
}

/// Summary of both datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Fiber counts.
    pub fiber: FiberSummary,
    /// Schools counts.
    pub schools: SchoolsSummary,
}

fn count<I, S>(labels: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.into()).or_insert(0) += 1;
    }
    counts
}

type GeometryCounts = (BTreeMap<String, usize>, BTreeMap<String, usize>);

async fn geometry_section(loader: &DatasetLoader) -> Result<GeometryCounts, SharedError> {
    let fiber = loader.fiber().await?;
    let schools = loader.schools().await?;
    Ok((
        count(fiber.features.iter().map(|f| f.geometry.kind().to_string())),
        count(schools.features.iter().map(|f| f.geometry.kind().to_string())),
    ))
}

async fn attribute_section(
    loader: &DatasetLoader,
) -> Result<(FiberSummary, SchoolsSummary), SharedError> {
    let schools = loader.schools().await?;
    let fiber = loader.fiber().await?;
    Ok((
        FiberSummary {
            total: fiber.features.len(),
            by_feature_type: count(fiber.features.iter().map(|f| {
                f.properties
                    .feature_type
                    .map_or_else(|| NONE_LABEL.to_string(), |t| t.to_string())
            })),
            ..FiberSummary::default()
        },
        SchoolsSummary {
            total: schools.features.len(),
            source: schools.meta.source,
            by_geometry: BTreeMap::new(),
            by_region: count(
                schools
                    .features
                    .iter()
                    .map(|f| f.properties.region.as_deref().unwrap_or(NONE_LABEL)),
            ),
            by_ownership: count(
                schools
                    .features
                    .iter()
                    .map(|f| f.properties.ownership.as_str()),
            ),
        },
    ))
}

/// Builds the summary, running both report sections concurrently.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if either file cannot be read or
/// parsed.
pub async fn summarize(loader: &DatasetLoader) -> Result<Summary, PipelineError> {
    let ((fiber_geometry, schools_geometry), (mut fiber, mut schools)) =
        futures::future::try_join(geometry_section(loader), attribute_section(loader)).await?;
    fiber.by_geometry = fiber_geometry;
    schools.by_geometry = schools_geometry;
    Ok(Summary { fiber, schools })
}

fn write_counts(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    counts: &BTreeMap<String, usize>,
) -> fmt::Result {
    writeln!(f, "  {title}:")?;
    for (label, n) in counts {
        writeln!(f, "    {label:<24} {n:>7}")?;
    }
    Ok(())
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fiber: {} features", self.fiber.total)?;
        write_counts(f, "geometry", &self.fiber.by_geometry)?;
        write_counts(f, "feature_type", &self.fiber.by_feature_type)?;
        writeln!(
            f,
            "Schools: {} features (source: {})",
            self.schools.total, self.schools.source
        )?;
        write_counts(f, "geometry", &self.schools.by_geometry)?;
        write_counts(f, "region", &self.schools.by_region)?;
        write_counts(f, "ownership", &self.schools.by_ownership)
    }
}
