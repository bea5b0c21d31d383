#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset pipelines for the Uganda map.
//!
//! Two short-lived, strictly sequential pipelines produce the static
//! `GeoJSON` files the map front end loads:
//!
//! - [`fiber`]: one Overpass query for telecom infrastructure, cached raw,
//!   normalized to Point/LineString/MultiLineString features.
//! - [`schools`]: secondary schools from the most trusted source that
//!   yields records (local official file, remote official dataset, then
//!   Overpass), enriched with region, ownership, and gender.
//!
//! [`summary`] reads the produced files back for a quick sanity report.

pub mod config;
pub mod fiber;
pub mod output;
pub mod schools;
pub mod summary;

use thiserror::Error;
use uganda_map_enrich::EnrichError;
use uganda_map_osm::OsmError;
use uganda_map_source::SourceError;
use uganda_map_source::memo::SharedError;

/// Errors that can end a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream fetch or parse failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Overpass document decoding failure.
    #[error(transparent)]
    Osm(#[from] OsmError),

    /// Enrichment table failure.
    #[error(transparent)]
    Enrich(#[from] EnrichError),

    /// A shared load failed.
    #[error("{0}")]
    Load(#[from] SharedError),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Every sourcing state failed or yielded nothing.
    #[error("No usable schools source (tried: {})", attempted.join(", "))]
    NoUsableSource {
        /// Source labels tried, in order.
        attempted: Vec<String>,
    },
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned [`Transport`] for pipeline tests.

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uganda_map_source::SourceError;
    use uganda_map_source::http::{HttpResponse, Transport};

    /// Answers every request to a URL with the same canned response and
    /// records the URLs requested. Unknown URLs fail like a refused
    /// connection.
    #[derive(Default)]
    pub struct CannedTransport {
        responses: BTreeMap<String, (u16, String)>,
        pub requests: Mutex<Vec<String>>,
    }

    impl CannedTransport {
        pub fn with(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses
                .insert(url.to_string(), (status, body.to_string()));
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn answer(&self, url: &str) -> Result<HttpResponse, SourceError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .map(|(status, body)| HttpResponse {
                    status: *status,
                    body: body.clone(),
                })
                .ok_or_else(|| SourceError::Normalization {
                    message: format!("connection refused: {url}"),
                })
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn get_text(&self, url: &str) -> Result<HttpResponse, SourceError> {
            self.answer(url)
        }

        async fn post_form(
            &self,
            url: &str,
            _fields: &[(&str, &str)],
        ) -> Result<HttpResponse, SourceError> {
            self.answer(url)
        }
    }
}
