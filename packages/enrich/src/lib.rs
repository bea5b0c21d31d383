#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived fields for school records.
//!
//! [`classify`] maps free-text ownership and gender tags onto closed
//! vocabularies through ordered rule tables. [`region`] resolves districts
//! to administrative regions from a configurable lookup document.

pub mod classify;
pub mod region;

use thiserror::Error;

/// Errors that can occur while loading enrichment tables.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// JSON decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the lookup document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The lookup document has none of the supported shapes.
    #[error("Unsupported region lookup shape: {message}")]
    UnsupportedShape {
        /// What was found instead.
        message: String,
    },
}
