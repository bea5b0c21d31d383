#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `OpenStreetMap` element handling for the map datasets.
//!
//! Decodes Overpass JSON into typed [`element`]s, builds the Overpass QL
//! [`query`] text for both datasets, reconstructs canonical `GeoJSON`
//! [`geometry`] from nodes, ways, and relations, [`classify`]s telecom
//! features, and assembles [`fiber`] features.

pub mod classify;
pub mod element;
pub mod fiber;
pub mod geometry;
pub mod query;

use thiserror::Error;

/// Errors that can occur while decoding Overpass output.
#[derive(Debug, Error)]
pub enum OsmError {
    /// JSON decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response has no `elements` array.
    #[error("Overpass response has no elements array")]
    MissingElements,
}
