#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upstream data acquisition for the map datasets.
//!
//! Everything that touches an upstream service or an upstream payload
//! before it is normalized lives here: the HTTP [`Transport`](http::Transport),
//! the multi-endpoint Overpass [`retry`] loop, the append-only raw response
//! [`cache`], and the [`sniff`]/[`delimited`]/[`columns`] helpers that turn
//! an arbitrary official dataset into rows.

pub mod cache;
pub mod columns;
pub mod delimited;
pub mod http;
pub mod memo;
pub mod progress;
pub mod retry;
pub mod sniff;

/// Errors that can occur while fetching or decoding upstream data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text could not be parsed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// The upstream answered with a non-2xx status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// URL that was requested.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The upstream answered 2xx but flagged the query as failed.
    #[error("{endpoint} rejected the query: {remark}")]
    Rejected {
        /// URL that was requested.
        endpoint: String,
        /// Upstream `remark` text.
        remark: String,
    },

    /// A mandatory column could not be found under any of its names.
    #[error("missing mandatory {field} column")]
    MissingColumn {
        /// Semantic field name (e.g. `"latitude"`).
        field: &'static str,
    },

    /// Every retry attempt failed.
    #[error("all {attempts} attempts failed; last error: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// Data normalization error.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}
