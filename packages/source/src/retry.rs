//! Multi-endpoint Overpass retry with exponential backoff.
//!
//! All Overpass queries should go through [`query_overpass`] instead of
//! calling a [`Transport`] directly. Attempts rotate through the endpoint
//! list, so a single overloaded mirror does not fail the run.
//!
//! # Usage
//!
//! ```ignore
//! use uganda_map_source::retry::{self, RetryPolicy};
//!
//! let response = retry::query_overpass(
//!     transport.as_ref(),
//!     &endpoints,
//!     &query,
//!     &RetryPolicy::default(),
//!     &progress,
//! )
//! .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::Rng as _;

use crate::SourceError;
use crate::http::Transport;
use crate::progress::ProgressCallback;

/// Default number of attempts across all endpoints.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Default base delay before the second attempt.
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s before jitter) the total
/// wait across the default six attempts is about a minute.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Uniform jitter range applied to every backoff delay.
pub const DEFAULT_JITTER: (f64, f64) = (0.7, 1.3);

/// Backoff exponents above this are clamped so the delay stays finite.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Remark fragments that mark an otherwise-successful Overpass response
/// as a failed query.
const REJECTION_MARKERS: &[&str] = &["error", "timed out", "out of memory"];

/// How many times and how patiently to retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts across all endpoints. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each later attempt.
    pub base_delay: Duration,
    /// Inclusive range the jitter multiplier is drawn from.
    pub jitter: (f64, f64),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryPolicy {
    fn draw_jitter(&self) -> f64 {
        let (low, high) = self.jitter;
        if high > low {
            rand::thread_rng().gen_range(low..=high)
        } else {
            low
        }
    }
}

/// A complete, successfully decoded Overpass payload.
#[derive(Debug, Clone)]
pub struct OverpassResponse {
    /// Decoded JSON body.
    pub body: serde_json::Value,
    /// Endpoint that produced the body.
    pub endpoint: String,
    /// Endpoint of every attempt, in attempt order.
    pub endpoints_tried: Vec<String>,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
}

/// Returns the endpoint targeted by the 1-based `attempt`.
///
/// Attempt `i` targets `endpoints[(i - 1) mod N]`; returns `None` when the
/// list is empty.
#[must_use]
pub fn endpoint_for_attempt(endpoints: &[String], attempt: u32) -> Option<&str> {
    if endpoints.is_empty() {
        return None;
    }
    let index = (attempt.saturating_sub(1) as usize) % endpoints.len();
    endpoints.get(index).map(String::as_str)
}

/// Delay before attempt `attempt + 1`: `base * 2^(attempt - 1) * jitter`.
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let factor = f64::from(1u32 << exponent) * jitter.max(0.0);
    base.mul_f64(factor)
}

/// Returns the upstream remark if it flags the query as failed.
#[must_use]
pub fn rejection_remark(body: &serde_json::Value) -> Option<&str> {
    let remark = body.get("remark")?.as_str()?;
    let lower = remark.to_lowercase();
    REJECTION_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
        .then_some(remark)
}

/// Runs an Overpass query, rotating across `endpoints` until one returns
/// a complete JSON payload.
///
/// # Retry behaviour
///
/// An attempt fails on a transport error, a non-2xx status, a body that
/// is not JSON, or a body whose `remark` reports a query error. After a
/// failed attempt `i` the loop sleeps [`backoff_delay`] and moves on to
/// the next endpoint. There is no partial success: the result is either
/// one complete payload or an error.
///
/// # Errors
///
/// Returns [`SourceError::RetriesExhausted`] carrying the last failure's
/// message after `policy.max_attempts` failed attempts, or
/// [`SourceError::Normalization`] if `endpoints` is empty.
pub async fn query_overpass(
    transport: &dyn Transport,
    endpoints: &[String],
    query: &str,
    policy: &RetryPolicy,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<OverpassResponse, SourceError> {
    if endpoints.is_empty() {
        return Err(SourceError::Normalization {
            message: "no Overpass endpoints configured".to_string(),
        });
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut endpoints_tried = Vec::with_capacity(max_attempts as usize);
    let mut last_error: Option<SourceError> = None;

    for attempt in 1..=max_attempts {
        let Some(endpoint) = endpoint_for_attempt(endpoints, attempt) else {
            break;
        };
        endpoints_tried.push(endpoint.to_string());
        progress.set_message(format!(
            "Overpass attempt {attempt}/{max_attempts}: {endpoint}"
        ));

        match attempt_once(transport, endpoint, query).await {
            Ok(body) => {
                log::info!("Overpass query succeeded on attempt {attempt} via {endpoint}");
                return Ok(OverpassResponse {
                    body,
                    endpoint: endpoint.to_string(),
                    endpoints_tried,
                    attempts: attempt,
                });
            }
            Err(e) => {
                if attempt < max_attempts {
                    let delay = backoff_delay(policy.base_delay, attempt, policy.draw_jitter());
                    log::warn!(
                        "Overpass attempt {attempt}/{max_attempts} via {endpoint} failed: {e} \
                         (retrying in {delay:?})"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                } else {
                    log::warn!(
                        "Overpass attempt {attempt}/{max_attempts} via {endpoint} failed: {e} \
                         (giving up)"
                    );
                    last_error = Some(e);
                }
            }
        }
    }

    Err(SourceError::RetriesExhausted {
        attempts: max_attempts,
        last_error: last_error.map_or_else(|| "no attempt was made".to_string(), |e| e.to_string()),
    })
}

/// One request against one endpoint, with every failure mode mapped to
/// an error.
async fn attempt_once(
    transport: &dyn Transport,
    endpoint: &str,
    query: &str,
) -> Result<serde_json::Value, SourceError> {
    let response = transport.post_form(endpoint, &[("data", query)]).await?;
    if !response.is_success() {
        return Err(SourceError::Status {
            endpoint: endpoint.to_string(),
            status: response.status,
        });
    }

    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    if let Some(remark) = rejection_remark(&body) {
        return Err(SourceError::Rejected {
            endpoint: endpoint.to_string(),
            remark: remark.to_string(),
        });
    }

    Ok(body)
}
