//! Pipeline configuration.
//!
//! A [`PipelineConfig`] starts from the embedded `config/default.toml` (or
//! a user-supplied TOML file), then environment overrides, then
//! command-line [`Overrides`]. It is never mutated after construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use uganda_map_osm::query::BoundingBox;
use uganda_map_source::retry::{DEFAULT_JITTER, RetryPolicy};

use crate::PipelineError;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Custom Overpass endpoint, tried before the configured list.
pub const ENV_OVERPASS_ENDPOINT: &str = "OVERPASS_ENDPOINT";

/// Official schools file; replaces the candidate list.
pub const ENV_SCHOOLS_OFFICIAL_PATH: &str = "SCHOOLS_OFFICIAL_PATH";

/// Official schools URL.
pub const ENV_SCHOOLS_OFFICIAL_URL: &str = "SCHOOLS_OFFICIAL_URL";

/// District to region lookup document.
pub const ENV_DISTRICT_REGION_LOOKUP: &str = "DISTRICT_REGION_LOOKUP";

/// Overpass connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverpassConfig {
    /// Endpoints in rotation order.
    pub endpoints: Vec<String>,
    /// Total attempts across all endpoints.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Per-request HTTP timeout, in seconds.
    pub request_timeout_secs: u64,
    /// HTTP user agent.
    pub user_agent: String,
}

/// Fiber dataset settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FiberConfig {
    /// Name of the administrative area to query.
    pub country: String,
    /// Administrative level of that area.
    pub admin_level: u8,
    /// Server-side query timeout, in seconds.
    pub query_timeout_secs: u32,
    /// Output `GeoJSON` path.
    pub output: PathBuf,
    /// Raw response cache directory.
    pub cache_dir: PathBuf,
    /// Raw response file name prefix.
    pub cache_prefix: String,
}

/// Schools dataset settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchoolsConfig {
    /// Overpass fallback search area.
    pub bbox: BoundingBox,
    /// Server-side query timeout, in seconds.
    pub query_timeout_secs: u32,
    /// Output `GeoJSON` path.
    pub output: PathBuf,
    /// Local official dataset paths, checked in order.
    #[serde(default)]
    pub official_candidates: Vec<PathBuf>,
    /// Remote official dataset URL.
    #[serde(default)]
    pub official_url: Option<String>,
    /// District to region lookup document.
    #[serde(default)]
    pub region_lookup: Option<PathBuf>,
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Overpass settings.
    pub overpass: OverpassConfig,
    /// Fiber settings.
    pub fiber: FiberConfig,
    /// Schools settings.
    pub schools: SchoolsConfig,
}

/// Command-line overrides. `None` leaves the value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Endpoint tried before all others.
    pub endpoint: Option<String>,
    /// Fiber output path.
    pub fiber_output: Option<PathBuf>,
    /// Schools output path.
    pub schools_output: Option<PathBuf>,
    /// Official schools file.
    pub official_path: Option<PathBuf>,
    /// Official schools URL.
    pub official_url: Option<String>,
    /// District to region lookup document.
    pub region_lookup: Option<PathBuf>,
}

impl Overrides {
    /// Reads overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`. Blank values are ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            endpoint: get(ENV_OVERPASS_ENDPOINT),
            official_path: get(ENV_SCHOOLS_OFFICIAL_PATH).map(PathBuf::from),
            official_url: get(ENV_SCHOOLS_OFFICIAL_URL),
            region_lookup: get(ENV_DISTRICT_REGION_LOOKUP).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Layers `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            fiber_output: other.fiber_output.or(self.fiber_output),
            schools_output: other.schools_output.or(self.schools_output),
            official_path: other.official_path.or(self.official_path),
            official_url: other.official_url.or(self.official_url),
            region_lookup: other.region_lookup.or(self.region_lookup),
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        toml::de::from_str(text).map_err(|e| PipelineError::Config {
            message: e.to_string(),
        })
    }

    /// The embedded default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the embedded document is
    /// invalid.
    pub fn embedded() -> Result<Self, PipelineError> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// Loads `path`, or the embedded default when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                let text = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
                    message: format!("{}: {e}", path.display()),
                })?;
                Self::from_toml_str(&text)
            }
            None => Self::embedded(),
        }
    }

    /// Returns a copy with `overrides` applied.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.overpass.endpoints.retain(|e| *e != endpoint);
            self.overpass.endpoints.insert(0, endpoint);
        }
        if let Some(output) = overrides.fiber_output {
            self.fiber.output = output;
        }
        if let Some(output) = overrides.schools_output {
            self.schools.output = output;
        }
        if let Some(path) = overrides.official_path {
            self.schools.official_candidates = vec![path];
        }
        if let Some(url) = overrides.official_url {
            self.schools.official_url = Some(url);
        }
        if let Some(path) = overrides.region_lookup {
            self.schools.region_lookup = Some(path);
        }
        self
    }

    /// Retry policy derived from the `[overpass]` section.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.overpass.max_attempts,
            base_delay: Duration::from_millis(self.overpass.base_delay_ms),
            jitter: DEFAULT_JITTER,
        }
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.overpass.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = PipelineConfig::embedded().unwrap();
        assert_eq!(config.overpass.max_attempts, 6);
        assert_eq!(config.overpass.endpoints.len(), 3);
        assert_eq!(config.fiber.country, "Uganda");
        assert_eq!(config.fiber.admin_level, 2);
        assert_eq!(config.schools.official_candidates.len(), 3);
        assert!(
            config.schools.official_candidates[0]
                .to_string_lossy()
                .ends_with(".geojson")
        );
        assert_eq!(config.schools.official_url, None);
        assert_eq!(config.request_timeout(), Duration::from_secs(240));
    }

    #[test]
    fn env_endpoint_is_tried_first() {
        let env: BTreeMap<&str, &str> = [
            (ENV_OVERPASS_ENDPOINT, "https://mirror.example/api/interpreter"),
            (ENV_SCHOOLS_OFFICIAL_URL, "   "),
        ]
        .into_iter()
        .collect();
        let overrides = Overrides::from_lookup(|key| env.get(key).map(ToString::to_string));
        assert_eq!(overrides.official_url, None);

        let config = PipelineConfig::embedded().unwrap().with_overrides(overrides);
        assert_eq!(
            config.overpass.endpoints[0],
            "https://mirror.example/api/interpreter"
        );
        assert_eq!(config.overpass.endpoints.len(), 4);
    }

    #[test]
    fn cli_values_win_over_env() {
        let env = Overrides {
            official_path: Some(PathBuf::from("env.csv")),
            ..Overrides::default()
        };
        let cli = Overrides {
            official_path: Some(PathBuf::from("cli.csv")),
            ..Overrides::default()
        };
        let config = PipelineConfig::embedded()
            .unwrap()
            .with_overrides(env.merge(cli));
        assert_eq!(
            config.schools.official_candidates,
            vec![PathBuf::from("cli.csv")]
        );
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = PipelineConfig::from_toml_str("[overpass]\nendpoints = 3").unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }
}
