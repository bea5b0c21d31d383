#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the Uganda map dataset pipelines.
//!
//! Runs the fiber and schools pipelines, summarizes their output, or
//! lists the effective Overpass endpoint rotation. Without a subcommand
//! an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`uganda_map_cli_utils::init_logger`])
//! so retry warnings and step spinners share the terminal cleanly.

mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uganda_map_cli_utils::{IndicatifProgress, MultiProgress, init_logger};
use uganda_map_pipeline::config::{Overrides, PipelineConfig};
use uganda_map_pipeline::fiber::run_fiber;
use uganda_map_pipeline::schools::run_schools;
use uganda_map_pipeline::summary::{DatasetLoader, summarize};
use uganda_map_source::http::ReqwestTransport;

#[derive(Parser)]
#[command(
    name = "uganda_map",
    about = "Build the Uganda telecom fiber and secondary schools GeoJSON datasets"
)]
struct Cli {
    /// Pipeline configuration file (TOML). Defaults to the built-in configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Fetch telecom fiber infrastructure from Overpass
    Fiber {
        /// Overpass endpoint to try before the configured ones
        #[arg(long)]
        endpoint: Option<String>,
        /// Output `GeoJSON` path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build the secondary schools dataset
    Schools {
        /// Official schools file (.geojson, .json or .csv)
        #[arg(long)]
        official_path: Option<PathBuf>,
        /// Official schools dataset URL
        #[arg(long)]
        official_url: Option<String>,
        /// District to region lookup document (JSON)
        #[arg(long)]
        region_lookup: Option<PathBuf>,
        /// Overpass endpoint to try before the configured ones
        #[arg(long)]
        endpoint: Option<String>,
        /// Output `GeoJSON` path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the fiber pipeline, then the schools pipeline
    All {
        /// Overpass endpoint to try before the configured ones
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Summarize the published datasets
    Summary {
        /// Fiber dataset path (defaults to the configured output)
        #[arg(long)]
        fiber: Option<PathBuf>,
        /// Schools dataset path (defaults to the configured output)
        #[arg(long)]
        schools: Option<PathBuf>,
    },
    /// List the effective Overpass endpoint rotation
    Endpoints,
}

impl Commands {
    fn overrides(&self) -> Overrides {
        match self {
            Self::Fiber { endpoint, output } => Overrides {
                endpoint: endpoint.clone(),
                fiber_output: output.clone(),
                ..Overrides::default()
            },
            Self::Schools {
                official_path,
                official_url,
                region_lookup,
                endpoint,
                output,
            } => Overrides {
                endpoint: endpoint.clone(),
                schools_output: output.clone(),
                official_path: official_path.clone(),
                official_url: official_url.clone(),
                region_lookup: region_lookup.clone(),
                ..Overrides::default()
            },
            Self::All { endpoint } => Overrides {
                endpoint: endpoint.clone(),
                ..Overrides::default()
            },
            Self::Summary { .. } | Self::Endpoints => Overrides::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => interactive::select_command()?,
    };

    if let Err(e) = run(command, cli.config, &multi).await {
        log::error!("{e}");
        return Err(e);
    }

    Ok(())
}

async fn run(
    command: Commands,
    config_path: Option<PathBuf>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::load(config_path.as_deref())?
        .with_overrides(Overrides::from_env().merge(command.overrides()));

    match command {
        Commands::Endpoints => {
            for (i, endpoint) in config.overpass.endpoints.iter().enumerate() {
                println!("{:>2}. {endpoint}", i + 1);
            }
        }
        Commands::Summary { fiber, schools } => {
            let loader = DatasetLoader::new(
                fiber.unwrap_or_else(|| config.fiber.output.clone()),
                schools.unwrap_or_else(|| config.schools.output.clone()),
            );
            let summary = summarize(&loader).await?;
            print!("{summary}");
        }
        Commands::Fiber { .. } => {
            let transport =
                ReqwestTransport::new(&config.overpass.user_agent, config.request_timeout())?;
            let progress = IndicatifProgress::step_spinner(multi, "Fiber");
            run_fiber(&config, &transport, &progress).await?;
        }
        Commands::Schools { .. } => {
            let transport =
                ReqwestTransport::new(&config.overpass.user_agent, config.request_timeout())?;
            let progress = IndicatifProgress::step_spinner(multi, "Schools");
            run_schools(&config, &transport, &progress).await?;
        }
        Commands::All { .. } => {
            let transport =
                ReqwestTransport::new(&config.overpass.user_agent, config.request_timeout())?;
            let mut failed = Vec::new();

            let progress = IndicatifProgress::step_spinner(multi, "Fiber");
            if let Err(e) = run_fiber(&config, &transport, &progress).await {
                progress.finish_and_clear();
                log::error!("Fiber pipeline failed: {e}");
                failed.push("fiber");
            }

            let progress = IndicatifProgress::step_spinner(multi, "Schools");
            if let Err(e) = run_schools(&config, &transport, &progress).await {
                progress.finish_and_clear();
                log::error!("Schools pipeline failed: {e}");
                failed.push("schools");
            }

            if !failed.is_empty() {
                return Err(format!("pipeline(s) failed: {}", failed.join(", ")).into());
            }
        }
    }

    Ok(())
}
