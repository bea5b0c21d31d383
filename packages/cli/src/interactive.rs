//! Interactive menu shown when no subcommand is given.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};

use crate::Commands;

/// Menu entries.
enum Action {
    All,
    Fiber,
    Schools,
    Summary,
    Endpoints,
}

impl Action {
    const ALL: &[Self] = &[
        Self::All,
        Self::Fiber,
        Self::Schools,
        Self::Summary,
        Self::Endpoints,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::All => "Build both datasets",
            Self::Fiber => "Build fiber dataset",
            Self::Schools => "Build schools dataset",
            Self::Summary => "Summarize published datasets",
            Self::Endpoints => "List Overpass endpoints",
        }
    }
}

/// Prompts for optional text; blank input means `None`.
fn optional_text(prompt: &str) -> Result<Option<String>, dialoguer::Error> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn custom_endpoint() -> Result<Option<String>, dialoguer::Error> {
    let wants = Confirm::new()
        .with_prompt("Try a custom Overpass endpoint first?")
        .default(false)
        .interact()?;
    if wants {
        optional_text("Overpass endpoint URL")
    } else {
        Ok(None)
    }
}

/// Asks which command to run and collects its options.
///
/// # Errors
///
/// Returns an error if the terminal cannot be prompted.
pub fn select_command() -> Result<Commands, dialoguer::Error> {
    println!("Uganda Map Datasets");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(match Action::ALL[idx] {
        Action::All => Commands::All {
            endpoint: custom_endpoint()?,
        },
        Action::Fiber => Commands::Fiber {
            endpoint: custom_endpoint()?,
            output: None,
        },
        Action::Schools => Commands::Schools {
            official_path: optional_text("Official schools file (blank for defaults)")?
                .map(PathBuf::from),
            official_url: optional_text("Official schools URL (blank for none)")?,
            region_lookup: optional_text("District to region lookup (blank for built-in)")?
                .map(PathBuf::from),
            endpoint: custom_endpoint()?,
            output: None,
        },
        Action::Summary => Commands::Summary {
            fiber: None,
            schools: None,
        },
        Action::Endpoints => Commands::Endpoints,
    })
}
