// Command handlers module
pub mod config;
pub mod run;
pub mod simulate;
pub mod version;

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::core::config::Settings;

// Re-exports for cleaner imports
pub use notify_test::execute as notify_test;
pub use run::execute as run;
pub use simulate::execute as simulate;
pub use version::execute as version;

/// Settings file chosen with the global `--config` flag, or the default one
pub fn settings_path(matches: &clap::ArgMatches) -> Result<PathBuf> {
    match matches.try_get_one::<String>("config").ok().flatten() {
        Some(path) => Ok(PathBuf::from(path)),
        None => Settings::default_path().context("Could not locate the settings file"),
    }
}

/// Load and validate settings, creating defaults on first run
pub fn load_settings(matches: &clap::ArgMatches) -> Result<Settings> {
    let path = settings_path(matches)?;
    Settings::load_from(&path).with_context(|| format!("Failed to load settings from {:?}", path))
}
