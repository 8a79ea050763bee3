use anyhow::{Context, Result};
use colored::Colorize;

use super::{load_settings, settings_path};
use crate::core::config::Settings;

pub fn handle(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("init", sub_matches)) => init(sub_matches),
        Some(("show", sub_matches)) => show(sub_matches),
        Some(("path", sub_matches)) => path(sub_matches),
        _ => {
            println!("Use 'sondewatch config --help' for more information.");
            Ok(())
        }
    }
}

fn init(matches: &clap::ArgMatches) -> Result<()> {
    let path = settings_path(matches)?;
    let force = matches.get_flag("force");

    if path.exists() && !force {
        println!(
            "{}",
            format!("⚠️  Settings file already exists: {}", path.display()).yellow()
        );
        println!("{}", "Use --force to overwrite it with defaults.".dimmed());
        return Ok(());
    }

    Settings::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write settings to {:?}", path))?;

    println!("{}", "✓ Default settings written to:".green());
    println!("  {}", path.display().to_string().cyan().bold());
    println!(
        "{}",
        "Edit listener_location and notifications before running.".dimmed()
    );
    Ok(())
}

fn show(matches: &clap::ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let json = serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?;

    println!("{}", settings_path(matches)?.display().to_string().dimmed());
    println!("{}", json);
    Ok(())
}

fn path(matches: &clap::ArgMatches) -> Result<()> {
    let path = settings_path(matches)?;
    let status = if path.exists() {
        "exists".green()
    } else {
        "not created yet".yellow()
    };

    println!("{} ({})", path.display(), status);
    Ok(())
}
