use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::load_settings;
use crate::core::config::{ListenerKind, Settings};
use crate::core::monitor::Monitor;
use crate::core::tracker::TrackerConfig;
use crate::listeners;
use crate::notify::Notifier;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;

    let kind = match matches.try_get_one::<String>("listener").ok().flatten() {
        Some(raw) => raw.parse::<ListenerKind>()?,
        None => settings.listener_type,
    };

    if kind == ListenerKind::Udp && !settings.udp_broadcast.enabled {
        bail!("UDP listener selected but udp_broadcast.enabled is false in the settings file");
    }

    let tracker_config = TrackerConfig::from_settings(&settings)?;
    print_summary(&settings, kind);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("sondewatch-worker")
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let notifier = Notifier::new(&settings.notifications.active_urls())?;
        let listener = listeners::build(kind, &settings)?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        ctrlc::set_handler(move || {
            let _ = shutdown_tx.send(());
        })
        .context("Failed to install Ctrl-C handler")?;

        Monitor::new(tracker_config, Arc::new(notifier))
            .run(listener, shutdown_rx)
            .await
            .with_context(|| format!("{} listener stopped with an error", kind))
    })
}

fn print_summary(settings: &Settings, kind: ListenerKind) {
    let thresholds = &settings.notification_thresholds;
    let location = &settings.listener_location;

    println!("{}", "Sondewatch".cyan().bold());
    println!(
        "  {} {:.5}, {:.5}",
        "Home:".dimmed(),
        location.latitude,
        location.longitude
    );
    println!(
        "  {} within {} km, below {} m",
        "Alerts:".dimmed(),
        thresholds.distance_km,
        thresholds.altitude_meters
    );
    match thresholds.landing_point_timeout_minutes {
        0 => println!("  {} {}", "Landing:".dimmed(), "disabled".yellow()),
        minutes => println!("  {} after {} min of silence", "Landing:".dimmed(), minutes),
    }
    println!("  {} {}", "Listener:".dimmed(), kind.to_string().green());

    let endpoints = settings.notifications.active_urls().len();
    if endpoints == 0 {
        println!(
            "  {} {}",
            "Notify:".dimmed(),
            "no endpoints configured, alerts are logged only".yellow()
        );
    } else {
        println!("  {} {} endpoint(s)", "Notify:".dimmed(), endpoints);
    }
    println!("{}", "Press Ctrl-C to stop.".dimmed());
}
