use anyhow::Result;
use clap::{Arg, Command};

use sondewatch::commands;

fn main() -> Result<()> {
    let matches = Command::new("sondewatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Radiosonde tracker with descent and landing alerts")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .help("Print version information")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Settings file (defaults to the user config directory)")
                .global(true)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue)
                .global(true)
        )
        .subcommand(
            Command::new("run")
                .about("Listen for telemetry and send alerts")
                .arg(
                    Arg::new("listener")
                        .short('l')
                        .long("listener")
                        .value_name("KIND")
                        .help("Override the configured listener (udp, mqtt, web)")
                )
        )
        .subcommand(
            Command::new("config")
                .about("Manage the settings file")
                .subcommand_required(true)
                .subcommand(
                    Command::new("init")
                        .about("Write a default settings file")
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Overwrite an existing file")
                                .action(clap::ArgAction::SetTrue)
                        )
                )
                .subcommand(
                    Command::new("show")
                        .about("Print the effective settings")
                )
                .subcommand(
                    Command::new("path")
                        .about("Print the settings file location")
                )
        )
        .subcommand(
            Command::new("notify-test")
                .about("Send a sample alert to every enabled notification endpoint")
        )
        .subcommand(
            Command::new("simulate")
                .about("Broadcast synthetic PAYLOAD_SUMMARY packets over UDP")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Destination address")
                        .default_value("127.0.0.1")
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Destination port (defaults to the configured UDP port)")
                        .value_parser(clap::value_parser!(u16))
                )
                .arg(
                    Arg::new("callsign")
                        .long("callsign")
                        .value_name("SERIAL")
                        .help("Sonde serial to report")
                        .default_value("V2850795")
                )
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .help("Number of packets to send")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("60")
                )
                .arg(
                    Arg::new("interval-ms")
                        .short('i')
                        .long("interval-ms")
                        .value_name("MS")
                        .help("Delay between packets")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1000")
                )
                .arg(
                    Arg::new("start-altitude")
                        .long("start-altitude")
                        .value_name("METERS")
                        .help("Altitude of the first packet")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("1500")
                )
                .arg(
                    Arg::new("descent-rate")
                        .long("descent-rate")
                        .value_name("METERS")
                        .help("Altitude lost between packets")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("30")
                )
        )
        .subcommand(
            Command::new("version")
                .about("Shows version information")
        )
        .get_matches();

    sondewatch::init_logging(matches.get_flag("verbose"));

    if matches.get_flag("version") {
        return commands::version();
    }

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run(sub_matches)?,
        Some(("config", sub_matches)) => commands::config::handle(sub_matches)?,
        Some(("notify-test", sub_matches)) => commands::notify_test(sub_matches)?,
        Some(("simulate", sub_matches)) => commands::simulate(sub_matches)?,
        Some(("version", _)) => commands::version()?,
        _ => commands::run(&matches)?,
    }

    Ok(())
}
