//! dl1dh CLI binary.
//!
//! Inspects DL1 data handler files: instrument summary, run header and a
//! per-event listing.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::redundant_closure_for_method_calls
)]

use clap::{Parser, Subcommand};

use dl1dh_core::ArrayEvent;
use dl1dh_io::{Dl1EventSource, SourceConfig, SourceRegistry, DL1DH_SOURCE};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("DL1 I/O error: {0}")]
    Dl1Io(#[from] dl1dh_io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid telescope list '{0}'")]
    TelescopeList(String),
}

/// Reader for DL1 Cherenkov telescope event files.
#[derive(Parser)]
#[command(name = "dl1dh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (repeat for debug logging)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the subarray, run header and event count of a DL1 file
    Info {
        /// Input DL1 file
        input: PathBuf,
    },

    /// List the events of a DL1 file
    Events {
        /// Input DL1 file
        input: PathBuf,

        /// Only keep these telescopes (comma separated ids)
        #[arg(long)]
        allowed_tels: Option<String>,

        /// Stop after this many events
        #[arg(long)]
        max_events: Option<usize>,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    logger_builder(cli.verbose, std::env::var("RUST_LOG").ok().as_deref()).init();

    if let Err(e) = run(cli.command) {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn level_for(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

/// `-v` sets the default level; `filters` (the `RUST_LOG` syntax) are
/// applied afterwards and win.
fn logger_builder(verbose: u8, filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_for(verbose));
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    builder
}

fn run(command: Commands) -> Result<()> {
    dl1dh_io::require_hdf5()?;
    let registry = SourceRegistry::with_builtin();

    match command {
        Commands::Info { input } => {
            let stdout = std::io::stdout();
            write_info(&mut stdout.lock(), &input)?;
        }

        Commands::Events {
            input,
            allowed_tels,
            max_events,
            json,
        } => {
            let mut config = SourceConfig::default();
            if let Some(list) = allowed_tels {
                config = config.with_allowed_tels(parse_tel_list(&list)?);
            }
            if let Some(max) = max_events {
                config = config.with_max_events(max);
            }
            log::info!("reading {} with {:?}", input.display(), config);

            for event in registry.open(DL1DH_SOURCE, &input, config)? {
                let event = event?;
                if json {
                    println!("{}", serde_json::to_string(&event_json(&event))?);
                } else {
                    println!("{}", event_line(&event));
                }
            }
        }
    }

    Ok(())
}

/// Summary of a file read from its tables and attributes, without
/// iterating the events.
fn write_info(out: &mut impl Write, input: &Path) -> Result<()> {
    let source = Dl1EventSource::open(input)?;

    writeln!(out, "File: {}", input.display())?;
    writeln!(out, "Origin: {}", source.meta().origin)?;
    writeln!(out, "Events: {}", source.num_events()?)?;
    writeln!(out)?;

    let subarray = source.read_subarray()?;
    writeln!(
        out,
        "Subarray '{}': {} telescopes",
        subarray.name,
        subarray.num_tels()
    )?;
    for tel_type in subarray.tel_types() {
        let ids = subarray.tel_ids_for_type(tel_type);
        writeln!(out, "  {:<24} {:>4} tels  {:?}", tel_type, ids.len(), ids)?;
    }
    writeln!(out)?;

    let header = source.read_mc_header();
    writeln!(out, "MC header: {} keys", header.len())?;
    for (key, value) in header.iter() {
        writeln!(out, "  {:<28} {}", key, value)?;
    }
    let missing: Vec<&str> = header.missing_keys().collect();
    if !missing.is_empty() {
        writeln!(out, "  missing: {}", missing.join(", "))?;
    }
    Ok(())
}

fn parse_tel_list(list: &str) -> Result<Vec<u32>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| CliError::TelescopeList(list.to_string()))
        })
        .collect()
}

fn event_line(event: &ArrayEvent) -> String {
    let tels: Vec<String> = event.tels_with_data.iter().map(|t| t.to_string()).collect();
    let charge: f64 = event.dl1.values().map(|img| img.total_charge()).sum();
    format!(
        "#{:<6} obs {} event {:<10} E={:.3}  tels [{}]  charge {:.1}",
        event.count,
        event.obs_id,
        event.event_id,
        event.mc.energy,
        tels.join(","),
        charge
    )
}

fn event_json(event: &ArrayEvent) -> serde_json::Value {
    let tels: serde_json::Map<String, serde_json::Value> = event
        .dl1
        .iter()
        .map(|(tel_id, img)| {
            (
                tel_id.to_string(),
                serde_json::json!({
                    "num_pixels": img.num_pixels(),
                    "total_charge": img.total_charge(),
                }),
            )
        })
        .collect();

    serde_json::json!({
        "count": event.count,
        "obs_id": event.obs_id,
        "event_id": event.event_id,
        "tels_with_data": event.tels_with_data,
        "mc": event.mc,
        "energy_gev": event.mc.energy.to_gev(),
        "alt_deg": event.mc.alt.to_degrees(),
        "az_deg": event.mc.az.to_degrees(),
        "dl1": tels,
    })
}
