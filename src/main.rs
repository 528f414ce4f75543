// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hostwarden::{
    config::EngineConfig,
    memory::{FleetSnapshot, InMemoryDnsStore, InMemoryFleet},
    metrics,
    naming::{HostnameKind, NamingConvention},
    notification::StateChangeNotification,
    providers::TokioSleeper,
    reconciler::Reconciler,
    types::Placement,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "hostwarden", version, about = "Hostname-driven private DNS reconciler")]
struct Cli {
    /// Path to YAML engine configuration. PRUNE and TEST environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile one state-change notification against a fleet snapshot
    Reconcile {
        /// YAML fleet snapshot (instances and private zones)
        #[arg(long)]
        fleet: PathBuf,

        /// JSON state-change notification
        #[arg(long)]
        event: PathBuf,

        /// Write the updated snapshot back to the fleet file
        #[arg(long)]
        write_back: bool,
    },

    /// Delete records sharing a hostname prefix whose address no live instance holds
    Prune {
        #[arg(long)]
        fleet: PathBuf,

        /// Hosted zone identifier
        #[arg(long)]
        zone: String,

        /// Full or partial hostname whose siblings are swept
        #[arg(long)]
        hostname: String,

        /// Placement, e.g. us-east-1a
        #[arg(long)]
        placement: Placement,

        #[arg(long)]
        write_back: bool,
    },

    /// Classify a hostname against the naming convention
    CheckHostname {
        hostname: String,

        #[arg(long)]
        placement: Placement,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HostnameCheck<'a> {
    hostname: &'a str,
    placement: &'a Placement,
    kind: HostnameKind,
    location_code: &'a str,
    checked_at: DateTime<Utc>,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("hostwarden")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (json|text).
    // Logs go to stderr; stdout carries the JSON result only.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();
    debug!(?cli, "Parsed command line");

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    }
    .with_env_overrides();

    let result = run(cli.command, config).await;

    if cli.print_metrics {
        eprintln!("{}", metrics::gather_metrics()?);
    }
    result
}

async fn run(command: Command, config: EngineConfig) -> Result<()> {
    match command {
        Command::Reconcile {
            fleet,
            event,
            write_back,
        } => reconcile(config, &fleet, &event, write_back).await,
        Command::Prune {
            fleet,
            zone,
            hostname,
            placement,
            write_back,
        } => prune(config, &fleet, &zone, &hostname, &placement, write_back).await,
        Command::CheckHostname {
            hostname,
            placement,
        } => check_hostname(&config, &hostname, &placement),
    }
}

async fn reconcile(
    config: EngineConfig,
    fleet_path: &Path,
    event_path: &Path,
    write_back: bool,
) -> Result<()> {
    let (fleet, store) = load_snapshot(fleet_path).await?.into_collaborators();
    let json = tokio::fs::read_to_string(event_path)
        .await
        .with_context(|| format!("Failed to read event file {}", event_path.display()))?;
    let notification = StateChangeNotification::from_json(&json)
        .with_context(|| format!("Invalid event file {}", event_path.display()))?;

    let reconciler = Reconciler::new(
        config,
        fleet.clone(),
        store.clone(),
        Arc::new(TokioSleeper),
    )?;

    match reconciler.handle_notification(&notification).await {
        Ok(outcome) => print_json(&outcome)?,
        Err(e) if e.is_soft() => {
            warn!(error = %e, "Change accepted but not observed as synchronized");
        }
        Err(e) => return Err(e).context("Reconciliation failed"),
    }

    if write_back {
        save_snapshot(fleet_path, &fleet, &store).await?;
    }
    Ok(())
}

async fn prune(
    config: EngineConfig,
    fleet_path: &Path,
    zone_id: &str,
    hostname: &str,
    placement: &Placement,
    write_back: bool,
) -> Result<()> {
    let (fleet, store) = load_snapshot(fleet_path).await?.into_collaborators();

    let Some(zone) = store
        .zones()
        .await
        .into_iter()
        .map(|z| z.zone)
        .find(|z| z.id == zone_id)
    else {
        bail!("Hosted zone {zone_id} not found in {}", fleet_path.display());
    };

    let reconciler = Reconciler::new(
        config,
        fleet.clone(),
        store.clone(),
        Arc::new(TokioSleeper),
    )?;
    let report = reconciler
        .pruner()
        .prune(&zone, hostname, placement)
        .await
        .context("Prune failed")?;
    print_json(&report)?;

    if write_back {
        save_snapshot(fleet_path, &fleet, &store).await?;
    }
    Ok(())
}

fn check_hostname(config: &EngineConfig, hostname: &str, placement: &Placement) -> Result<()> {
    let naming = NamingConvention::new(config.naming.clone())?;
    let kind = naming.classify(hostname, placement)?;
    let location_code = naming.location_code(placement)?;

    print_json(&HostnameCheck {
        hostname,
        placement,
        kind,
        location_code,
        checked_at: Utc::now(),
    })
}

async fn load_snapshot(path: &Path) -> Result<FleetSnapshot> {
    debug!(path = %path.display(), "Loading fleet snapshot");
    let yaml = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fleet snapshot {}", path.display()))?;
    FleetSnapshot::from_yaml_str(&yaml)
        .with_context(|| format!("Invalid fleet snapshot {}", path.display()))
}

async fn save_snapshot(
    path: &Path,
    fleet: &InMemoryFleet,
    store: &InMemoryDnsStore,
) -> Result<()> {
    let snapshot = FleetSnapshot {
        instances: fleet.instances().await,
        zones: store.zones().await,
    };
    tokio::fs::write(path, snapshot.to_yaml_string()?)
        .await
        .with_context(|| format!("Failed to write fleet snapshot {}", path.display()))?;
    info!(path = %path.display(), "Fleet snapshot written back");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
