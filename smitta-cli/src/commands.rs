use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use smitta_config::SmittaConfig;
use smitta_controller::{load_schedule, ControllerSettings, TrafficController};
use smitta_core::time::SimTime;
use smitta_export::ResultExporter;
use smitta_simulator::topology::build_network;
use smitta_telemetry::logging::EventLogger;
use smitta_telemetry::metrics::MetricsRecorder;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an infection scenario
    Run(RunArgs),
    /// Validate an infection document
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Configuration file; defaults to config/smitta.yaml and SMITTA_* variables
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Infection document, overrides `infection.file_path`
    #[arg(short, long)]
    pub infection_file: Option<PathBuf>,
    /// Simulated time limit in seconds
    #[arg(long)]
    pub until: Option<f64>,
    /// Rewrite the traffic of infected nodes
    #[arg(long)]
    pub enable_traffic_mod: bool,
    /// Export result vectors when the run ends
    #[arg(long)]
    pub export: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    pub file: PathBuf,
    /// Instant (seconds) every activation time must lie after
    #[arg(long, default_value_t = 0.0)]
    pub now: f64,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check(args) => {
            EventLogger::init();
            check(&args)
        }
    }
}

fn load_config(args: &RunArgs) -> anyhow::Result<SmittaConfig> {
    let mut config = match &args.config {
        Some(path) => SmittaConfig::load_from_path(path)?,
        None => SmittaConfig::load()?,
    };
    if let Some(file) = &args.infection_file {
        config.infection.file_path = file.clone();
    }
    if let Some(until) = args.until {
        config.simulation.sim_time_limit_s = Some(until);
    }
    if args.enable_traffic_mod {
        config.traffic.enable_traffic_mod = true;
    }
    if args.export {
        config.export.enabled = true;
    }
    Ok(config)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    EventLogger::init_with_level(&config.telemetry.log_level);

    let limit = config
        .simulation
        .time_limit()
        .context("invalid simulated time limit")?;
    let mut sim = build_network(&config).context("building network")?;
    let settings = ControllerSettings::from_config(&config)?;
    let controller = sim.add_module("trafficController", Box::new(TrafficController::new(settings)));

    let metrics = config.telemetry.metrics.then(MetricsRecorder::new);
    if let Some(metrics) = &metrics {
        sim.with_metrics(metrics.clone());
    }
    let export_status = config.export.enabled.then(|| {
        let exporter = ResultExporter::from_config(&config);
        let status = exporter.status();
        sim.add_lifecycle_listener(Box::new(exporter));
        status
    });

    let clock = sim.clock();
    let progress = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!(sim_time = %clock.now(), "Simulation progress");
        }
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let summary = sim.run(limit);
        (sim, summary)
    })
    .await;
    progress.abort();
    let (sim, summary) = outcome?;
    let summary = summary?;

    let controller = sim
        .module::<TrafficController>(controller)
        .context("traffic controller missing after run")?;
    println!(
        "Run finished at {} after {} events (fingerprint {})",
        summary.end_time, summary.events_processed, summary.fingerprint
    );
    println!(
        "Infections: {} scheduled, {} fired, {} reconfigured, {} attack apps",
        controller.scheduled_count(),
        controller.infected_count(),
        controller.reconfigured_count(),
        controller.spawned().len()
    );
    if let Some(path) = &summary.result_file {
        println!("Result vectors: {}", path.display());
    }
    if let Some(status) = export_status {
        if let Some(status) = status.lock().as_ref() {
            println!("Export: {:?}", status);
        }
    }
    if let Some(metrics) = metrics.filter(|_| config.telemetry.print_metrics) {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

fn check(args: &CheckArgs) -> anyhow::Result<()> {
    let schedule = load_schedule(&args.file)?;
    let now = SimTime::from_secs_f64(args.now)?;
    if let Some(entry) = schedule.iter().find(|entry| entry.activation_time <= now) {
        bail!(
            "infection of node {} at {} is not after {}",
            entry.node_id,
            entry.activation_time,
            now
        );
    }

    let first = schedule.iter().map(|entry| entry.activation_time).min();
    let last = schedule.iter().map(|entry| entry.activation_time).max();
    match (first, last) {
        (Some(first), Some(last)) => println!(
            "{}: {} infection entries between {} and {}",
            args.file.display(),
            schedule.len(),
            first,
            last
        ),
        _ => println!("{}: no infection entries", args.file.display()),
    }
    Ok(())
}
