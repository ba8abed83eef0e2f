//! Holter monitor command line
//!
//! Records a session from the wearable's UDP stream or from the built-in
//! simulator into `<output>/Session_<timestamp>/`.
//!
//! Usage:
//!   holter-monitor run --bind 0.0.0.0:55000
//!   holter-monitor simulate --duration 60 --burst 20:5
//!   holter-monitor print-config --config holter.toml

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use holter_core::config::{ConfigLoader, SystemConfig};
use holter_core::hal::simulation::{MotionBurst, SimulationConfig};
use holter_core::hal::FrameSource;
use holter_core::{CsvFilteredSink, CsvRawSink, HolterSession, HolterSimulator, SessionPaths, SessionReport, UdpFrameSource};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "holter-monitor", version, about = "Motion-adaptive ECG Holter recorder")]
struct Cli {
    /// Configuration file merged on top of the discovered ones
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Session output directory, overrides `output.directory`
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the device's UDP stream
    Run(RunArgs),
    /// Record a synthetic stream with motion bursts
    Simulate(SimulateArgs),
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Listen address, overrides `acquisition.udp_bind_addr`
    #[arg(long)]
    bind: Option<String>,

    /// Stop after this many seconds; runs until killed otherwise
    #[arg(long)]
    duration: Option<u64>,
}

#[derive(Args)]
struct SimulateArgs {
    /// Length of the synthetic recording in seconds
    #[arg(long, default_value_t = 60)]
    duration: u64,

    /// Motion burst as START:LEN in seconds, repeatable
    #[arg(long = "burst", value_parser = parse_burst)]
    bursts: Vec<(u64, u64)>,

    #[arg(long)]
    seed: Option<u64>,

    /// Pace frames at the configured sample rate instead of as fast as possible
    #[arg(long)]
    realtime: bool,
}

fn parse_burst(value: &str) -> Result<(u64, u64), String> {
    let (start, len) = value
        .split_once(':')
        .ok_or_else(|| format!("expected START:LEN, got '{value}'"))?;
    let start = start.parse().map_err(|_| format!("invalid burst start '{start}'"))?;
    let len = len.parse().map_err(|_| format!("invalid burst length '{len}'"))?;
    Ok((start, len))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(directory) = cli.output {
        config.output.directory = directory;
    }

    match cli.command {
        Command::Run(args) => run_udp(config, args),
        Command::Simulate(args) => run_simulation(config, args),
        Command::PrintConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(explicit: Option<&PathBuf>) -> anyhow::Result<SystemConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = explicit {
        loader = loader.with_file(path);
    }
    loader.load_system_config().context("loading configuration")
}

fn run_udp(mut config: SystemConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.acquisition.udp_bind_addr = bind;
    }
    let source = UdpFrameSource::bind(
        &config.acquisition.udp_bind_addr,
        Duration::from_millis(config.acquisition.recv_timeout_ms),
        config.system.sample_rate_hz,
    )?;

    record(config, source, args.duration.map(Duration::from_secs))
}

fn run_simulation(config: SystemConfig, args: SimulateArgs) -> anyhow::Result<()> {
    let rate = u64::from(config.system.sample_rate_hz);
    let total_samples = args.duration * rate;
    if total_samples == 0 {
        bail!("simulation duration must be at least one second");
    }

    let mut simulation = SimulationConfig {
        sample_rate_hz: config.system.sample_rate_hz,
        total_samples: Some(total_samples),
        realtime: args.realtime,
        announce_ready: true,
        ..SimulationConfig::default()
    };
    if let Some(seed) = args.seed {
        simulation.seed = seed;
    }
    for (start, len) in args.bursts {
        if start * rate >= total_samples {
            warn!(start_s = start, "Burst starts after the end of the recording");
        }
        simulation.artifacts.bursts.push(MotionBurst::new(start * rate, len * rate));
    }

    let source = HolterSimulator::new(simulation)?;
    record(config, source, None)
}

fn record<S: FrameSource + 'static>(config: SystemConfig, source: S, limit: Option<Duration>) -> anyhow::Result<()> {
    let paths = SessionPaths::create(&config.output)?;
    let raw_sink = CsvRawSink::create(&paths.raw)?;
    let filtered_sink = CsvFilteredSink::create(&paths.filtered)?;

    let session = HolterSession::new(config)?;
    if let Some(limit) = limit {
        let stop = session.stop_handle();
        thread::spawn(move || {
            thread::sleep(limit);
            info!(seconds = limit.as_secs(), "Recording time limit reached");
            stop.request_stop();
        });
    }

    let report = session.run(source, raw_sink, filtered_sink)?;
    report.write(&paths.report)?;
    print_summary(&paths, &report);
    Ok(())
}

fn print_summary(paths: &SessionPaths, report: &SessionReport) {
    println!("Session saved to {}", paths.directory.display());
    println!("  raw frames:      {}", report.sinks.raw_frames_written);
    println!("  filtered frames: {}", report.sinks.filtered_frames_written);
    println!("  windows:         {}", report.sinks.windows_processed);
    println!("  anomalies:       {}", report.ingest.anomalies.total());
    println!("  frames shed:     {}", report.ingest.frames_shed);
    if !report.gaps.is_empty() {
        println!("  unfiltered gaps: {} ({} frames)", report.gaps.len(), report.frames_in_gaps());
    }
    if let Some(error) = &report.filter_error {
        println!("  filter stopped:  {error}");
    }
}
