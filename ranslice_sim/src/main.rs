//! RanSlice Simulator CLI
//!
//! Run the allocation engine over simulated episodes, or drive real radios
//! through the file-based artifact exchange.

use clap::Parser;
use ranslice_core::{CoreError, DomainConfig};
use ranslice_env::{FileExchange, SystemContext};
use ranslice_sim::scenarios::ScenarioId;
use ranslice_sim::{EpisodeExport, EpisodeResult, EpisodeRunner, LiveDriver, SimConfig, SimWorld};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// RanSlice PRB allocation simulator
#[derive(Parser, Debug)]
#[command(name = "ranslice-sim")]
#[command(about = "Simulate interference-coupled PRB allocation across network slices", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (reference, anchor_mmtc, urllc_virtual, fine_grained, all)
    #[arg(short = 'S', long, default_value = "reference")]
    scenario: String,

    /// Number of episodes per scenario
    #[arg(short, long, default_value = "1")]
    episodes: u64,

    /// Steps per episode (intervals in live mode)
    #[arg(long, default_value = "100")]
    episode_len: u64,

    /// Override the action space PRB step
    #[arg(long)]
    step_size: Option<u32>,

    /// Load the domain configuration from a JSON file
    #[arg(long)]
    config: Option<String>,

    /// Print the effective domain configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Export per-step history to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Drive real radios through the artifact files instead of simulating
    #[arg(long)]
    live: bool,

    /// Allocation artifact rewritten every interval
    #[arg(long, default_value = "slice_allocation.json")]
    alloc_path: String,

    /// Measurement artifact written by the radio controller
    #[arg(long, default_value = "slice_measurements.json")]
    measurement_path: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn domain_config(args: &Args, scenario: ScenarioId) -> Result<DomainConfig, CoreError> {
    let mut config = match &args.config {
        Some(path) => DomainConfig::from_json_file(path)?,
        None => scenario.domain_config(),
    };
    if let Some(step) = args.step_size {
        config.action_step = step;
    }
    config.validate()?;
    Ok(config)
}

fn run_live(args: &Args, scenario: ScenarioId) -> Result<(), CoreError> {
    let config = domain_config(args, scenario)?;
    let world = SimWorld::new(config, SystemContext::shared())?;
    let exchange = FileExchange::new(&args.alloc_path, &args.measurement_path);
    let mut driver = LiveDriver::new(world, exchange);

    info!(
        "Live mode: publishing to {}, reading {}",
        args.alloc_path, args.measurement_path
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ranslice_env::EnvError::from)?;
    let metrics = runtime.block_on(driver.run(args.episode_len))?;

    info!(
        "Live run done: {} intervals, total reward {:.3}, mean {:.4}",
        metrics.steps,
        metrics.total_reward,
        metrics.mean_reward()
    );
    Ok(())
}

fn run_simulated(
    args: &Args,
    scenario: ScenarioId,
    seed: u64,
) -> Result<(Vec<EpisodeResult>, EpisodeExport), CoreError> {
    let config = SimConfig {
        seed,
        episodes: args.episodes,
        episode_len: args.episode_len,
        ..Default::default()
    };
    EpisodeRunner::new(config)
        .with_domain(domain_config(args, scenario)?)
        .with_history(args.export.is_some())
        .with_allocation_path(&args.alloc_path)
        .run(scenario)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!(
                "Available scenarios: {}, all",
                ScenarioId::all().iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
            );
            std::process::exit(1);
        })]
    };

    if args.print_config {
        match domain_config(&args, scenarios[0]).and_then(|c| c.to_json_pretty()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.live {
        if scenarios.len() > 1 {
            eprintln!("Error: --live only supports a single scenario, not 'all'");
            std::process::exit(1);
        }
        if let Err(e) = run_live(&args, scenarios[0]) {
            error!("Live run failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if args.export.is_some() && scenarios.len() > 1 {
        eprintln!("Error: --export only supports a single scenario, not 'all'");
        std::process::exit(1);
    }

    // Determine base seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if !args.json {
        info!("RanSlice Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut all_results: Vec<EpisodeResult> = Vec::new();

    for scenario in &scenarios {
        let (results, export) = match run_simulated(&args, *scenario, seed) {
            Ok(out) => out,
            Err(e) => {
                error!("✗ {} (seed={}) FAILED: {}", scenario.name(), seed, e);
                std::process::exit(1);
            }
        };

        if !args.json {
            for r in &results {
                info!(
                    "✓ {} episode {} (seed={}): total={:.3} mean={:.4} min={:.3} max={:.3} floor={}",
                    scenario.name(),
                    r.episode,
                    seed,
                    r.metrics.total_reward,
                    r.metrics.mean_reward(),
                    r.metrics.min_reward,
                    r.metrics.max_reward,
                    r.metrics.floor_engagements
                );
            }
        }

        if let Some(path) = &args.export {
            if let Err(e) = export.write_to_file(path) {
                error!("Failed to write export: {:?}", e);
                std::process::exit(1);
            }
            info!("Exported {} steps to {}", export.steps.len(), path);
        }

        all_results.extend(results);
    }

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "seed": seed,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "episode": r.episode,
                    "steps": r.metrics.steps,
                    "total_reward": r.metrics.total_reward,
                    "mean_reward": r.metrics.mean_reward(),
                    "min_reward": r.metrics.min_reward,
                    "max_reward": r.metrics.max_reward,
                    "floor_engagements": r.metrics.floor_engagements,
                    "time_secs": r.final_time_secs,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to encode summary: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("✅ {} episode runs completed", all_results.len());
    }
}
