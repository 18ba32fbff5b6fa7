//! AmbiTrack Simulator CLI
//!
//! Run the disambiguation engine over seeded synthetic events.

use ambitrack_core::MatchingConfig;
use ambitrack_sim::{ScenarioId, ScenarioResult, ScenarioRunner, SimError};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// AmbiTrack synthetic-event validation CLI
#[derive(Parser, Debug)]
#[command(name = "ambitrack-sim")]
#[command(about = "Validate track disambiguation on synthetic events", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Scenario to run (clean_tracks, ghost_storm, crossing_pair, noise_flood, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Events generated per scenario
    #[arg(short, long, default_value = "10")]
    events: usize,

    /// JSON file with matching tolerances
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export per-event results to a JSON file (single scenario only)
    #[arg(long)]
    export: Option<String>,
}

fn load_config(path: Option<&str>) -> Result<MatchingConfig, SimError> {
    let config = match path {
        Some(path) => MatchingConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => MatchingConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<Vec<ScenarioResult>, SimError> {
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().map_err(SimError::scenario)?]
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        return Err(SimError::scenario(
            "--export only supports a single scenario and seed",
        ));
    }

    let config = load_config(args.config.as_deref())?;

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let mut results = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed)
            .with_events(args.events)
            .with_config(config.clone())?;

        for scenario in &scenarios {
            let result = runner.run(*scenario)?;

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if let Some(path) = &args.export {
                result.export.write_to_file(path)?;
                info!("Exported {} events to {}", result.export.events.len(), path);
            }

            results.push(result);
        }
    }

    Ok(results)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("AmbiTrack Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let all_results = match run(&args) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error: {}", e);
            if matches!(e, SimError::Scenario(_)) {
                eprintln!("Available scenarios: clean_tracks, ghost_storm, crossing_pair, noise_flood, all");
            }
            std::process::exit(1);
        }
    };

    let total = all_results.len();
    let failed_count = all_results.iter().filter(|r| !r.passed).count();

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "events": r.events,
                    "ghost_rate": r.summary.ghost_rate(),
                    "duplicate_rate": r.summary.duplicate_rate(),
                    "mean_purity": r.summary.mean_purity(),
                    "mean_match_fraction": r.summary.mean_match_fraction(),
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            // List failed seeds
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
