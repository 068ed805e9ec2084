//! rts-ai CLI - headless skirmish runner.
//!
//! Single binary that provides:
//! - `rts-ai simulate` - run a seeded skirmish and summarise the decisions
//! - `rts-ai verify-replay` - run the same skirmish twice and compare decision digests
//! - `rts-ai show-config` - print the effective runtime configuration
//! - `rts-ai init` - write a starter configuration file

mod trees;
mod world;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rts_ai_core::TickContext;
use rts_ai_runtime::{BatchScheduler, PriorityTier, Registry, RuntimeConfig, SchedulerConfig};
use rts_ai_tools::{SharedTraceLog, TraceEvent, TraceLog};

use crate::world::{faction_of, unit_type_of, SkirmishWorld};

const STOCK_CONFIG: &str = r#"# rts-ai runtime configuration

scheduler:
  budget_ms: 2.0
  max_agents_per_tick: 64

wrapper:
  decision_key: action
  write_back: [target_id, target_pos, move_pos, patrol_index]

templates:
  - id: skirmish
    tree_type: skirmisher
  - id: faction2-defenders
    tree_type: defender
    faction: 2
  - id: medics
    tree_type: support
    unit_type: medic
    priority: 1
    defaults:
      rally_radius: { type: float, value: 6.0 }
"#;

#[derive(Parser)]
#[command(name = "rts-ai")]
#[command(about = "Deterministic behavior-tree skirmish runner", version)]
struct Cli {
    /// Runtime configuration file (YAML); the stock configuration when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a seeded skirmish
    Simulate {
        #[command(flatten)]
        run: RunArgs,

        /// Write the recorded trace log as JSON
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Run the same skirmish twice and compare decision digests
    VerifyReplay {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the effective configuration
    ShowConfig,

    /// Write the stock configuration to a file
    Init {
        #[arg(default_value = "rts-ai.yaml")]
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Number of agents to spawn
    #[arg(long, default_value_t = 120)]
    agents: u64,

    /// Number of scheduler ticks
    #[arg(long, default_value_t = 300)]
    ticks: u64,

    /// Global seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Simulated seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if cli.log_json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Simulate { run, trace }) => simulate(&config, &run, trace.as_deref()),
        Some(Commands::VerifyReplay { run }) => verify_replay(&config, &run),
        Some(Commands::ShowConfig) => {
            print!("{}", config.to_yaml_string()?);
            Ok(())
        }
        Some(Commands::Init { path }) => init_config(&path),
        None => {
            println!("rts-ai - deterministic behavior-tree skirmish runner");
            println!();
            println!("Usage: rts-ai <COMMAND>");
            println!();
            println!("Commands:");
            println!("  simulate       Run a seeded skirmish");
            println!("  verify-replay  Run twice and compare decision digests");
            println!("  show-config    Print the effective configuration");
            println!("  init           Write the stock configuration to a file");
            println!();
            println!("Run 'rts-ai --help' for more information.");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load(path),
        None => {
            RuntimeConfig::from_yaml_str(STOCK_CONFIG).context("stock configuration is invalid")
        }
    }
}

#[derive(Debug, Default)]
struct Outcome {
    log: TraceLog,
    decisions: BTreeMap<String, u64>,
    evaluations: u64,
    overruns: u64,
    passes: u64,
    fallbacks: usize,
}

fn run_skirmish(
    config: &RuntimeConfig,
    scheduler_config: SchedulerConfig,
    args: &RunArgs,
) -> Result<Outcome> {
    let mut registry = Registry::from_config(config);
    registry.set_global_seed(args.seed);
    trees::register_stock_trees(&mut registry);

    let log = SharedTraceLog::default();
    let mut scheduler = BatchScheduler::new(scheduler_config);
    scheduler.set_trace_sink(Some(Box::new(log.clone())));

    let mut outcome = Outcome::default();
    for unit in 1..=args.agents {
        let spawned = registry
            .create_wrapper(unit, faction_of(unit), unit_type_of(unit), None)
            .with_context(|| format!("spawning agent {unit}"))?;
        if spawned.diagnostic.is_some() {
            outcome.fallbacks += 1;
        }
        let tier = if unit_type_of(unit) == "medic" {
            PriorityTier::High
        } else {
            PriorityTier::Normal
        };
        scheduler.register(spawned.wrapper, tier);
    }

    let mut world = SkirmishWorld::generate(args.agents, args.seed);
    let mut tick = TickContext::new(0, args.dt);
    for _ in 0..args.ticks {
        let report = scheduler.tick(tick, &mut world);
        outcome.overruns += u64::from(report.budget_exceeded);
        for eval in &report.evaluated {
            outcome.evaluations += 1;
            let fingerprint = eval.decision.as_ref().map_or(0, |d| d.fingerprint());
            log.borrow_mut().push(
                TraceEvent::new(tick.tick, "agent.decision")
                    .with_agent(eval.unit)
                    .with_a(eval.status.code())
                    .with_b(fingerprint),
            );
            if let Some(decision) = &eval.decision {
                *outcome.decisions.entry(decision.to_string()).or_default() += 1;
            }
        }
        world.step(args.dt);
        tick = tick.next();
    }

    outcome.passes = scheduler.passes();
    outcome.log = log.borrow().clone();
    Ok(outcome)
}

fn simulate(config: &RuntimeConfig, args: &RunArgs, trace: Option<&Path>) -> Result<()> {
    tracing::info!(
        agents = args.agents,
        ticks = args.ticks,
        seed = args.seed,
        "Starting skirmish"
    );

    let outcome = run_skirmish(config, config.scheduler.clone(), args)?;

    println!("Skirmish summary");
    println!("================");
    println!();
    println!("Agents: {} ({} on fallback trees)", args.agents, outcome.fallbacks);
    println!("Ticks: {}", args.ticks);
    println!("Evaluations: {}", outcome.evaluations);
    println!("Full passes: {}", outcome.passes);
    println!("Budget overruns: {}", outcome.overruns);
    println!();
    println!("Decisions:");
    for (decision, count) in &outcome.decisions {
        println!("  {decision:<10} {count}");
    }
    println!();
    println!("Decision digest: {:016x}", decision_log(&outcome.log).digest());

    if let Some(path) = trace {
        let json = serde_json::to_string_pretty(&outcome.log)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write trace to {}", path.display()))?;
        tracing::info!(path = %path.display(), events = outcome.log.len(), "Trace written");
    }
    Ok(())
}

/// Only decisions are compared: budget events depend on wall-clock time.
fn decision_log(log: &TraceLog) -> TraceLog {
    TraceLog {
        events: log.with_tag("agent.decision").cloned().collect(),
    }
}

fn verify_replay(config: &RuntimeConfig, args: &RunArgs) -> Result<()> {
    let pacing = SchedulerConfig::unbounded(config.scheduler.max_agents_per_tick);
    let first = decision_log(&run_skirmish(config, pacing.clone(), args)?.log);
    let second = decision_log(&run_skirmish(config, pacing, args)?.log);

    if first != second {
        let diverged = first
            .events
            .iter()
            .zip(&second.events)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| first.len().min(second.len()));
        bail!(
            "replay diverged at event {diverged}: {:016x} != {:016x}",
            first.digest(),
            second.digest()
        );
    }

    println!(
        "Replay verified: {} decisions, digest {:016x}",
        first.len(),
        first.digest()
    );
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::write(path, STOCK_CONFIG)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!("Wrote stock configuration to {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Add templates under `templates:`");
    println!("  2. Run: rts-ai --config {} simulate", path.display());
    Ok(())
}
