//! Director CLI - drives the frame-budgeted AI director over a synthetic realm.
//!
//! - `director run` - populate a world, run N frames, print the performance report
//! - `director config` - print the effective configuration as YAML

mod demo;
mod events;
mod rng;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ai_core::{EntityId, Outbound};
use ai_director::{Director, DirectorConfig};
use ai_tools::SharedTraceLog;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use demo::{CharacterMind, CouncilMind, DemoWorld, NationMind, HARVEST, RUMOR, TENSION};
use events::EventEmitter;
use rng::SplitMix64;

/// Simulated seconds per frame.
const FRAME_DT: f32 = 1.0 / 60.0;
/// Frames between removals of a random character entity.
const REMOVAL_INTERVAL: u64 = 40;
/// Frames between orphan sweeps.
const REAP_INTERVAL: u64 = 25;

#[derive(Parser)]
#[command(name = "director")]
#[command(about = "Frame-budgeted AI director harness", version)]
struct Cli {
    /// Director configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the director over a synthetic world
    Run(RunArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Frames to process
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Nation agents (one realm entity each)
    #[arg(long, default_value_t = 8)]
    nations: usize,

    /// Character agents (one person entity each)
    #[arg(long, default_value_t = 64)]
    characters: usize,

    /// Council agents, attached to realms round-robin
    #[arg(long, default_value_t = 4)]
    councils: usize,

    /// Seed for every random decision in the run
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Append per-frame events to this JSONL file
    #[arg(long)]
    events: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run(config, args),
        Commands::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DirectorConfig> {
    match path {
        Some(path) => DirectorConfig::load(path)
            .with_context(|| format!("loading director config from {}", path.display())),
        None => Ok(DirectorConfig::default()),
    }
}

struct Population {
    realms: Vec<EntityId>,
    people: Vec<EntityId>,
}

fn populate(
    director: &mut Director<DemoWorld>,
    world: &mut DemoWorld,
    args: &RunArgs,
) -> Result<Population> {
    let mut population = Population {
        realms: Vec::with_capacity(args.nations),
        people: Vec::with_capacity(args.characters),
    };
    let mut stream = 0u64;
    let mut next_stream = || {
        stream += 1;
        SplitMix64::for_stream(args.seed, stream)
    };

    for _ in 0..args.nations {
        let realm = world.spawn_entity();
        let id = director.create_agent(Some(realm), Box::new(NationMind::new(next_stream())), world)?;
        director.subscribe(id, RUMOR)?;
        director.subscribe(id, HARVEST)?;
        population.realms.push(realm);
    }

    for i in 0..args.councils {
        // Councils sit on an existing realm; extra councils get a realm of their own.
        let realm = match population.realms.get(i) {
            Some(&realm) => realm,
            None => world.spawn_entity(),
        };
        let id = director.create_agent(Some(realm), Box::new(CouncilMind::new()), world)?;
        director.subscribe(id, TENSION)?;
    }

    for _ in 0..args.characters {
        let person = world.spawn_entity();
        director.create_agent(
            Some(person),
            Box::new(CharacterMind::new(next_stream())),
            world,
        )?;
        population.people.push(person);
    }

    Ok(population)
}

/// Send one harvest report per realm from a worker thread, the way an off-thread economy
/// system would.
fn send_harvest(director: &Director<DemoWorld>, realms: &[EntityId], seed: u64) -> Result<usize> {
    let injector = director.injector();
    let realms = realms.to_vec();
    let worker = std::thread::spawn(move || {
        let mut rng = SplitMix64::for_stream(seed, u64::MAX);
        for realm in &realms {
            let report = json!({ "realm": realm.0, "yield": 10 + rng.below(50) });
            injector.send(Outbound::to_topic(HARVEST, report))?;
        }
        Ok::<usize, ai_director::InboundClosed>(realms.len())
    });
    let sent = worker
        .join()
        .map_err(|_| anyhow!("harvest worker panicked"))??;
    Ok(sent)
}

fn run(config: DirectorConfig, args: RunArgs) -> Result<()> {
    tracing::info!(
        frames = args.frames,
        nations = args.nations,
        characters = args.characters,
        councils = args.councils,
        seed = args.seed,
        "Starting director run"
    );

    let mut director: Director<DemoWorld> =
        Director::new(config).context("invalid director configuration")?;
    let trace = SharedTraceLog::new();
    director.set_trace_sink(Box::new(trace.clone()));
    director.start()?;

    let mut events = args
        .events
        .as_deref()
        .map(EventEmitter::create)
        .transpose()?;

    let mut world = DemoWorld::new();
    let mut population = populate(&mut director, &mut world, &args)?;
    let harvest = send_harvest(&director, &population.realms, args.seed)?;
    tracing::info!(agents = director.agent_count(), harvest, "World populated");

    if let Some(events) = events.as_mut() {
        events.emit_simple(
            "run_started",
            None,
            "director run started",
            json!({
                "seed": args.seed,
                "agents": director.agent_count(),
                "entities": world.entity_count(),
            }),
        )?;
    }

    let mut rng = SplitMix64::new(args.seed);
    let mut boundary_topics: BTreeMap<String, usize> = BTreeMap::new();

    for i in 0..args.frames {
        let report = director.process_frame(FRAME_DT, &mut world);
        if let Some(events) = events.as_mut() {
            events.emit_frame(&report)?;
        }
        if report.stopped {
            break;
        }

        for message in director.drain_boundary() {
            if let Some(topic) = message.topic() {
                *boundary_topics.entry(topic.to_string()).or_default() += 1;
            }
        }

        if i > 0 && i % REMOVAL_INTERVAL == 0 && !population.people.is_empty() {
            let index = rng.below(population.people.len() as u64) as usize;
            let person = population.people.swap_remove(index);
            world.remove_entity(person);
            tracing::debug!(frame = i, entity = person.0, "Removed character entity");
            if let Some(events) = events.as_mut() {
                events.emit_simple(
                    "entity_removed",
                    Some(i),
                    format!("removed {person}"),
                    json!({ "entity": person.0 }),
                )?;
            }
        }

        if i % REAP_INTERVAL == REAP_INTERVAL - 1 {
            let reaped = director.reap_orphans(&world);
            if !reaped.is_empty() {
                tracing::info!(frame = i, reaped = reaped.len(), "Reaped orphaned agents");
                if let Some(events) = events.as_mut() {
                    let ids: Vec<u32> = reaped.iter().map(|id| id.0).collect();
                    events.emit_simple(
                        "orphans_reaped",
                        Some(i),
                        format!("reaped {} agents", ids.len()),
                        json!({ "agents": ids }),
                    )?;
                }
            }
        }
    }

    for line in director.performance_report() {
        println!("{line}");
    }

    println!();
    println!("Boundary topics:");
    for (topic, count) in &boundary_topics {
        println!("  {topic}: {count}");
    }

    println!();
    println!("Trace events:");
    for tag in [
        "director.service",
        "director.defer",
        "director.evict",
        "director.fault",
        "director.starve",
    ] {
        println!("  {tag}: {}", trace.count(tag));
    }

    println!();
    println!("Treasuries:");
    for realm in &population.realms {
        println!("  {realm}: {}", world.treasury(*realm));
    }

    let metrics = director.metrics();
    if let Some(events) = events.as_mut() {
        events.emit_simple(
            "run_complete",
            Some(director.frame()),
            metrics.summary(),
            serde_json::to_value(&metrics)?,
        )?;
        events.flush()?;
    }

    director.stop()?;
    tracing::info!(summary = %metrics.summary(), "Director run complete");
    Ok(())
}
