//! Colony Jobs - demo driver
//!
//! Seeds a small colony in a simulated world and runs the job engine over it
//! for a number of ticks, printing what every worker was assigned.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use colony_jobs::core::config::EngineConfig;
use colony_jobs::core::error::Result;
use colony_jobs::core::types::{Position, ZoneId};
use colony_jobs::memory::store::{InMemoryZoneStore, ZoneStore};
use colony_jobs::memory::zone_state::{ZoneCounters, ZoneState};
use colony_jobs::policy::capabilities::{Role, RoleCapabilities};
use colony_jobs::simulation::tick::{JobEngine, TickEvent};
use colony_jobs::world::entity::{
    ControllerState, EntityBody, EntityKind, ResourceKind, Store, WorkerBody,
};
use colony_jobs::world::sim::{structure, SimWorld};

/// Run the job engine over a seeded demo colony
#[derive(Parser, Debug)]
#[command(name = "colony-jobs")]
#[command(about = "Drive a simulated colony through the job catalog and assignment engine")]
struct Args {
    /// Random seed for deterministic object ids
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Number of ticks to run
    #[arg(long, default_value_t = 20)]
    ticks: u64,

    /// Engine configuration (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Role capability table (TOML); built-in defaults when omitted
    #[arg(long)]
    capabilities: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    zone: String,
    counters: ZoneCounters,
}

fn seed_colony(world: &mut SimWorld) -> ZoneId {
    let home = world.add_zone("W1N1");
    let remote = world.add_zone("W2N1");
    world.connect(&home, &remote);

    world.spawn(
        Position::new(home.clone(), 25, 25),
        EntityBody::Controller(ControllerState::owned(3)),
    );
    world.spawn(
        Position::new(home.clone(), 10, 10),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    world.spawn(
        Position::new(home.clone(), 40, 12),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    world.spawn(
        Position::new(home.clone(), 11, 11),
        structure(EntityKind::Container, 250_000, 250_000, Some(Store::new(2000))),
    );
    world.spawn(
        Position::new(home.clone(), 20, 30),
        structure(
            EntityKind::Spawn,
            5000,
            5000,
            Some(Store::new(300).with(ResourceKind::Energy, 120)),
        ),
    );
    for x in [18, 19, 21, 22] {
        world.spawn(
            Position::new(home.clone(), x, 32),
            structure(EntityKind::Extension, 1000, 1000, Some(Store::new(50))),
        );
    }
    world.spawn(
        Position::new(home.clone(), 24, 28),
        structure(
            EntityKind::Tower,
            3000,
            3000,
            Some(Store::new(1000).with(ResourceKind::Energy, 300)),
        ),
    );
    world.spawn(
        Position::new(home.clone(), 30, 30),
        EntityBody::ConstructionSite {
            structure: EntityKind::Road,
            progress: 0,
            progress_total: 300,
        },
    );
    world.spawn(
        Position::new(home.clone(), 15, 20),
        EntityBody::DroppedResource {
            resource: ResourceKind::Energy,
            amount: 400,
        },
    );

    let crew = [
        ("miner-1", Role::Miner, (5, 1, 0), (12, 12)),
        ("harvester-1", Role::Harvester, (2, 2, 0), (20, 28)),
        ("worker-1", Role::Worker, (2, 2, 0), (22, 26)),
        ("lorry-1", Role::Lorry, (0, 4, 0), (14, 18)),
        ("scout-1", Role::Scout, (0, 0, 0), (25, 26)),
    ];
    for (name, role, (work, carry, claim), (x, y)) in crew {
        let body = WorkerBody::new(name, role, home.clone()).with_parts(work, carry, claim);
        world.spawn(Position::new(home.clone(), x, y), EntityBody::Worker(body));
    }
    home
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("colony_jobs=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let capabilities = match &args.capabilities {
        Some(path) => RoleCapabilities::load(path)?,
        None => RoleCapabilities::default(),
    };

    let mut world = SimWorld::new(args.seed).with_sign_text(config.signing_text.clone());
    let home = seed_colony(&mut world);

    let mut store = InMemoryZoneStore::new();
    store.put(
        &home,
        &ZoneState {
            miner_limit: 1,
            ..ZoneState::default()
        },
    )?;

    let mut engine = JobEngine::new(config, store)?.with_capabilities(capabilities);
    engine.manage_zone(home.clone());
    tracing::info!(seed = args.seed, ticks = args.ticks, zone = %home, "colony seeded");

    for _ in 0..args.ticks {
        let report = engine.run_tick(&mut world);
        if args.format == "text" {
            for event in &report.events {
                match event {
                    TickEvent::Assigned { worker, role, kind, target } => {
                        println!(
                            "[{:>4}] {:<16} {} -> {:?} {}",
                            report.tick,
                            role.name(),
                            worker,
                            kind,
                            target
                        );
                    }
                    TickEvent::Cleared { worker, reason } => {
                        println!("[{:>4}] cleared          {} ({:?})", report.tick, worker, reason);
                    }
                    TickEvent::Failed { worker, message, .. } => {
                        println!("[{:>4}] failed           {} {}", report.tick, worker, message);
                    }
                    _ => {}
                }
            }
        }
        world.advance();
    }

    let state = engine.store().read_zone_memory(&home)?;
    let summary = Summary {
        seed: args.seed,
        ticks: args.ticks,
        zone: home.to_string(),
        counters: state.counters,
    };
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => println!(
            "\n{} ticks: {} assigned, {} cleared, {} targets lost, {} fatal",
            summary.ticks,
            summary.counters.jobs_assigned,
            summary.counters.assignments_cleared,
            summary.counters.targets_lost,
            summary.counters.fatal_errors
        ),
    }
    Ok(())
}
