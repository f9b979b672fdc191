//! Tick driver integration tests

use colony_jobs::actions::catalog::ActionKind;
use colony_jobs::core::config::EngineConfig;
use colony_jobs::core::error::{Result, Severity};
use colony_jobs::core::types::{ObjectId, Position, ZoneId};
use colony_jobs::jobs::job::{Job, JobDetail, JobKind, JobTarget, TargetKind};
use colony_jobs::memory::store::{InMemoryZoneStore, ZoneStore};
use colony_jobs::memory::zone_state::ZoneState;
use colony_jobs::policy::capabilities::Role;
use colony_jobs::policy::roles::RolePolicy;
use colony_jobs::policy::select::SelectionContext;
use colony_jobs::simulation::tick::{JobEngine, TickEvent};
use colony_jobs::world::entity::{EntityBody, EntityKind, ResourceKind, WorkerBody};
use colony_jobs::world::sim::SimWorld;

fn engine_for(zones: &[&ZoneId]) -> JobEngine<InMemoryZoneStore> {
    let mut store = InMemoryZoneStore::new();
    for zone in zones {
        store.put(zone, &ZoneState::default()).unwrap();
    }
    let mut engine = JobEngine::new(EngineConfig::default(), store).unwrap();
    for zone in zones {
        engine.manage_zone((*zone).clone());
    }
    engine
}

fn spawn_worker(world: &mut SimWorld, zone: &ZoneId, body: WorkerBody, x: u8, y: u8) -> ObjectId {
    world.spawn(Position::new(zone.clone(), x, y), EntityBody::Worker(body))
}

fn miner(zone: &ZoneId, name: &str) -> WorkerBody {
    WorkerBody::new(name, Role::Miner, zone.clone()).with_parts(5, 1, 0)
}

#[test]
fn test_same_tick_source_race_corrects_next_tick() {
    let mut world = SimWorld::new(41);
    let zone = world.add_zone("W1N1");
    world.set_observed(&zone, true);
    let near = world.spawn(
        Position::new(zone.clone(), 10, 10),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    let far = world.spawn(
        Position::new(zone.clone(), 40, 40),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    // each miner drains a full 3000 window on its own
    let first = spawn_worker(&mut world, &zone, miner(&zone, "m1"), 11, 12);
    let second = spawn_worker(&mut world, &zone, miner(&zone, "m2"), 12, 11);
    let mut late = miner(&zone, "m3");
    late.spawning = true;
    let third = spawn_worker(&mut world, &zone, late, 12, 12);
    let mut engine = engine_for(&[&zone]);

    // neither saw the other's decision, so both took the near source
    let report = engine.run_tick(&mut world);
    let mut assigned: Vec<_> = report.assigned().map(|(w, t)| (*w, t.clone())).collect();
    assigned.sort_by_key(|(w, _)| *w);
    let mut expected = vec![(first, JobTarget::Object(near)), (second, JobTarget::Object(near))];
    expected.sort_by_key(|(w, _)| *w);
    assert_eq!(assigned, expected);
    world.advance();

    if let Some(body) = world.get_mut(&third).and_then(|e| e.worker_mut()) {
        body.spawning = false;
    }
    let report = engine.run_tick(&mut world);
    assert_eq!(report.assigned().collect::<Vec<_>>(), vec![(&third, &JobTarget::Object(far))]);
}

#[test]
fn test_missing_policy_only_fails_that_worker() {
    let mut world = SimWorld::new(42);
    let zone = world.add_zone("W1N1");
    world.set_observed(&zone, true);
    world.spawn(
        Position::new(zone.clone(), 10, 10),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    let lorry = spawn_worker(
        &mut world,
        &zone,
        WorkerBody::new("l", Role::Lorry, zone.clone()).with_parts(0, 4, 0),
        20,
        20,
    );
    let mined = spawn_worker(&mut world, &zone, miner(&zone, "m"), 12, 12);
    let mut engine = engine_for(&[&zone]);
    engine.registry_mut().unregister(Role::Lorry);

    let report = engine.run_tick(&mut world);
    assert_eq!(report.workers_evaluated, 2);
    assert!(report.assigned().any(|(w, _)| *w == mined));

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        TickEvent::Failed { worker, severity: Severity::Fatal, .. } if *worker == lorry
    ));

    let state = engine.store().read_zone_memory(&zone).unwrap();
    assert_eq!(state.counters.fatal_errors, 1);
    assert_eq!(state.counters.jobs_assigned, 1);
}

#[test]
fn test_corrupt_document_skips_only_its_zone() {
    let mut world = SimWorld::new(43);
    let good = world.add_zone("W1N1");
    let bad = world.add_zone("W2N1");
    for zone in [&good, &bad] {
        world.set_observed(zone, true);
        world.spawn(
            Position::new(zone.clone(), 10, 10),
            EntityBody::Source { energy: 3000, energy_capacity: 3000 },
        );
    }
    let healthy = spawn_worker(&mut world, &good, miner(&good, "good"), 12, 12);
    spawn_worker(&mut world, &bad, miner(&bad, "bad"), 12, 12);

    let mut engine = engine_for(&[&good, &bad]);
    engine.store_mut().put_raw(&bad, "{\"assignments\": [");

    let report = engine.run_tick(&mut world);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, TickEvent::ZoneSkipped { zone, .. } if *zone == bad)));
    assert_eq!(report.workers_evaluated, 1);
    assert_eq!(report.assigned().map(|(w, _)| *w).collect::<Vec<_>>(), vec![healthy]);
    assert_eq!(engine.store().raw(&bad), Some("{\"assignments\": ["));
}

#[test]
fn test_military_roles_are_not_driven() {
    let mut world = SimWorld::new(44);
    let zone = world.add_zone("W1N1");
    world.set_observed(&zone, true);
    spawn_worker(
        &mut world,
        &zone,
        WorkerBody::new("d", Role::Defender, zone.clone()).with_parts(0, 0, 0),
        20,
        20,
    );
    let mut engine = engine_for(&[&zone]);

    let report = engine.run_tick(&mut world);
    assert_eq!(report.workers_evaluated, 0);
    assert!(report.events.is_empty());
}

#[test]
fn test_dead_worker_assignment_retired() {
    let mut world = SimWorld::new(45);
    let zone = world.add_zone("W1N1");
    world.set_observed(&zone, true);
    world.spawn(
        Position::new(zone.clone(), 10, 10),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    let doomed = spawn_worker(&mut world, &zone, miner(&zone, "m"), 30, 30);
    let mut engine = engine_for(&[&zone]);

    engine.run_tick(&mut world);
    assert!(engine.store().read_zone_memory(&zone).unwrap().assignment(&doomed).is_some());
    world.advance();

    world.remove(&doomed);
    engine.run_tick(&mut world);
    assert!(engine.store().read_zone_memory(&zone).unwrap().assignment(&doomed).is_none());
}

#[test]
fn test_scout_marks_zone_explored_on_arrival() {
    let mut world = SimWorld::new(46);
    let home = world.add_zone("W1N1");
    let next = world.add_zone("W2N1");
    world.connect(&home, &next);
    world.set_observed(&home, true);
    let scout = spawn_worker(
        &mut world,
        &home,
        WorkerBody::new("s", Role::Scout, home.clone()).with_parts(0, 0, 0),
        25,
        25,
    );
    let mut engine = engine_for(&[&home]);

    let report = engine.run_tick(&mut world);
    assert_eq!(
        report.assigned().collect::<Vec<_>>(),
        vec![(&scout, &JobTarget::Zone(next.clone()))]
    );
    assert!(report.events.contains(&TickEvent::Arrived { worker: scout }));
    assert_eq!(world.get(&scout).map(|e| e.zone().clone()), Some(next.clone()));
    world.advance();

    engine.run_tick(&mut world);
    let state = engine.store().read_zone_memory(&home).unwrap();
    assert_eq!(state.explored_zones, vec![next]);
    assert!(state.assignment(&scout).is_none());
}

#[test]
fn test_miner_harvests_and_source_drains() {
    let mut world = SimWorld::new(47);
    let zone = world.add_zone("W1N1");
    world.set_observed(&zone, true);
    let source = world.spawn(
        Position::new(zone.clone(), 10, 10),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    let worker = spawn_worker(&mut world, &zone, miner(&zone, "m"), 11, 11);
    let mut engine = engine_for(&[&zone]);

    for _ in 0..3 {
        engine.run_tick(&mut world);
        world.advance();
    }

    let energy = match world.get(&source).map(|e| &e.body) {
        Some(EntityBody::Source { energy, .. }) => *energy,
        _ => panic!("source vanished"),
    };
    // 5 work parts mine 10 per tick
    assert_eq!(energy, 2970);
    let state = engine.store().read_zone_memory(&zone).unwrap();
    let held = state.assignment(&worker).and_then(|a| a.job.as_ref()).unwrap();
    assert_eq!(held.kind, JobKind::Source);
    let carried = world
        .get(&worker)
        .and_then(|e| e.worker())
        .map(|w| w.store.get(ResourceKind::Energy));
    assert_eq!(carried, Some(30));
    assert_eq!(world.get(&worker).map(|e| e.kind()), Some(EntityKind::Worker));
}

/// Offers an upgrade of a source, which no handler can perform
struct UpgradeTheSource(ObjectId);

impl RolePolicy for UpgradeTheSource {
    fn role(&self) -> Role {
        Role::Worker
    }

    fn select_job(&self, _ctx: &mut SelectionContext<'_>) -> Result<Option<Job>> {
        Ok(Some(Job::new(
            JobKind::Upgrade,
            JobTarget::Object(self.0),
            TargetKind::Entity(EntityKind::Source),
            ActionKind::Upgrade,
            JobDetail::Labor,
        )))
    }
}

#[test]
fn test_unperformable_selection_is_not_counted() {
    let mut world = SimWorld::new(48);
    let zone = world.add_zone("W1N1");
    world.set_observed(&zone, true);
    let source = world.spawn(
        Position::new(zone.clone(), 10, 10),
        EntityBody::Source { energy: 3000, energy_capacity: 3000 },
    );
    let worker = spawn_worker(
        &mut world,
        &zone,
        WorkerBody::new("w", Role::Worker, zone.clone()).with_parts(2, 2, 0),
        11,
        11,
    );
    let mut engine = engine_for(&[&zone]);
    engine.registry_mut().register(Box::new(UpgradeTheSource(source)));

    let report = engine.run_tick(&mut world);
    assert_eq!(report.assigned().count(), 0);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        TickEvent::Failed { worker: w, severity: Severity::Fatal, .. } if *w == worker
    ));

    let state = engine.store().read_zone_memory(&zone).unwrap();
    assert_eq!(state.counters.jobs_assigned, 0);
    assert_eq!(state.counters.fatal_errors, 1);
    assert!(state.assignment(&worker).is_none());
}
