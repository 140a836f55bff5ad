//! Meadow Headless Simulation Harness
//!
//! Validates ecosystem logic without a renderer. Runs entirely in-process —
//! no networking, no UI.
//!
//! Usage:
//!   cargo run -p meadow-simtest
//!   cargo run -p meadow-simtest -- --verbose

use meadow_core::components::{
    AgentKind, Bee, Bird, Boid, DeathCause, Flowers, Vec2, WorldBounds,
};
use meadow_core::generation::{generate_meadow, pastel_palette, MeadowConfig};
use meadow_core::genetics::{Dna, Genes};
use meadow_core::grid::{GridEntry, SpatialGrid};
use meadow_core::systems::reproduction::MAX_BEES;
use meadow_core::systems::{flocking, lifecycle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: String) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail,
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Meadow Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Spatial grid contract sweep
    results.extend(validate_grid_contract(verbose));

    // 2. Steering invariants over random agents
    results.extend(validate_steering(verbose));

    // 3. Genetics over many generations
    results.extend(validate_genetics(verbose));

    // 4. Resource claim guards
    results.extend(validate_resource_guards(verbose));

    // 5. Life-cycle terminal paths
    results.extend(validate_lifecycle(verbose));

    // 6. Long soak of a full meadow
    results.extend(validate_soak(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Spatial grid ─────────────────────────────────────────────────────

fn validate_grid_contract(_verbose: bool) -> Vec<TestResult> {
    println!("--- Spatial Grid ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(0xBEE5);

    let cell = 50.0;
    let mut grid = SpatialGrid::new(1000.0, 800.0, cell);
    let points: Vec<Vec2> = (0..400)
        .map(|_| Vec2::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..800.0)))
        .collect();
    for (i, p) in points.iter().enumerate() {
        grid.insert(GridEntry {
            entity: synthetic_entity(i),
            position: *p,
            velocity: Vec2::ZERO,
        });
    }

    // Within one cell size: always visible. Beyond two: never.
    let mut missing = 0usize;
    let mut phantom = 0usize;
    for a in &points {
        let nearby = grid.query(*a);
        for b in &points {
            let dist = a.distance(b);
            let seen = nearby.iter().any(|e| e.position == *b);
            if dist <= cell && !seen {
                missing += 1;
            }
            if dist > 2.0 * cell * std::f32::consts::SQRT_2 && seen {
                phantom += 1;
            }
        }
    }
    results.push(check(
        "grid_close_pairs_visible",
        missing == 0,
        format!("{} close pairs missing from queries", missing),
    ));
    results.push(check(
        "grid_far_pairs_absent",
        phantom == 0,
        format!("{} far pairs leaked into queries", phantom),
    ));

    grid.clear();
    let empty = points.iter().all(|p| grid.query(*p).is_empty());
    results.push(check(
        "grid_clear",
        empty,
        "all buckets empty after clear".into(),
    ));

    results
}

// A stable fake entity id for grid-only tests.
fn synthetic_entity(_i: usize) -> hecs::Entity {
    hecs::Entity::DANGLING
}

// ── 2. Steering ─────────────────────────────────────────────────────────

fn validate_steering(_verbose: bool) -> Vec<TestResult> {
    println!("--- Steering ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(0x0B01D);
    let bounds = WorldBounds::new(1200.0, 900.0, 100.0);

    let mut speed_ok = true;
    let mut wrap_ok = true;
    let mut ground_ok = true;
    for _ in 0..2000 {
        let kind = if rng.gen::<bool>() {
            AgentKind::Bee
        } else {
            AgentKind::Bird
        };
        let mut boid = Boid::new(
            kind,
            Vec2::new(rng.gen_range(-50.0..1250.0), rng.gen_range(-50.0..950.0)),
            Vec2::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)),
            Dna::random(kind, &mut rng),
            1.0,
        );
        flocking::limit_speed(&mut boid);
        if boid.speed() > boid.settings.max_speed + 1e-3 {
            speed_ok = false;
        }
        flocking::avoid_edges(&mut boid, &bounds);
        if boid.position.x < 0.0 || boid.position.x > bounds.width {
            wrap_ok = false;
        }
        if boid.position.y > bounds.ground_level() {
            ground_ok = false;
        }
    }
    results.push(check(
        "speed_clamped",
        speed_ok,
        "velocity magnitude never exceeds max_speed".into(),
    ));
    results.push(check(
        "horizontal_wrap",
        wrap_ok,
        "x always wrapped into [0, width]".into(),
    ));
    results.push(check(
        "ground_clamp",
        ground_ok,
        "y never below ground level".into(),
    ));

    results
}

// ── 3. Genetics ─────────────────────────────────────────────────────────

fn validate_genetics(_verbose: bool) -> Vec<TestResult> {
    println!("--- Genetics ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(0xD0A);

    // Thousands of generations of blending and mutation stay within bounds
    let mut in_bounds = true;
    for kind in [AgentKind::Bee, AgentKind::Bird] {
        let mut a = Dna::random(kind, &mut rng);
        let mut b = Dna::random(kind, &mut rng);
        for _ in 0..2000 {
            let child = Dna::inherit(kind, &a, &b, &mut rng);
            if !child.within_bounds(kind) {
                in_bounds = false;
                break;
            }
            a = b;
            b = child;
        }
    }
    results.push(check(
        "dna_bounds_hold",
        in_bounds,
        "trait values clamped through 2000 generations".into(),
    ));

    // Visual genes keep their vertex counts through inheritance
    let palette = pastel_palette();
    let ga = Genes::random(&palette, &mut rng);
    let gb = Genes::random(&palette, &mut rng);
    let mut shapes_ok = true;
    for _ in 0..500 {
        let child = Genes::inherit(&ga, &gb, &mut rng);
        if child.body.len() != ga.body.len()
            || child.beak.len() != ga.beak.len()
            || child.tail.len() != ga.tail.len()
        {
            shapes_ok = false;
            break;
        }
    }
    results.push(check(
        "genes_vertex_counts_stable",
        shapes_ok,
        "body/beak/tail vertex counts preserved".into(),
    ));

    results.push(check(
        "palette_resolves",
        palette.len() == 8,
        format!("{} plumage colors resolved", palette.len()),
    ));

    results
}

// ── 4. Resource guards ──────────────────────────────────────────────────

fn validate_resource_guards(_verbose: bool) -> Vec<TestResult> {
    println!("--- Resource Guards ---");
    let mut results = Vec::new();

    let mut flowers = Flowers::new();
    let anchor = Vec2::new(100.0, 100.0);
    let id = flowers.add(anchor, &[anchor, anchor + Vec2::new(5.0, 0.0)]);

    // Claims are exclusive and recoverable
    let c1 = flowers.claim(id, 0.2);
    let c2 = flowers.claim(id, 0.2);
    let c3 = flowers.claim(id, 0.2);
    let exclusive = c1.is_some() && c2.is_some() && c3.is_none();
    results.push(check(
        "petal_claims_exclusive",
        exclusive,
        "two petals, two claims, third denied".into(),
    ));

    if let Some(c) = c1 {
        flowers.release(c);
    }
    let reclaimed = flowers.claim(id, 0.2).is_some();
    results.push(check(
        "petal_release_recovers",
        reclaimed,
        "released petal claimable again".into(),
    ));
    if let Some(c) = c2 {
        flowers.release(c);
    }

    // Nectar is never negative and regeneration caps at 1.0
    let c = flowers.claim(id, 0.0);
    let mut ok = true;
    if let Some(c) = c {
        flowers.take_nectar(&c, 100.0);
        if flowers.petal_nectar(&c) < 0.0 {
            ok = false;
        }
        for _ in 0..10_000 {
            flowers.regenerate(0.002);
        }
        if flowers.petal_nectar(&c) > 1.0 + 1e-5 {
            ok = false;
        }
        flowers.release(c);
    }
    results.push(check(
        "nectar_bounded",
        ok,
        "petal nectar stays within [0, 1]".into(),
    ));

    results
}

// ── 5. Life-cycle ───────────────────────────────────────────────────────

fn validate_lifecycle(_verbose: bool) -> Vec<TestResult> {
    println!("--- Life-cycle ---");
    let mut results = Vec::new();
    let bounds = WorldBounds::new(800.0, 600.0, 80.0);

    // Natural death falls, grounds, fades, vanishes
    let mut boid = Boid::new(
        AgentKind::Bird,
        Vec2::new(400.0, 100.0),
        Vec2::new(2.0, 0.0),
        Dna::preset(AgentKind::Bird),
        1.0,
    );
    boid.die(DeathCause::OldAge);
    let mut ticks = 0u32;
    while !boid.vanished && ticks < 10_000 {
        lifecycle::advance(&mut boid, &bounds);
        ticks += 1;
    }
    results.push(check(
        "corpse_falls_and_fades",
        boid.vanished && boid.position.y == bounds.ground_level(),
        format!("vanished after {} ticks on the ground", ticks),
    ));

    // Energy only ever decreases while alive and unfed
    let mut starving = Boid::new(
        AgentKind::Bee,
        Vec2::new(200.0, 200.0),
        Vec2::ZERO,
        Dna::preset(AgentKind::Bee),
        1.0,
    );
    let mut monotonic = true;
    let mut last = starving.energy;
    for _ in 0..500 {
        if !lifecycle::advance(&mut starving, &bounds) {
            break;
        }
        if starving.energy > last {
            monotonic = false;
        }
        last = starving.energy;
    }
    results.push(check(
        "energy_monotonic_while_alive",
        monotonic,
        "energy non-increasing without feeding".into(),
    ));

    // Predation leaves no corpse
    let mut eaten = Boid::new(
        AgentKind::Bee,
        Vec2::new(100.0, 100.0),
        Vec2::ZERO,
        Dna::preset(AgentKind::Bee),
        1.0,
    );
    eaten.die(DeathCause::Predation);
    results.push(check(
        "predation_vanishes_immediately",
        !eaten.alive && eaten.vanished,
        "eaten agent gone the same tick".into(),
    ));

    results
}

// ── 6. Soak ─────────────────────────────────────────────────────────────

fn validate_soak(verbose: bool) -> Vec<TestResult> {
    println!("--- Soak (3000 ticks) ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(0x5EED);

    let config = MeadowConfig::default();
    let mut sim = generate_meadow(&config, &mut rng);

    let mut bounds_ok = true;
    let mut partner_ok = true;
    let mut population_ok = true;
    let mut energy_ok = true;

    for tick in 0..3000u32 {
        sim.tick_with_rng(&mut rng);

        if tick % 100 != 0 {
            continue;
        }

        for (_, boid) in sim.world.query::<&Boid>().iter() {
            // Wrap/clamp run before integration, so allow one tick of travel
            let slack = boid.settings.max_speed + 1.0;
            if boid.position.x < -slack
                || boid.position.x > sim.bounds.width + slack
                || boid.position.y > sim.bounds.ground_level() + slack
                || !boid.position.x.is_finite()
                || !boid.position.y.is_finite()
            {
                bounds_ok = false;
            }
            if !boid.energy.is_finite() {
                energy_ok = false;
            }
        }

        // Pair bonds must be mutual or already dissolved
        let pairs: Vec<(hecs::Entity, hecs::Entity)> = sim
            .world
            .query::<&Bird>()
            .iter()
            .filter_map(|(e, b)| b.partner.map(|p| (e, p)))
            .collect();
        for (me, partner) in pairs {
            if let Ok(other) = sim.world.get::<&Bird>(partner) {
                if let Some(back) = other.partner {
                    if back != me {
                        partner_ok = false;
                    }
                }
            }
        }

        if sim.live_bee_count() > MAX_BEES + sim.hives.len() {
            population_ok = false;
        }
    }

    results.push(check(
        "soak_positions_bounded",
        bounds_ok,
        "all agents stayed within world bounds".into(),
    ));
    results.push(check(
        "soak_partner_symmetry",
        partner_ok,
        "every pair bond mutual at each checkpoint".into(),
    ));
    results.push(check(
        "soak_population_capped",
        population_ok,
        format!("bee population within cap ({} at end)", sim.live_bee_count()),
    ));
    results.push(check(
        "soak_energy_finite",
        energy_ok,
        "no NaN/inf energy observed".into(),
    ));

    // Occupied petals cannot exceed bees in the world: claims are held by
    // living bees only, and death paths release them
    let occupied: usize = sim
        .flowers
        .iter()
        .map(|(_, f)| f.occupant_count())
        .sum();
    let bee_total = sim.world.query::<&Bee>().iter().count();
    results.push(check(
        "soak_no_leaked_claims",
        occupied <= bee_total,
        format!("{} occupied petals vs {} bees", occupied, bee_total),
    ));

    if verbose {
        match serde_json::to_string_pretty(&sim.stats()) {
            Ok(json) => println!("  final stats: {}", json),
            Err(e) => println!("  stats serialization failed: {}", e),
        }
    }

    results
}
