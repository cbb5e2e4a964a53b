use clap::Parser;
use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::{
    Component, EntityId, EntityType, EntityTypeInfo, PhysicsComponent, Tickable, TileMapData, TransformComponent, World,
    WorldConfig,
};
use shared::{Hitbox, Point};
use std::f32::consts::PI;
use tokio::time::{interval, Duration, MissedTickBehavior};

const CRITTER: EntityType = EntityType(1);

/// Demo behaviour: every couple of seconds, pick a new heading.
struct Wanderer {
    speed: f32,
    rng: StdRng,
}

impl Component for Wanderer {}

impl Tickable for Wanderer {
    const TICK_INTERVAL: u32 = 120;

    fn on_tick(world: &mut World, entity: EntityId) {
        let Some(wanderer) = world.try_get_component_mut::<Wanderer>(entity) else {
            return;
        };
        let speed = wanderer.speed;
        let heading = wanderer.rng.gen_range(-PI..PI);
        if let Some(physics) = world.try_get_component_mut::<PhysicsComponent>(entity) {
            physics.acceleration = Point::from_angle(speed, heading);
            physics.target_rotation = Some(heading);
        }
    }
}

/// Main-method of the application.
/// Parses command-line arguments, builds a demo world and drives it at the configured tick rate.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// World size in tiles per side
        #[clap(short, long, default_value = "64")]
        world_size: u32,
        /// Tick rate (updates per second)
        #[clap(short, long, default_value = "60")]
        tick_rate: u32,
        /// Number of demo entities to spawn
        #[clap(short, long, default_value = "200")]
        entities: usize,
        /// Fraction of tiles that are walls
        #[clap(long, default_value = "0.05")]
        wall_density: f64,
        /// Seed for the map, spawn positions and wandering
        #[clap(long, default_value = "1")]
        seed: u64,
        /// Stop after this many ticks; runs until Ctrl+C when omitted
        #[clap(long)]
        ticks: Option<u64>,
    }

    env_logger::init();
    let args = Args::parse();

    let config = WorldConfig {
        world_size_tiles: args.world_size,
        tick_rate: args.tick_rate,
        ..WorldConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(args.seed);
    let world_units = config.world_units();

    let mut tiles = TileMapData::flat(config.world_size_tiles);
    for wall in tiles.walls.iter_mut() {
        *wall = rng.gen_bool(args.wall_density.clamp(0.0, 1.0));
    }

    let mut world = World::new(config, tiles)?;
    world.register_tickable::<Wanderer>()?;
    world.register_entity_type(
        CRITTER,
        EntityTypeInfo::new("critter")
            .require::<TransformComponent>()
            .require::<PhysicsComponent>(),
    )?;

    for _ in 0..args.entities {
        let position = Point::new(rng.gen_range(0.0..world_units), rng.gen_range(0.0..world_units));
        let radius = rng.gen_range(8.0..24.0);
        world
            .build_entity(CRITTER)
            .with(TransformComponent::new(position).with_hitbox(Hitbox::circle(radius).with_mass(radius / 8.0)))
            .with(PhysicsComponent::new().with_turn(0.0, PI))
            .with(Wanderer {
                speed: rng.gen_range(100.0..300.0),
                rng: StdRng::seed_from_u64(rng.gen()),
            })
            .join()?;
    }

    info!("Spawned {} critters, running at {} Hz", args.entities, args.tick_rate);

    tokio::select! {
        result = run_world(&mut world, args.tick_rate, args.ticks) => {
            if let Err(e) = result {
                error!("Simulation stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

/// Ticks the world on a fixed interval, logging a summary once per second.
async fn run_world(world: &mut World, tick_rate: u32, max_ticks: Option<u64>) -> server::WorldResult<()> {
    let mut interval_timer = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval_timer.tick().await;

        let summary = world.tick()?;
        if summary.tick % u64::from(tick_rate) == 0 {
            info!(
                "Tick {}: {} live entities, {} colliding pairs",
                summary.tick, summary.live_entities, summary.collisions
            );
        }

        if max_ticks.is_some_and(|max| world.tick_count() >= max) {
            info!("Reached {} ticks", world.tick_count());
            return Ok(());
        }
    }
}
