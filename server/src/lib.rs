//! # Tile World Simulation Core
//!
//! This library owns the authoritative state of a tile-based multiplayer
//! world: every live entity, its spatial placement and the fixed-step physics
//! and collision resolution that makes entities interact. Networking, world
//! generation, AI and item systems are collaborators built on top of it.
//!
//! ## Core Responsibilities
//!
//! ### Entity-Component Registry
//! Entities are generational ids; all state lives in one dense store per
//! component type. Creation, component changes and destruction are buffered
//! and applied at fixed points of the tick, so code iterating active entities
//! always sees a stable snapshot.
//!
//! ### Spatial Chunk Grid
//! The world is split into square chunks that track which entities overlap
//! them, which of those can collide or move, and which AI entities are
//! watching them.
//!
//! ### Collision Pipeline
//! Broad phase by chunk and collision group, narrow phase with exact shape
//! tests, then resolution from both sides of every colliding pair.
//!
//! ## Architecture Design
//!
//! ### Single Owner
//! A [`World`] owns every store, the tile layer and the chunk grid. Hooks are
//! plain functions receiving `&mut World` and an entity id; they re-fetch
//! whatever they need instead of holding references across stages.
//!
//! ### Fixed Timestep
//! [`World::tick`] runs eight stages to completion with no suspension points.
//! The host decides when to call it; see `main.rs` for a driver.
//!
//! ## Module Organization
//!
//! - `entity`: ids, the slot allocator, entity type registration
//! - `component`, `component_array`, `registry`: hooks, dense stores and the
//!   type-erased store table
//! - `transform`, `physics`: the built-in components
//! - `layer`, `chunk`: tiles, raycasts and the chunk grid
//! - `collision`, `scheduler`, `query`: the tick pipeline and spatial queries
//! - `config`, `error`: world settings and the error type
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{EntityType, EntityTypeInfo, TileMapData, TransformComponent, World, WorldConfig};
//! use shared::{Hitbox, Point};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WorldConfig::default();
//!     let tiles = TileMapData::flat(config.world_size_tiles);
//!     let mut world = World::new(config, tiles)?;
//!
//!     let boulder = EntityType(1);
//!     world.register_entity_type(boulder, EntityTypeInfo::new("boulder").require::<TransformComponent>())?;
//!     world
//!         .build_entity(boulder)
//!         .with(TransformComponent::new(Point::new(100.0, 100.0)).with_hitbox(Hitbox::circle(20.0)))
//!         .join()?;
//!
//!     // The boulder joins at the end of the first tick
//!     world.tick()?;
//!     Ok(())
//! }
//! ```

pub mod chunk;
pub mod collision;
pub mod component;
pub mod component_array;
pub mod config;
pub mod entity;
pub mod error;
pub mod layer;
pub mod physics;
pub mod query;
pub mod registry;
pub mod scheduler;
pub mod transform;
pub mod world;

pub use collision::{CollisionGroup, CollisionRecord, CollisionTable};
pub use component::{Component, HitboxCollision, Packet, Tickable};
pub use config::WorldConfig;
pub use entity::{EntityId, EntityType, EntityTypeInfo};
pub use error::{WorldError, WorldResult};
pub use layer::{RiverSteppingStone, TileMap, TileMapData, WaterRock};
pub use physics::PhysicsComponent;
pub use scheduler::TickSummary;
pub use transform::TransformComponent;
pub use world::{EntityBuilder, World};
