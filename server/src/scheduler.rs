//! # Fixed-Tick Scheduler
//!
//! [`World::tick`] advances the simulation by one fixed step. Stages run
//! strictly in this order:
//!
//! 1. Rotation integration
//! 2. Position integration
//! 3. Dirty resolution: hitboxes, bounds, chunk membership, walls and border
//! 4. Collision detection and resolution
//! 5. Tick dispatch for ticked stores whose interval divides the tick count
//! 6. Queued component removals
//! 7. Entity destruction
//! 8. Entity join
//!
//! Work requested by hooks during a stage is buffered, so every stage sees a
//! stable set of active entities. Something spawned during stage 5 is first
//! ticked on the next tick.

use crate::entity::{EntityId, EntityState};
use crate::error::WorldResult;
use crate::physics::{self, PhysicsComponent};
use crate::registry::StoreKind;
use crate::transform::TransformComponent;
use crate::world::World;
use log::debug;

/// What a tick did, for host-side logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Number of the tick that just ran. The first tick is 0.
    pub tick: u64,
    pub collisions: usize,
    pub joined: usize,
    pub destroyed: usize,
    pub live_entities: usize,
}

impl World {
    pub fn tick(&mut self) -> WorldResult<TickSummary> {
        let tick = self.tick;

        physics::integrate_rotation(self)?;
        physics::integrate_position(self)?;
        self.resolve_dirty_transforms()?;

        self.detect_collisions()?;
        self.resolve_collisions()?;
        let collisions = self.collisions.len();

        self.dispatch_ticks();
        self.flush_removals();
        let destroyed = self.destroy_queued_entities();
        let joined = self.join_pending_entities();

        self.tick += 1;

        let summary = TickSummary {
            tick,
            collisions,
            joined,
            destroyed,
            live_entities: self.entities.len(),
        };
        debug!(
            "Tick {}: {} collisions, {} joined, {} destroyed, {} live",
            summary.tick, summary.collisions, summary.joined, summary.destroyed, summary.live_entities
        );
        Ok(summary)
    }

    fn resolve_dirty_transforms(&mut self) -> WorldResult<()> {
        let dirty: Vec<EntityId> = self
            .components
            .array::<TransformComponent>()?
            .iter()
            .filter(|(_, transform)| transform.is_dirty())
            .map(|(entity, _)| entity)
            .collect();

        for entity in dirty {
            self.clean_transform(entity);
            if self.has_component::<PhysicsComponent>(entity) && physics::resolve_world_collisions(self, entity) {
                self.clean_transform(entity);
            }
        }
        Ok(())
    }

    fn dispatch_ticks(&mut self) {
        for index in 0..self.components.len() {
            let StoreKind::Ticked { interval, on_tick } = self.components.entry(index).kind else {
                continue;
            };
            if self.tick % u64::from(interval) != 0 {
                continue;
            }

            let snapshot = self.components.entry(index).array.entities().to_vec();
            for entity in snapshot {
                on_tick(self, entity);
            }
        }
    }

    fn flush_removals(&mut self) {
        for index in 0..self.components.len() {
            let queue = self.components.entry_mut(index).array.take_removal_queue();
            for entity in queue {
                if !self.components.entry(index).array.has(entity) {
                    continue;
                }
                let on_remove = self.components.entry(index).on_remove;
                on_remove(self, entity);
                self.components.entry_mut(index).array.remove_now(entity);
            }
        }
    }

    /// Runs until no hook queues further destruction. Returns how many
    /// entities were erased.
    fn destroy_queued_entities(&mut self) -> usize {
        let mut destroyed = 0;

        while !self.destroy_queue.is_empty() {
            for entity in std::mem::take(&mut self.destroy_queue) {
                let Some(entity_type) = self.entity_type(entity) else {
                    continue;
                };

                if let Some(on_death) = self.entity_types.death_handler(entity_type) {
                    on_death(self, entity);
                }
                for on_remove in self.components.hooks_for(entity, |entry| entry.on_remove) {
                    on_remove(self, entity);
                }

                for entry in self.components.entries_mut() {
                    entry.array.remove_now(entity);
                    entry.array.discard_pending(entity);
                }
                self.chunks.remove_viewer(entity);
                self.entities.free(entity);
                destroyed += 1;

                debug!("Destroyed entity {} of type {}", entity, entity_type);
            }
        }

        destroyed
    }

    /// Promotes entities and components whose delay elapsed, then fires
    /// `on_join` store by store. Returns how many entities joined.
    fn join_pending_entities(&mut self) -> usize {
        let mut joined = Vec::new();
        self.join_buffer.retain_mut(|entry| {
            if entry.remaining_ticks == 0 {
                joined.push(entry.entity);
                false
            } else {
                entry.remaining_ticks -= 1;
                true
            }
        });
        for &entity in &joined {
            if let Some(record) = self.entities.get_mut(entity) {
                record.state = EntityState::Active;
            }
        }

        let promoted: Vec<Vec<EntityId>> = self
            .components
            .entries_mut()
            .iter_mut()
            .map(|entry| entry.array.flush_pending())
            .collect();

        for (index, entities) in promoted.into_iter().enumerate() {
            let on_join = self.components.entry(index).on_join;
            for entity in entities {
                on_join(self, entity);
            }
        }

        joined.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Tickable};
    use crate::config::WorldConfig;
    use crate::entity::{EntityType, EntityTypeInfo};
    use crate::layer::TileMapData;
    use shared::{Hitbox, Point};
    use std::cell::RefCell;

    const THING: EntityType = EntityType(1);

    thread_local! {
        static JOURNAL: RefCell<Vec<String>> = RefCell::new(Vec::new());
    }

    fn note(line: impl Into<String>) {
        JOURNAL.with(|journal| journal.borrow_mut().push(line.into()));
    }

    fn journal() -> Vec<String> {
        JOURNAL.with(|journal| journal.borrow().clone())
    }

    #[derive(Default)]
    struct Counter(u32);
    impl Component for Counter {
        fn on_join(_world: &mut World, _entity: EntityId) {
            note("join counter");
        }

        fn on_remove(_world: &mut World, _entity: EntityId) {
            note("remove counter");
        }
    }
    impl Tickable for Counter {
        const TICK_INTERVAL: u32 = 3;

        fn on_tick(world: &mut World, entity: EntityId) {
            world.get_component_mut::<Counter>(entity).0 += 1;
        }
    }

    struct Tag;
    impl Component for Tag {
        fn on_join(_world: &mut World, _entity: EntityId) {
            note("join tag");
        }

        fn on_remove(_world: &mut World, _entity: EntityId) {
            note("remove tag");
        }
    }

    /// Spawns a counter-carrying entity every tick it is ticked.
    struct Spawner;
    impl Component for Spawner {}
    impl Tickable for Spawner {
        fn on_tick(world: &mut World, _entity: EntityId) {
            let spawned = world.build_entity(THING).with(Counter::default()).join();
            assert!(spawned.is_ok());
        }
    }

    fn on_death(world: &mut World, entity: EntityId) {
        if world.has_component::<Tag>(entity) {
            note("death");
        }
    }

    fn world() -> World {
        let config = WorldConfig {
            world_size_tiles: 8,
            chunk_size_tiles: 4,
            tile_size: 10.0,
            tick_rate: 10,
        };
        let mut world = World::new(config, TileMapData::flat(8)).unwrap();
        world.register_tickable::<Counter>().unwrap();
        world.register_component::<Tag>().unwrap();
        world.register_tickable::<Spawner>().unwrap();
        world
            .register_entity_type(THING, EntityTypeInfo::new("thing").on_death(on_death))
            .unwrap();
        world
    }

    #[test]
    fn test_tick_numbers_start_at_zero() {
        let mut world = world();
        assert_eq!(world.tick().unwrap().tick, 0);
        assert_eq!(world.tick().unwrap().tick, 1);
        assert_eq!(world.tick_count(), 2);
    }

    #[test]
    fn test_ticked_store_honours_interval() {
        let mut world = world();
        let entity = world.build_entity(THING).with(Counter::default()).join().unwrap();
        world.tick().unwrap();

        // Ticks 1 through 6 run; the interval divides 3 and 6
        for _ in 0..6 {
            world.tick().unwrap();
        }
        assert_eq!(world.get_component::<Counter>(entity).0, 2);
    }

    #[test]
    fn test_entities_spawned_while_ticking_wait_a_tick() {
        let mut world = world();
        world.build_entity(THING).with(Spawner).join().unwrap();
        world.tick().unwrap();

        let summary = world.tick().unwrap();
        assert_eq!(summary.joined, 1);
        assert_eq!(summary.live_entities, 2);

        let spawned = world.active_entities()[1];
        assert_eq!(world.get_component::<Counter>(spawned).0, 0);
    }

    #[test]
    fn test_join_hooks_fire_in_store_order() {
        let mut world = world();
        world
            .build_entity(THING)
            .with(Tag)
            .with(Counter::default())
            .join()
            .unwrap();
        world.tick().unwrap();
        assert_eq!(journal(), vec!["join counter", "join tag"]);
    }

    #[test]
    fn test_destruction_runs_death_handler_first() {
        let mut world = world();
        let entity = world
            .build_entity(THING)
            .with(Tag)
            .with(Counter::default())
            .join()
            .unwrap();
        world.tick().unwrap();

        world.destroy_entity(entity).unwrap();
        world.destroy_entity(entity).unwrap();
        let summary = world.tick().unwrap();

        assert_eq!(summary.destroyed, 1);
        assert!(!world.is_alive(entity));
        assert_eq!(
            journal(),
            vec!["join counter", "join tag", "death", "remove counter", "remove tag"]
        );
    }

    #[test]
    fn test_removal_fires_hook_once() {
        let mut world = world();
        let entity = world.build_entity(THING).with(Tag).join().unwrap();
        world.tick().unwrap();

        world.remove_component::<Tag>(entity).unwrap();
        world.tick().unwrap();
        world.tick().unwrap();

        assert_eq!(journal(), vec!["join tag", "remove tag"]);
        assert!(!world.has_component::<Tag>(entity));
    }

    #[test]
    fn test_destroyed_entity_leaves_its_chunks() {
        let mut world = world();
        let entity = world
            .build_entity(THING)
            .with(TransformComponent::new(Point::new(40.0, 40.0)).with_hitbox(Hitbox::circle(5.0)))
            .join()
            .unwrap();
        world.tick().unwrap();
        assert_eq!(world.chunks().chunk(0).entities(), &[entity]);
        assert_eq!(world.get_component::<TransformComponent>(entity).chunks(), &[0, 1, 2, 3]);

        world.destroy_entity(entity).unwrap();
        world.tick().unwrap();
        assert!(world.chunks().chunks().iter().all(|chunk| chunk.entities().is_empty()));
    }
}
