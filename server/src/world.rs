//! # World
//!
//! The single owner of all simulation state: entity slots, component stores,
//! the tile layer, the chunk grid and the current collision table. There are
//! no globals; collaborators receive `&mut World` and go through its API.
//!
//! ## Deferred Mutation
//! Creating an entity, adding or removing a component and destroying an entity
//! never touch active storage directly. They fill the join buffer, the pending
//! buffers, the removal queues and the destroy queue, which the scheduler
//! drains at fixed stages of [`World::tick`](crate::scheduler).

use crate::chunk::ChunkGrid;
use crate::collision::{CollisionGroup, CollisionTable};
use crate::component::{Component, Packet, Tickable};
use crate::config::WorldConfig;
use crate::entity::{
    EntityAllocator, EntityId, EntityRecord, EntityState, EntityType, EntityTypeInfo, EntityTypeRegistry,
};
use crate::error::{WorldError, WorldResult};
use crate::layer::{TileMap, TileMapData};
use crate::physics::PhysicsComponent;
use crate::registry::ComponentRegistry;
use crate::transform::TransformComponent;
use log::{debug, info, warn};
use shared::Bounds;
use std::any::{type_name, TypeId};

/// An entity waiting to join.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JoinEntry {
    pub entity: EntityId,
    pub remaining_ticks: u32,
}

pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) tick: u64,
    pub(crate) entities: EntityAllocator,
    pub(crate) entity_types: EntityTypeRegistry,
    /// Ordered by remaining delay; equal delays keep insertion order.
    pub(crate) join_buffer: Vec<JoinEntry>,
    pub(crate) destroy_queue: Vec<EntityId>,
    pub(crate) components: ComponentRegistry,
    pub(crate) tiles: TileMap,
    pub(crate) chunks: ChunkGrid,
    pub(crate) collisions: CollisionTable,
}

impl World {
    /// Builds an empty world over the generated terrain. The transform and
    /// physics stores are registered first, in that order.
    pub fn new(config: WorldConfig, tile_data: TileMapData) -> WorldResult<Self> {
        config.validate()?;
        let tiles = TileMap::new(&config, tile_data)?;
        let chunks = ChunkGrid::new(&config, &tiles);

        let mut components = ComponentRegistry::new();
        components.register::<TransformComponent>()?;
        components.register::<PhysicsComponent>()?;

        info!(
            "World created: {0}x{0} tiles, {1}x{1} chunks, {2} ticks/s",
            config.world_size_tiles,
            config.chunks_per_side(),
            config.tick_rate
        );

        Ok(Self {
            config,
            tick: 0,
            entities: EntityAllocator::new(),
            entity_types: EntityTypeRegistry::default(),
            join_buffer: Vec::new(),
            destroy_queue: Vec::new(),
            components,
            tiles,
            chunks,
            collisions: CollisionTable::default(),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    /// Tile edits made by structure-building collaborators. Physics sees
    /// them from the next integration on.
    pub fn tiles_mut(&mut self) -> &mut TileMap {
        &mut self.tiles
    }

    pub fn chunks(&self) -> &ChunkGrid {
        &self.chunks
    }

    pub fn collisions(&self) -> &CollisionTable {
        &self.collisions
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn register_component<T: Component>(&mut self) -> WorldResult<()> {
        self.components.register::<T>().map(|_| ())
    }

    pub fn register_tickable<T: Tickable>(&mut self) -> WorldResult<()> {
        self.components.register_ticked::<T>().map(|_| ())
    }

    pub fn register_entity_type(&mut self, entity_type: EntityType, info: EntityTypeInfo) -> WorldResult<()> {
        if self.entity_types.register(entity_type, info) {
            Ok(())
        } else {
            Err(WorldError::EntityTypeAlreadyRegistered(entity_type))
        }
    }

    /// Starts spawning an entity. Nothing happens until [`EntityBuilder::join`].
    pub fn build_entity(&mut self, entity_type: EntityType) -> EntityBuilder<'_> {
        EntityBuilder {
            world: self,
            entity_type,
            collision_group: CollisionGroup::Default,
            join_delay: 0,
            inserts: Vec::new(),
        }
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Joined and not yet destroyed, though possibly queued for destruction.
    pub fn is_active(&self, entity: EntityId) -> bool {
        matches!(
            self.entities.get(entity).map(|record| record.state),
            Some(EntityState::Active | EntityState::DestroyQueued)
        )
    }

    pub fn entity_type(&self, entity: EntityId) -> Option<EntityType> {
        self.entities.get(entity).map(|record| record.entity_type)
    }

    pub fn collision_group(&self, entity: EntityId) -> CollisionGroup {
        self.entities
            .get(entity)
            .map_or(CollisionGroup::Default, |record| record.collision_group)
    }

    /// Live entities, pending ones included.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Joined entities in slot order.
    pub fn active_entities(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, record)| record.state != EntityState::Pending)
            .map(|(entity, _)| entity)
            .collect()
    }

    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> WorldResult<()> {
        self.add_component_delayed(entity, component, 0)
    }

    /// Buffers a component; it joins at the join flush `join_delay` ticks from now.
    /// On an entity that hasn't joined yet the component never joins before it.
    pub fn add_component_delayed<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
        join_delay: u32,
    ) -> WorldResult<()> {
        if !self.entities.is_alive(entity) {
            warn!("Dropping {} for dead entity {}", type_name::<T>(), entity);
            return Ok(());
        }
        let join_delay = self
            .join_buffer
            .iter()
            .find(|entry| entry.entity == entity)
            .map_or(join_delay, |entry| join_delay.max(entry.remaining_ticks));
        let array = self.components.array_mut::<T>()?;
        if array.has(entity) || array.has_pending(entity) {
            return Err(WorldError::DuplicateComponent {
                entity,
                component: type_name::<T>(),
            });
        }
        array.add(entity, component, join_delay);
        Ok(())
    }

    /// Whether `entity` has an active `T`. Pending components don't count.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.components
            .array::<T>()
            .map_or(false, |array| array.has(entity))
    }

    pub fn try_get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.components.array::<T>().ok()?.get(entity)
    }

    pub fn try_get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.components.array_mut::<T>().ok()?.get_mut(entity)
    }

    pub fn component<T: Component>(&self, entity: EntityId) -> WorldResult<&T> {
        self.try_get_component(entity).ok_or(WorldError::MissingComponent {
            entity,
            component: type_name::<T>(),
        })
    }

    /// # Panics
    /// Panics if `entity` has no active `T`. Check with
    /// [`World::has_component`] when absence is legitimate.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> &T {
        match self.try_get_component(entity) {
            Some(component) => component,
            None => panic!(
                "{}",
                WorldError::MissingComponent {
                    entity,
                    component: type_name::<T>(),
                }
            ),
        }
    }

    /// # Panics
    /// Panics if `entity` has no active `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> &mut T {
        match self.try_get_component_mut(entity) {
            Some(component) => component,
            None => panic!(
                "{}",
                WorldError::MissingComponent {
                    entity,
                    component: type_name::<T>(),
                }
            ),
        }
    }

    /// Queues removal of an active `T`, applied at the deactivation stage.
    /// A `T` that hasn't joined yet is dropped right away.
    /// Returns whether anything was queued or dropped.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> WorldResult<bool> {
        let array = self.components.array_mut::<T>()?;
        if array.discard_pending(entity).is_some() {
            return Ok(true);
        }
        Ok(array.queue_removal(entity))
    }

    /// Destroys an entity at the next destruction stage.
    ///
    /// Calling it again, or on an entity already queued, does nothing. An
    /// entity that hasn't joined yet is dropped from the join buffer at once
    /// and never fires any hook.
    pub fn destroy_entity(&mut self, entity: EntityId) -> WorldResult<()> {
        let Some(record) = self.entities.get_mut(entity) else {
            warn!("destroy_entity called on dead entity {}", entity);
            return Ok(());
        };
        if !self.entity_types.contains(record.entity_type) {
            return Err(WorldError::UnregisteredEntityType(record.entity_type));
        }

        match record.state {
            EntityState::DestroyQueued => {}
            EntityState::Active => {
                record.state = EntityState::DestroyQueued;
                self.destroy_queue.push(entity);
            }
            EntityState::Pending => {
                self.discard_pending_entity(entity);
                debug!("Dropped pending entity {}", entity);
            }
        }
        Ok(())
    }

    /// Size of everything [`World::add_entity_data_to_packet`] writes.
    pub fn entity_data_length(&self, entity: EntityId) -> usize {
        self.components
            .entries()
            .iter()
            .map(|entry| entry.array.data_length(entity))
            .sum()
    }

    /// Runs the serialization hook of every component the entity holds, in
    /// store registration order.
    pub fn add_entity_data_to_packet(&self, entity: EntityId, packet: &mut Packet) -> WorldResult<()> {
        for entry in self.components.entries() {
            entry.array.add_data_to_packet(entity, packet)?;
        }
        Ok(())
    }

    /// Replaces the chunks an AI viewer watches with those overlapping `bounds`.
    pub fn set_viewed_chunks(&mut self, viewer: EntityId, bounds: &Bounds) {
        if !self.is_active(viewer) {
            warn!("Entity {} can't view chunks before joining", viewer);
            return;
        }
        let chunks = self.chunks.chunks_in_bounds(bounds);
        self.chunks.set_viewed_chunks(viewer, chunks);
    }

    /// Entities in the chunks `viewer` watches, in id order. Empty for
    /// entities that aren't viewing anything.
    pub fn potential_visible_entities(&self, viewer: EntityId) -> Vec<EntityId> {
        self.chunks.potential_visible(viewer)
    }

    /// Drops an entity that never joined, along with every trace it left in
    /// the stores, the chunk lists and the viewer table.
    fn discard_pending_entity(&mut self, entity: EntityId) {
        self.join_buffer.retain(|entry| entry.entity != entity);
        self.remove_entity_from_chunks(entity);
        for entry in self.components.entries_mut() {
            entry.array.remove_now(entity);
            entry.array.discard_pending(entity);
        }
        self.chunks.remove_viewer(entity);
        self.entities.free(entity);
    }

    pub(crate) fn push_join_entry(&mut self, entity: EntityId, join_delay: u32) {
        let position = self
            .join_buffer
            .iter()
            .position(|entry| entry.remaining_ticks > join_delay)
            .unwrap_or(self.join_buffer.len());
        self.join_buffer.insert(
            position,
            JoinEntry {
                entity,
                remaining_ticks: join_delay,
            },
        );
    }
}

type ComponentInsert = Box<dyn FnOnce(&mut World, EntityId, u32) -> WorldResult<()>>;

/// Collects an entity's components before it enters the join buffer.
pub struct EntityBuilder<'w> {
    world: &'w mut World,
    entity_type: EntityType,
    collision_group: CollisionGroup,
    join_delay: u32,
    inserts: Vec<(TypeId, &'static str, ComponentInsert)>,
}

impl<'w> EntityBuilder<'w> {
    pub fn collision_group(mut self, group: CollisionGroup) -> Self {
        self.collision_group = group;
        self
    }

    /// Ticks to wait before joining. Zero joins at this tick's join stage.
    pub fn join_delay(mut self, ticks: u32) -> Self {
        self.join_delay = ticks;
        self
    }

    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.inserts.push((
            TypeId::of::<T>(),
            type_name::<T>(),
            Box::new(move |world: &mut World, entity: EntityId, delay: u32| {
                world.add_component_delayed(entity, component, delay)
            }),
        ));
        self
    }

    /// Validates the entity against its type and puts it into the join buffer.
    /// On error nothing has been allocated.
    pub fn join(self) -> WorldResult<EntityId> {
        let EntityBuilder {
            world,
            entity_type,
            collision_group,
            join_delay,
            inserts,
        } = self;

        let info = world
            .entity_types
            .get(entity_type)
            .ok_or(WorldError::UnregisteredEntityType(entity_type))?;
        for (type_id, name) in info.required_components() {
            if !inserts.iter().any(|(inserted, _, _)| *inserted == type_id) {
                return Err(WorldError::MissingRequiredComponent {
                    entity_type,
                    component: name,
                });
            }
        }
        for (type_id, name, _) in &inserts {
            if world.components.index_of_type(*type_id).is_none() {
                return Err(WorldError::UnregisteredComponent(name));
            }
        }

        let entity = world.entities.allocate(EntityRecord {
            entity_type,
            collision_group,
            state: EntityState::Pending,
        });
        for (_, _, insert) in inserts {
            if let Err(err) = insert(&mut *world, entity, join_delay) {
                world.discard_pending_entity(entity);
                return Err(err);
            }
        }
        world.push_join_entry(entity, join_delay);

        debug!(
            "Entity {} of type {} queued to join in {} ticks",
            entity, entity_type, join_delay
        );
        Ok(entity)
    }
}
