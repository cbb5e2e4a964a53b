//! # Entities
//!
//! Entities are opaque identifiers. All of their state lives in component
//! stores keyed by [`EntityId`]; the only per-entity data kept here is the
//! bookkeeping the world needs to schedule their lifecycle.
//!
//! ## Identifier Reuse
//! Ids pack a slot index and a generation counter. Freeing a slot bumps its
//! generation, so an id held past its entity's destruction never resolves to
//! whatever reuses the slot.

use crate::collision::CollisionGroup;
use crate::component::Component;
use crate::world::World;
use log::info;
use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Generational entity identifier.
///
/// Lower 32 bits hold the slot index, upper 32 bits the generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn to_bits(self) -> u64 {
        self.0
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Collaborator-defined entity kind, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityType(pub u16);

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an entity is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// Waiting in the join buffer; invisible to every stage.
    Pending,
    Active,
    /// Still active, destroyed at the next destruction stage.
    DestroyQueued,
}

#[derive(Clone, Copy, Debug)]
pub struct EntityRecord {
    pub entity_type: EntityType,
    pub collision_group: CollisionGroup,
    pub state: EntityState,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<EntityRecord>,
}

/// Arena of entity slots with a free list.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, record: EntityRecord) -> EntityId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.record = Some(record);
                EntityId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    record: Some(record),
                });
                EntityId::new(index, 0)
            }
        }
    }

    /// Releases the slot and returns what it held. Stale ids return `None`.
    pub fn free(&mut self, entity: EntityId) -> Option<EntityRecord> {
        let slot = self.slot_mut(entity)?;
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index());
        self.live -= 1;
        Some(record)
    }

    pub fn get(&self, entity: EntityId) -> Option<&EntityRecord> {
        let slot = self.slots.get(entity.index() as usize)?;
        if slot.generation != entity.generation() {
            return None;
        }
        slot.record.as_ref()
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut EntityRecord> {
        self.slot_mut(entity)?.record.as_mut()
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.get(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityRecord)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.record
                .as_ref()
                .map(|record| (EntityId::new(index as u32, slot.generation), record))
        })
    }

    fn slot_mut(&mut self, entity: EntityId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(entity.index() as usize)?;
        (slot.generation == entity.generation()).then_some(slot)
    }
}

/// Called at the destruction stage, before any `on_remove` hook of the entity.
pub type DeathHandler = fn(&mut World, EntityId);

/// Static schema of an entity type.
#[derive(Clone)]
pub struct EntityTypeInfo {
    pub name: &'static str,
    required: Vec<(TypeId, &'static str)>,
    pub death_handler: Option<DeathHandler>,
}

impl EntityTypeInfo {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            required: Vec::new(),
            death_handler: None,
        }
    }

    /// Every entity of this type must be spawned with a `T`.
    pub fn require<T: Component>(mut self) -> Self {
        self.required.push((TypeId::of::<T>(), type_name::<T>()));
        self
    }

    pub fn on_death(mut self, handler: DeathHandler) -> Self {
        self.death_handler = Some(handler);
        self
    }

    pub fn required_components(&self) -> impl Iterator<Item = (TypeId, &'static str)> + '_ {
        self.required.iter().copied()
    }
}

impl fmt::Debug for EntityTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTypeInfo")
            .field("name", &self.name)
            .field(
                "required",
                &self.required.iter().map(|(_, name)| *name).collect::<Vec<_>>(),
            )
            .field("has_death_handler", &self.death_handler.is_some())
            .finish()
    }
}

/// Registration table from entity type to its schema and death handler.
#[derive(Debug, Default)]
pub struct EntityTypeRegistry {
    types: HashMap<EntityType, EntityTypeInfo>,
}

impl EntityTypeRegistry {
    /// Returns `false` if the type was already registered.
    pub fn register(&mut self, entity_type: EntityType, info: EntityTypeInfo) -> bool {
        if self.types.contains_key(&entity_type) {
            return false;
        }
        info!("Registered entity type {} ({})", entity_type, info.name);
        self.types.insert(entity_type, info);
        true
    }

    pub fn get(&self, entity_type: EntityType) -> Option<&EntityTypeInfo> {
        self.types.get(&entity_type)
    }

    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.types.contains_key(&entity_type)
    }

    pub fn death_handler(&self, entity_type: EntityType) -> Option<DeathHandler> {
        self.types.get(&entity_type).and_then(|info| info.death_handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EntityRecord {
        EntityRecord {
            entity_type: EntityType(1),
            collision_group: CollisionGroup::Default,
            state: EntityState::Active,
        }
    }

    #[test]
    fn test_entity_id_packing() {
        let id = EntityId::new(42, 7);
        assert_eq!(id.index(), 42);
        assert_eq!(id.generation(), 7);
        assert_eq!(EntityId::from_bits(id.to_bits()), id);
        assert_eq!(id.to_string(), "42v7");
    }

    #[test]
    fn test_freed_slot_is_reused_with_new_generation() {
        let mut allocator = EntityAllocator::new();
        let first = allocator.allocate(record());
        let _second = allocator.allocate(record());

        assert!(allocator.free(first).is_some());
        let reused = allocator.allocate(record());

        assert_eq!(reused.index(), first.index());
        assert_ne!(reused.generation(), first.generation());
        assert!(!allocator.is_alive(first));
        assert!(allocator.is_alive(reused));
        assert_eq!(allocator.len(), 2);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut allocator = EntityAllocator::new();
        let entity = allocator.allocate(record());

        assert!(allocator.free(entity).is_some());
        assert!(allocator.free(entity).is_none());
        assert!(allocator.is_empty());
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut allocator = EntityAllocator::new();
        let a = allocator.allocate(record());
        let b = allocator.allocate(record());
        let c = allocator.allocate(record());
        allocator.free(b);

        let live: Vec<EntityId> = allocator.iter().map(|(id, _)| id).collect();
        assert_eq!(live, vec![a, c]);
    }

    #[test]
    fn test_type_registry_rejects_duplicates() {
        let mut registry = EntityTypeRegistry::default();
        assert!(registry.register(EntityType(3), EntityTypeInfo::new("cow")));
        assert!(!registry.register(EntityType(3), EntityTypeInfo::new("other cow")));
        assert_eq!(registry.get(EntityType(3)).map(|info| info.name), Some("cow"));
        assert!(registry.death_handler(EntityType(3)).is_none());
    }
}
