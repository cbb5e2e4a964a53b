//! Type-erased table of component stores.
//!
//! Stores are kept in registration order, which is also the order hooks fire
//! in whenever more than one store is involved (join, collision, destruction).
//! Whether a store is ticked is decided by which `register` call created it,
//! so the scheduler never probes a store for an `on_tick` at runtime.

use crate::component::{Component, HitboxCollision, Packet, Tickable};
use crate::component_array::ComponentArray;
use crate::entity::EntityId;
use crate::error::{WorldError, WorldResult};
use crate::world::World;
use log::info;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

pub type EntityHook = fn(&mut World, EntityId);
pub type EntityCollisionHook = fn(&mut World, EntityId, EntityId);
pub type HitboxCollisionHook = fn(&mut World, EntityId, EntityId, &HitboxCollision);

#[derive(Clone, Copy)]
pub enum StoreKind {
    Passive,
    Ticked { interval: u32, on_tick: EntityHook },
}

/// Store operations that don't need the component type.
pub(crate) trait ErasedArray {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn has(&self, entity: EntityId) -> bool;
    fn take_removal_queue(&mut self) -> Vec<EntityId>;
    fn remove_now(&mut self, entity: EntityId) -> bool;
    fn discard_pending(&mut self, entity: EntityId) -> bool;
    fn flush_pending(&mut self) -> Vec<EntityId>;
    fn entities(&self) -> &[EntityId];
    fn data_length(&self, entity: EntityId) -> usize;
    fn add_data_to_packet(&self, entity: EntityId, packet: &mut Packet) -> WorldResult<()>;
}

impl<T: Component> ErasedArray for ComponentArray<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn has(&self, entity: EntityId) -> bool {
        ComponentArray::has(self, entity)
    }

    fn take_removal_queue(&mut self) -> Vec<EntityId> {
        ComponentArray::take_removal_queue(self)
    }

    fn remove_now(&mut self, entity: EntityId) -> bool {
        ComponentArray::remove_now(self, entity).is_some()
    }

    fn discard_pending(&mut self, entity: EntityId) -> bool {
        ComponentArray::discard_pending(self, entity).is_some()
    }

    fn flush_pending(&mut self) -> Vec<EntityId> {
        ComponentArray::flush_pending(self)
    }

    fn entities(&self) -> &[EntityId] {
        ComponentArray::entities(self)
    }

    fn data_length(&self, entity: EntityId) -> usize {
        self.get(entity).map_or(0, |component| component.data_length())
    }

    fn add_data_to_packet(&self, entity: EntityId, packet: &mut Packet) -> WorldResult<()> {
        match self.get(entity) {
            Some(component) => component.add_data_to_packet(packet),
            None => Ok(()),
        }
    }
}

/// A registered store and the hooks captured for its component type.
pub struct ComponentEntry {
    pub name: &'static str,
    pub kind: StoreKind,
    pub on_join: EntityHook,
    pub on_remove: EntityHook,
    pub on_entity_collision: EntityCollisionHook,
    pub on_hitbox_collision: HitboxCollisionHook,
    pub(crate) array: Box<dyn ErasedArray>,
}

#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<ComponentEntry>,
    lookup: HashMap<TypeId, usize>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Component>(&mut self) -> WorldResult<usize> {
        self.insert::<T>(StoreKind::Passive)
    }

    pub fn register_ticked<T: Tickable>(&mut self) -> WorldResult<usize> {
        self.insert::<T>(StoreKind::Ticked {
            interval: T::TICK_INTERVAL.max(1),
            on_tick: T::on_tick,
        })
    }

    fn insert<T: Component>(&mut self, kind: StoreKind) -> WorldResult<usize> {
        let type_id = TypeId::of::<T>();
        if self.lookup.contains_key(&type_id) {
            return Err(WorldError::ComponentAlreadyRegistered(type_name::<T>()));
        }

        let index = self.entries.len();
        self.entries.push(ComponentEntry {
            name: type_name::<T>(),
            kind,
            on_join: T::on_join,
            on_remove: T::on_remove,
            on_entity_collision: T::on_entity_collision,
            on_hitbox_collision: T::on_hitbox_collision,
            array: Box::new(ComponentArray::<T>::new()),
        });
        self.lookup.insert(type_id, index);

        info!("Registered component store {} ({})", index, type_name::<T>());
        Ok(index)
    }

    pub fn index_of<T: Component>(&self) -> Option<usize> {
        self.index_of_type(TypeId::of::<T>())
    }

    pub fn index_of_type(&self, type_id: TypeId) -> Option<usize> {
        self.lookup.get(&type_id).copied()
    }

    pub fn array<T: Component>(&self) -> WorldResult<&ComponentArray<T>> {
        self.index_of::<T>()
            .and_then(|index| self.entries[index].array.as_any().downcast_ref())
            .ok_or(WorldError::UnregisteredComponent(type_name::<T>()))
    }

    pub fn array_mut<T: Component>(&mut self) -> WorldResult<&mut ComponentArray<T>> {
        let array = match self.index_of::<T>() {
            Some(index) => self.entries[index].array.as_any_mut().downcast_mut(),
            None => None,
        };
        array.ok_or(WorldError::UnregisteredComponent(type_name::<T>()))
    }

    /// Mutable access to two different stores at once.
    ///
    /// # Panics
    /// Panics if `A` and `B` are the same type.
    pub fn pair_mut<A: Component, B: Component>(
        &mut self,
    ) -> WorldResult<(&mut ComponentArray<A>, &mut ComponentArray<B>)> {
        let a = self
            .index_of::<A>()
            .ok_or(WorldError::UnregisteredComponent(type_name::<A>()))?;
        let b = self
            .index_of::<B>()
            .ok_or(WorldError::UnregisteredComponent(type_name::<B>()))?;
        assert_ne!(a, b, "pair_mut needs two distinct component types");

        let (first, second) = if a < b {
            let (low, high) = self.entries.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.entries.split_at_mut(a);
            (&mut high[0], &mut low[b])
        };

        let first = first
            .array
            .as_any_mut()
            .downcast_mut()
            .ok_or(WorldError::UnregisteredComponent(type_name::<A>()))?;
        let second = second
            .array
            .as_any_mut()
            .downcast_mut()
            .ok_or(WorldError::UnregisteredComponent(type_name::<B>()))?;
        Ok((first, second))
    }

    pub fn entries(&self) -> &[ComponentEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ComponentEntry] {
        &mut self.entries
    }

    pub fn entry(&self, index: usize) -> &ComponentEntry {
        &self.entries[index]
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut ComponentEntry {
        &mut self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hooks of every store holding an active component for `entity`,
    /// in registration order.
    pub fn hooks_for<H: Copy>(&self, entity: EntityId, select: impl Fn(&ComponentEntry) -> H) -> Vec<H> {
        self.entries
            .iter()
            .filter(|entry| entry.array.has(entity))
            .map(select)
            .collect()
    }
}
