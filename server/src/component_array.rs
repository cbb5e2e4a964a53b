//! Dense per-type component storage with buffered join and removal.

use crate::entity::EntityId;
use std::collections::HashMap;

#[derive(Debug)]
struct PendingComponent<T> {
    entity: EntityId,
    component: T,
    remaining_ticks: u32,
}

/// Active components packed contiguously, plus the buffers that feed and
/// drain them.
///
/// Active storage only changes through [`ComponentArray::flush_pending`] and
/// [`ComponentArray::remove_now`], both called by the scheduler. Everything
/// else enqueues.
#[derive(Debug)]
pub struct ComponentArray<T> {
    components: Vec<T>,
    entities: Vec<EntityId>,
    index: HashMap<EntityId, usize>,
    /// Ordered by remaining delay; equal delays keep insertion order.
    pending: Vec<PendingComponent<T>>,
    removal_queue: Vec<EntityId>,
}

impl<T> Default for ComponentArray<T> {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            entities: Vec::new(),
            index: HashMap::new(),
            pending: Vec::new(),
            removal_queue: Vec::new(),
        }
    }
}

impl<T> ComponentArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers a component. It becomes active at the join flush that runs
    /// `join_delay` ticks from now.
    pub fn add(&mut self, entity: EntityId, component: T, join_delay: u32) {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.remaining_ticks > join_delay)
            .unwrap_or(self.pending.len());
        self.pending.insert(
            position,
            PendingComponent {
                entity,
                component,
                remaining_ticks: join_delay,
            },
        );
    }

    pub fn has(&self, entity: EntityId) -> bool {
        self.index.contains_key(&entity)
    }

    pub fn has_pending(&self, entity: EntityId) -> bool {
        self.pending.iter().any(|pending| pending.entity == entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.index.get(&entity).map(|&i| &self.components[i])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        match self.index.get(&entity) {
            Some(&i) => Some(&mut self.components[i]),
            None => None,
        }
    }

    /// Marks an active component for removal at the next flush.
    /// Returns `false` if there was nothing new to mark.
    pub fn queue_removal(&mut self, entity: EntityId) -> bool {
        if !self.has(entity) || self.removal_queue.contains(&entity) {
            return false;
        }
        self.removal_queue.push(entity);
        true
    }

    pub fn is_queued_for_removal(&self, entity: EntityId) -> bool {
        self.removal_queue.contains(&entity)
    }

    pub fn take_removal_queue(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.removal_queue)
    }

    /// Swaps the last active component into the removed slot.
    pub fn remove_now(&mut self, entity: EntityId) -> Option<T> {
        let i = self.index.remove(&entity)?;
        let component = self.components.swap_remove(i);
        self.entities.swap_remove(i);
        if let Some(&moved) = self.entities.get(i) {
            self.index.insert(moved, i);
        }
        Some(component)
    }

    /// Drops a component that has not joined yet.
    pub fn discard_pending(&mut self, entity: EntityId) -> Option<T> {
        let position = self.pending.iter().position(|pending| pending.entity == entity)?;
        Some(self.pending.remove(position).component)
    }

    /// Promotes every pending component whose delay has elapsed and counts
    /// the rest down by one tick. Returns the promoted entities in order.
    pub fn flush_pending(&mut self) -> Vec<EntityId> {
        let ready = self
            .pending
            .iter()
            .take_while(|pending| pending.remaining_ticks == 0)
            .count();

        let mut promoted = Vec::with_capacity(ready);
        for pending in self.pending.drain(..ready) {
            self.index.insert(pending.entity, self.components.len());
            self.components.push(pending.component);
            self.entities.push(pending.entity);
            promoted.push(pending.entity);
        }

        for pending in &mut self.pending {
            pending.remaining_ticks -= 1;
        }
        promoted
    }

    /// Active entities in storage order.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.components.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.components.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
