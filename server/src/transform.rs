//! # Transform Component
//!
//! Position, rotation and the hitboxes an entity owns. The hitboxes' world
//! placement and the entity's bounding box are derived: they are recomputed
//! when the transform is cleaned and never read stale by the collision
//! pipeline, which only runs after every dirty transform was cleaned.
//!
//! ## Chunk Membership
//! `chunks` always equals the chunks overlapping `bounds`. The transform joins
//! its chunks when it is promoted and leaves all of them when it is removed.

use crate::chunk::ChunkMember;
use crate::component::{Component, Packet};
use crate::entity::EntityId;
use crate::error::WorldResult;
use crate::physics::PhysicsComponent;
use crate::world::World;
use shared::{normalize_angle, Bounds, Hitbox, Point, DEFAULT_COLLISION_BIT, DEFAULT_COLLISION_MASK};

#[derive(Debug, Clone)]
pub struct TransformComponent {
    position: Point,
    rotation: f32,
    hitboxes: Vec<Hitbox>,
    bounds: Bounds,
    /// Sorted indices of the chunks `bounds` overlaps.
    chunks: Vec<usize>,
    /// What this entity is, checked before any hitbox test.
    pub collision_bit: u32,
    /// What this entity can hit.
    pub collision_mask: u32,
    is_dirty: bool,
    hitboxes_dirty: bool,
    filed_collision_relevant: bool,
}

impl TransformComponent {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            rotation: 0.0,
            hitboxes: Vec::new(),
            bounds: Bounds::around(position, 0.0, 0.0),
            chunks: Vec::new(),
            collision_bit: DEFAULT_COLLISION_BIT,
            collision_mask: DEFAULT_COLLISION_MASK,
            is_dirty: true,
            hitboxes_dirty: true,
            filed_collision_relevant: false,
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = normalize_angle(rotation);
        self
    }

    pub fn with_hitbox(mut self, hitbox: Hitbox) -> Self {
        self.add_hitbox(hitbox);
        self
    }

    pub fn with_collision(mut self, bit: u32, mask: u32) -> Self {
        self.collision_bit = bit;
        self.collision_mask = mask;
        self
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Moves the entity. Hitboxes and chunks follow at the next dirty resolution.
    pub fn set_position(&mut self, position: Point) {
        self.position = position;
        self.is_dirty = true;
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = normalize_angle(rotation);
        self.is_dirty = true;
    }

    pub(crate) fn translate(&mut self, offset: Point) {
        self.position += offset;
        self.is_dirty = true;
    }

    pub fn add_hitbox(&mut self, hitbox: Hitbox) {
        self.hitboxes.push(hitbox);
        self.hitboxes_dirty = true;
    }

    pub fn remove_hitbox(&mut self, index: usize) -> Option<Hitbox> {
        if index >= self.hitboxes.len() {
            return None;
        }
        self.hitboxes_dirty = true;
        Some(self.hitboxes.remove(index))
    }

    pub fn hitboxes(&self) -> &[Hitbox] {
        &self.hitboxes
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn chunks(&self) -> &[usize] {
        &self.chunks
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty || self.hitboxes_dirty
    }

    /// Whether any hitbox takes part in pushing.
    pub fn is_collision_relevant(&self) -> bool {
        self.hitboxes.iter().any(|hitbox| !hitbox.ignores_pushing())
    }

    /// Bit/mask gate between two entities; both sides must accept the other.
    pub fn can_collide_with(&self, other: &TransformComponent) -> bool {
        (self.collision_mask & other.collision_bit) != 0 && (other.collision_mask & self.collision_bit) != 0
    }

    /// Recomputes hitbox placement and the bounding box.
    pub fn clean_hitboxes(&mut self) {
        let mut bounds = Bounds::EMPTY;
        for hitbox in &mut self.hitboxes {
            hitbox.update_placement(self.position, self.rotation);
            bounds = bounds.union(&hitbox.bounds());
        }
        if self.hitboxes.is_empty() {
            bounds = Bounds::around(self.position, 0.0, 0.0);
        }
        self.bounds = bounds;
        self.is_dirty = false;
        self.hitboxes_dirty = false;
    }
}

impl Component for TransformComponent {
    fn on_join(world: &mut World, entity: EntityId) {
        world.clean_transform(entity);
    }

    fn on_remove(world: &mut World, entity: EntityId) {
        world.remove_entity_from_chunks(entity);
    }

    fn data_length(&self) -> usize {
        Packet::encoded_len(&(self.position, self.rotation, self.hitboxes.len() as u32)).unwrap_or(0)
    }

    fn add_data_to_packet(&self, packet: &mut Packet) -> WorldResult<()> {
        packet.write(&(self.position, self.rotation, self.hitboxes.len() as u32))
    }
}

impl World {
    /// Brings hitboxes, bounds and chunk membership of `entity` up to date.
    pub(crate) fn clean_transform(&mut self, entity: EntityId) {
        if let Some(transform) = self.try_get_component_mut::<TransformComponent>(entity) {
            transform.clean_hitboxes();
        }
        self.refresh_chunk_membership(entity);
    }

    /// Diffs the chunks the entity's bounds overlap against the chunks it was
    /// filed in, and files or unfiles it accordingly.
    pub(crate) fn refresh_chunk_membership(&mut self, entity: EntityId) {
        let group = self.collision_group(entity);
        let has_physics = self.has_component::<PhysicsComponent>(entity);

        let Ok(transforms) = self.components.array_mut::<TransformComponent>() else {
            return;
        };
        let Some(transform) = transforms.get_mut(entity) else {
            return;
        };

        let relevant = transform.is_collision_relevant();
        let was_relevant = std::mem::replace(&mut transform.filed_collision_relevant, relevant);
        let new_chunks = self.chunks.chunks_in_bounds(&transform.bounds);
        let old_chunks = std::mem::replace(&mut transform.chunks, new_chunks);

        let member = ChunkMember {
            entity,
            group,
            collision_relevant: relevant,
            has_physics,
        };

        for &index in &old_chunks {
            if transform.chunks.binary_search(&index).is_err() {
                self.chunks.remove_member(index, entity);
            } else if was_relevant != relevant {
                self.chunks.set_collision_relevant(index, entity, relevant);
            }
        }
        for &index in &transform.chunks {
            if old_chunks.binary_search(&index).is_err() {
                self.chunks.add_member(index, &member);
            }
        }
    }

    pub(crate) fn remove_entity_from_chunks(&mut self, entity: EntityId) {
        let Some(transform) = self.try_get_component_mut::<TransformComponent>(entity) else {
            return;
        };
        let chunks = std::mem::take(&mut transform.chunks);
        transform.filed_collision_relevant = false;
        for index in chunks {
            self.chunks.remove_member(index, entity);
        }
    }
}
