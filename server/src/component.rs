//! # Component Hooks
//!
//! Every kind of per-entity data implements [`Component`]. The hooks are
//! associated functions rather than methods: they receive the whole world and
//! the entity id and re-fetch whatever they need, so no hook ever holds a
//! borrow into a store while the scheduler is iterating it.
//!
//! ## Hook Timing
//! - `on_join`: after the component was promoted from its pending buffer
//!   (join stage).
//! - `on_tick`: tick dispatch, for [`Tickable`] components only.
//! - `on_entity_collision`, `on_hitbox_collision`: collision resolution.
//! - `on_remove`: before the component is physically removed (deactivation
//!   or destruction stage).
//!
//! Hooks may add components, queue removals and destroy entities. Those
//! requests are buffered and take effect at the next scheduler boundary.

use crate::entity::EntityId;
use crate::error::WorldResult;
use crate::world::World;
use serde::Serialize;
use shared::Point;

pub trait Component: 'static {
    fn on_join(_world: &mut World, _entity: EntityId) {}

    fn on_remove(_world: &mut World, _entity: EntityId) {}

    /// Fired once per resolved entity pair, from this entity's side.
    fn on_entity_collision(_world: &mut World, _entity: EntityId, _other: EntityId) {}

    /// Fired for every colliding hitbox pair touching one of this entity's hitboxes.
    fn on_hitbox_collision(
        _world: &mut World,
        _entity: EntityId,
        _other: EntityId,
        _collision: &HitboxCollision,
    ) {
    }

    /// Number of bytes [`Component::add_data_to_packet`] will write.
    fn data_length(&self) -> usize {
        0
    }

    fn add_data_to_packet(&self, _packet: &mut Packet) -> WorldResult<()> {
        Ok(())
    }
}

/// Components that run logic every `TICK_INTERVAL` ticks.
pub trait Tickable: Component {
    const TICK_INTERVAL: u32 = 1;

    fn on_tick(world: &mut World, entity: EntityId);
}

/// One colliding hitbox pair, seen from the entity receiving the hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxCollision {
    /// Index of the receiving entity's hitbox in its transform.
    pub own_hitbox: usize,
    /// Index of the other entity's hitbox in its transform.
    pub other_hitbox: usize,
    pub point: Point,
    /// Unit axis pointing from the own hitbox toward the other one.
    pub axis: Point,
    pub overlap: f32,
}

/// Byte buffer handed to the serialization hooks.
///
/// The layout of what components write is owned by the networking layer;
/// this type only encodes values and tracks length.
#[derive(Debug, Default, Clone)]
pub struct Packet {
    buffer: Vec<u8>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> WorldResult<()> {
        bincode::serialize_into(&mut self.buffer, value)?;
        Ok(())
    }

    /// Size `value` takes once written.
    pub fn encoded_len<T: Serialize>(value: &T) -> WorldResult<usize> {
        Ok(bincode::serialized_size(value)? as usize)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_length_matches_encoded_len() {
        let mut packet = Packet::new();
        let value = (Point::new(1.0, 2.0), 0.5_f32, 3_u32);

        packet.write(&value).unwrap();
        assert_eq!(packet.len(), Packet::encoded_len(&value).unwrap());
        assert_eq!(packet.len(), 16);
    }

    #[test]
    fn test_packet_appends() {
        let mut packet = Packet::with_capacity(8);
        packet.write(&1_u32).unwrap();
        packet.write(&2_u32).unwrap();

        assert_eq!(packet.as_bytes(), &[1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(packet.into_bytes().len(), 8);
    }
}
