//! # Physics
//!
//! Movement integration and positional correction for entities carrying a
//! [`PhysicsComponent`]. Integration only writes position and rotation and
//! marks the transform dirty; hitboxes and chunks are brought up to date by
//! the dirty-resolution stage that follows.
//!
//! ## Separation
//! Overlapping soft hitboxes share the correction by mass: each side moves
//! `overlap * other_mass / (own_mass + other_mass)` away from the other.
//! A side that cannot move (immovable, or no physics at all) leaves the whole
//! correction to the other side. Hard hitboxes are never pushed by soft ones
//! and stop any velocity heading into them.

use crate::component::{Component, HitboxCollision, Packet};
use crate::entity::EntityId;
use crate::error::WorldResult;
use crate::transform::TransformComponent;
use crate::world::World;
use shared::{angle_difference, hitbox_contact, normalize_angle, Hitbox, Point, RIVER_FLOW_FORCE};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsComponent {
    pub velocity: Point,
    /// Self-propelled acceleration, scaled by the tile's speed multiplier.
    pub acceleration: Point,
    pub angular_velocity: f32,
    /// Rotation the entity turns toward at `turn_speed` radians per second.
    pub target_rotation: Option<f32>,
    pub turn_speed: f32,
    /// Ignores tile friction, speed multipliers and river flow.
    pub ignores_tile_effects: bool,
    /// Never displaced by collisions.
    pub is_immovable: bool,
}

impl PhysicsComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_velocity(mut self, velocity: Point) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Point) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_turn(mut self, target_rotation: f32, turn_speed: f32) -> Self {
        self.target_rotation = Some(normalize_angle(target_rotation));
        self.turn_speed = turn_speed;
        self
    }

    pub fn immovable(mut self) -> Self {
        self.is_immovable = true;
        self
    }

    pub fn ignoring_tile_effects(mut self) -> Self {
        self.ignores_tile_effects = true;
        self
    }
}

impl Component for PhysicsComponent {
    fn on_join(world: &mut World, entity: EntityId) {
        let chunks = match world.try_get_component::<TransformComponent>(entity) {
            Some(transform) => transform.chunks().to_vec(),
            None => return,
        };
        for index in chunks {
            world.chunks.add_physics_entity(index, entity);
        }
    }

    fn on_remove(world: &mut World, entity: EntityId) {
        let chunks = match world.try_get_component::<TransformComponent>(entity) {
            Some(transform) => transform.chunks().to_vec(),
            None => return,
        };
        for index in chunks {
            world.chunks.remove_physics_entity(index, entity);
        }
    }

    fn data_length(&self) -> usize {
        Packet::encoded_len(&(self.velocity, self.angular_velocity)).unwrap_or(0)
    }

    fn add_data_to_packet(&self, packet: &mut Packet) -> WorldResult<()> {
        packet.write(&(self.velocity, self.angular_velocity))
    }
}

/// Applies angular velocity and turns toward the target rotation.
pub(crate) fn integrate_rotation(world: &mut World) -> WorldResult<()> {
    let dt = world.config.delta_time();
    let (transforms, physics_store) = world
        .components
        .pair_mut::<TransformComponent, PhysicsComponent>()?;

    for (entity, physics) in physics_store.iter_mut() {
        let Some(transform) = transforms.get_mut(entity) else {
            continue;
        };

        let mut rotation = transform.rotation();
        let mut turned = false;

        if physics.angular_velocity != 0.0 {
            rotation += physics.angular_velocity * dt;
            turned = true;
        }

        if let Some(target) = physics.target_rotation {
            let difference = angle_difference(rotation, target);
            let step = physics.turn_speed * dt;
            if difference.abs() <= step {
                turned |= difference != 0.0;
                rotation = target;
            } else {
                rotation += step * difference.signum();
                turned = true;
            }
        }

        if turned {
            transform.set_rotation(rotation);
        }
    }
    Ok(())
}

/// Acceleration, friction and river flow into velocity, then velocity into
/// position.
pub(crate) fn integrate_position(world: &mut World) -> WorldResult<()> {
    let dt = world.config.delta_time();
    let World {
        components,
        tiles,
        chunks,
        ..
    } = world;
    let (transforms, physics_store) = components.pair_mut::<TransformComponent, PhysicsComponent>()?;

    for (entity, physics) in physics_store.iter_mut() {
        let Some(transform) = transforms.get_mut(entity) else {
            continue;
        };
        let position = transform.position();

        if physics.ignores_tile_effects {
            physics.velocity += physics.acceleration * dt;
        } else {
            let (tile_x, tile_y) = tiles.tile_coords_at(position);
            let tile_type = tiles.tile_type(tile_x, tile_y);

            physics.velocity += physics.acceleration * (tile_type.move_speed_multiplier() * dt);
            let damping = 1.0 - (tile_type.friction() * dt).min(1.0);
            physics.velocity = physics.velocity * damping;

            if let Some(flow) = tiles.flow_direction(tile_x, tile_y) {
                let chunk = chunks.chunk(chunks.chunk_index_at(position));
                let on_stepping_stone = chunk
                    .stepping_stones()
                    .iter()
                    .any(|&i| tiles.stepping_stones()[i].contains(position));
                if !on_stepping_stone {
                    physics.velocity += Point::from_angle(RIVER_FLOW_FORCE * dt, flow);
                }
            }
        }

        if !physics.velocity.is_zero() {
            transform.translate(physics.velocity * dt);
        }
    }
    Ok(())
}

/// Pushes a physics entity out of wall tiles and back inside the world border.
/// The velocity component along the dominant push axis is zeroed.
/// Returns whether the entity moved.
pub(crate) fn resolve_world_collisions(world: &mut World, entity: EntityId) -> bool {
    let world_units = world.config.world_units();
    let tile_size = world.tiles.tile_size();
    let World { components, tiles, .. } = world;
    let Ok((transforms, physics_store)) = components.pair_mut::<TransformComponent, PhysicsComponent>() else {
        return false;
    };
    let (Some(transform), Some(physics)) = (transforms.get_mut(entity), physics_store.get_mut(entity)) else {
        return false;
    };

    let mut moved = false;

    for i in 0..transform.hitboxes().len() {
        if transform.hitboxes()[i].ignores_walls() {
            continue;
        }

        for (tile_x, tile_y) in tiles.tiles_in_bounds(&transform.hitboxes()[i].bounds()) {
            if !tiles.is_wall(tile_x, tile_y) {
                continue;
            }
            let tile_bounds = tiles.tile_bounds(tile_x, tile_y);
            let mut wall = Hitbox::rectangle(tile_size, tile_size);
            wall.update_placement(
                Point::new(
                    (tile_bounds.min_x + tile_bounds.max_x) / 2.0,
                    (tile_bounds.min_y + tile_bounds.max_y) / 2.0,
                ),
                0.0,
            );

            let Some(contact) = hitbox_contact(&transform.hitboxes()[i], &wall) else {
                continue;
            };
            if contact.overlap <= 0.0 {
                continue;
            }

            transform.translate(-contact.axis * contact.overlap);
            zero_dominant_axis(&mut physics.velocity, contact.axis);
            transform.clean_hitboxes();
            moved = true;
        }
    }

    let bounds = transform.bounds();
    let mut correction = Point::ZERO;
    if bounds.min_x < 0.0 {
        correction.x = -bounds.min_x;
    } else if bounds.max_x > world_units {
        correction.x = world_units - bounds.max_x;
    }
    if bounds.min_y < 0.0 {
        correction.y = -bounds.min_y;
    } else if bounds.max_y > world_units {
        correction.y = world_units - bounds.max_y;
    }

    if correction.x != 0.0 {
        physics.velocity.x = 0.0;
    }
    if correction.y != 0.0 {
        physics.velocity.y = 0.0;
    }
    if !correction.is_zero() {
        transform.translate(correction);
        moved = true;
    }

    moved
}

fn zero_dominant_axis(velocity: &mut Point, axis: Point) {
    if axis.x.abs() >= axis.y.abs() {
        velocity.x = 0.0;
    } else {
        velocity.y = 0.0;
    }
}

impl World {
    /// Moves `entity` its share of a hitbox overlap away from `other`.
    pub(crate) fn apply_push(&mut self, entity: EntityId, other: EntityId, collision: &HitboxCollision) -> WorldResult<()> {
        let (transforms, physics_store) = self
            .components
            .pair_mut::<TransformComponent, PhysicsComponent>()?;

        let Some(physics) = physics_store.get(entity) else {
            return Ok(());
        };
        if physics.is_immovable {
            return Ok(());
        }
        let other_is_anchored = physics_store.get(other).map_or(true, |p| p.is_immovable);

        let (Some(own_transform), Some(other_transform)) = (transforms.get(entity), transforms.get(other)) else {
            return Ok(());
        };
        let (Some(own_hitbox), Some(other_hitbox)) = (
            own_transform.hitboxes().get(collision.own_hitbox),
            other_transform.hitboxes().get(collision.other_hitbox),
        ) else {
            return Ok(());
        };
        if own_hitbox.ignores_pushing() || other_hitbox.ignores_pushing() {
            return Ok(());
        }

        let share = if other_is_anchored || (other_hitbox.is_hard() && !own_hitbox.is_hard()) {
            1.0
        } else if own_hitbox.is_hard() && !other_hitbox.is_hard() {
            0.0
        } else {
            let total_mass = own_hitbox.mass + other_hitbox.mass;
            if total_mass > 0.0 {
                other_hitbox.mass / total_mass
            } else {
                0.5
            }
        };
        if share == 0.0 {
            return Ok(());
        }
        let blocks = other_hitbox.is_hard();

        let displacement = -collision.axis * (collision.overlap * share);
        if let Some(transform) = transforms.get_mut(entity) {
            transform.translate(displacement);
        }
        if blocks {
            if let Some(physics) = physics_store.get_mut(entity) {
                let into_contact = physics.velocity.dot(collision.axis);
                if into_contact > 0.0 {
                    physics.velocity -= collision.axis * into_contact;
                }
            }
        }

        self.clean_transform(entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::entity::{EntityType, EntityTypeInfo};
    use crate::layer::{RiverSteppingStone, TileMapData};
    use assert_approx_eq::assert_approx_eq;
    use shared::TileType;
    use std::f32::consts::PI;

    const MOVER: EntityType = EntityType(1);

    fn config() -> WorldConfig {
        WorldConfig {
            world_size_tiles: 16,
            chunk_size_tiles: 4,
            tile_size: 10.0,
            tick_rate: 10,
        }
    }

    fn world_with(data: TileMapData) -> World {
        let mut world = World::new(config(), data).unwrap();
        world
            .register_entity_type(MOVER, EntityTypeInfo::new("mover"))
            .unwrap();
        world
    }

    fn spawn(world: &mut World, position: Point, physics: PhysicsComponent) -> EntityId {
        let entity = world
            .build_entity(MOVER)
            .with(TransformComponent::new(position).with_hitbox(Hitbox::circle(2.0)))
            .with(physics)
            .join()
            .unwrap();
        world.tick().unwrap();
        entity
    }

    #[test]
    fn test_turns_toward_target_at_turn_speed() {
        let mut world = world_with(TileMapData::flat(16));
        let entity = spawn(&mut world, Point::new(50.0, 50.0), PhysicsComponent::new().with_turn(PI / 2.0, 5.0));

        // Joining doesn't integrate
        assert_approx_eq!(world.get_component::<TransformComponent>(entity).rotation(), 0.0, 1e-6);
        world.tick().unwrap();
        assert_approx_eq!(world.get_component::<TransformComponent>(entity).rotation(), 0.5, 1e-5);
        for _ in 0..5 {
            world.tick().unwrap();
        }
        assert_approx_eq!(world.get_component::<TransformComponent>(entity).rotation(), PI / 2.0, 1e-5);
    }

    #[test]
    fn test_rotation_wraps_into_range() {
        let mut world = world_with(TileMapData::flat(16));
        let entity = spawn(&mut world, Point::new(50.0, 50.0), PhysicsComponent {
            angular_velocity: 10.0,
            ..PhysicsComponent::new()
        });
        for _ in 0..7 {
            world.tick().unwrap();
        }
        let rotation = world.get_component::<TransformComponent>(entity).rotation();
        assert!((-PI..PI).contains(&rotation));
        assert_approx_eq!(rotation, normalize_angle(7.0), 1e-4);
    }

    #[test]
    fn test_friction_damps_velocity() {
        let mut world = world_with(TileMapData::flat(16));
        let entity = spawn(
            &mut world,
            Point::new(50.0, 50.0),
            PhysicsComponent::new().with_velocity(Point::new(10.0, 0.0)),
        );
        world.tick().unwrap();

        // Grass friction 3.0 over a 0.1s step keeps 70% of the velocity
        let velocity = world.get_component::<PhysicsComponent>(entity).velocity;
        assert_approx_eq!(velocity.x, 7.0, 1e-4);
        let position = world.get_component::<TransformComponent>(entity).position();
        assert_approx_eq!(position.x, 50.7, 1e-4);
    }

    #[test]
    fn test_ignoring_tile_effects_skips_friction() {
        let mut world = world_with(TileMapData::flat(16));
        let entity = spawn(
            &mut world,
            Point::new(50.0, 50.0),
            PhysicsComponent::new()
                .with_velocity(Point::new(10.0, 0.0))
                .ignoring_tile_effects(),
        );
        world.tick().unwrap();
        assert_approx_eq!(world.get_component::<PhysicsComponent>(entity).velocity.x, 10.0, 1e-6);
    }

    fn river() -> TileMapData {
        let mut data = TileMapData::flat(16);
        for i in 0..data.tile_types.len() {
            data.tile_types[i] = TileType::Water;
            data.flow_directions[i] = Some(0.0);
        }
        data
    }

    #[test]
    fn test_river_flow_carries_entities() {
        let mut world = world_with(river());
        let entity = spawn(&mut world, Point::new(50.0, 50.0), PhysicsComponent::new());
        world.tick().unwrap();

        let velocity = world.get_component::<PhysicsComponent>(entity).velocity;
        assert!(velocity.x > 0.0);
        assert_approx_eq!(velocity.y, 0.0, 1e-4);
    }

    #[test]
    fn test_stepping_stone_shelters_from_flow() {
        let mut data = river();
        data.stepping_stones.push(RiverSteppingStone {
            position: Point::new(50.0, 50.0),
            radius: 8.0,
        });
        let mut world = world_with(data);
        let entity = spawn(&mut world, Point::new(50.0, 50.0), PhysicsComponent::new());
        world.tick().unwrap();

        assert!(world.get_component::<PhysicsComponent>(entity).velocity.is_zero());
    }

    #[test]
    fn test_wall_pushes_entity_out() {
        let mut data = TileMapData::flat(16);
        // Wall tile spanning x 60..70 on row 5
        data.walls[5 * 16 + 6] = true;
        let mut world = world_with(data);

        let entity = spawn(
            &mut world,
            Point::new(57.0, 55.0),
            PhysicsComponent::new().with_velocity(Point::new(20.0, 0.0)),
        );
        // Friction leaves 14 units/s, enough to carry the circle 0.4 into the wall
        world.tick().unwrap();

        let transform = world.get_component::<TransformComponent>(entity);
        assert!(transform.position().x <= 58.0 + 1e-4);
        assert_approx_eq!(world.get_component::<PhysicsComponent>(entity).velocity.x, 0.0, 1e-6);
    }

    #[test]
    fn test_world_border_clamps() {
        let mut world = world_with(TileMapData::flat(16));
        let entity = spawn(
            &mut world,
            Point::new(3.0, 80.0),
            PhysicsComponent::new()
                .with_velocity(Point::new(-100.0, 0.0))
                .ignoring_tile_effects(),
        );
        world.tick().unwrap();

        let bounds = world.get_component::<TransformComponent>(entity).bounds();
        assert_approx_eq!(bounds.min_x, 0.0, 1e-4);
        assert_eq!(world.get_component::<PhysicsComponent>(entity).velocity.x, 0.0);
    }
}
