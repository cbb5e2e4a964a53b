//! Spatial queries for gameplay and AI collaborators.
//!
//! Range and point queries only visit the chunks overlapping the query area.
//! An entity spanning several of those chunks is reported once, in the order
//! it was first met (chunk index order, then chunk list order).

use crate::entity::EntityId;
use crate::transform::TransformComponent;
use crate::world::World;
use shared::{hitboxes_collide, Bounds, Hitbox, Point, TileType};
use std::collections::HashSet;

impl World {
    /// Entities with a hitbox touching the circle of `radius` around `center`.
    /// Entities without hitboxes count by their position.
    pub fn entities_in_range(&self, center: Point, radius: f32) -> Vec<EntityId> {
        let mut probe = Hitbox::circle(radius);
        probe.update_placement(center, 0.0);

        self.collect_in_chunks(&Bounds::around(center, radius, radius), |transform| {
            if transform.hitboxes().is_empty() {
                transform.position().distance_to(center) <= radius
            } else {
                transform
                    .hitboxes()
                    .iter()
                    .any(|hitbox| hitboxes_collide(&probe, hitbox))
            }
        })
    }

    /// Entities with a hitbox containing `point`.
    pub fn entities_at_point(&self, point: Point) -> Vec<EntityId> {
        self.collect_in_chunks(&Bounds::around(point, 0.0, 0.0), |transform| {
            transform
                .hitboxes()
                .iter()
                .any(|hitbox| hitbox.contains_point(point))
        })
    }

    /// Indices of the chunks overlapping `bounds`, in row-major order.
    pub fn chunks_in_bounds(&self, bounds: &Bounds) -> Vec<usize> {
        self.chunks.chunks_in_bounds(bounds)
    }

    /// Whether every tile on the line from `start` to `end` is one of `types`.
    pub fn tile_raytrace_matches_types(&self, start: Point, end: Point, types: &[TileType]) -> bool {
        self.tiles.tile_raytrace_matches_types(start, end, types)
    }

    pub fn raytrace_has_wall(&self, start: Point, end: Point) -> bool {
        self.tiles.raytrace_has_wall(start, end)
    }

    /// Entities `entity` collided with during the last tick.
    pub fn get_entity_collisions(&self, entity: EntityId) -> Vec<EntityId> {
        self.collisions.get_entity_collisions(entity)
    }

    fn collect_in_chunks(&self, area: &Bounds, matches: impl Fn(&TransformComponent) -> bool) -> Vec<EntityId> {
        let Ok(transforms) = self.components.array::<TransformComponent>() else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for index in self.chunks.chunks_in_bounds(area) {
            for &entity in self.chunks.chunk(index).entities() {
                if !seen.insert(entity) {
                    continue;
                }
                let Some(transform) = transforms.get(entity) else {
                    continue;
                };
                if transform.bounds().overlaps(area) && matches(transform) {
                    found.push(entity);
                }
            }
        }
        found
    }
}
