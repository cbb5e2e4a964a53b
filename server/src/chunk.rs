//! # Spatial Chunk Grid
//!
//! The world is cut into a fixed square grid of chunks. Each chunk keeps the
//! entities whose bounding box overlaps it, plus filtered sub-lists so the
//! collision broad phase and gameplay queries never scan the whole world.
//!
//! ## Viewers
//! AI entities register the chunks they are watching. Every entity entering a
//! watched chunk bumps a per-viewer reference count; leaving drops it. An
//! entity spanning several watched chunks therefore stays visible until it has
//! left the last of them.

use crate::collision::CollisionGroup;
use crate::config::WorldConfig;
use crate::entity::EntityId;
use crate::layer::TileMap;
use shared::{Bounds, Point};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone)]
pub struct Chunk {
    entities: Vec<EntityId>,
    collision_relevant: Vec<EntityId>,
    physics_entities: Vec<EntityId>,
    by_group: [Vec<EntityId>; CollisionGroup::COUNT],
    viewers: Vec<EntityId>,
    water_rocks: Vec<usize>,
    stepping_stones: Vec<usize>,
}

impl Chunk {
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Entities with at least one hitbox that pushes or gets pushed.
    ///
    /// The tick reads the per-group lists instead; this list serves gameplay
    /// and AI collaborators looking for solid neighbours.
    pub fn collision_relevant_entities(&self) -> &[EntityId] {
        &self.collision_relevant
    }

    pub fn physics_entities(&self) -> &[EntityId] {
        &self.physics_entities
    }

    pub fn entities_in_group(&self, group: CollisionGroup) -> &[EntityId] {
        &self.by_group[group.index()]
    }

    pub fn viewers(&self) -> &[EntityId] {
        &self.viewers
    }

    /// Indices into [`TileMap::water_rocks`] of rocks centred in this chunk.
    pub fn water_rocks(&self) -> &[usize] {
        &self.water_rocks
    }

    /// Indices into [`TileMap::stepping_stones`] of stones centred in this chunk.
    pub fn stepping_stones(&self) -> &[usize] {
        &self.stepping_stones
    }
}

/// How an entity is filed into a chunk's sub-lists.
#[derive(Debug, Clone, Copy)]
pub struct ChunkMember {
    pub entity: EntityId,
    pub group: CollisionGroup,
    pub collision_relevant: bool,
    pub has_physics: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ViewerState {
    chunks: Vec<usize>,
    potential_visible: BTreeMap<EntityId, u32>,
}

impl ViewerState {
    pub fn chunks(&self) -> &[usize] {
        &self.chunks
    }
}

fn remove_from(list: &mut Vec<EntityId>, entity: EntityId) -> bool {
    match list.iter().position(|&e| e == entity) {
        Some(position) => {
            list.remove(position);
            true
        }
        None => false,
    }
}

fn increment(visible: &mut BTreeMap<EntityId, u32>, entity: EntityId) {
    *visible.entry(entity).or_insert(0) += 1;
}

fn decrement(visible: &mut BTreeMap<EntityId, u32>, entity: EntityId) {
    if let Some(count) = visible.get_mut(&entity) {
        *count -= 1;
        if *count == 0 {
            visible.remove(&entity);
        }
    }
}

#[derive(Debug)]
pub struct ChunkGrid {
    chunks_per_side: u32,
    chunk_units: f32,
    chunks: Vec<Chunk>,
    viewers: HashMap<EntityId, ViewerState>,
}

impl ChunkGrid {
    pub fn new(config: &WorldConfig, tiles: &TileMap) -> Self {
        let chunks_per_side = config.chunks_per_side();
        let count = (chunks_per_side as usize) * (chunks_per_side as usize);
        let mut grid = Self {
            chunks_per_side,
            chunk_units: config.chunk_units(),
            chunks: vec![Chunk::default(); count],
            viewers: HashMap::new(),
        };

        for (i, rock) in tiles.water_rocks().iter().enumerate() {
            let index = grid.chunk_index_at(rock.position);
            grid.chunks[index].water_rocks.push(i);
        }
        for (i, stone) in tiles.stepping_stones().iter().enumerate() {
            let index = grid.chunk_index_at(stone.position);
            grid.chunks[index].stepping_stones.push(i);
        }
        grid
    }

    pub fn chunks_per_side(&self) -> u32 {
        self.chunks_per_side
    }

    /// Row-major index, coordinates clamped onto the grid.
    pub fn chunk_index(&self, x: i32, y: i32) -> usize {
        let max = self.chunks_per_side as i32 - 1;
        let x = x.clamp(0, max) as usize;
        let y = y.clamp(0, max) as usize;
        y * self.chunks_per_side as usize + x
    }

    pub fn chunk_index_at(&self, point: Point) -> usize {
        self.chunk_index(
            (point.x / self.chunk_units).floor() as i32,
            (point.y / self.chunk_units).floor() as i32,
        )
    }

    pub fn chunk(&self, index: usize) -> &Chunk {
        &self.chunks[index]
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// World-space rectangle covered by a chunk.
    pub fn chunk_bounds(&self, index: usize) -> Bounds {
        let side = self.chunks_per_side as usize;
        let x = (index % side) as f32 * self.chunk_units;
        let y = (index / side) as f32 * self.chunk_units;
        Bounds::new(x, x + self.chunk_units, y, y + self.chunk_units)
    }

    /// Chunks overlapping `bounds` in ascending index order.
    pub fn chunks_in_bounds(&self, bounds: &Bounds) -> Vec<usize> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let max = self.chunks_per_side as i32 - 1;
        let to_chunk = |value: f32| ((value / self.chunk_units).floor() as i32).clamp(0, max);

        let (min_x, max_x) = (to_chunk(bounds.min_x), to_chunk(bounds.max_x));
        let (min_y, max_y) = (to_chunk(bounds.min_y), to_chunk(bounds.max_y));

        let mut indices = Vec::with_capacity(((max_x - min_x + 1) * (max_y - min_y + 1)) as usize);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                indices.push(self.chunk_index(x, y));
            }
        }
        indices
    }

    pub fn add_member(&mut self, index: usize, member: &ChunkMember) {
        let chunk = &mut self.chunks[index];
        chunk.entities.push(member.entity);
        chunk.by_group[member.group.index()].push(member.entity);
        if member.collision_relevant {
            chunk.collision_relevant.push(member.entity);
        }
        if member.has_physics && !chunk.physics_entities.contains(&member.entity) {
            chunk.physics_entities.push(member.entity);
        }

        for viewer in &chunk.viewers {
            if *viewer == member.entity {
                continue;
            }
            if let Some(state) = self.viewers.get_mut(viewer) {
                increment(&mut state.potential_visible, member.entity);
            }
        }
    }

    /// Drops the entity from every list of the chunk. Lists keep their order.
    pub fn remove_member(&mut self, index: usize, entity: EntityId) {
        let chunk = &mut self.chunks[index];
        if !remove_from(&mut chunk.entities, entity) {
            return;
        }
        remove_from(&mut chunk.collision_relevant, entity);
        remove_from(&mut chunk.physics_entities, entity);
        for list in &mut chunk.by_group {
            if remove_from(list, entity) {
                break;
            }
        }

        for viewer in &chunk.viewers {
            if *viewer == entity {
                continue;
            }
            if let Some(state) = self.viewers.get_mut(viewer) {
                decrement(&mut state.potential_visible, entity);
            }
        }
    }

    pub fn set_collision_relevant(&mut self, index: usize, entity: EntityId, relevant: bool) {
        let chunk = &mut self.chunks[index];
        if relevant {
            if !chunk.collision_relevant.contains(&entity) {
                chunk.collision_relevant.push(entity);
            }
        } else {
            remove_from(&mut chunk.collision_relevant, entity);
        }
    }

    pub fn add_physics_entity(&mut self, index: usize, entity: EntityId) {
        let chunk = &mut self.chunks[index];
        if !chunk.physics_entities.contains(&entity) {
            chunk.physics_entities.push(entity);
        }
    }

    pub fn remove_physics_entity(&mut self, index: usize, entity: EntityId) {
        remove_from(&mut self.chunks[index].physics_entities, entity);
    }

    /// Replaces the chunks a viewer watches, adjusting the reference counts of
    /// everything in the chunks it starts or stops watching.
    pub fn set_viewed_chunks(&mut self, viewer: EntityId, chunks: Vec<usize>) {
        let state = self.viewers.entry(viewer).or_default();
        let old_chunks = std::mem::take(&mut state.chunks);

        for &index in &old_chunks {
            if chunks.contains(&index) {
                continue;
            }
            let chunk = &mut self.chunks[index];
            remove_from(&mut chunk.viewers, viewer);
            for &entity in &chunk.entities {
                if entity != viewer {
                    decrement(&mut state.potential_visible, entity);
                }
            }
        }

        for &index in &chunks {
            if old_chunks.contains(&index) {
                continue;
            }
            let chunk = &mut self.chunks[index];
            chunk.viewers.push(viewer);
            for &entity in &chunk.entities {
                if entity != viewer {
                    increment(&mut state.potential_visible, entity);
                }
            }
        }

        state.chunks = chunks;
    }

    pub fn remove_viewer(&mut self, viewer: EntityId) {
        if self.viewers.contains_key(&viewer) {
            self.set_viewed_chunks(viewer, Vec::new());
            self.viewers.remove(&viewer);
        }
    }

    pub fn viewer(&self, viewer: EntityId) -> Option<&ViewerState> {
        self.viewers.get(&viewer)
    }

    /// Entities in any chunk the viewer watches, in id order.
    pub fn potential_visible(&self, viewer: EntityId) -> Vec<EntityId> {
        self.viewers
            .get(&viewer)
            .map(|state| state.potential_visible.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of watched chunks the entity currently overlaps, as seen by `viewer`.
    pub fn visibility_count(&self, viewer: EntityId, entity: EntityId) -> u32 {
        self.viewers
            .get(&viewer)
            .and_then(|state| state.potential_visible.get(&entity).copied())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{RiverSteppingStone, TileMapData};

    fn grid() -> ChunkGrid {
        // 4x4 chunks of 100 world units
        let config = WorldConfig {
            world_size_tiles: 16,
            chunk_size_tiles: 4,
            tile_size: 25.0,
            ..WorldConfig::default()
        };
        let tiles = TileMap::new(&config, TileMapData::flat(16)).unwrap();
        ChunkGrid::new(&config, &tiles)
    }

    fn member(index: u32) -> ChunkMember {
        ChunkMember {
            entity: EntityId::new(index, 0),
            group: CollisionGroup::Default,
            collision_relevant: true,
            has_physics: false,
        }
    }

    #[test]
    fn test_chunk_index_clamps() {
        let grid = grid();
        assert_eq!(grid.chunk_index(1, 2), 9);
        assert_eq!(grid.chunk_index(-4, 9), 12);
        assert_eq!(grid.chunk_index_at(Point::new(250.0, 120.0)), 6);
    }

    #[test]
    fn test_chunks_in_bounds_row_major() {
        let grid = grid();
        let bounds = Bounds::new(90.0, 210.0, 150.0, 210.0);
        assert_eq!(grid.chunks_in_bounds(&bounds), vec![4, 5, 6, 8, 9, 10]);
        assert_eq!(grid.chunk_bounds(6), Bounds::new(200.0, 300.0, 100.0, 200.0));
        assert!(grid.chunks_in_bounds(&Bounds::EMPTY).is_empty());
    }

    #[test]
    fn test_out_of_world_bounds_clamp_to_edge() {
        let grid = grid();
        let bounds = Bounds::new(-50.0, -10.0, 390.0, 450.0);
        assert_eq!(grid.chunks_in_bounds(&bounds), vec![12]);
    }

    #[test]
    fn test_member_lists() {
        let mut grid = grid();
        let mut mover = member(1);
        mover.has_physics = true;
        mover.group = CollisionGroup::Damaging;
        grid.add_member(3, &mover);
        grid.add_member(3, &member(2));

        let chunk = grid.chunk(3);
        assert_eq!(chunk.entities().len(), 2);
        assert_eq!(chunk.physics_entities(), &[mover.entity]);
        assert_eq!(chunk.entities_in_group(CollisionGroup::Damaging), &[mover.entity]);
        assert_eq!(chunk.entities_in_group(CollisionGroup::Default), &[EntityId::new(2, 0)]);

        grid.remove_member(3, mover.entity);
        let chunk = grid.chunk(3);
        assert_eq!(chunk.entities(), &[EntityId::new(2, 0)]);
        assert!(chunk.physics_entities().is_empty());
        assert!(chunk.entities_in_group(CollisionGroup::Damaging).is_empty());
    }

    #[test]
    fn test_removal_preserves_order() {
        let mut grid = grid();
        for i in 0..4 {
            grid.add_member(0, &member(i));
        }
        grid.remove_member(0, EntityId::new(1, 0));

        let ids: Vec<u32> = grid.chunk(0).entities().iter().map(|e| e.index()).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn test_viewer_counts_span_chunks() {
        let mut grid = grid();
        let viewer = EntityId::new(50, 0);
        let wide = member(7);

        grid.set_viewed_chunks(viewer, vec![0, 1]);
        grid.add_member(0, &wide);
        grid.add_member(1, &wide);
        assert_eq!(grid.visibility_count(viewer, wide.entity), 2);

        grid.remove_member(0, wide.entity);
        assert_eq!(grid.potential_visible(viewer), vec![wide.entity]);

        grid.remove_member(1, wide.entity);
        assert!(grid.potential_visible(viewer).is_empty());
    }

    #[test]
    fn test_changing_view_adjusts_counts() {
        let mut grid = grid();
        let viewer = EntityId::new(50, 0);
        grid.add_member(0, &member(1));
        grid.add_member(5, &member(2));
        grid.add_member(5, &ChunkMember {
            entity: viewer,
            ..member(0)
        });

        grid.set_viewed_chunks(viewer, vec![0, 5]);
        assert_eq!(
            grid.potential_visible(viewer),
            vec![EntityId::new(1, 0), EntityId::new(2, 0)]
        );

        grid.set_viewed_chunks(viewer, vec![5, 6]);
        assert_eq!(grid.potential_visible(viewer), vec![EntityId::new(2, 0)]);
        assert_eq!(grid.chunk(6).viewers(), &[viewer]);
        assert!(grid.chunk(0).viewers().is_empty());

        grid.remove_viewer(viewer);
        assert!(grid.viewer(viewer).is_none());
        assert!(grid.chunk(5).viewers().is_empty());
    }

    #[test]
    fn test_tile_features_are_indexed_by_chunk() {
        let config = WorldConfig {
            world_size_tiles: 16,
            chunk_size_tiles: 4,
            tile_size: 25.0,
            ..WorldConfig::default()
        };
        let mut data = TileMapData::flat(16);
        data.stepping_stones.push(RiverSteppingStone {
            position: Point::new(150.0, 50.0),
            radius: 10.0,
        });
        let tiles = TileMap::new(&config, data).unwrap();
        let grid = ChunkGrid::new(&config, &tiles);

        assert_eq!(grid.chunk(1).stepping_stones(), &[0]);
        assert!(grid.chunk(0).stepping_stones().is_empty());
    }
}
