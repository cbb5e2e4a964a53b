//! # Tile Layer
//!
//! Per-tile terrain supplied by world generation, stored row-major
//! (`index = y * tiles_per_side + x`), plus the tile raycasts line-of-sight
//! and attack-range checks are built on.
//!
//! Coordinates outside the map are clamped to the nearest edge tile rather
//! than rejected, since movement can transiently push positions past the
//! border.

use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use serde::{Deserialize, Serialize};
use shared::{Biome, Bounds, Point, TileType};

/// A rock sitting in a river. Purely decorative to the core; collaborators
/// spawn entities for them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterRock {
    pub position: Point,
    pub rotation: f32,
    pub size: f32,
}

/// A stone that lets entities stand in a river without being carried off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiverSteppingStone {
    pub position: Point,
    pub radius: f32,
}

impl RiverSteppingStone {
    pub fn contains(&self, point: Point) -> bool {
        self.position.distance_squared_to(point) <= self.radius * self.radius
    }
}

/// Raw world-generation output. Every per-tile vector holds one entry per
/// tile, row-major.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileMapData {
    pub tile_types: Vec<TileType>,
    pub biomes: Vec<Biome>,
    pub walls: Vec<bool>,
    pub temperatures: Vec<f32>,
    pub humidities: Vec<f32>,
    /// Flow angle in radians, only on liquid tiles.
    pub flow_directions: Vec<Option<f32>>,
    pub water_rocks: Vec<WaterRock>,
    pub stepping_stones: Vec<RiverSteppingStone>,
}

impl TileMapData {
    /// Open grassland with no walls or rivers.
    pub fn flat(tiles_per_side: u32) -> Self {
        let count = (tiles_per_side as usize) * (tiles_per_side as usize);
        Self {
            tile_types: vec![TileType::Grass; count],
            biomes: vec![Biome::Grasslands; count],
            walls: vec![false; count],
            temperatures: vec![0.5; count],
            humidities: vec![0.5; count],
            flow_directions: vec![None; count],
            water_rocks: Vec::new(),
            stepping_stones: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileMap {
    tiles_per_side: u32,
    tile_size: f32,
    tile_types: Vec<TileType>,
    biomes: Vec<Biome>,
    walls: Vec<bool>,
    temperatures: Vec<f32>,
    humidities: Vec<f32>,
    flow_directions: Vec<Option<f32>>,
    water_rocks: Vec<WaterRock>,
    stepping_stones: Vec<RiverSteppingStone>,
}

fn check_len(name: &str, len: usize, expected: usize) -> WorldResult<()> {
    if len != expected {
        return Err(WorldError::InvalidTileData(format!(
            "{} has {} entries, expected {}",
            name, len, expected
        )));
    }
    Ok(())
}

impl TileMap {
    pub fn new(config: &WorldConfig, data: TileMapData) -> WorldResult<Self> {
        let expected = config.tile_count();
        check_len("tile_types", data.tile_types.len(), expected)?;
        check_len("biomes", data.biomes.len(), expected)?;
        check_len("walls", data.walls.len(), expected)?;
        check_len("temperatures", data.temperatures.len(), expected)?;
        check_len("humidities", data.humidities.len(), expected)?;
        check_len("flow_directions", data.flow_directions.len(), expected)?;

        if let Some(index) = data
            .flow_directions
            .iter()
            .zip(&data.tile_types)
            .position(|(flow, tile)| flow.is_some() && !tile.is_liquid())
        {
            return Err(WorldError::InvalidTileData(format!(
                "tile {} has a river flow but is {:?}",
                index, data.tile_types[index]
            )));
        }

        Ok(Self {
            tiles_per_side: config.world_size_tiles,
            tile_size: config.tile_size,
            tile_types: data.tile_types,
            biomes: data.biomes,
            walls: data.walls,
            temperatures: data.temperatures,
            humidities: data.humidities,
            flow_directions: data.flow_directions,
            water_rocks: data.water_rocks,
            stepping_stones: data.stepping_stones,
        })
    }

    pub fn tiles_per_side(&self) -> u32 {
        self.tiles_per_side
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn clamp_coord(&self, value: i32) -> i32 {
        value.clamp(0, self.tiles_per_side as i32 - 1)
    }

    pub fn tile_index(&self, x: i32, y: i32) -> usize {
        let x = self.clamp_coord(x) as usize;
        let y = self.clamp_coord(y) as usize;
        y * self.tiles_per_side as usize + x
    }

    /// Tile containing a world-space point, clamped onto the map.
    pub fn tile_coords_at(&self, point: Point) -> (i32, i32) {
        (
            self.clamp_coord((point.x / self.tile_size).floor() as i32),
            self.clamp_coord((point.y / self.tile_size).floor() as i32),
        )
    }

    pub fn tile_type(&self, x: i32, y: i32) -> TileType {
        self.tile_types[self.tile_index(x, y)]
    }

    pub fn tile_type_at(&self, point: Point) -> TileType {
        let (x, y) = self.tile_coords_at(point);
        self.tile_type(x, y)
    }

    pub fn biome(&self, x: i32, y: i32) -> Biome {
        self.biomes[self.tile_index(x, y)]
    }

    pub fn temperature(&self, x: i32, y: i32) -> f32 {
        self.temperatures[self.tile_index(x, y)]
    }

    pub fn humidity(&self, x: i32, y: i32) -> f32 {
        self.humidities[self.tile_index(x, y)]
    }

    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.walls[self.tile_index(x, y)]
    }

    pub fn flow_direction(&self, x: i32, y: i32) -> Option<f32> {
        self.flow_directions[self.tile_index(x, y)]
    }

    pub fn set_wall(&mut self, x: i32, y: i32, is_wall: bool) {
        let index = self.tile_index(x, y);
        self.walls[index] = is_wall;
    }

    /// Changing a river tile into solid ground also drops its flow.
    pub fn set_tile_type(&mut self, x: i32, y: i32, tile_type: TileType) {
        let index = self.tile_index(x, y);
        self.tile_types[index] = tile_type;
        if !tile_type.is_liquid() {
            self.flow_directions[index] = None;
        }
    }

    pub fn tile_bounds(&self, x: i32, y: i32) -> Bounds {
        let size = self.tile_size;
        Bounds::new(
            x as f32 * size,
            (x + 1) as f32 * size,
            y as f32 * size,
            (y + 1) as f32 * size,
        )
    }

    /// Tiles overlapping `bounds`, clamped onto the map, row by row.
    pub fn tiles_in_bounds(&self, bounds: &Bounds) -> Vec<(i32, i32)> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let (min_x, min_y) = self.tile_coords_at(Point::new(bounds.min_x, bounds.min_y));
        let (max_x, max_y) = self.tile_coords_at(Point::new(bounds.max_x, bounds.max_y));

        let mut tiles = Vec::with_capacity(((max_x - min_x + 1) * (max_y - min_y + 1)) as usize);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                tiles.push((x, y));
            }
        }
        tiles
    }

    pub fn water_rocks(&self) -> &[WaterRock] {
        &self.water_rocks
    }

    pub fn stepping_stones(&self) -> &[RiverSteppingStone] {
        &self.stepping_stones
    }

    /// Walks every tile the segment from `start` to `end` passes through and
    /// returns whether all of them satisfy `predicate`. Stops at the first tile
    /// that doesn't.
    ///
    /// The traversal steps along whichever axis reaches its next tile boundary
    /// first. When the segment crosses a tile corner exactly, both tiles
    /// touching the corner are tested before stepping diagonally, so a ray can
    /// never slip between two diagonal walls.
    pub fn raytrace_tiles(&self, start: Point, end: Point, mut predicate: impl FnMut(i32, i32) -> bool) -> bool {
        let limit = self.tiles_per_side as f64 - 1e-6;
        let to_tile_space = |value: f32| (value as f64 / self.tile_size as f64).clamp(0.0, limit);

        let (start_x, start_y) = (to_tile_space(start.x), to_tile_space(start.y));
        let (end_x, end_y) = (to_tile_space(end.x), to_tile_space(end.y));

        let mut x = start_x.floor() as i32;
        let mut y = start_y.floor() as i32;
        let target_x = end_x.floor() as i32;
        let target_y = end_y.floor() as i32;

        let dx = end_x - start_x;
        let dy = end_y - start_y;
        let step_x = if dx > 0.0 { 1 } else if dx < 0.0 { -1 } else { 0 };
        let step_y = if dy > 0.0 { 1 } else if dy < 0.0 { -1 } else { 0 };

        let t_delta_x = if dx != 0.0 { 1.0 / dx.abs() } else { f64::INFINITY };
        let t_delta_y = if dy != 0.0 { 1.0 / dy.abs() } else { f64::INFINITY };

        let mut t_max_x = if dx > 0.0 {
            (x as f64 + 1.0 - start_x) / dx
        } else if dx < 0.0 {
            (start_x - x as f64) / -dx
        } else {
            f64::INFINITY
        };
        let mut t_max_y = if dy > 0.0 {
            (y as f64 + 1.0 - start_y) / dy
        } else if dy < 0.0 {
            (start_y - y as f64) / -dy
        } else {
            f64::INFINITY
        };

        if !predicate(x, y) {
            return false;
        }

        // A supercover walk never takes more steps than the Manhattan distance
        let max_steps = (target_x - x).abs() + (target_y - y).abs();
        let mut steps = 0;

        while (x, y) != (target_x, target_y) && steps < max_steps {
            if t_max_x < t_max_y {
                x += step_x;
                t_max_x += t_delta_x;
                steps += 1;
            } else if t_max_y < t_max_x {
                y += step_y;
                t_max_y += t_delta_y;
                steps += 1;
            } else {
                if !predicate(x + step_x, y) || !predicate(x, y + step_y) {
                    return false;
                }
                x += step_x;
                y += step_y;
                t_max_x += t_delta_x;
                t_max_y += t_delta_y;
                steps += 2;
            }

            if !predicate(x, y) {
                return false;
            }
        }

        true
    }

    /// True when every tile along the segment is one of `types`.
    pub fn tile_raytrace_matches_types(&self, start: Point, end: Point, types: &[TileType]) -> bool {
        self.raytrace_tiles(start, end, |x, y| types.contains(&self.tile_type(x, y)))
    }

    pub fn raytrace_has_wall(&self, start: Point, end: Point) -> bool {
        !self.raytrace_tiles(start, end, |x, y| !self.is_wall(x, y))
    }
}
