//! World configuration.

use crate::error::{WorldError, WorldResult};
use serde::{Deserialize, Serialize};
use shared::{DEFAULT_CHUNK_SIZE, DEFAULT_TICK_RATE, DEFAULT_TILE_SIZE, DEFAULT_WORLD_SIZE};

/// Dimensions and timestep of a world.
///
/// The world is a square of `world_size_tiles` tiles per side, split into
/// square chunks of `chunk_size_tiles` tiles per side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub world_size_tiles: u32,
    pub chunk_size_tiles: u32,
    /// Side length of one tile in world units.
    pub tile_size: f32,
    /// Ticks per second. The timestep is fixed at `1 / tick_rate`.
    pub tick_rate: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_size_tiles: DEFAULT_WORLD_SIZE,
            chunk_size_tiles: DEFAULT_CHUNK_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> WorldResult<()> {
        if self.world_size_tiles == 0 {
            return Err(WorldError::InvalidConfig("world size must be positive".into()));
        }
        if self.chunk_size_tiles == 0 {
            return Err(WorldError::InvalidConfig("chunk size must be positive".into()));
        }
        if self.world_size_tiles % self.chunk_size_tiles != 0 {
            return Err(WorldError::InvalidConfig(format!(
                "world size {} is not a multiple of chunk size {}",
                self.world_size_tiles, self.chunk_size_tiles
            )));
        }
        if !(self.tile_size > 0.0) {
            return Err(WorldError::InvalidConfig(format!(
                "tile size must be positive, got {}",
                self.tile_size
            )));
        }
        if self.tick_rate == 0 {
            return Err(WorldError::InvalidConfig("tick rate must be positive".into()));
        }
        Ok(())
    }

    pub fn chunks_per_side(&self) -> u32 {
        self.world_size_tiles / self.chunk_size_tiles
    }

    pub fn tile_count(&self) -> usize {
        (self.world_size_tiles as usize) * (self.world_size_tiles as usize)
    }

    /// Side length of the world in world units.
    pub fn world_units(&self) -> f32 {
        self.world_size_tiles as f32 * self.tile_size
    }

    pub fn chunk_units(&self) -> f32 {
        self.chunk_size_tiles as f32 * self.tile_size
    }

    pub fn delta_time(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunks_per_side(), 32);
        assert_eq!(config.world_units(), 128.0 * 64.0);
        assert_eq!(config.chunk_units(), 256.0);
        assert_approx_eq!(config.delta_time(), 1.0 / 60.0, 1e-7);
    }

    #[test]
    fn test_rejects_uneven_chunks() {
        let config = WorldConfig {
            world_size_tiles: 30,
            chunk_size_tiles: 4,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let zero_tile = WorldConfig {
            tile_size: 0.0,
            ..WorldConfig::default()
        };
        let zero_rate = WorldConfig {
            tick_rate: 0,
            ..WorldConfig::default()
        };
        let zero_chunk = WorldConfig {
            chunk_size_tiles: 0,
            ..WorldConfig::default()
        };

        assert!(zero_tile.validate().is_err());
        assert!(zero_rate.validate().is_err());
        assert!(zero_chunk.validate().is_err());
    }

    #[test]
    fn test_tile_count() {
        let config = WorldConfig {
            world_size_tiles: 8,
            chunk_size_tiles: 2,
            ..WorldConfig::default()
        };
        assert_eq!(config.tile_count(), 64);
        assert_eq!(config.chunks_per_side(), 4);
    }
}
