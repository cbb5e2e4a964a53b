//! Tile and biome kinds with the physical properties the integrator reads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Grass,
    Dirt,
    Sand,
    Snow,
    Ice,
    Water,
    Sludge,
    Rock,
    Permafrost,
}

impl TileType {
    pub const ALL: [TileType; 9] = [
        TileType::Grass,
        TileType::Dirt,
        TileType::Sand,
        TileType::Snow,
        TileType::Ice,
        TileType::Water,
        TileType::Sludge,
        TileType::Rock,
        TileType::Permafrost,
    ];

    /// Velocity damping per second applied to entities standing on the tile.
    pub fn friction(&self) -> f32 {
        match self {
            TileType::Grass => 3.0,
            TileType::Dirt => 3.5,
            TileType::Sand => 4.0,
            TileType::Snow => 4.5,
            TileType::Ice => 0.5,
            TileType::Water => 5.0,
            TileType::Sludge => 6.0,
            TileType::Rock => 3.0,
            TileType::Permafrost => 2.0,
        }
    }

    /// Scales self-propelled acceleration on the tile.
    pub fn move_speed_multiplier(&self) -> f32 {
        match self {
            TileType::Snow => 0.65,
            TileType::Water => 0.6,
            TileType::Sludge => 0.5,
            TileType::Sand => 0.85,
            TileType::Ice => 1.5,
            _ => 1.0,
        }
    }

    /// Liquid tiles are the only ones that can carry a river flow.
    pub fn is_liquid(&self) -> bool {
        matches!(self, TileType::Water | TileType::Sludge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    Grasslands,
    Desert,
    Tundra,
    Swamp,
    Mountains,
    River,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_water_and_sludge_are_liquid() {
        let liquids: Vec<TileType> = TileType::ALL.into_iter().filter(|tile| tile.is_liquid()).collect();
        assert_eq!(liquids, vec![TileType::Water, TileType::Sludge]);
    }

    #[test]
    fn test_ice_is_slippery() {
        for tile in TileType::ALL {
            assert!(tile.friction() > 0.0);
            if tile != TileType::Ice {
                assert!(tile.friction() > TileType::Ice.friction());
            }
        }
    }

    #[test]
    fn test_default_tile() {
        assert_eq!(TileType::default(), TileType::Grass);
        assert_eq!(TileType::Grass.move_speed_multiplier(), 1.0);
    }
}
