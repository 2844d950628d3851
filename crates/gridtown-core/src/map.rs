use bevy::prelude::*;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::components::GridPos;
use crate::resources::{Biome, MapGenConfig};

/// Map dimensions and tile data
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Default)]
pub struct CityMap {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<Vec<Tile>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
    pub elevation: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileType {
    Grass,
    Water,
    Forest,
    Sand,
    Rock,
    Road,
}

impl Tile {
    pub fn is_buildable(&self) -> bool {
        !matches!(self.tile_type, TileType::Water | TileType::Road)
    }
}

impl CityMap {
    pub fn new(width: u32, height: u32) -> Self {
        let tiles = (0..height)
            .map(|_| {
                (0..width)
                    .map(|_| Tile {
                        tile_type: TileType::Grass,
                        elevation: 128,
                    })
                    .collect()
            })
            .collect();

        Self {
            width,
            height,
            tiles,
        }
    }

    pub fn get_tile(&self, x: i32, y: i32) -> Option<&Tile> {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            self.tiles.get(y as usize)?.get(x as usize)
        } else {
            None
        }
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) -> bool {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            if let Some(row) = self.tiles.get_mut(y as usize) {
                if let Some(cell) = row.get_mut(x as usize) {
                    *cell = tile;
                    return true;
                }
            }
        }
        false
    }

    pub fn is_valid_position(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn is_road(&self, pos: GridPos) -> bool {
        self.get_tile(pos.x, pos.y)
            .map(|t| t.tile_type == TileType::Road)
            .unwrap_or(false)
    }

    pub fn is_buildable(&self, pos: GridPos) -> bool {
        self.get_tile(pos.x, pos.y)
            .map(|t| t.is_buildable())
            .unwrap_or(false)
    }

    /// Whether any orthogonal neighbor matches the given tile type
    pub fn is_adjacent_to(&self, pos: GridPos, tile_type: TileType) -> bool {
        pos.neighbors4()
            .iter()
            .any(|n| {
                self.get_tile(n.x, n.y)
                    .map(|t| t.tile_type == tile_type)
                    .unwrap_or(false)
            })
    }

    /// Lay a road on a buildable tile, preserving elevation
    pub fn build_road(&mut self, pos: GridPos) -> bool {
        match self.get_tile(pos.x, pos.y) {
            Some(tile) if tile.is_buildable() => {
                let elevation = tile.elevation;
                self.set_tile(
                    pos.x,
                    pos.y,
                    Tile {
                        tile_type: TileType::Road,
                        elevation,
                    },
                )
            }
            _ => false,
        }
    }

    pub fn road_count(&self) -> u32 {
        self.tiles
            .iter()
            .flatten()
            .filter(|t| t.tile_type == TileType::Road)
            .count() as u32
    }
}

/// Generate terrain from Perlin noise, skewed by biome
pub fn generate_map_from_config(config: &MapGenConfig, biome: Biome) -> CityMap {
    let mut map = CityMap::new(config.width, config.height);
    let perlin = Perlin::new(config.seed as u32);

    // Biomes shift the water line and swap ground cover
    let water_level = match biome {
        Biome::Temperate => config.water_level,
        Biome::Desert => config.water_level - 0.25,
        Biome::Alpine => config.water_level + 0.05,
    };
    let forest_threshold = match biome {
        Biome::Temperate => 1.0 - config.forest_density * 2.0,
        Biome::Desert => 0.92,
        Biome::Alpine => 1.0 - config.forest_density * 1.5,
    };

    for y in 0..map.height {
        for x in 0..map.width {
            let nx = x as f64 / map.width as f64;
            let ny = y as f64 / map.height as f64;

            let elevation = perlin.get([nx * 4.0, ny * 4.0]) as f32;
            let cover = perlin.get([nx * 8.0, ny * 8.0]) as f32;
            let rock = perlin.get([nx * 6.0 + 100.0, ny * 6.0]) as f32;

            let tile_type = if elevation < water_level {
                TileType::Water
            } else if rock > 0.55 {
                TileType::Rock
            } else if cover > forest_threshold {
                TileType::Forest
            } else {
                match biome {
                    Biome::Desert => TileType::Sand,
                    _ => TileType::Grass,
                }
            };

            let tile = Tile {
                tile_type,
                elevation: ((elevation + 1.0) * 127.5) as u8,
            };

            map.set_tile(x as i32, y as i32, tile);
        }
    }

    log::info!(
        "Generated {:?} map {}x{} (seed {})",
        biome,
        map.width,
        map.height,
        config.seed
    );
    map
}

pub fn generate_demo_map() -> CityMap {
    generate_map_from_config(&MapGenConfig::default(), Biome::Temperate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_lookup() {
        let map = CityMap::new(8, 8);
        assert!(map.get_tile(-1, 0).is_none());
        assert!(map.get_tile(8, 0).is_none());
        assert!(map.get_tile(3, 3).is_some());
    }

    #[test]
    fn test_road_building() {
        let mut map = CityMap::new(8, 8);
        let pos = GridPos::new(2, 2);
        assert!(map.build_road(pos));
        assert!(map.is_road(pos));
        assert!(!map.is_buildable(pos));
        // Roads cannot be laid twice
        assert!(!map.build_road(pos));
        assert_eq!(map.road_count(), 1);
    }

    #[test]
    fn test_water_is_not_buildable() {
        let mut map = CityMap::new(8, 8);
        map.set_tile(
            1,
            1,
            Tile {
                tile_type: TileType::Water,
                elevation: 0,
            },
        );
        assert!(!map.is_buildable(GridPos::new(1, 1)));
        assert!(map.is_adjacent_to(GridPos::new(2, 1), TileType::Water));
        assert!(!map.build_road(GridPos::new(1, 1)));
    }

    #[test]
    fn test_same_seed_generates_same_map() {
        let config = MapGenConfig {
            width: 32,
            height: 32,
            ..Default::default()
        };
        let a = generate_map_from_config(&config, Biome::Temperate);
        let b = generate_map_from_config(&config, Biome::Temperate);
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(
                    a.get_tile(x, y).unwrap().tile_type,
                    b.get_tile(x, y).unwrap().tile_type
                );
            }
        }
    }

    #[test]
    fn test_desert_has_sand_instead_of_grass() {
        let config = MapGenConfig {
            width: 32,
            height: 32,
            ..Default::default()
        };
        let map = generate_map_from_config(&config, Biome::Desert);
        let has_sand = map
            .tiles
            .iter()
            .flatten()
            .any(|t| t.tile_type == TileType::Sand);
        let has_grass = map
            .tiles
            .iter()
            .flatten()
            .any(|t| t.tile_type == TileType::Grass);
        assert!(has_sand);
        assert!(!has_grass);
    }
}
