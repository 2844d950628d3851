//! Per-cell land value, rebuilt every month.
//!
//! Value pulls zone development and tax yield. Waterfront and greenery
//! raise it, services raise it nearby, industry and coal smoke depress it,
//! and city-wide crime drags everything down a little.

use bevy::prelude::*;

use crate::components::{Building, GridPos, PowerPlant, ServiceBuilding, ServiceKind, Zone, ZoneKind};
use crate::map::{CityMap, TileType};
use crate::systems::services::ServiceEffects;

const BASE_VALUE: f32 = 0.45;
const WATER_BONUS: f32 = 0.1;
const FOREST_BONUS: f32 = 0.05;
const SCENERY_RADIUS: i32 = 2;

/// Land value per cell in [0, 1]
#[derive(Resource, Debug, Default)]
pub struct LandValueGrid {
    pub width: u32,
    pub height: u32,
    values: Vec<f32>,
}

impl LandValueGrid {
    pub fn get(&self, pos: GridPos) -> f32 {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return BASE_VALUE;
        }
        self.values[(pos.y as u32 * self.width + pos.x as u32) as usize]
    }

    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            return BASE_VALUE;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }
}

/// A point influence on surrounding land value; negative strength blights
pub(crate) struct ValueSource {
    pub pos: GridPos,
    pub radius: f32,
    pub strength: f32,
}

/// System that rebuilds the land value grid
pub fn land_value_system(
    mut grid: ResMut<LandValueGrid>,
    map: Res<CityMap>,
    effects: Res<ServiceEffects>,
    buildings: Query<(
        &Building,
        &GridPos,
        Option<&Zone>,
        Option<&ServiceBuilding>,
        Option<&PowerPlant>,
    )>,
) {
    let mut sources: Vec<ValueSource> = Vec::new();

    for (building, pos, zone, service, plant) in buildings.iter() {
        if !building.built {
            continue;
        }

        if let Some(service) = service {
            if building.operational {
                let strength = match service.kind {
                    ServiceKind::Park => 0.15,
                    _ => 0.05,
                };
                sources.push(ValueSource {
                    pos: *pos,
                    radius: service.radius,
                    strength,
                });
            }
        }

        if plant.is_some() && building.kind == "coal_plant" {
            sources.push(ValueSource {
                pos: *pos,
                radius: 8.0,
                strength: -0.3,
            });
        }

        if let Some(zone) = zone {
            if zone.kind == ZoneKind::Industrial && zone.level > 0 {
                sources.push(ValueSource {
                    pos: *pos,
                    radius: 6.0,
                    strength: -0.2,
                });
            }
        }
    }

    let crime_drag = effects.crime_modifier * 0.1;
    let values = compute_values(&map, &sources, crime_drag);

    grid.width = map.width;
    grid.height = map.height;
    grid.values = values;
}

pub(crate) fn compute_values(map: &CityMap, sources: &[ValueSource], crime_drag: f32) -> Vec<f32> {
    let mut values = Vec::with_capacity((map.width * map.height) as usize);

    for y in 0..map.height as i32 {
        for x in 0..map.width as i32 {
            let pos = GridPos::new(x, y);
            let mut value = BASE_VALUE + scenery_bonus(map, pos) - crime_drag;

            for source in sources {
                let distance = pos.distance_to(&source.pos);
                if distance <= source.radius {
                    // Linear falloff from full strength at the source
                    value += source.strength * (1.0 - distance / source.radius);
                }
            }

            values.push(value.clamp(0.0, 1.0));
        }
    }

    values
}

fn scenery_bonus(map: &CityMap, pos: GridPos) -> f32 {
    let mut near_water = false;
    let mut near_forest = false;

    for dy in -SCENERY_RADIUS..=SCENERY_RADIUS {
        for dx in -SCENERY_RADIUS..=SCENERY_RADIUS {
            if let Some(tile) = map.get_tile(pos.x + dx, pos.y + dy) {
                match tile.tile_type {
                    TileType::Water => near_water = true,
                    TileType::Forest => near_forest = true,
                    _ => {}
                }
            }
        }
    }

    let mut bonus = 0.0;
    if near_water {
        bonus += WATER_BONUS;
    }
    if near_forest {
        bonus += FOREST_BONUS;
    }
    bonus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Tile;

    #[test]
    fn test_plain_map_sits_at_base_value() {
        let map = CityMap::new(8, 8);
        let values = compute_values(&map, &[], 0.0);
        assert!(values.iter().all(|v| (*v - BASE_VALUE).abs() < f32::EPSILON));
    }

    #[test]
    fn test_park_raises_nearby_value() {
        let map = CityMap::new(16, 16);
        let park = ValueSource {
            pos: GridPos::new(8, 8),
            radius: 8.0,
            strength: 0.15,
        };
        let values = compute_values(&map, &[park], 0.0);
        let at_park = values[(8 * 16 + 8) as usize];
        let far_away = values[0];
        assert!(at_park > far_away);
    }

    #[test]
    fn test_coal_plant_blights_neighborhood() {
        let map = CityMap::new(16, 16);
        let plant = ValueSource {
            pos: GridPos::new(8, 8),
            radius: 8.0,
            strength: -0.3,
        };
        let values = compute_values(&map, &[plant], 0.0);
        let at_plant = values[(8 * 16 + 8) as usize];
        assert!(at_plant < BASE_VALUE);
    }

    #[test]
    fn test_waterfront_premium() {
        let mut map = CityMap::new(8, 8);
        map.set_tile(
            0,
            0,
            Tile {
                tile_type: TileType::Water,
                elevation: 0,
            },
        );
        let values = compute_values(&map, &[], 0.0);
        // Adjacent to water vs far corner
        assert!(values[(1 * 8 + 1) as usize] > values[(7 * 8 + 7) as usize]);
    }

    #[test]
    fn test_values_stay_clamped() {
        let map = CityMap::new(8, 8);
        let blights: Vec<ValueSource> = (0..10)
            .map(|_| ValueSource {
                pos: GridPos::new(4, 4),
                radius: 10.0,
                strength: -0.5,
            })
            .collect();
        let values = compute_values(&map, &blights, 0.3);
        assert!(values.iter().all(|v| *v >= 0.0 && *v <= 1.0));
    }
}
