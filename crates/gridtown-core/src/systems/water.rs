//! Water distribution: pump-fed flood fill over pipes and road
//! right-of-way.
//!
//! Pumps only push water while powered and standing next to a water tile,
//! so the source set moves month to month even when no pipe was touched.
//! The fill is rebuilt when topology changes (dirty flag) or when the
//! source set itself differs from the last rebuild.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::components::{Building, GridPos, WaterPipe, WaterPump, Zone};
use crate::map::{CityMap, TileType};
use crate::resources::GameConfig;
use crate::systems::power::{connection_distance, flood_fill};

/// Wet-cell map, the water twin of `PowerGrid`. Transient, never saved.
#[derive(Resource, Debug)]
pub struct WaterGrid {
    /// Cells reached by pump pressure, with hop distance from the pump
    pub wet: HashMap<GridPos, u32>,
    pub dirty: bool,
    cached_sources: Vec<GridPos>,
}

impl Default for WaterGrid {
    fn default() -> Self {
        Self {
            wet: HashMap::new(),
            dirty: true,
            cached_sources: Vec::new(),
        }
    }
}

/// System that rebuilds the wet-cell map and assigns watered flags
pub fn water_network_system(
    mut grid: ResMut<WaterGrid>,
    map: Res<CityMap>,
    config: Res<GameConfig>,
    pipes: Query<&GridPos, With<WaterPipe>>,
    mut buildings: Query<(&mut Building, &GridPos, Option<&Zone>, Option<&WaterPump>)>,
) {
    let mut sources: Vec<GridPos> = buildings
        .iter()
        .filter(|(building, pos, _, pump)| {
            pump.is_some()
                && building.built
                && building.powered
                && building.health >= 0.5
                && map.is_adjacent_to(**pos, TileType::Water)
        })
        .map(|(_, pos, _, _)| *pos)
        .collect();
    sources.sort();

    if grid.dirty || sources != grid.cached_sources {
        let mut conductive: HashSet<GridPos> = pipes.iter().copied().collect();
        for y in 0..map.height {
            for x in 0..map.width {
                let pos = GridPos::new(x as i32, y as i32);
                if map.is_road(pos) {
                    conductive.insert(pos);
                }
            }
        }

        grid.wet = flood_fill(&sources, &conductive, Some(config.balance.pump_pressure));
        grid.cached_sources = sources;
        grid.dirty = false;

        log::debug!(
            "Water network rebuilt: {} pumps, {} wet cells",
            grid.cached_sources.len(),
            grid.wet.len()
        );
    }

    for (mut building, pos, zone, _) in buildings.iter_mut() {
        if !building.built {
            continue;
        }
        let draw = building_water_draw(&config, &building.kind, zone);
        if draw <= 0.0 {
            building.watered = true;
            continue;
        }
        let size = crate::systems::power::building_size(&config, &building.kind);
        let cells = crate::systems::construction::footprint_cells(*pos, size);
        building.watered = connection_distance(&cells, &grid.wet).is_some();
    }
}

/// Monthly water demand; zoned lots use their tier table
pub(crate) fn building_water_draw(config: &GameConfig, kind: &str, zone: Option<&Zone>) -> f32 {
    if let Some(zone) = zone {
        return config
            .zone_tiers
            .tier(zone.kind, zone.level)
            .map(|tier| tier.water_draw)
            .unwrap_or(0.0);
    }
    config
        .buildings
        .get(kind)
        .map(|def| def.water_draw)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ZoneKind;

    #[test]
    fn test_zone_water_draw_scales_with_tier() {
        let config = GameConfig::default();
        let mut zone = Zone::new(ZoneKind::Residential);
        assert_eq!(building_water_draw(&config, "residential", Some(&zone)), 0.0);

        zone.level = 1;
        let t1 = building_water_draw(&config, "residential", Some(&zone));
        zone.level = 3;
        let t3 = building_water_draw(&config, "residential", Some(&zone));
        assert!(t3 > t1);
    }

    #[test]
    fn test_placed_building_draw_comes_from_def() {
        let config = GameConfig::default();
        assert!(building_water_draw(&config, "clinic", None) > 0.0);
        assert_eq!(building_water_draw(&config, "wind_turbine", None), 0.0);
    }

    #[test]
    fn test_no_pumps_means_dry_network() {
        let wet = flood_fill(&[], &HashSet::new(), Some(24));
        assert!(wet.is_empty());
    }
}
