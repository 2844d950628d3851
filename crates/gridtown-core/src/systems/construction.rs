//! Placement, zoning, utility lines, demolition and the monthly
//! construction pass.

use bevy::prelude::*;
use std::collections::HashSet;

use crate::components::{
    Building, GridPos, PowerLine, PowerPlant, PowerStorageUnit, Rubble, ServiceBuilding,
    WaterPipe, WaterPump, Zone,
};
use crate::events::{
    BuildRoadEvent, BuildingCompletedEvent, DemolishEvent, MapChangeKind, MapChangedEvent,
    NotificationEvent, PlaceBuildingEvent, PlacePipeEvent, PlacePowerLineEvent, ZoneCellsEvent,
};
use crate::map::{CityMap, TileType};
use crate::notifications::NotificationKind;
use crate::resources::{CityState, GameConfig, UnlockState};

/// Cells covered by a building anchored at `pos`
pub fn footprint_cells(pos: GridPos, size: (u32, u32)) -> Vec<GridPos> {
    let mut cells = Vec::with_capacity((size.0 * size.1) as usize);
    for dy in 0..size.1 {
        for dx in 0..size.0 {
            cells.push(GridPos::new(pos.x + dx as i32, pos.y + dy as i32));
        }
    }
    cells
}

/// Cells already claimed by structures that block placement
fn claimed_cells(
    config: &GameConfig,
    buildings: &Query<(&Building, &GridPos)>,
    zones: &Query<&GridPos, (With<Zone>, Without<Building>)>,
    rubble: &Query<&GridPos, With<Rubble>>,
    lines: &Query<&GridPos, With<PowerLine>>,
    pipes: &Query<&GridPos, With<WaterPipe>>,
) -> HashSet<GridPos> {
    let mut taken = HashSet::new();
    for (building, pos) in buildings.iter() {
        let size = crate::systems::power::building_size(config, &building.kind);
        taken.extend(footprint_cells(*pos, size));
    }
    taken.extend(zones.iter().copied());
    taken.extend(rubble.iter().copied());
    taken.extend(lines.iter().copied());
    taken.extend(pipes.iter().copied());
    taken
}

/// System that handles building placement commands
pub fn building_placement_system(
    mut commands: Commands,
    mut events: EventReader<PlaceBuildingEvent>,
    config: Res<GameConfig>,
    mut city: ResMut<CityState>,
    map: Res<CityMap>,
    buildings: Query<(&Building, &GridPos)>,
    zones: Query<&GridPos, (With<Zone>, Without<Building>)>,
    rubble: Query<&GridPos, With<Rubble>>,
    lines: Query<&GridPos, With<PowerLine>>,
    pipes: Query<&GridPos, With<WaterPipe>>,
) {
    if events.is_empty() {
        return;
    }

    let mut taken = claimed_cells(&config, &buildings, &zones, &rubble, &lines, &pipes);

    for event in events.read() {
        let def = match config.buildings.get(&event.kind) {
            Some(def) => def,
            None => {
                log::warn!("Unknown building type: {}", event.kind);
                continue;
            }
        };

        if city.population < def.unlock_population {
            log::warn!(
                "{} is locked until {} citizens",
                def.name,
                def.unlock_population
            );
            continue;
        }

        if city.funds < def.cost {
            log::warn!("Cannot afford {} ({})", def.name, def.cost);
            continue;
        }

        let cells = footprint_cells(event.position, def.size);
        if cells
            .iter()
            .any(|cell| !map.is_buildable(*cell) || taken.contains(cell))
        {
            log::warn!(
                "Cannot place {} at {:?} - area not clear",
                def.name,
                event.position
            );
            continue;
        }

        city.funds -= def.cost;

        let mut entity = commands.spawn((event.position, Building::new(&event.kind)));
        if let Some(plant) = def.plant {
            entity.insert(PowerPlant { kind: plant.kind });
        }
        if def.storage_kwh > 0.0 {
            entity.insert(PowerStorageUnit::new(def.storage_kwh));
        }
        if def.pump_output > 0.0 {
            entity.insert(WaterPump);
        }
        if let Some(service) = def.service {
            entity.insert(ServiceBuilding {
                kind: service.kind,
                radius: service.radius,
            });
        }

        taken.extend(cells);
        log::info!("Placed {} at {:?}", def.name, event.position);
    }
}

/// System that turns painted cells into zone lots
pub fn zoning_system(
    mut commands: Commands,
    mut events: EventReader<ZoneCellsEvent>,
    config: Res<GameConfig>,
    map: Res<CityMap>,
    buildings: Query<(&Building, &GridPos)>,
    zones: Query<&GridPos, (With<Zone>, Without<Building>)>,
    rubble: Query<&GridPos, With<Rubble>>,
    lines: Query<&GridPos, With<PowerLine>>,
    pipes: Query<&GridPos, With<WaterPipe>>,
) {
    if events.is_empty() {
        return;
    }

    let mut taken = claimed_cells(&config, &buildings, &zones, &rubble, &lines, &pipes);

    for event in events.read() {
        let mut zoned = 0;
        for cell in &event.cells {
            if !map.is_buildable(*cell) || taken.contains(cell) {
                continue;
            }
            commands.spawn((*cell, Zone::new(event.kind)));
            taken.insert(*cell);
            zoned += 1;
        }
        if zoned > 0 {
            log::info!("Zoned {} {:?} lots", zoned, event.kind);
        }
    }
}

/// System that lays road tiles
pub fn road_building_system(
    mut events: EventReader<BuildRoadEvent>,
    mut map: ResMut<CityMap>,
    config: Res<GameConfig>,
    mut city: ResMut<CityState>,
    mut map_events: EventWriter<MapChangedEvent>,
    buildings: Query<(&Building, &GridPos)>,
    zones: Query<&GridPos, (With<Zone>, Without<Building>)>,
    rubble: Query<&GridPos, With<Rubble>>,
    lines: Query<&GridPos, With<PowerLine>>,
    pipes: Query<&GridPos, With<WaterPipe>>,
) {
    if events.is_empty() {
        return;
    }

    // Lines and pipes share the right-of-way; only solid structures block.
    let mut taken = claimed_cells(&config, &buildings, &zones, &rubble, &lines, &pipes);
    for pos in lines.iter().chain(pipes.iter()) {
        taken.remove(pos);
    }

    for event in events.read() {
        for cell in &event.cells {
            if taken.contains(cell) || city.funds < config.balance.road_cost {
                continue;
            }
            if map.build_road(*cell) {
                city.funds -= config.balance.road_cost;
                map_events.send(MapChangedEvent {
                    position: *cell,
                    change: MapChangeKind::RoadBuilt,
                });
            }
        }
    }
}

/// System that strings power lines
pub fn power_line_system(
    mut commands: Commands,
    mut events: EventReader<PlacePowerLineEvent>,
    config: Res<GameConfig>,
    map: Res<CityMap>,
    mut city: ResMut<CityState>,
    mut map_events: EventWriter<MapChangedEvent>,
    buildings: Query<(&Building, &GridPos)>,
    zones: Query<&GridPos, (With<Zone>, Without<Building>)>,
    rubble: Query<&GridPos, With<Rubble>>,
    lines: Query<&GridPos, With<PowerLine>>,
    pipes: Query<&GridPos, With<WaterPipe>>,
) {
    if events.is_empty() {
        return;
    }

    let mut taken = claimed_cells(&config, &buildings, &zones, &rubble, &lines, &pipes);
    // Pipes do not block a line on the same cell
    for pos in pipes.iter() {
        taken.remove(pos);
    }

    for event in events.read() {
        for cell in &event.cells {
            let on_land = map
                .get_tile(cell.x, cell.y)
                .map(|t| t.tile_type != TileType::Water)
                .unwrap_or(false);
            if !on_land || taken.contains(cell) || city.funds < config.balance.power_line_cost {
                continue;
            }
            city.funds -= config.balance.power_line_cost;
            commands.spawn((*cell, PowerLine::default()));
            taken.insert(*cell);
            map_events.send(MapChangedEvent {
                position: *cell,
                change: MapChangeKind::PowerLineBuilt,
            });
        }
    }
}

/// System that buries water pipes
pub fn pipe_system(
    mut commands: Commands,
    mut events: EventReader<PlacePipeEvent>,
    config: Res<GameConfig>,
    map: Res<CityMap>,
    mut city: ResMut<CityState>,
    mut map_events: EventWriter<MapChangedEvent>,
    buildings: Query<(&Building, &GridPos)>,
    zones: Query<&GridPos, (With<Zone>, Without<Building>)>,
    rubble: Query<&GridPos, With<Rubble>>,
    lines: Query<&GridPos, With<PowerLine>>,
    pipes: Query<&GridPos, With<WaterPipe>>,
) {
    if events.is_empty() {
        return;
    }

    let mut taken = claimed_cells(&config, &buildings, &zones, &rubble, &lines, &pipes);
    for pos in lines.iter() {
        taken.remove(pos);
    }

    for event in events.read() {
        for cell in &event.cells {
            let on_land = map
                .get_tile(cell.x, cell.y)
                .map(|t| t.tile_type != TileType::Water)
                .unwrap_or(false);
            if !on_land || taken.contains(cell) || city.funds < config.balance.water_pipe_cost {
                continue;
            }
            city.funds -= config.balance.water_pipe_cost;
            commands.spawn((*cell, WaterPipe));
            taken.insert(*cell);
            map_events.send(MapChangedEvent {
                position: *cell,
                change: MapChangeKind::PipeBuilt,
            });
        }
    }
}

/// System that demolishes whatever sits on a cell
pub fn demolition_system(
    mut commands: Commands,
    mut events: EventReader<DemolishEvent>,
    config: Res<GameConfig>,
    mut city: ResMut<CityState>,
    mut map_events: EventWriter<MapChangedEvent>,
    buildings: Query<(Entity, &Building, &GridPos)>,
    empty_zones: Query<(Entity, &GridPos), (With<Zone>, Without<Building>)>,
    lines: Query<(Entity, &GridPos), With<PowerLine>>,
    pipes: Query<(Entity, &GridPos), With<WaterPipe>>,
    rubble: Query<(Entity, &GridPos), With<Rubble>>,
) {
    for event in events.read() {
        let pos = event.position;

        // Buildings first: the footprint may cover more than the clicked cell
        let hit = buildings.iter().find(|(_, building, anchor)| {
            let size = crate::systems::power::building_size(&config, &building.kind);
            footprint_cells(**anchor, size).contains(&pos)
        });
        if let Some((entity, building, anchor)) = hit {
            if let Some(def) = config.buildings.get(&building.kind) {
                let refund = (def.cost as f32 * config.balance.demolition_refund) as i64;
                city.funds += refund;
            }
            commands.entity(entity).despawn();
            map_events.send(MapChangedEvent {
                position: *anchor,
                change: MapChangeKind::BuildingRemoved,
            });
            log::info!("Demolished {} at {:?}", building.kind, anchor);
            continue;
        }

        if let Some((entity, _)) = empty_zones.iter().find(|(_, p)| **p == pos) {
            commands.entity(entity).despawn();
            continue;
        }

        if let Some((entity, _)) = lines.iter().find(|(_, p)| **p == pos) {
            commands.entity(entity).despawn();
            map_events.send(MapChangedEvent {
                position: pos,
                change: MapChangeKind::PowerLineRemoved,
            });
            continue;
        }

        if let Some((entity, _)) = pipes.iter().find(|(_, p)| **p == pos) {
            commands.entity(entity).despawn();
            map_events.send(MapChangedEvent {
                position: pos,
                change: MapChangeKind::PipeRemoved,
            });
            continue;
        }

        if let Some((entity, _)) = rubble.iter().find(|(_, p)| **p == pos) {
            city.funds -= config.balance.rubble_clearing_cost;
            commands.entity(entity).despawn();
            continue;
        }

        log::warn!("Nothing to demolish at {:?}", pos);
    }
}

/// System that advances construction by one month
pub fn construction_progress_system(
    mut query: Query<(Entity, &mut Building, &GridPos, Option<&Zone>)>,
    config: Res<GameConfig>,
    mut completed_events: EventWriter<BuildingCompletedEvent>,
    mut map_events: EventWriter<MapChangedEvent>,
) {
    for (entity, mut building, pos, zone) in query.iter_mut() {
        if building.built {
            continue;
        }

        let build_months = if zone.is_some() {
            config.zone_tiers.build_months
        } else {
            config
                .buildings
                .get(&building.kind)
                .map(|def| def.build_months)
                .unwrap_or(1)
        };

        building.construction_progress += if build_months == 0 {
            1.0
        } else {
            1.0 / build_months as f32
        };

        if building.construction_progress >= 1.0 {
            building.construction_progress = 1.0;
            building.built = true;

            completed_events.send(BuildingCompletedEvent {
                building: entity,
                kind: building.kind.clone(),
                position: *pos,
            });
            // A finished structure joins the conductive footprint.
            map_events.send(MapChangedEvent {
                position: *pos,
                change: MapChangeKind::BuildingPlaced,
            });

            log::info!("Construction completed: {} at {:?}", building.kind, pos);
        }
    }
}

/// System that folds the month's utility flags into one operational bit
pub fn operational_status_system(mut query: Query<&mut Building>) {
    for mut building in query.iter_mut() {
        building.operational =
            building.built && building.health > 0.25 && building.powered && building.watered;
    }
}

/// System that announces newly unlocked building types
pub fn unlock_system(
    city: Res<CityState>,
    config: Res<GameConfig>,
    mut unlocks: ResMut<UnlockState>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    let mut keys: Vec<&String> = config.buildings.keys().collect();
    keys.sort();

    for key in keys {
        let def = &config.buildings[key];
        if def.unlock_population == 0
            || unlocks.announced.contains(key)
            || city.population < def.unlock_population
        {
            continue;
        }
        unlocks.announced.insert(key.clone());
        notifications.send(NotificationEvent::new(NotificationKind::Unlock).with_target(&def.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_cells() {
        let cells = footprint_cells(GridPos::new(3, 4), (2, 2));
        assert_eq!(cells.len(), 4);
        assert!(cells.contains(&GridPos::new(3, 4)));
        assert!(cells.contains(&GridPos::new(4, 5)));
        assert!(!cells.contains(&GridPos::new(5, 4)));
    }

    #[test]
    fn test_single_cell_footprint() {
        let cells = footprint_cells(GridPos::new(0, 0), (1, 1));
        assert_eq!(cells, vec![GridPos::new(0, 0)]);
    }
}
