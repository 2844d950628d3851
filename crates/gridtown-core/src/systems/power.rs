//! Power grid: flood-fill distribution, supply/demand balance, storage and
//! brownout/blackout stability.
//!
//! The network itself is transient derived state. Every rebuild flood-fills
//! from all operating plants across conductive cells (roads, healthy power
//! lines, built building footprints) and keeps only the derived map of
//! energized cells with their hop distance from the nearest plant. The
//! distance map is what makes brownout shedding deterministic: the consumers
//! farthest from a source drop first.

use bevy::prelude::*;
use pathfinding::prelude::dijkstra_all;
use std::collections::{HashMap, HashSet};

use crate::components::{Building, GridPos, PowerLine, PowerPlant, PowerStorageUnit, Zone};
use crate::events::{MapChangedEvent, NotificationEvent};
use crate::map::CityMap;
use crate::notifications::NotificationKind;
use crate::resources::{Difficulty, GameConfig};
use crate::systems::construction::footprint_cells;
use crate::systems::water::WaterGrid;
use crate::systems::weather::{plant_output_factor, WeatherState};

/// Energized-cell map, rebuilt with a full flood fill whenever grid
/// topology changes. Not serialized; a loaded game starts dirty.
#[derive(Resource, Debug)]
pub struct PowerGrid {
    /// Reachable cells mapped to hop distance from the nearest plant
    pub energized: HashMap<GridPos, u32>,
    pub dirty: bool,
    /// Raw plant output last month, before storage
    pub supply_kw: f32,
    /// Connected consumer draw last month
    pub demand_kw: f32,
}

impl Default for PowerGrid {
    fn default() -> Self {
        Self {
            energized: HashMap::new(),
            dirty: true,
            supply_kw: 0.0,
            demand_kw: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridCondition {
    #[default]
    Stable,
    Brownout,
    Blackout,
}

/// Grid stress state machine, advanced once per month by the balance pass
#[derive(Resource, Debug)]
pub struct GridStability {
    pub condition: GridCondition,
    /// Supply-to-demand ratio after storage discharge
    pub ratio: f32,
    /// Consecutive months spent below stable
    pub stressed_months: u32,
}

impl Default for GridStability {
    fn default() -> Self {
        Self {
            condition: GridCondition::Stable,
            ratio: 1.0,
            stressed_months: 0,
        }
    }
}

/// System that flags both utility networks for a rebuild when the grid
/// topology changed
pub fn mark_networks_dirty_system(
    mut events: EventReader<MapChangedEvent>,
    mut power: ResMut<PowerGrid>,
    mut water: ResMut<WaterGrid>,
) {
    for event in events.read() {
        power.dirty = true;
        water.dirty = true;
        log::debug!("Utility networks dirtied by {:?} at {:?}", event.change, event.position);
    }
}

/// System that rebuilds the energized-cell map when the grid is dirty
pub fn power_network_system(
    mut grid: ResMut<PowerGrid>,
    map: Res<CityMap>,
    config: Res<GameConfig>,
    lines: Query<(&PowerLine, &GridPos)>,
    buildings: Query<(&Building, &GridPos)>,
    plants: Query<(&Building, &PowerPlant, &GridPos)>,
) {
    if !grid.dirty {
        return;
    }

    let conductive = conductive_cells(&map, &config, &lines, &buildings);

    let sources: Vec<GridPos> = plants
        .iter()
        .filter(|(building, _, _)| building.built && building.health >= 0.5)
        .flat_map(|(building, _, pos)| {
            let size = building_size(&config, &building.kind);
            footprint_cells(*pos, size)
        })
        .collect();

    grid.energized = flood_fill(&sources, &conductive, None);
    grid.dirty = false;

    log::debug!(
        "Power network rebuilt: {} sources, {} energized cells",
        sources.len(),
        grid.energized.len()
    );
}

/// System that balances supply against demand and assigns powered flags.
///
/// Runs every month even when the network itself did not change, because
/// weather, storage charge and consumer load all move month to month.
pub fn power_balance_system(
    mut grid: ResMut<PowerGrid>,
    mut stability: ResMut<GridStability>,
    mut water: ResMut<WaterGrid>,
    weather: Res<WeatherState>,
    config: Res<GameConfig>,
    difficulty: Res<Difficulty>,
    mut notifications: EventWriter<NotificationEvent>,
    mut query: Query<(
        Entity,
        &mut Building,
        &GridPos,
        Option<&Zone>,
        Option<&PowerPlant>,
        Option<&mut PowerStorageUnit>,
    )>,
) {
    // First pass: read-only sweep for supply, consumer loads and storage.
    let mut supply = 0.0f32;
    let mut consumers: Vec<ConsumerLoad> = Vec::new();
    let mut storage: Vec<StorageState> = Vec::new();

    for (entity, building, pos, zone, plant, storage_unit) in query.iter() {
        if !building.built {
            continue;
        }

        if let Some(plant) = plant {
            if building.health >= 0.5 {
                if let Some(def) = config.buildings.get(&building.kind) {
                    if let Some(plant_def) = def.plant {
                        supply += plant_def.output_kw
                            * plant_output_factor(plant.kind, weather.current, weather.season);
                    }
                }
            }
            continue;
        }

        let size = building_size(&config, &building.kind);
        let cells = footprint_cells(*pos, size);
        let distance = connection_distance(&cells, &grid.energized);

        if let Some(unit) = storage_unit {
            if distance.is_some() {
                storage.push(StorageState {
                    entity,
                    charge: unit.charge_kwh,
                    capacity: unit.capacity_kwh,
                    pos: *pos,
                });
            }
            continue;
        }

        let draw = building_power_draw(&config, &building.kind, zone);
        if draw <= 0.0 {
            continue;
        }

        if let Some(distance) = distance {
            consumers.push(ConsumerLoad {
                entity,
                draw,
                distance,
                pos: *pos,
            });
        }
        // Disconnected consumers simply never enter the powered set.
    }

    let outcome = balance(
        supply,
        &mut consumers,
        &mut storage,
        config.balance.storage_efficiency,
        difficulty.brownout_threshold,
        difficulty.blackout_threshold,
    );

    grid.supply_kw = supply;
    grid.demand_kw = outcome.total_demand;

    // Stability transitions drive notifications.
    if outcome.condition != stability.condition {
        match outcome.condition {
            GridCondition::Brownout => {
                notifications.send(
                    NotificationEvent::new(NotificationKind::PowerShortage)
                        .with_value((outcome.ratio * 100.0) as i64),
                );
            }
            GridCondition::Blackout => {
                notifications.send(NotificationEvent::new(NotificationKind::Blackout));
            }
            GridCondition::Stable => {}
        }
    }
    stability.condition = outcome.condition;
    stability.ratio = outcome.ratio;
    stability.stressed_months = if outcome.condition == GridCondition::Stable {
        0
    } else {
        stability.stressed_months + 1
    };

    // Second pass: apply powered flags and storage charge.
    let mut pumps_changed = false;
    for (entity, mut building, _, zone, plant, storage_unit) in query.iter_mut() {
        if let Some(mut unit) = storage_unit {
            if let Some(charge) = outcome.new_charges.get(&entity) {
                unit.charge_kwh = *charge;
            }
            continue;
        }

        if !building.built {
            continue;
        }

        let powered = if plant.is_some() {
            building.health >= 0.5
        } else if building_power_draw(&config, &building.kind, zone) > 0.0 {
            outcome.powered.contains(&entity)
        } else {
            true
        };

        if building.powered != powered {
            pumps_changed = true; // a consumer changed state; pumps may be among them
        }
        building.powered = powered;
        if powered {
            building.months_unpowered = 0;
        } else {
            building.months_unpowered += 1;
        }
    }

    // Pump power state feeds the water fill's source set.
    if pumps_changed {
        water.dirty = true;
    }
}

pub(crate) struct ConsumerLoad {
    pub entity: Entity,
    pub draw: f32,
    pub distance: u32,
    pub pos: GridPos,
}

pub(crate) struct StorageState {
    pub entity: Entity,
    pub charge: f32,
    pub capacity: f32,
    pub pos: GridPos,
}

pub(crate) struct BalanceOutcome {
    pub condition: GridCondition,
    pub ratio: f32,
    pub total_demand: f32,
    pub powered: HashSet<Entity>,
    pub new_charges: HashMap<Entity, f32>,
}

/// Pure balance step: storage charge/discharge, stability classification
/// and brownout shedding
pub(crate) fn balance(
    supply: f32,
    consumers: &mut [ConsumerLoad],
    storage: &mut [StorageState],
    storage_efficiency: f32,
    brownout_threshold: f32,
    blackout_threshold: f32,
) -> BalanceOutcome {
    let total_demand: f32 = consumers.iter().map(|c| c.draw).sum();

    // Deterministic ordering for both charge priority and shedding.
    storage.sort_by_key(|s| s.pos);

    let mut new_charges = HashMap::new();
    let mut effective_supply = supply;

    if supply >= total_demand {
        // Surplus charges batteries, losing a little to conversion.
        let mut surplus = supply - total_demand;
        for unit in storage.iter() {
            let room = unit.capacity - unit.charge;
            let take = (room / storage_efficiency).min(surplus);
            if take > 0.0 {
                new_charges.insert(unit.entity, unit.charge + take * storage_efficiency);
                surplus -= take;
            }
        }
    } else {
        // Deficit drains batteries before anyone browns out.
        let mut deficit = total_demand - supply;
        for unit in storage.iter() {
            let give = unit.charge.min(deficit);
            if give > 0.0 {
                new_charges.insert(unit.entity, unit.charge - give);
                effective_supply += give;
                deficit -= give;
            }
        }
    }

    let ratio = if total_demand <= f32::EPSILON {
        1.0
    } else {
        effective_supply / total_demand
    };

    let condition = if ratio >= brownout_threshold {
        GridCondition::Stable
    } else if ratio >= blackout_threshold {
        GridCondition::Brownout
    } else {
        GridCondition::Blackout
    };

    let mut powered = HashSet::new();
    match condition {
        GridCondition::Stable => {
            powered.extend(consumers.iter().map(|c| c.entity));
        }
        GridCondition::Brownout => {
            // Nearest consumers keep power until supply runs out.
            consumers.sort_by_key(|c| (c.distance, c.pos));
            let mut remaining = effective_supply;
            for consumer in consumers.iter() {
                if consumer.draw <= remaining {
                    remaining -= consumer.draw;
                    powered.insert(consumer.entity);
                }
            }
        }
        GridCondition::Blackout => {}
    }

    BalanceOutcome {
        condition,
        ratio,
        total_demand,
        powered,
        new_charges,
    }
}

/// Cells that carry current: roads, healthy lines, and built buildings
pub(crate) fn conductive_cells(
    map: &CityMap,
    config: &GameConfig,
    lines: &Query<(&PowerLine, &GridPos)>,
    buildings: &Query<(&Building, &GridPos)>,
) -> HashSet<GridPos> {
    let mut conductive = HashSet::new();

    for y in 0..map.height {
        for x in 0..map.width {
            let pos = GridPos::new(x as i32, y as i32);
            if map.is_road(pos) {
                conductive.insert(pos);
            }
        }
    }

    for (line, pos) in lines.iter() {
        if line.is_conductive() {
            conductive.insert(*pos);
        }
    }

    for (building, pos) in buildings.iter() {
        if building.built {
            let size = building_size(config, &building.kind);
            conductive.extend(footprint_cells(*pos, size));
        }
    }

    conductive
}

/// Multi-source flood fill over conductive cells. Returns every reachable
/// cell with its hop distance from the nearest source; `limit` truncates
/// the result (used by water pressure).
pub(crate) fn flood_fill(
    sources: &[GridPos],
    conductive: &HashSet<GridPos>,
    limit: Option<u32>,
) -> HashMap<GridPos, u32> {
    #[derive(Clone, PartialEq, Eq, Hash)]
    enum Node {
        Root,
        Cell(GridPos),
    }

    if sources.is_empty() {
        return HashMap::new();
    }

    let reachable = dijkstra_all(&Node::Root, |node| -> Vec<(Node, u32)> {
        match node {
            Node::Root => sources.iter().map(|pos| (Node::Cell(*pos), 0)).collect(),
            Node::Cell(pos) => pos
                .neighbors4()
                .iter()
                .filter(|neighbor| conductive.contains(*neighbor))
                .map(|neighbor| (Node::Cell(*neighbor), 1))
                .collect(),
        }
    });

    reachable
        .into_iter()
        .filter_map(|(node, (_, cost))| match node {
            Node::Cell(pos) if limit.map_or(true, |l| cost <= l) => Some((pos, cost)),
            _ => None,
        })
        .collect()
}

/// Shortest distance from any footprint cell (or orthogonal neighbor) to
/// an energized cell, if connected at all
pub(crate) fn connection_distance(
    cells: &[GridPos],
    energized: &HashMap<GridPos, u32>,
) -> Option<u32> {
    let mut best: Option<u32> = None;
    for cell in cells {
        if let Some(distance) = energized.get(cell) {
            best = Some(best.map_or(*distance, |b| b.min(*distance)));
        }
        for neighbor in cell.neighbors4() {
            if let Some(distance) = energized.get(&neighbor) {
                let through = distance + 1;
                best = Some(best.map_or(through, |b| b.min(through)));
            }
        }
    }
    best
}

pub(crate) fn building_size(config: &GameConfig, kind: &str) -> (u32, u32) {
    config
        .buildings
        .get(kind)
        .map(|def| def.size)
        .unwrap_or((1, 1))
}

/// Monthly draw in kW; zoned lots use their tier table
pub(crate) fn building_power_draw(config: &GameConfig, kind: &str, zone: Option<&Zone>) -> f32 {
    if let Some(zone) = zone {
        return config
            .zone_tiers
            .tier(zone.kind, zone.level)
            .map(|tier| tier.power_draw_kw)
            .unwrap_or(0.0);
    }
    config
        .buildings
        .get(kind)
        .map(|def| def.power_draw_kw)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(cells: &[(i32, i32)]) -> HashSet<GridPos> {
        cells.iter().map(|(x, y)| GridPos::new(*x, *y)).collect()
    }

    #[test]
    fn test_flood_fill_follows_conductive_path() {
        let sources = vec![GridPos::new(0, 0)];
        let conductive = set(&[(1, 0), (2, 0), (3, 0)]);
        let energized = flood_fill(&sources, &conductive, None);

        assert_eq!(energized.get(&GridPos::new(0, 0)), Some(&0));
        assert_eq!(energized.get(&GridPos::new(3, 0)), Some(&3));
        // Cells off the path are dark
        assert!(!energized.contains_key(&GridPos::new(0, 1)));
    }

    #[test]
    fn test_flood_fill_gap_blocks_current() {
        let sources = vec![GridPos::new(0, 0)];
        // Gap at (2, 0)
        let conductive = set(&[(1, 0), (3, 0), (4, 0)]);
        let energized = flood_fill(&sources, &conductive, None);

        assert!(energized.contains_key(&GridPos::new(1, 0)));
        assert!(!energized.contains_key(&GridPos::new(3, 0)));
    }

    #[test]
    fn test_flood_fill_multi_source_takes_nearest() {
        let sources = vec![GridPos::new(0, 0), GridPos::new(6, 0)];
        let conductive = set(&[(1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]);
        let energized = flood_fill(&sources, &conductive, None);

        assert_eq!(energized.get(&GridPos::new(5, 0)), Some(&1));
        assert_eq!(energized.get(&GridPos::new(3, 0)), Some(&3));
    }

    #[test]
    fn test_flood_fill_respects_limit() {
        let sources = vec![GridPos::new(0, 0)];
        let conductive = set(&[(1, 0), (2, 0), (3, 0), (4, 0)]);
        let energized = flood_fill(&sources, &conductive, Some(2));

        assert!(energized.contains_key(&GridPos::new(2, 0)));
        assert!(!energized.contains_key(&GridPos::new(3, 0)));
    }

    #[test]
    fn test_connection_through_adjacency() {
        let mut energized = HashMap::new();
        energized.insert(GridPos::new(5, 5), 4u32);

        // Building one cell away connects with one extra hop
        let cells = [GridPos::new(5, 6)];
        assert_eq!(connection_distance(&cells, &energized), Some(5));

        // Diagonal does not connect
        let cells = [GridPos::new(6, 6)];
        assert_eq!(connection_distance(&cells, &energized), None);
    }

    fn consumer(id: u32, draw: f32, distance: u32) -> ConsumerLoad {
        ConsumerLoad {
            entity: Entity::from_raw(id),
            draw,
            distance,
            pos: GridPos::new(id as i32, 0),
        }
    }

    #[test]
    fn test_balance_stable_when_supply_meets_demand() {
        let mut consumers = vec![consumer(1, 50.0, 1), consumer(2, 50.0, 2)];
        let mut storage = vec![];
        let outcome = balance(120.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);

        assert_eq!(outcome.condition, GridCondition::Stable);
        assert_eq!(outcome.powered.len(), 2);
        assert!(outcome.ratio >= 1.0);
    }

    #[test]
    fn test_balance_zero_demand_is_stable() {
        let mut consumers = vec![];
        let mut storage = vec![];
        let outcome = balance(0.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);
        assert_eq!(outcome.condition, GridCondition::Stable);
        assert_eq!(outcome.ratio, 1.0);
    }

    #[test]
    fn test_brownout_sheds_farthest_first() {
        let mut consumers = vec![
            consumer(1, 40.0, 1),
            consumer(2, 40.0, 5),
            consumer(3, 40.0, 9),
        ];
        let mut storage = vec![];
        // 80 of 120 available: ratio 0.66 within brownout band
        let outcome = balance(80.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);

        assert_eq!(outcome.condition, GridCondition::Brownout);
        assert!(outcome.powered.contains(&Entity::from_raw(1)));
        assert!(outcome.powered.contains(&Entity::from_raw(2)));
        assert!(!outcome.powered.contains(&Entity::from_raw(3)));
    }

    #[test]
    fn test_blackout_powers_nobody() {
        let mut consumers = vec![consumer(1, 100.0, 1), consumer(2, 100.0, 2)];
        let mut storage = vec![];
        let outcome = balance(40.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);

        assert_eq!(outcome.condition, GridCondition::Blackout);
        assert!(outcome.powered.is_empty());
    }

    #[test]
    fn test_storage_charges_from_surplus() {
        let mut consumers = vec![consumer(1, 50.0, 1)];
        let mut storage = vec![StorageState {
            entity: Entity::from_raw(9),
            charge: 0.0,
            capacity: 100.0,
            pos: GridPos::new(0, 0),
        }];
        let outcome = balance(100.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);

        assert_eq!(outcome.condition, GridCondition::Stable);
        let charge = outcome.new_charges[&Entity::from_raw(9)];
        // 50 kW surplus at 0.9 round-trip efficiency
        assert!((charge - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_storage_covers_deficit() {
        let mut consumers = vec![consumer(1, 100.0, 1)];
        let mut storage = vec![StorageState {
            entity: Entity::from_raw(9),
            charge: 60.0,
            capacity: 100.0,
            pos: GridPos::new(0, 0),
        }];
        // 50 raw supply + 50 discharged covers the full 100 demand
        let outcome = balance(50.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);

        assert_eq!(outcome.condition, GridCondition::Stable);
        assert!(outcome.powered.contains(&Entity::from_raw(1)));
        let charge = outcome.new_charges[&Entity::from_raw(9)];
        assert!((charge - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_storage_never_overcharges() {
        let mut consumers = vec![];
        let mut storage = vec![StorageState {
            entity: Entity::from_raw(9),
            charge: 95.0,
            capacity: 100.0,
            pos: GridPos::new(0, 0),
        }];
        let outcome = balance(1000.0, &mut consumers, &mut storage, 0.9, 0.95, 0.6);

        let charge = outcome.new_charges[&Entity::from_raw(9)];
        assert!(charge <= 100.0 + f32::EPSILON);
    }
}
