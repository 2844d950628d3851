//! Storm damage and repair, fire and crime rolls, and collapse cleanup.
//!
//! Damage rolls scale with the difficulty preset's disaster rate. Repairs
//! are tracked as jobs that advance each month and bill the ledger while
//! active.

use bevy::prelude::*;
use rand::Rng;

use crate::components::{Building, GridPos, PowerLine, Rubble, Zone};
use crate::events::{
    BuildingCollapsedEvent, MapChangeKind, MapChangedEvent, NotificationEvent,
};
use crate::notifications::NotificationKind;
use crate::resources::{CityState, Difficulty, GameConfig, RngSeed, SimClock};
use crate::systems::month_rng;
use crate::systems::services::ServiceEffects;
use crate::systems::weather::{Weather, WeatherState};

const STORM_SALT: u64 = 0xD15A_57E4_0001;
const FIRE_SALT: u64 = 0xD15A_57E4_0002;

/// Repair queue for storm- and fire-damaged structures
#[derive(Resource, Debug, Default)]
pub struct StormDamage {
    pub repairs: Vec<RepairJob>,
}

#[derive(Debug)]
pub struct RepairJob {
    pub target: Entity,
    pub progress: f32,
}

impl StormDamage {
    fn is_queued(&self, entity: Entity) -> bool {
        self.repairs.iter().any(|job| job.target == entity)
    }
}

/// Rolling disaster bookkeeping consumed by happiness and the ledger
#[derive(Resource, Debug, Default)]
pub struct DisasterLog {
    /// Happiness penalty from recent events, decays by half each month
    pub recent_penalty: f32,
    /// Crime losses billed to this month's ledger
    pub crime_losses: i64,
    pub fires_this_month: u32,
}

impl DisasterLog {
    fn record_event(&mut self, weight: f32) {
        self.recent_penalty = (self.recent_penalty + weight).min(0.5);
    }
}

/// System that applies storm damage to lines and buildings
pub fn storm_damage_system(
    weather: Res<WeatherState>,
    difficulty: Res<Difficulty>,
    seed: Res<RngSeed>,
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    mut disasters: ResMut<DisasterLog>,
    mut lines: Query<(&mut PowerLine, &GridPos)>,
    mut buildings: Query<(&mut Building, &GridPos)>,
    mut map_events: EventWriter<MapChangedEvent>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    // Last month's shock fades whether or not it storms again.
    disasters.recent_penalty *= 0.5;
    if disasters.recent_penalty < 0.01 {
        disasters.recent_penalty = 0.0;
    }

    if weather.current != Weather::Storm {
        return;
    }

    let mut rng = month_rng(seed.0, clock.month, STORM_SALT);
    let line_chance = (0.15 * difficulty.disaster_rate).clamp(0.0, 1.0);
    let building_chance = (0.05 * difficulty.disaster_rate).clamp(0.0, 1.0);

    let mut severed = 0;
    for (mut line, pos) in lines.iter_mut() {
        if rng.gen::<f32>() >= line_chance {
            continue;
        }
        let was_conductive = line.is_conductive();
        line.health = (line.health - rng.gen_range(0.3..0.7)).max(0.0);
        if was_conductive && !line.is_conductive() {
            severed += 1;
            map_events.send(MapChangedEvent {
                position: *pos,
                change: MapChangeKind::PowerLineSevered,
            });
        }
    }
    if severed > 0 {
        disasters.record_event(0.1);
        notifications.send(
            NotificationEvent::new(NotificationKind::StormDamage)
                .with_target(format!("{} power lines", severed)),
        );
    }

    for (mut building, pos) in buildings.iter_mut() {
        if !building.built || rng.gen::<f32>() >= building_chance {
            continue;
        }
        building.health = (building.health - rng.gen_range(0.1..0.35)).max(0.0);
        disasters.record_event(0.1);

        let name = config
            .buildings
            .get(&building.kind)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| building.kind.clone());
        notifications.send(
            NotificationEvent::new(NotificationKind::StormDamage)
                .with_target(name)
                .at(*pos),
        );
    }
}

/// System that rolls fires and tallies crime losses
pub fn fire_crime_system(
    weather: Res<WeatherState>,
    effects: Res<ServiceEffects>,
    difficulty: Res<Difficulty>,
    seed: Res<RngSeed>,
    clock: Res<SimClock>,
    config: Res<GameConfig>,
    city: Res<CityState>,
    mut disasters: ResMut<DisasterLog>,
    mut buildings: Query<(&mut Building, &GridPos)>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    let mut rng = month_rng(seed.0, clock.month, FIRE_SALT);

    let heat_factor = if weather.current == Weather::Heatwave {
        2.0
    } else {
        1.0
    };
    let chance = (config.balance.base_fire_chance
        * (0.5 + effects.fire_risk)
        * difficulty.disaster_rate
        * heat_factor)
        .clamp(0.0, 1.0);

    disasters.fires_this_month = 0;
    for (mut building, pos) in buildings.iter_mut() {
        if !building.built || rng.gen::<f32>() >= chance {
            continue;
        }
        building.health = (building.health - rng.gen_range(0.2..0.5)).max(0.0);
        disasters.fires_this_month += 1;
        disasters.record_event(0.05);

        let name = config
            .buildings
            .get(&building.kind)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| building.kind.clone());
        notifications.send(
            NotificationEvent::new(NotificationKind::Fire)
                .with_target(name)
                .at(*pos),
        );
    }

    // Crime skims the till in proportion to police coverage gaps.
    let commercial = city.zone_stats.commercial_developed as f32;
    disasters.crime_losses =
        (commercial * config.balance.crime_loss_per_lot as f32 * effects.crime_modifier) as i64;
}

/// System that turns zero-health buildings into rubble (or abandoned lots)
pub fn collapse_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut query: Query<(Entity, &Building, &GridPos, Option<&mut Zone>)>,
    mut map_events: EventWriter<MapChangedEvent>,
    mut collapsed_events: EventWriter<BuildingCollapsedEvent>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    for (entity, building, pos, zone) in query.iter_mut() {
        if !building.built || building.health > 0.0 {
            continue;
        }

        let name = config
            .buildings
            .get(&building.kind)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| building.kind.clone());

        if let Some(mut zone) = zone {
            // A collapsed lot stays zoned and can redevelop later.
            zone.level = 0;
            zone.occupancy = 0.0;
            commands.entity(entity).remove::<Building>();
        } else {
            commands.entity(entity).despawn();
            commands.spawn((*pos, Rubble));
        }

        collapsed_events.send(BuildingCollapsedEvent {
            kind: building.kind.clone(),
            position: *pos,
        });
        map_events.send(MapChangedEvent {
            position: *pos,
            change: MapChangeKind::BuildingRemoved,
        });
        notifications.send(
            NotificationEvent::new(NotificationKind::Collapse)
                .with_target(name)
                .at(*pos),
        );
    }
}

/// System that queues and advances repairs on damaged structures
pub fn repair_system(
    mut storm: ResMut<StormDamage>,
    config: Res<GameConfig>,
    mut lines: Query<(Entity, &mut PowerLine, &GridPos)>,
    mut buildings: Query<(Entity, &mut Building, &GridPos)>,
    mut map_events: EventWriter<MapChangedEvent>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    // Queue anything newly damaged below the working threshold. Dead
    // buildings (health 0) go through collapse instead.
    for (entity, line, _) in lines.iter() {
        if line.health < 0.5 && !storm.is_queued(entity) {
            storm.repairs.push(RepairJob {
                target: entity,
                progress: 0.0,
            });
        }
    }
    for (entity, building, _) in buildings.iter() {
        if building.built
            && building.health > 0.0
            && building.health < 0.5
            && !storm.is_queued(entity)
        {
            storm.repairs.push(RepairJob {
                target: entity,
                progress: 0.0,
            });
        }
    }

    let repair_rate = config.balance.repair_rate;
    let mut finished: Vec<Entity> = Vec::new();

    for job in storm.repairs.iter_mut() {
        job.progress += repair_rate;
        if job.progress < 1.0 {
            continue;
        }

        if let Ok((_, mut line, pos)) = lines.get_mut(job.target) {
            line.health = 1.0;
            map_events.send(MapChangedEvent {
                position: *pos,
                change: MapChangeKind::StructureRepaired,
            });
            notifications.send(
                NotificationEvent::new(NotificationKind::RepairComplete)
                    .with_target("a power line"),
            );
        } else if let Ok((_, mut building, pos)) = buildings.get_mut(job.target) {
            building.health = 1.0;
            let name = config
                .buildings
                .get(&building.kind)
                .map(|def| def.name.clone())
                .unwrap_or_else(|| building.kind.clone());
            map_events.send(MapChangedEvent {
                position: *pos,
                change: MapChangeKind::StructureRepaired,
            });
            notifications.send(
                NotificationEvent::new(NotificationKind::RepairComplete).with_target(name),
            );
        }
        finished.push(job.target);
    }

    // Completed jobs and jobs whose target no longer exists both drop out.
    storm.repairs.retain(|job| {
        !finished.contains(&job.target)
            && (lines.get(job.target).is_ok() || buildings.get(job.target).is_ok())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disaster_penalty_is_capped() {
        let mut log = DisasterLog::default();
        for _ in 0..20 {
            log.record_event(0.1);
        }
        assert!(log.recent_penalty <= 0.5);
    }

    #[test]
    fn test_repair_queue_dedup() {
        let mut storm = StormDamage::default();
        let entity = Entity::from_raw(7);
        storm.repairs.push(RepairJob {
            target: entity,
            progress: 0.5,
        });
        assert!(storm.is_queued(entity));
        assert!(!storm.is_queued(Entity::from_raw(8)));
    }
}
