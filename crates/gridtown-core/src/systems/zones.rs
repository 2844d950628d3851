//! Zone development: lots grow into buildings, climb tiers, and decay.
//!
//! A lot develops when demand for its kind, the land under it, and service
//! coverage together clear the threshold, then passes through a
//! construction phase like any placed building. Tier upgrades are instant
//! once a thriving lot qualifies; sustained unpower walks the whole thing
//! back to an empty lot.

use bevy::prelude::*;
use rand::Rng;

use crate::components::{Building, GridPos, Zone, ZoneKind};
use crate::events::{MapChangeKind, MapChangedEvent, NotificationEvent};
use crate::notifications::NotificationKind;
use crate::resources::{CityState, GameConfig, RngSeed, SimClock};
use crate::systems::demand::DemandState;
use crate::systems::land_value::LandValueGrid;
use crate::systems::month_rng;
use crate::systems::services::CityCoverage;

const ZONE_SALT: u64 = 0x2022_0E5A_0003;

/// System that advances every zone lot by one month
pub fn zone_development_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    city: Res<CityState>,
    demand: Res<DemandState>,
    land_value: Res<LandValueGrid>,
    coverage: Res<CityCoverage>,
    seed: Res<RngSeed>,
    clock: Res<SimClock>,
    mut notifications: EventWriter<NotificationEvent>,
    mut map_events: EventWriter<MapChangedEvent>,
    mut zones: Query<(Entity, &mut Zone, &GridPos, Option<&mut Building>)>,
) {
    let mut rng = month_rng(seed.0, clock.month, ZONE_SALT);
    let coverage_score = coverage.overall_score() / 100.0;
    let mut started = 0;

    for (entity, mut zone, pos, building) in zones.iter_mut() {
        let kind_demand = demand.for_kind(zone.kind);
        let score = development_score(kind_demand, land_value.get(*pos), coverage_score);

        match building {
            None => {
                if kind_demand < 0.1 || score < config.balance.development_threshold {
                    continue;
                }
                let chance = (config.balance.development_chance * kind_demand).clamp(0.0, 1.0);
                if rng.gen::<f32>() < chance {
                    commands
                        .entity(entity)
                        .insert(Building::new(zone.kind.building_key()));
                    started += 1;
                }
            }
            Some(building) if building.built => {
                if zone.level == 0 {
                    // Construction just finished: the lot opens at tier 1
                    zone.level = 1;
                    zone.occupancy = 0.3;
                    continue;
                }

                if zone.kind == ZoneKind::Residential {
                    // Homes fill with the people who actually moved in
                    let target = if building.operational && city.zone_stats.housing_capacity > 0 {
                        (city.population as f32 / city.zone_stats.housing_capacity as f32)
                            .clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    zone.occupancy += (target - zone.occupancy) * 0.3;
                } else if building.operational && kind_demand > 0.0 {
                    zone.occupancy = (zone.occupancy + 0.15).min(1.0);
                } else if kind_demand < -0.2 || !building.operational {
                    zone.occupancy = (zone.occupancy - 0.1).max(0.0);
                }

                let max_level = config.zone_tiers.max_level(zone.kind);
                if zone.level < max_level
                    && zone.occupancy > 0.75
                    && score > config.balance.upgrade_threshold
                    && rng.gen::<f32>() < 0.25
                {
                    zone.level += 1;
                    log::debug!("{:?} lot at {:?} grew to tier {}", zone.kind, pos, zone.level);
                } else if zone.occupancy < 0.1 && zone.level > 1 {
                    zone.level -= 1;
                    log::debug!("{:?} lot at {:?} fell to tier {}", zone.kind, pos, zone.level);
                }

                if building.months_unpowered > config.balance.abandonment_months {
                    let name = config
                        .buildings
                        .get(zone.kind.building_key())
                        .map(|def| def.name.clone())
                        .unwrap_or_else(|| zone.kind.building_key().to_string());

                    commands.entity(entity).remove::<Building>();
                    zone.level = 0;
                    zone.occupancy = 0.0;

                    notifications.send(
                        NotificationEvent::new(NotificationKind::Abandonment)
                            .with_target(name)
                            .at(*pos),
                    );
                    map_events.send(MapChangedEvent {
                        position: *pos,
                        change: MapChangeKind::BuildingRemoved,
                    });
                }
            }
            Some(_) => {} // still under construction
        }
    }

    if started > 0 {
        log::info!("Zone growth: {} lots began construction", started);
    }
}

/// Weighted development score in [0 -ish, 1]: demand leads, land value and
/// services follow
pub(crate) fn development_score(demand: f32, land_value: f32, coverage: f32) -> f32 {
    demand * 0.5 + land_value * 0.3 + coverage * 0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_leans_on_demand() {
        let high_demand = development_score(1.0, 0.3, 0.0);
        let high_value = development_score(0.3, 1.0, 0.0);
        assert!(high_demand > high_value);
    }

    #[test]
    fn test_slum_scores_below_threshold() {
        // Weak demand on blighted land with no services
        let score = development_score(0.2, 0.1, 0.0);
        assert!(score < 0.45);
    }

    #[test]
    fn test_prime_lot_clears_upgrade_bar() {
        let score = development_score(0.9, 0.8, 0.7);
        assert!(score > 0.65);
    }
}
