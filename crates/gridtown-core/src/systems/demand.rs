//! RCI (Residential/Commercial/Industrial) demand.
//!
//! Demand per zone kind lives in [-1, 1]: positive pulls new development,
//! negative drains occupancy. The curves weigh housing against jobs, shops
//! against population, and industry against commerce, then tax pressure and
//! city mood shift the whole board.

use bevy::prelude::*;

use crate::components::{Building, Zone, ZoneKind};
use crate::resources::{CityState, Difficulty, GameConfig, ZoneStats};
use crate::systems::services::ServiceEffects;

/// Demand levels for each zone kind, recalculated monthly
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct DemandState {
    pub residential: f32,
    pub commercial: f32,
    pub industrial: f32,
}

impl DemandState {
    pub fn for_kind(&self, kind: ZoneKind) -> f32 {
        match kind {
            ZoneKind::Residential => self.residential,
            ZoneKind::Commercial => self.commercial,
            ZoneKind::Industrial => self.industrial,
        }
    }
}

/// System that recounts lots, capacity and jobs into `CityState`
pub fn update_zone_stats_system(
    mut city: ResMut<CityState>,
    config: Res<GameConfig>,
    zones: Query<(&Zone, Option<&Building>)>,
) {
    let mut stats = ZoneStats::default();

    for (zone, building) in zones.iter() {
        let built = building.map(|b| b.built).unwrap_or(false);
        let operational = building.map(|b| b.operational).unwrap_or(false);
        let developed = zone.level > 0 && built;

        match zone.kind {
            ZoneKind::Residential => {
                stats.residential_lots += 1;
                if developed {
                    stats.residential_developed += 1;
                    if let Some(tier) = config.zone_tiers.tier(zone.kind, zone.level) {
                        stats.housing_capacity += tier.capacity;
                    }
                }
            }
            ZoneKind::Commercial => {
                stats.commercial_lots += 1;
                if developed {
                    stats.commercial_developed += 1;
                    // Only an operating business hires
                    if operational {
                        if let Some(tier) = config.zone_tiers.tier(zone.kind, zone.level) {
                            stats.commercial_jobs += tier.capacity;
                        }
                    }
                }
            }
            ZoneKind::Industrial => {
                stats.industrial_lots += 1;
                if developed {
                    stats.industrial_developed += 1;
                    if operational {
                        if let Some(tier) = config.zone_tiers.tier(zone.kind, zone.level) {
                            stats.industrial_jobs += tier.capacity;
                        }
                    }
                }
            }
        }
    }

    city.zone_stats = stats;
}

/// System that recalculates RCI demand
pub fn calculate_demand_system(
    city: Res<CityState>,
    difficulty: Res<Difficulty>,
    effects: Res<ServiceEffects>,
    mut demand: ResMut<DemandState>,
) {
    *demand = compute_demand(
        &city.zone_stats,
        city.population,
        city.happiness,
        city.employment,
        difficulty.tax_rate,
        effects.education_modifier,
    );
}

pub(crate) fn compute_demand(
    stats: &ZoneStats,
    population: u32,
    happiness: f32,
    employment: f32,
    tax_rate: f32,
    education_modifier: f32,
) -> DemandState {
    // A fresh city wants a bit of everything to get moving.
    if stats.residential_lots == 0 && stats.commercial_lots == 0 && stats.industrial_lots == 0 {
        return DemandState {
            residential: 0.8,
            commercial: 0.5,
            industrial: 0.3,
        };
    }

    let total_jobs = stats.total_jobs();

    // Residential demand: jobs chasing housing
    let mut r_demand = if stats.housing_capacity > 0 {
        let job_housing_ratio = total_jobs as f32 / stats.housing_capacity as f32;
        (job_housing_ratio - 0.8).clamp(-1.0, 1.0)
    } else if total_jobs > 0 {
        1.0 // jobs but nowhere to live
    } else {
        0.5 // nothing yet, moderate pull to kickstart
    };

    // Commercial demand: shoppers per shop job
    let mut c_demand = if population > 0 {
        let pop_per_commercial = if stats.commercial_jobs > 0 {
            population as f32 / stats.commercial_jobs as f32
        } else {
            100.0
        };
        ((pop_per_commercial - 2.0) / 5.0).clamp(-1.0, 1.0)
    } else if stats.residential_lots > 0 {
        0.3
    } else {
        0.0
    };

    // Industrial demand: goods supply for commerce
    let mut i_demand = if stats.commercial_lots > 0 {
        let ind_com_ratio = if stats.industrial_lots > 0 {
            stats.industrial_lots as f32 / stats.commercial_lots as f32
        } else {
            0.0
        };
        ((0.5 - ind_com_ratio) * 2.0).clamp(-1.0, 1.0)
    } else if stats.residential_lots > 0 {
        0.2
    } else {
        0.0
    };

    // Undeveloped zoning keeps a floor under demand
    let res_dev_rate = development_rate(stats.residential_developed, stats.residential_lots);
    let com_dev_rate = development_rate(stats.commercial_developed, stats.commercial_lots);
    let ind_dev_rate = development_rate(stats.industrial_developed, stats.industrial_lots);

    if res_dev_rate < 0.5 {
        r_demand = r_demand.max(0.3);
    }
    if com_dev_rate < 0.5 {
        c_demand = c_demand.max(0.2);
    }
    if ind_dev_rate < 0.5 {
        i_demand = i_demand.max(0.1);
    }

    // High taxes push everyone away; a content city pulls movers in.
    let tax_pressure = (tax_rate - 1.0).max(0.0) * 0.5;
    r_demand += (happiness - 0.5) * 0.3 - tax_pressure;
    c_demand += education_modifier - tax_pressure;
    i_demand -= tax_pressure;

    if employment < 0.5 {
        // Nobody moves to a town with no work
        r_demand -= (0.5 - employment) * 0.3;
    }

    DemandState {
        residential: r_demand.clamp(-1.0, 1.0),
        commercial: c_demand.clamp(-1.0, 1.0),
        industrial: i_demand.clamp(-1.0, 1.0),
    }
}

fn development_rate(developed: u32, lots: u32) -> f32 {
    if lots > 0 {
        developed as f32 / lots as f32
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral(stats: &ZoneStats, population: u32) -> DemandState {
        compute_demand(stats, population, 0.5, 1.0, 1.0, 0.0)
    }

    #[test]
    fn test_empty_city_kickstart() {
        let demand = neutral(&ZoneStats::default(), 0);
        assert!(demand.residential > 0.5);
        assert!(demand.commercial > 0.0);
        assert!(demand.industrial > 0.0);
    }

    #[test]
    fn test_jobs_without_housing_pull_residents() {
        let stats = ZoneStats {
            commercial_lots: 4,
            commercial_developed: 4,
            commercial_jobs: 120,
            ..Default::default()
        };
        let demand = neutral(&stats, 0);
        assert!(demand.residential > 0.8);
    }

    #[test]
    fn test_unzoned_city_with_lots_stays_in_range() {
        let stats = ZoneStats {
            residential_lots: 10,
            residential_developed: 10,
            housing_capacity: 500,
            ..Default::default()
        };
        // Lots of empty housing, no jobs: residential demand sinks
        let demand = neutral(&stats, 100);
        assert!(demand.residential < 0.0);
        assert!(demand.residential >= -1.0);
    }

    #[test]
    fn test_high_taxes_depress_demand() {
        let stats = ZoneStats {
            residential_lots: 10,
            residential_developed: 2,
            housing_capacity: 32,
            commercial_lots: 5,
            commercial_developed: 1,
            commercial_jobs: 10,
            industrial_lots: 3,
            industrial_developed: 1,
            industrial_jobs: 14,
            ..Default::default()
        };
        let normal = compute_demand(&stats, 200, 0.5, 1.0, 1.0, 0.0);
        let taxed = compute_demand(&stats, 200, 0.5, 1.0, 1.4, 0.0);
        assert!(taxed.residential < normal.residential);
        assert!(taxed.commercial < normal.commercial);
        assert!(taxed.industrial < normal.industrial);
    }

    #[test]
    fn test_demand_is_clamped() {
        let stats = ZoneStats {
            commercial_lots: 100,
            commercial_developed: 100,
            commercial_jobs: 10_000,
            ..Default::default()
        };
        let demand = compute_demand(&stats, 1_000_000, 1.0, 1.0, 0.5, 0.2);
        for value in [demand.residential, demand.commercial, demand.industrial] {
            assert!((-1.0..=1.0).contains(&value));
        }
    }
}
