//! Employment, happiness and population, in that order.
//!
//! The three feed each other across months: jobs lift happiness, happiness
//! pulls migrants, migrants fill jobs. Happiness itself moves slowly - each
//! month it lerps toward a weighted target instead of jumping, so a single
//! blackout stings but does not crater the city.

use bevy::prelude::*;

use crate::components::Building;
use crate::events::NotificationEvent;
use crate::notifications::NotificationKind;
use crate::resources::{CityState, Difficulty, GameConfig};
use crate::systems::disasters::DisasterLog;
use crate::systems::power::{GridCondition, GridStability};
use crate::systems::services::{CityCoverage, ServiceEffects};

/// System that recomputes the employment rate
pub fn employment_system(mut city: ResMut<CityState>, config: Res<GameConfig>) {
    let workforce = (city.population as f32 * config.balance.workforce_share) as u32;
    city.employment = if workforce == 0 {
        1.0
    } else {
        (city.zone_stats.total_jobs() as f32 / workforce as f32).min(1.0)
    };
}

/// System that moves happiness toward this month's target
pub fn happiness_system(
    mut city: ResMut<CityState>,
    stability: Res<GridStability>,
    coverage: Res<CityCoverage>,
    effects: Res<ServiceEffects>,
    disasters: Res<DisasterLog>,
    difficulty: Res<Difficulty>,
    config: Res<GameConfig>,
    buildings: Query<&Building>,
) {
    let power_score = match stability.condition {
        GridCondition::Stable => 1.0,
        GridCondition::Brownout => stability.ratio.clamp(0.0, 1.0),
        GridCondition::Blackout => 0.0,
    };

    let mut built = 0u32;
    let mut watered = 0u32;
    for building in buildings.iter() {
        if building.built {
            built += 1;
            if building.watered {
                watered += 1;
            }
        }
    }
    let water_score = if built == 0 {
        1.0
    } else {
        watered as f32 / built as f32
    };

    let target = happiness_target(
        city.employment,
        power_score,
        water_score,
        coverage.overall_score(),
        effects.happiness_modifier,
        difficulty.tax_rate,
        disasters.recent_penalty,
        city.bankrupt,
    );

    let smoothing = config.balance.happiness_smoothing;
    city.happiness = (city.happiness + (target - city.happiness) * smoothing).clamp(0.0, 1.0);
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn happiness_target(
    employment: f32,
    power_score: f32,
    water_score: f32,
    coverage_score: f32,
    park_bonus: f32,
    tax_rate: f32,
    disaster_penalty: f32,
    bankrupt: bool,
) -> f32 {
    let tax_score = (2.0 - tax_rate).clamp(0.0, 1.0);

    let mut target = employment * 0.20
        + power_score * 0.20
        + water_score * 0.10
        + (coverage_score / 100.0) * 0.20
        + tax_score * 0.20
        + park_bonus;

    target -= disaster_penalty;
    if bankrupt {
        target -= 0.15;
    }

    target.clamp(0.0, 1.0)
}

/// System that grows or shrinks the population and announces milestones
pub fn population_system(
    mut city: ResMut<CityState>,
    config: Res<GameConfig>,
    stability: Res<GridStability>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    let blackout = stability.condition == GridCondition::Blackout;
    let growth = population_step(
        city.population,
        city.zone_stats.housing_capacity,
        city.happiness,
        city.employment,
        city.bankrupt,
        blackout,
        config.balance.base_growth_rate,
    );

    let capacity = city.zone_stats.housing_capacity;
    let mut new_population = (city.population as i64 + growth as i64).max(0) as u32;
    if growth > 0 {
        // Move-ins stop at the door when housing is full
        new_population = new_population.min(capacity.max(city.population));
    }
    city.population = new_population;

    while city.milestones_reached < config.milestones.len()
        && city.population >= config.milestones[city.milestones_reached]
    {
        let milestone = config.milestones[city.milestones_reached];
        notifications.send(
            NotificationEvent::new(NotificationKind::Milestone).with_value(milestone as i64),
        );
        city.milestones_reached += 1;
    }

    city.record_population();
}

pub(crate) fn population_step(
    population: u32,
    housing_capacity: u32,
    happiness: f32,
    employment: f32,
    bankrupt: bool,
    blackout: bool,
    base_growth_rate: f32,
) -> i32 {
    if housing_capacity == 0 {
        // Nowhere to live: the city bleeds out slowly
        return -((population as f32 * 0.05).ceil() as i32);
    }

    let mut modifier = (happiness - 0.45) * 2.0;
    modifier += (employment - 0.5) * 0.5;
    if bankrupt {
        modifier -= 0.3;
    }
    if blackout {
        modifier -= 0.6;
    }

    let occupancy = population as f32 / housing_capacity as f32;
    if occupancy > 0.95 {
        modifier = modifier.min(0.1);
    }
    if occupancy > 1.0 {
        // Overcrowding after capacity loss pushes people out
        modifier -= (occupancy - 1.0) * 2.0;
    }

    if population == 0 {
        return if modifier > 0.0 {
            ((housing_capacity as f32 * 0.05) as i32).max(4)
        } else {
            0
        };
    }

    let mut growth = (population as f32 * base_growth_rate * modifier).round() as i32;
    if growth == 0 && modifier > 0.0 && population < housing_capacity {
        // Small towns still trickle in while they stay attractive
        growth = 1;
    }
    growth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_city_grows() {
        let growth = population_step(1000, 2000, 0.8, 0.9, false, false, 0.04);
        assert!(growth > 0);
    }

    #[test]
    fn test_miserable_city_shrinks() {
        let growth = population_step(1000, 2000, 0.1, 0.2, true, true, 0.04);
        assert!(growth < 0);
    }

    #[test]
    fn test_homeless_city_bleeds_out() {
        let growth = population_step(500, 0, 0.9, 1.0, false, false, 0.04);
        assert!(growth < 0);
    }

    #[test]
    fn test_first_movers_arrive_into_empty_housing() {
        let growth = population_step(0, 100, 0.6, 1.0, false, false, 0.04);
        assert!(growth >= 4);
    }

    #[test]
    fn test_overcrowding_pushes_people_out() {
        let growth = population_step(300, 200, 0.7, 0.9, false, false, 0.04);
        assert!(growth < 0);
    }

    #[test]
    fn test_happiness_target_range() {
        let best = happiness_target(1.0, 1.0, 1.0, 100.0, 0.3, 0.9, 0.0, false);
        let worst = happiness_target(0.0, 0.0, 0.0, 0.0, 0.0, 1.8, 0.5, true);
        assert!(best <= 1.0 && best > 0.9);
        assert!((0.0..=0.1).contains(&worst));
    }

    #[test]
    fn test_blackout_dents_target() {
        let lit = happiness_target(0.8, 1.0, 1.0, 50.0, 0.1, 1.0, 0.0, false);
        let dark = happiness_target(0.8, 0.0, 1.0, 50.0, 0.1, 1.0, 0.0, false);
        assert!(lit - dark > 0.15);
    }
}
