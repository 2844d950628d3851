//! Service coverage calculation and effects.
//!
//! Coverage feeds crime, fire risk, health, education and park happiness,
//! which in turn steer population growth, land value and zone development.

use bevy::prelude::*;

use crate::components::{Building, GridPos, ServiceBuilding, ServiceKind, Zone, ZoneKind};
use crate::resources::CityState;

/// Overall city service coverage statistics
#[derive(Resource, Debug, Default)]
pub struct CityCoverage {
    /// Percentage of residential lots covered by police (0-100)
    pub police_coverage: f32,
    /// Percentage of buildings covered by fire stations (0-100)
    pub fire_coverage: f32,
    /// Percentage of residential lots with clinic access (0-100)
    pub healthcare_coverage: f32,
    /// Percentage of residential lots with school access (0-100)
    pub education_coverage: f32,
    /// Average park access score (0-100)
    pub park_access: f32,
}

impl CityCoverage {
    /// Overall service score (0-100)
    pub fn overall_score(&self) -> f32 {
        (self.police_coverage * 0.2
            + self.fire_coverage * 0.15
            + self.healthcare_coverage * 0.25
            + self.education_coverage * 0.25
            + self.park_access * 0.15)
            .clamp(0.0, 100.0)
    }
}

/// Effects that services have on the city
#[derive(Resource, Debug, Clone, Copy)]
pub struct ServiceEffects {
    /// Crime pressure (0.0 = none, 1.0 = rampant)
    pub crime_modifier: f32,
    /// Fire risk (0.0 = none, 1.0 = tinderbox)
    pub fire_risk: f32,
    /// Health modifier feeding population growth
    pub health_modifier: f32,
    /// Education modifier feeding commercial demand
    pub education_modifier: f32,
    /// Happiness bonus from parks
    pub happiness_modifier: f32,
}

impl Default for ServiceEffects {
    fn default() -> Self {
        Self {
            crime_modifier: 0.5,
            fire_risk: 0.3,
            health_modifier: 0.0,
            education_modifier: 0.0,
            happiness_modifier: 0.0,
        }
    }
}

/// System that recalculates city-wide coverage percentages
pub fn service_coverage_system(
    city: Res<CityState>,
    mut coverage: ResMut<CityCoverage>,
    buildings: Query<(&Building, &GridPos, Option<&Zone>)>,
    services: Query<(&Building, &ServiceBuilding, &GridPos)>,
) {
    let building_positions: Vec<(GridPos, bool)> = buildings
        .iter()
        .filter(|(building, _, _)| building.built)
        .map(|(_, pos, zone)| {
            let is_residential = zone
                .map(|z| z.kind == ZoneKind::Residential && z.level > 0)
                .unwrap_or(false);
            (*pos, is_residential)
        })
        .collect();

    if building_positions.is_empty() {
        *coverage = CityCoverage::default();
        return;
    }

    // A dark or dry station protects nobody.
    let service_list: Vec<(ServiceKind, GridPos, f32)> = services
        .iter()
        .filter(|(building, _, _)| building.operational)
        .map(|(_, service, pos)| (service.kind, *pos, service.radius))
        .collect();

    let mut police_covered = 0u32;
    let mut fire_covered = 0u32;
    let mut health_covered = 0u32;
    let mut edu_covered = 0u32;
    let mut total_park_access = 0.0f32;
    let mut residential_count = 0u32;
    let total_buildings = building_positions.len();

    for (pos, is_residential) in &building_positions {
        if *is_residential {
            residential_count += 1;
        }

        let mut police = false;
        let mut fire = false;
        let mut health = false;
        let mut edu = false;

        for (kind, service_pos, radius) in &service_list {
            let distance = pos.distance_to(service_pos);
            if distance > *radius {
                continue;
            }
            match kind {
                ServiceKind::Police => police = true,
                ServiceKind::Fire => fire = true,
                ServiceKind::Clinic => health = true,
                ServiceKind::School => edu = true,
                ServiceKind::Park => {
                    total_park_access += 1.0 - (distance / radius);
                }
            }
        }

        if *is_residential {
            police_covered += police as u32;
            health_covered += health as u32;
            edu_covered += edu as u32;
        }
        fire_covered += fire as u32;
    }

    let res_count = residential_count.max(1) as f32;
    let total = total_buildings.max(1) as f32;

    // A bankrupt city halves service effectiveness.
    let funding = if city.bankrupt { 0.5 } else { 1.0 };

    coverage.police_coverage = (police_covered as f32 / res_count * 100.0 * funding).min(100.0);
    coverage.fire_coverage = (fire_covered as f32 / total * 100.0 * funding).min(100.0);
    coverage.healthcare_coverage = (health_covered as f32 / res_count * 100.0 * funding).min(100.0);
    coverage.education_coverage = (edu_covered as f32 / res_count * 100.0 * funding).min(100.0);
    coverage.park_access = (total_park_access / total * 100.0 * funding).min(100.0);
}

/// System that folds coverage into the effect modifiers
pub fn apply_service_effects_system(
    coverage: Res<CityCoverage>,
    mut effects: ResMut<ServiceEffects>,
) {
    *effects = effects_from_coverage(&coverage);
}

pub(crate) fn effects_from_coverage(coverage: &CityCoverage) -> ServiceEffects {
    ServiceEffects {
        // 0% coverage = 0.8 crime, 100% coverage = 0.1 crime
        crime_modifier: 0.8 - (coverage.police_coverage / 100.0 * 0.7),
        // 0% coverage = 0.5 risk, 100% coverage = 0.05 risk
        fire_risk: 0.5 - (coverage.fire_coverage / 100.0 * 0.45),
        // 0% coverage = -0.1, 100% coverage = +0.2
        health_modifier: (coverage.healthcare_coverage / 100.0 * 0.3) - 0.1,
        // 0% coverage = -0.1, 100% coverage = +0.2
        education_modifier: (coverage.education_coverage / 100.0 * 0.3) - 0.1,
        // 0% access = 0.0, full access = +0.3
        happiness_modifier: (coverage.park_access / 100.0 * 0.3).min(0.3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_coverage_means_high_crime() {
        let effects = effects_from_coverage(&CityCoverage::default());
        assert!((effects.crime_modifier - 0.8).abs() < f32::EPSILON);
        assert!((effects.fire_risk - 0.5).abs() < f32::EPSILON);
        assert!(effects.health_modifier < 0.0);
    }

    #[test]
    fn test_full_coverage_suppresses_crime() {
        let coverage = CityCoverage {
            police_coverage: 100.0,
            fire_coverage: 100.0,
            healthcare_coverage: 100.0,
            education_coverage: 100.0,
            park_access: 100.0,
        };
        let effects = effects_from_coverage(&coverage);
        assert!((effects.crime_modifier - 0.1).abs() < 0.001);
        assert!((effects.fire_risk - 0.05).abs() < 0.001);
        assert!(effects.health_modifier > 0.19);
        assert!((effects.happiness_modifier - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_overall_score_weighting() {
        let coverage = CityCoverage {
            police_coverage: 100.0,
            fire_coverage: 0.0,
            healthcare_coverage: 0.0,
            education_coverage: 0.0,
            park_access: 0.0,
        };
        assert!((coverage.overall_score() - 20.0).abs() < 0.001);
    }
}
