//! The monthly ledger: taxes in, upkeep out.
//!
//! Taxes come from developed zone lots, scaled by tier yield, occupancy,
//! the land under them and the difficulty's tax rate. Expenses cover
//! building upkeep, infrastructure maintenance, service budgets, coal fuel,
//! repair crews and crime losses. The net lands on the treasury;
//! a negative balance flips the bankruptcy flag until the city digs out.

use bevy::prelude::*;

use crate::components::{Building, GridPos, PowerLine, WaterPipe, Zone};
use crate::events::NotificationEvent;
use crate::map::CityMap;
use crate::notifications::NotificationKind;
use crate::resources::{CityState, Difficulty, GameConfig};
use crate::systems::disasters::{DisasterLog, StormDamage};
use crate::systems::land_value::LandValueGrid;

pub const LEDGER_HISTORY_CAP: usize = 240;

/// Month-by-month financial breakdown
#[derive(Resource, Debug, Default)]
pub struct CityLedger {
    pub income: TaxIncome,
    pub expenses: Expenses,
    pub net: i64,
    /// Net flow per month, bounded
    pub history: Vec<i64>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TaxIncome {
    pub residential: i64,
    pub commercial: i64,
    pub industrial: i64,
}

impl TaxIncome {
    pub fn total(&self) -> i64 {
        self.residential + self.commercial + self.industrial
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Expenses {
    pub upkeep: i64,
    pub infrastructure: i64,
    pub services: i64,
    pub fuel: i64,
    pub repairs: i64,
    pub crime: i64,
}

impl Expenses {
    pub fn total(&self) -> i64 {
        self.upkeep + self.infrastructure + self.services + self.fuel + self.repairs + self.crime
    }
}

/// Tax take of one developed lot
pub(crate) fn lot_tax(tier_yield: i64, occupancy: f32, land_value: f32, tax_rate: f32) -> f32 {
    tier_yield as f32 * occupancy * (0.5 + land_value) * tax_rate
}

/// System that settles the month's books
pub fn economy_system(
    mut city: ResMut<CityState>,
    mut ledger: ResMut<CityLedger>,
    config: Res<GameConfig>,
    difficulty: Res<Difficulty>,
    map: Res<CityMap>,
    land_value: Res<LandValueGrid>,
    storm: Res<StormDamage>,
    disasters: Res<DisasterLog>,
    zones: Query<(&Zone, &Building, &GridPos)>,
    buildings: Query<&Building, Without<Zone>>,
    lines: Query<(), With<PowerLine>>,
    pipes: Query<(), With<WaterPipe>>,
    mut notifications: EventWriter<NotificationEvent>,
) {
    // Income: taxes from developed lots
    let mut residential = 0.0f32;
    let mut commercial = 0.0f32;
    let mut industrial = 0.0f32;

    for (zone, building, pos) in zones.iter() {
        if !building.built || zone.level == 0 {
            continue;
        }
        let Some(tier) = config.zone_tiers.tier(zone.kind, zone.level) else {
            continue;
        };
        let tax = lot_tax(
            tier.tax_yield,
            zone.occupancy,
            land_value.get(*pos),
            difficulty.tax_rate,
        );
        match zone.kind {
            crate::components::ZoneKind::Residential => residential += tax,
            crate::components::ZoneKind::Commercial => commercial += tax,
            crate::components::ZoneKind::Industrial => industrial += tax,
        }
    }

    ledger.income = TaxIncome {
        residential: residential as i64,
        commercial: commercial as i64,
        industrial: industrial as i64,
    };

    // Expenses: upkeep, service budgets and coal fuel from building defs
    let mut upkeep = 0i64;
    let mut services = 0i64;
    let mut fuel = 0i64;

    for building in buildings.iter() {
        if !building.built {
            continue;
        }
        let Some(def) = config.buildings.get(&building.kind) else {
            continue;
        };
        upkeep += def.maintenance;
        if let Some(service) = def.service {
            services += service.budget;
        }
        if let Some(plant) = def.plant {
            if building.operational {
                fuel += plant.fuel_cost;
            }
        }
    }

    let infrastructure = map.road_count() as i64 * config.balance.road_maintenance
        + lines.iter().count() as i64 * config.balance.power_line_maintenance
        + pipes.iter().count() as i64 * config.balance.water_pipe_maintenance;

    let repairs = storm.repairs.len() as i64 * config.balance.repair_cost;

    ledger.expenses = Expenses {
        upkeep,
        infrastructure,
        services,
        fuel,
        repairs,
        crime: disasters.crime_losses,
    };

    ledger.net = ledger.income.total() - ledger.expenses.total();
    city.funds += ledger.net;

    let net = ledger.net;
    ledger.history.push(net);
    if ledger.history.len() > LEDGER_HISTORY_CAP {
        ledger.history.remove(0);
    }

    // Bankruptcy flips on the way down and clears on recovery
    if city.funds < 0 && !city.bankrupt {
        city.bankrupt = true;
        notifications.send(NotificationEvent::new(NotificationKind::Bankruptcy));
    } else if city.funds >= 0 && city.bankrupt {
        city.bankrupt = false;
        log::info!("City treasury recovered");
    }

    if ledger.net != 0 {
        log::debug!(
            "Ledger: {:+} (income {}, expenses {}), treasury {}",
            ledger.net,
            ledger.income.total(),
            ledger.expenses.total(),
            city.funds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_tax_scales_with_occupancy() {
        let empty = lot_tax(100, 0.0, 0.5, 1.0);
        let full = lot_tax(100, 1.0, 0.5, 1.0);
        assert_eq!(empty, 0.0);
        assert!(full > 0.0);
    }

    #[test]
    fn test_lot_tax_land_value_premium() {
        let slum = lot_tax(100, 1.0, 0.0, 1.0);
        let prime = lot_tax(100, 1.0, 1.0, 1.0);
        // (0.5 + 1.0) vs (0.5 + 0.0): prime land pays triple
        assert!((prime / slum - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_expense_totals() {
        let expenses = Expenses {
            upkeep: 100,
            infrastructure: 20,
            services: 300,
            fuel: 450,
            repairs: 150,
            crime: 30,
        };
        assert_eq!(expenses.total(), 1050);
    }

    #[test]
    fn test_income_totals() {
        let income = TaxIncome {
            residential: 500,
            commercial: 300,
            industrial: 200,
        };
        assert_eq!(income.total(), 1000);
    }
}
