use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::components::{PlantKind, ServiceKind, ZoneKind};

/// Simulation clock. One tick is one simulated month.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimClock {
    pub month: u64,
}

impl SimClock {
    pub fn tick(&mut self) {
        self.month += 1;
    }

    pub fn year(&self) -> u64 {
        self.month / 12
    }

    /// Month within the year, 0 = January
    pub fn month_of_year(&self) -> u32 {
        (self.month % 12) as u32
    }

    pub fn season(&self) -> Season {
        match self.month_of_year() {
            11 | 0 | 1 => Season::Winter,
            2..=4 => Season::Spring,
            5..=7 => Season::Summer,
            _ => Season::Autumn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

/// Climate the city was founded in. Skews map generation and the monthly
/// weather tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Biome {
    #[default]
    Temperate,
    Desert,
    Alpine,
}

impl Biome {
    /// Key into `GameConfig::weather`
    pub fn key(&self) -> &'static str {
        match self {
            Biome::Temperate => "temperate",
            Biome::Desert => "desert",
            Biome::Alpine => "alpine",
        }
    }
}

impl std::str::FromStr for Biome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperate" => Ok(Biome::Temperate),
            "desert" => Ok(Biome::Desert),
            "alpine" => Ok(Biome::Alpine),
            other => Err(format!("unknown biome: {}", other)),
        }
    }
}

/// Top-level mutable city state. Created at new game, mutated every
/// simulated month, reset on a new game.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct CityState {
    pub funds: i64,
    pub population: u32,
    /// Aggregate citizen happiness, clamped to [0, 1]
    pub happiness: f32,
    /// Fraction of the workforce employed, clamped to [0, 1]
    pub employment: f32,
    pub biome: Biome,
    pub bankrupt: bool,
    pub zone_stats: ZoneStats,
    /// Bounded history for clients to plot
    pub population_history: Vec<u32>,
    /// Index into `GameConfig::milestones` of the next unreached milestone
    pub milestones_reached: usize,
}

impl Default for CityState {
    fn default() -> Self {
        Self {
            funds: 0,
            population: 0,
            happiness: 0.5,
            employment: 1.0,
            biome: Biome::Temperate,
            bankrupt: false,
            zone_stats: ZoneStats::default(),
            population_history: Vec::new(),
            milestones_reached: 0,
        }
    }
}

pub const POPULATION_HISTORY_CAP: usize = 240;

impl CityState {
    pub fn record_population(&mut self) {
        self.population_history.push(self.population);
        if self.population_history.len() > POPULATION_HISTORY_CAP {
            self.population_history.remove(0);
        }
    }
}

/// Aggregate zone statistics, recomputed each month by the demand pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZoneStats {
    pub residential_lots: u32,
    pub commercial_lots: u32,
    pub industrial_lots: u32,
    pub residential_developed: u32,
    pub commercial_developed: u32,
    pub industrial_developed: u32,
    pub housing_capacity: u32,
    pub commercial_jobs: u32,
    pub industrial_jobs: u32,
}

impl ZoneStats {
    pub fn total_jobs(&self) -> u32 {
        self.commercial_jobs + self.industrial_jobs
    }

    pub fn lots(&self, kind: ZoneKind) -> u32 {
        match kind {
            ZoneKind::Residential => self.residential_lots,
            ZoneKind::Commercial => self.commercial_lots,
            ZoneKind::Industrial => self.industrial_lots,
        }
    }

    pub fn developed(&self, kind: ZoneKind) -> u32 {
        match kind {
            ZoneKind::Residential => self.residential_developed,
            ZoneKind::Commercial => self.commercial_developed,
            ZoneKind::Industrial => self.industrial_developed,
        }
    }
}

/// Active difficulty preset, chosen at new game from
/// `GameConfig::difficulty_presets`
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct Difficulty {
    pub name: String,
    pub starting_funds: i64,
    /// Multiplier on zone tax yield; above 1.0 also depresses demand
    pub tax_rate: f32,
    /// Multiplier on storm/fire/crime rolls
    pub disaster_rate: f32,
    /// Supply-to-demand ratio below which the grid browns out
    pub brownout_threshold: f32,
    /// Ratio below which the grid blacks out entirely
    pub blackout_threshold: f32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            name: "Mayor".to_string(),
            starting_funds: 40_000,
            tax_rate: 1.0,
            disaster_rate: 1.0,
            brownout_threshold: 0.95,
            blackout_threshold: 0.6,
        }
    }
}

/// Seed for all in-simulation randomness. Monthly rolls derive their RNG
/// from this plus the month counter, so equal seeds give equal histories.
#[derive(Resource, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RngSeed(pub u64);

impl Default for RngSeed {
    fn default() -> Self {
        Self(12345)
    }
}

/// Building types the city has already been notified about
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnlockState {
    pub announced: HashSet<String>,
}

/// Performance metrics for debugging
#[derive(Resource, Debug, Default)]
pub struct SimMetrics {
    pub system_times: HashMap<String, f32>,
    pub tick_time: f32,
    pub entities_count: u32,
}

impl SimMetrics {
    pub fn record_system_time(&mut self, system_name: String, time_ms: f32) {
        self.system_times.insert(system_name, time_ms);
    }
}

/// Game configuration loaded from files
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub buildings: HashMap<String, BuildingDef>,
    pub zone_tiers: ZoneTierTable,
    pub difficulty_presets: HashMap<String, Difficulty>,
    /// Weather weight tables keyed by biome (`Biome::key`)
    pub weather: HashMap<String, WeatherWeights>,
    /// Notification templates keyed by `NotificationKind::key`
    pub notifications: HashMap<String, String>,
    /// Population thresholds that trigger milestone notifications
    pub milestones: Vec<u32>,
    pub map_generation: MapGenConfig,
    pub balance: BalanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    pub name: String,
    pub cost: i64,
    pub build_months: u32,
    pub size: (u32, u32), // width, height in tiles
    /// Upkeep charged to the monthly ledger once built
    pub maintenance: i64,
    #[serde(default)]
    pub power_draw_kw: f32,
    #[serde(default)]
    pub water_draw: f32,
    /// Population required before the type can be placed
    #[serde(default)]
    pub unlock_population: u32,
    #[serde(default)]
    pub storage_kwh: f32,
    #[serde(default)]
    pub pump_output: f32,
    #[serde(default)]
    pub plant: Option<PlantDef>,
    #[serde(default)]
    pub service: Option<ServiceDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlantDef {
    pub kind: PlantKind,
    pub output_kw: f32,
    /// Monthly fuel bill while operational (zero for wind/solar)
    pub fuel_cost: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceDef {
    pub kind: ServiceKind,
    pub radius: f32,
    /// Monthly operating budget
    pub budget: i64,
}

/// Per-tier numbers for developed zone lots. Index 0 is level 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneTierTable {
    pub build_months: u32,
    pub residential: Vec<ZoneTier>,
    pub commercial: Vec<ZoneTier>,
    pub industrial: Vec<ZoneTier>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneTier {
    /// Housing capacity for residential, jobs for commercial/industrial
    pub capacity: u32,
    pub tax_yield: i64,
    pub power_draw_kw: f32,
    pub water_draw: f32,
}

impl ZoneTierTable {
    pub fn tiers(&self, kind: ZoneKind) -> &[ZoneTier] {
        match kind {
            ZoneKind::Residential => &self.residential,
            ZoneKind::Commercial => &self.commercial,
            ZoneKind::Industrial => &self.industrial,
        }
    }

    /// Tier data for a developed lot; `level` is 1-based
    pub fn tier(&self, kind: ZoneKind, level: u8) -> Option<&ZoneTier> {
        if level == 0 {
            return None;
        }
        self.tiers(kind).get(level as usize - 1)
    }

    pub fn max_level(&self, kind: ZoneKind) -> u8 {
        self.tiers(kind).len() as u8
    }
}

/// Relative odds of each monthly weather kind before seasonal adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeatherWeights {
    pub clear: f32,
    pub rain: f32,
    pub heatwave: f32,
    pub snow: f32,
    pub storm: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapGenConfig {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    /// Perlin elevation below this becomes water
    pub water_level: f32,
    pub forest_density: f32,
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            width: 96,
            height: 96,
            seed: 12345,
            water_level: -0.35,
            forest_density: 0.22,
        }
    }
}

/// Gameplay tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Monthly population growth fraction under ideal conditions
    pub base_growth_rate: f32,
    /// Fraction of the population counted as workforce
    pub workforce_share: f32,
    /// Monthly lerp weight of happiness toward its target
    pub happiness_smoothing: f32,
    /// Development score a level-0 lot must clear
    pub development_threshold: f32,
    /// Development score required for tier upgrades
    pub upgrade_threshold: f32,
    /// Base chance a qualifying lot starts construction in a month
    pub development_chance: f32,
    /// Months without power before a developed lot is abandoned
    pub abandonment_months: u32,
    /// Round-trip efficiency of battery storage
    pub storage_efficiency: f32,
    /// How far water pushes through pipes, in cells
    pub pump_pressure: u32,
    pub road_cost: i64,
    pub power_line_cost: i64,
    pub water_pipe_cost: i64,
    pub road_maintenance: i64,
    pub power_line_maintenance: i64,
    pub water_pipe_maintenance: i64,
    /// Repair progress per month per damaged structure
    pub repair_rate: f32,
    /// Monthly ledger cost per active repair
    pub repair_cost: i64,
    /// Fraction of build cost returned on demolition
    pub demolition_refund: f32,
    /// Cost of clearing a rubble cell
    pub rubble_clearing_cost: i64,
    /// Base monthly fire chance per building before risk modifiers
    pub base_fire_chance: f32,
    /// Monthly crime loss per developed commercial lot at full crime
    pub crime_loss_per_lot: i64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            base_growth_rate: 0.04,
            workforce_share: 0.6,
            happiness_smoothing: 0.3,
            development_threshold: 0.4,
            upgrade_threshold: 0.65,
            development_chance: 0.35,
            abandonment_months: 6,
            storage_efficiency: 0.9,
            pump_pressure: 24,
            road_cost: 10,
            power_line_cost: 15,
            water_pipe_cost: 12,
            road_maintenance: 1,
            power_line_maintenance: 1,
            water_pipe_maintenance: 1,
            repair_rate: 0.5,
            repair_cost: 150,
            demolition_refund: 0.25,
            rubble_clearing_cost: 50,
            base_fire_chance: 0.004,
            crime_loss_per_lot: 12,
        }
    }
}

impl GameConfig {
    pub fn weather_for(&self, biome: Biome) -> WeatherWeights {
        self.weather.get(biome.key()).copied().unwrap_or(WeatherWeights {
            clear: 1.0,
            rain: 0.0,
            heatwave: 0.0,
            snow: 0.0,
            storm: 0.0,
        })
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut buildings = HashMap::new();

        buildings.insert(
            "residential".to_string(),
            BuildingDef {
                name: "Residential".to_string(),
                cost: 0, // zone-grown, paid through zoning
                build_months: 0,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 0.0, // drawn from the tier table instead
                water_draw: 0.0,
                unlock_population: 0,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: None,
            },
        );
        buildings.insert(
            "commercial".to_string(),
            BuildingDef {
                name: "Commercial".to_string(),
                cost: 0,
                build_months: 0,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 0,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: None,
            },
        );
        buildings.insert(
            "industrial".to_string(),
            BuildingDef {
                name: "Industrial".to_string(),
                cost: 0,
                build_months: 0,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 0,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: None,
            },
        );

        buildings.insert(
            "coal_plant".to_string(),
            BuildingDef {
                name: "Coal Plant".to_string(),
                cost: 12_000,
                build_months: 3,
                size: (2, 2),
                maintenance: 300,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 0,
                plant: Some(PlantDef {
                    kind: PlantKind::Coal,
                    output_kw: 600.0,
                    fuel_cost: 450,
                }),
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: None,
            },
        );
        buildings.insert(
            "wind_turbine".to_string(),
            BuildingDef {
                name: "Wind Turbine".to_string(),
                cost: 3_500,
                build_months: 1,
                size: (1, 1),
                maintenance: 60,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 0,
                plant: Some(PlantDef {
                    kind: PlantKind::Wind,
                    output_kw: 80.0,
                    fuel_cost: 0,
                }),
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: None,
            },
        );
        buildings.insert(
            "solar_farm".to_string(),
            BuildingDef {
                name: "Solar Farm".to_string(),
                cost: 6_000,
                build_months: 2,
                size: (2, 2),
                maintenance: 40,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 2_500,
                plant: Some(PlantDef {
                    kind: PlantKind::Solar,
                    output_kw: 150.0,
                    fuel_cost: 0,
                }),
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: None,
            },
        );
        buildings.insert(
            "battery_bank".to_string(),
            BuildingDef {
                name: "Battery Bank".to_string(),
                cost: 4_000,
                build_months: 1,
                size: (1, 1),
                maintenance: 50,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 5_000,
                plant: None,
                storage_kwh: 400.0,
                pump_output: 0.0,
                service: None,
            },
        );
        buildings.insert(
            "water_pump".to_string(),
            BuildingDef {
                name: "Water Pump".to_string(),
                cost: 2_500,
                build_months: 1,
                size: (1, 1),
                maintenance: 80,
                power_draw_kw: 30.0,
                water_draw: 0.0,
                unlock_population: 0,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 900.0,
                service: None,
            },
        );

        buildings.insert(
            "police_station".to_string(),
            BuildingDef {
                name: "Police Station".to_string(),
                cost: 5_000,
                build_months: 2,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 15.0,
                water_draw: 10.0,
                unlock_population: 1_000,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: Some(ServiceDef {
                    kind: ServiceKind::Police,
                    radius: 12.0,
                    budget: 220,
                }),
            },
        );
        buildings.insert(
            "fire_station".to_string(),
            BuildingDef {
                name: "Fire Station".to_string(),
                cost: 5_000,
                build_months: 2,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 15.0,
                water_draw: 15.0,
                unlock_population: 800,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: Some(ServiceDef {
                    kind: ServiceKind::Fire,
                    radius: 12.0,
                    budget: 200,
                }),
            },
        );
        buildings.insert(
            "clinic".to_string(),
            BuildingDef {
                name: "Clinic".to_string(),
                cost: 6_000,
                build_months: 2,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 20.0,
                water_draw: 15.0,
                unlock_population: 1_500,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: Some(ServiceDef {
                    kind: ServiceKind::Clinic,
                    radius: 10.0,
                    budget: 260,
                }),
            },
        );
        buildings.insert(
            "school".to_string(),
            BuildingDef {
                name: "School".to_string(),
                cost: 5_500,
                build_months: 2,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 18.0,
                water_draw: 12.0,
                unlock_population: 1_200,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: Some(ServiceDef {
                    kind: ServiceKind::School,
                    radius: 14.0,
                    budget: 240,
                }),
            },
        );
        buildings.insert(
            "park".to_string(),
            BuildingDef {
                name: "Park".to_string(),
                cost: 800,
                build_months: 1,
                size: (1, 1),
                maintenance: 0,
                power_draw_kw: 0.0,
                water_draw: 0.0,
                unlock_population: 0,
                plant: None,
                storage_kwh: 0.0,
                pump_output: 0.0,
                service: Some(ServiceDef {
                    kind: ServiceKind::Park,
                    radius: 8.0,
                    budget: 40,
                }),
            },
        );

        let zone_tiers = ZoneTierTable {
            build_months: 2,
            residential: vec![
                ZoneTier {
                    capacity: 16,
                    tax_yield: 18,
                    power_draw_kw: 8.0,
                    water_draw: 0.0,
                },
                ZoneTier {
                    capacity: 48,
                    tax_yield: 60,
                    power_draw_kw: 20.0,
                    water_draw: 16.0,
                },
                ZoneTier {
                    capacity: 120,
                    tax_yield: 160,
                    power_draw_kw: 45.0,
                    water_draw: 40.0,
                },
            ],
            commercial: vec![
                ZoneTier {
                    capacity: 10,
                    tax_yield: 26,
                    power_draw_kw: 12.0,
                    water_draw: 0.0,
                },
                ZoneTier {
                    capacity: 30,
                    tax_yield: 80,
                    power_draw_kw: 30.0,
                    water_draw: 10.0,
                },
                ZoneTier {
                    capacity: 80,
                    tax_yield: 210,
                    power_draw_kw: 70.0,
                    water_draw: 24.0,
                },
            ],
            industrial: vec![
                ZoneTier {
                    capacity: 14,
                    tax_yield: 22,
                    power_draw_kw: 20.0,
                    water_draw: 0.0,
                },
                ZoneTier {
                    capacity: 40,
                    tax_yield: 70,
                    power_draw_kw: 50.0,
                    water_draw: 20.0,
                },
                ZoneTier {
                    capacity: 90,
                    tax_yield: 180,
                    power_draw_kw: 110.0,
                    water_draw: 45.0,
                },
            ],
        };

        let mut difficulty_presets = HashMap::new();
        difficulty_presets.insert(
            "settler".to_string(),
            Difficulty {
                name: "Settler".to_string(),
                starting_funds: 80_000,
                tax_rate: 1.1,
                disaster_rate: 0.5,
                brownout_threshold: 0.9,
                blackout_threshold: 0.5,
            },
        );
        difficulty_presets.insert("mayor".to_string(), Difficulty::default());
        difficulty_presets.insert(
            "tycoon".to_string(),
            Difficulty {
                name: "Tycoon".to_string(),
                starting_funds: 20_000,
                tax_rate: 0.9,
                disaster_rate: 1.5,
                brownout_threshold: 0.98,
                blackout_threshold: 0.7,
            },
        );

        let mut weather = HashMap::new();
        weather.insert(
            "temperate".to_string(),
            WeatherWeights {
                clear: 50.0,
                rain: 25.0,
                heatwave: 8.0,
                snow: 7.0,
                storm: 10.0,
            },
        );
        weather.insert(
            "desert".to_string(),
            WeatherWeights {
                clear: 60.0,
                rain: 5.0,
                heatwave: 25.0,
                snow: 0.0,
                storm: 10.0,
            },
        );
        weather.insert(
            "alpine".to_string(),
            WeatherWeights {
                clear: 40.0,
                rain: 20.0,
                heatwave: 2.0,
                snow: 28.0,
                storm: 10.0,
            },
        );

        let mut notifications = HashMap::new();
        notifications.insert(
            "power_shortage".to_string(),
            "Brownout: the grid is strained, {ratio}% of demand met".to_string(),
        );
        notifications.insert(
            "blackout".to_string(),
            "Blackout! The power grid has collapsed".to_string(),
        );
        notifications.insert(
            "storm_damage".to_string(),
            "A storm damaged {target}".to_string(),
        );
        notifications.insert("fire".to_string(), "Fire reported at {target}".to_string());
        notifications.insert(
            "collapse".to_string(),
            "{target} has collapsed into rubble".to_string(),
        );
        notifications.insert(
            "abandonment".to_string(),
            "A {target} lot has been abandoned".to_string(),
        );
        notifications.insert(
            "bankruptcy".to_string(),
            "The city treasury is empty".to_string(),
        );
        notifications.insert(
            "milestone".to_string(),
            "Population milestone reached: {value} citizens".to_string(),
        );
        notifications.insert(
            "unlock".to_string(),
            "{target} is now available".to_string(),
        );
        notifications.insert(
            "repair_complete".to_string(),
            "{target} has been repaired".to_string(),
        );

        Self {
            buildings,
            zone_tiers,
            difficulty_presets,
            weather,
            notifications,
            milestones: vec![500, 1_000, 2_500, 5_000, 10_000, 25_000, 50_000],
            map_generation: MapGenConfig::default(),
            balance: BalanceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_seasons() {
        let mut clock = SimClock::default();
        assert_eq!(clock.season(), Season::Winter); // January
        clock.month = 6; // July
        assert_eq!(clock.season(), Season::Summer);
        clock.month = 14; // March of year 1
        assert_eq!(clock.year(), 1);
        assert_eq!(clock.season(), Season::Spring);
    }

    #[test]
    fn test_default_config_is_complete() {
        let config = GameConfig::default();
        assert!(config.buildings.contains_key("coal_plant"));
        assert!(config.buildings.contains_key("water_pump"));
        assert!(config.difficulty_presets.contains_key("mayor"));
        assert_eq!(config.zone_tiers.residential.len(), 3);
        for biome in [Biome::Temperate, Biome::Desert, Biome::Alpine] {
            assert!(config.weather.contains_key(biome.key()));
        }
    }

    #[test]
    fn test_zone_tier_lookup() {
        let config = GameConfig::default();
        assert!(config.zone_tiers.tier(ZoneKind::Residential, 0).is_none());
        let t1 = config.zone_tiers.tier(ZoneKind::Residential, 1).unwrap();
        let t3 = config.zone_tiers.tier(ZoneKind::Residential, 3).unwrap();
        assert!(t3.capacity > t1.capacity);
        assert_eq!(config.zone_tiers.max_level(ZoneKind::Commercial), 3);
    }

    #[test]
    fn test_population_history_is_bounded() {
        let mut city = CityState::default();
        for i in 0..(POPULATION_HISTORY_CAP + 10) {
            city.population = i as u32;
            city.record_population();
        }
        assert_eq!(city.population_history.len(), POPULATION_HISTORY_CAP);
    }
}
