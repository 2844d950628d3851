use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::resources::{
    BalanceConfig, BuildingDef, Difficulty, GameConfig, MapGenConfig, WeatherWeights,
    ZoneTierTable,
};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("data file parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("data file encode error: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid game data: {0}")]
    Invalid(String),
}

fn invalid(message: impl Into<String>) -> DataError {
    DataError::Invalid(message.into())
}

/// Balance file carries the tuning knobs plus the milestone ladder
#[derive(Deserialize)]
struct BalanceFile {
    #[serde(default)]
    milestones: Option<Vec<u32>>,
    #[serde(flatten)]
    balance: BalanceConfig,
}

/// Data loader for game configuration files.
///
/// Every file is optional; missing pieces keep their compiled-in defaults,
/// which lets a data directory override just one table.
pub struct DataLoader;

impl DataLoader {
    /// Load all data from a directory
    pub fn load_from_directory<P: AsRef<Path>>(data_dir: P) -> Result<GameConfig, DataError> {
        let data_path = data_dir.as_ref();
        let mut config = GameConfig::default();

        let buildings_path = data_path.join("buildings.toml");
        if buildings_path.exists() {
            let content = fs::read_to_string(buildings_path)?;
            let buildings: HashMap<String, BuildingDef> = toml::from_str(&content)?;
            for (id, building) in &buildings {
                validate_building(id, building)?;
            }
            log::info!("Loaded {} building definitions", buildings.len());
            config.buildings = buildings;
        }

        let zones_path = data_path.join("zones.toml");
        if zones_path.exists() {
            let content = fs::read_to_string(zones_path)?;
            let zone_tiers: ZoneTierTable = toml::from_str(&content)?;
            validate_zone_tiers(&zone_tiers)?;
            log::info!("Loaded zone tier table");
            config.zone_tiers = zone_tiers;
        }

        let difficulty_path = data_path.join("difficulty.toml");
        if difficulty_path.exists() {
            let content = fs::read_to_string(difficulty_path)?;
            let presets: HashMap<String, Difficulty> = toml::from_str(&content)?;
            for (id, preset) in &presets {
                validate_difficulty(id, preset)?;
            }
            log::info!("Loaded {} difficulty presets", presets.len());
            config.difficulty_presets = presets;
        }

        let weather_path = data_path.join("weather.toml");
        if weather_path.exists() {
            let content = fs::read_to_string(weather_path)?;
            let weather: HashMap<String, WeatherWeights> = toml::from_str(&content)?;
            for (biome, weights) in &weather {
                validate_weather(biome, weights)?;
            }
            log::info!("Loaded weather tables for {} biomes", weather.len());
            config.weather = weather;
        }

        let notifications_path = data_path.join("notifications.toml");
        if notifications_path.exists() {
            let content = fs::read_to_string(notifications_path)?;
            let templates: HashMap<String, String> = toml::from_str(&content)?;
            for (key, template) in &templates {
                if template.trim().is_empty() {
                    return Err(invalid(format!("notification template '{}' is empty", key)));
                }
            }
            log::info!("Loaded {} notification templates", templates.len());
            config.notifications = templates;
        }

        let mapgen_path = data_path.join("mapgen.toml");
        if mapgen_path.exists() {
            let content = fs::read_to_string(mapgen_path)?;
            let mapgen: MapGenConfig = toml::from_str(&content)?;
            if mapgen.width == 0 || mapgen.height == 0 {
                return Err(invalid("map dimensions must be positive"));
            }
            config.map_generation = mapgen;
        }

        let balance_path = data_path.join("balance.toml");
        if balance_path.exists() {
            let content = fs::read_to_string(balance_path)?;
            let file: BalanceFile = toml::from_str(&content)?;
            validate_balance(&file.balance)?;
            if let Some(milestones) = file.milestones {
                config.milestones = milestones;
            }
            config.balance = file.balance;
        }

        Ok(config)
    }
}

fn validate_building(id: &str, building: &BuildingDef) -> Result<(), DataError> {
    if building.name.is_empty() {
        return Err(invalid(format!("building '{}' has no name", id)));
    }
    if building.cost < 0 {
        return Err(invalid(format!("building '{}' has negative cost", id)));
    }
    if building.size.0 == 0 || building.size.1 == 0 {
        return Err(invalid(format!("building '{}' has a zero footprint", id)));
    }
    if building.power_draw_kw < 0.0 || building.water_draw < 0.0 {
        return Err(invalid(format!("building '{}' has negative draw", id)));
    }
    if let Some(plant) = &building.plant {
        if plant.output_kw <= 0.0 {
            return Err(invalid(format!("plant '{}' must produce power", id)));
        }
    }
    if building.storage_kwh < 0.0 {
        return Err(invalid(format!("building '{}' has negative storage", id)));
    }
    if let Some(service) = &building.service {
        if service.radius <= 0.0 {
            return Err(invalid(format!("service '{}' needs a positive radius", id)));
        }
    }
    Ok(())
}

fn validate_zone_tiers(table: &ZoneTierTable) -> Result<(), DataError> {
    for (kind, tiers) in [
        ("residential", &table.residential),
        ("commercial", &table.commercial),
        ("industrial", &table.industrial),
    ] {
        if tiers.is_empty() {
            return Err(invalid(format!("zone table '{}' has no tiers", kind)));
        }
        for (index, tier) in tiers.iter().enumerate() {
            if tier.capacity == 0 {
                return Err(invalid(format!(
                    "zone '{}' tier {} has zero capacity",
                    kind,
                    index + 1
                )));
            }
            if tier.tax_yield < 0 {
                return Err(invalid(format!(
                    "zone '{}' tier {} has negative tax yield",
                    kind,
                    index + 1
                )));
            }
        }
    }
    Ok(())
}

fn validate_difficulty(id: &str, preset: &Difficulty) -> Result<(), DataError> {
    if preset.starting_funds <= 0 {
        return Err(invalid(format!("difficulty '{}' needs starting funds", id)));
    }
    if !(0.0..=1.0).contains(&preset.blackout_threshold)
        || !(0.0..=1.0).contains(&preset.brownout_threshold)
    {
        return Err(invalid(format!(
            "difficulty '{}' thresholds must be within [0, 1]",
            id
        )));
    }
    if preset.blackout_threshold >= preset.brownout_threshold {
        return Err(invalid(format!(
            "difficulty '{}' blackout threshold must sit below brownout",
            id
        )));
    }
    if preset.tax_rate <= 0.0 || preset.disaster_rate < 0.0 {
        return Err(invalid(format!("difficulty '{}' rates out of range", id)));
    }
    Ok(())
}

fn validate_weather(biome: &str, weights: &WeatherWeights) -> Result<(), DataError> {
    let values = [
        weights.clear,
        weights.rain,
        weights.heatwave,
        weights.snow,
        weights.storm,
    ];
    if values.iter().any(|w| *w < 0.0) {
        return Err(invalid(format!("weather '{}' has negative weights", biome)));
    }
    if values.iter().sum::<f32>() <= 0.0 {
        return Err(invalid(format!("weather '{}' weights sum to zero", biome)));
    }
    Ok(())
}

fn validate_balance(balance: &BalanceConfig) -> Result<(), DataError> {
    if balance.base_growth_rate <= 0.0 {
        return Err(invalid("base growth rate must be positive"));
    }
    if !(0.0..=1.0).contains(&balance.happiness_smoothing) {
        return Err(invalid("happiness smoothing must be within [0, 1]"));
    }
    if !(0.0..=1.0).contains(&balance.storage_efficiency) {
        return Err(invalid("storage efficiency must be within [0, 1]"));
    }
    if balance.pump_pressure == 0 {
        return Err(invalid("pump pressure must be positive"));
    }
    Ok(())
}

/// Write the compiled-in defaults out as data files
pub fn create_default_data_files<P: AsRef<Path>>(data_dir: P) -> Result<(), DataError> {
    let data_path = data_dir.as_ref();
    fs::create_dir_all(data_path)?;

    let config = GameConfig::default();

    fs::write(
        data_path.join("buildings.toml"),
        toml::to_string_pretty(&config.buildings)?,
    )?;
    fs::write(
        data_path.join("zones.toml"),
        toml::to_string_pretty(&config.zone_tiers)?,
    )?;
    fs::write(
        data_path.join("difficulty.toml"),
        toml::to_string_pretty(&config.difficulty_presets)?,
    )?;
    fs::write(
        data_path.join("weather.toml"),
        toml::to_string_pretty(&config.weather)?,
    )?;
    fs::write(
        data_path.join("notifications.toml"),
        toml::to_string_pretty(&config.notifications)?,
    )?;
    fs::write(
        data_path.join("mapgen.toml"),
        toml::to_string_pretty(&config.map_generation)?,
    )?;

    log::info!("Created default data files in {:?}", data_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_load_default_data() {
        let temp_dir = TempDir::new().unwrap();
        let data_path = temp_dir.path().join("data");

        create_default_data_files(&data_path).unwrap();
        let config = DataLoader::load_from_directory(&data_path).unwrap();

        assert!(config.buildings.contains_key("coal_plant"));
        assert!(config.difficulty_presets.contains_key("mayor"));
        assert_eq!(config.zone_tiers.residential.len(), 3);
    }

    #[test]
    fn test_empty_directory_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = DataLoader::load_from_directory(temp_dir.path()).unwrap();
        assert!(!config.buildings.is_empty());
    }

    #[test]
    fn test_zero_footprint_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("buildings.toml"),
            r#"
[shed]
name = "Shed"
cost = 100
build_months = 1
size = [0, 1]
maintenance = 0
"#,
        )
        .unwrap();

        let result = DataLoader::load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(DataError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("weather.toml"), "not { valid").unwrap();

        let result = DataLoader::load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(DataError::Parse(_))));
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("difficulty.toml"),
            r#"
[upside_down]
name = "Upside Down"
starting_funds = 1000
tax_rate = 1.0
disaster_rate = 1.0
brownout_threshold = 0.5
blackout_threshold = 0.9
"#,
        )
        .unwrap();

        let result = DataLoader::load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(DataError::Invalid(_))));
    }

    #[test]
    fn test_all_zero_weather_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("weather.toml"),
            r#"
[void]
clear = 0.0
rain = 0.0
heatwave = 0.0
snow = 0.0
storm = 0.0
"#,
        )
        .unwrap();

        let result = DataLoader::load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(DataError::Invalid(_))));
    }
}
