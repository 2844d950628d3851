//! Monthly weather: seasonal rolls from biome-keyed weight tables.
//!
//! Weather feeds back into the power balance (solar and wind output) and
//! into the storm-damage rolls. The roll RNG mixes the game seed with the
//! month counter, so two games with the same seed see the same skies.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::PlantKind;
use crate::resources::{CityState, GameConfig, RngSeed, Season, SimClock, WeatherWeights};
use crate::systems::month_rng;

const WEATHER_SALT: u64 = 0x5EA5_0000_0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weather {
    Clear,
    Rain,
    Heatwave,
    Snow,
    Storm,
}

#[derive(Resource, Debug, Clone)]
pub struct WeatherState {
    pub current: Weather,
    pub season: Season,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self {
            current: Weather::Clear,
            season: Season::Winter,
        }
    }
}

/// System that rolls the month's weather
pub fn weather_system(
    mut weather: ResMut<WeatherState>,
    clock: Res<SimClock>,
    city: Res<CityState>,
    config: Res<GameConfig>,
    seed: Res<RngSeed>,
) {
    let season = clock.season();
    let mut weights = config.weather_for(city.biome);

    // Seasonal skew on top of the biome table
    match season {
        Season::Winter => {
            weights.heatwave = 0.0;
            weights.snow *= 2.0;
        }
        Season::Summer => {
            weights.snow = 0.0;
            weights.heatwave *= 2.0;
        }
        Season::Spring => {
            weights.rain *= 1.5;
        }
        Season::Autumn => {
            weights.storm *= 1.5;
        }
    }

    let mut rng = month_rng(seed.0, clock.month, WEATHER_SALT);
    weather.current = roll_weather(&weights, rng.gen::<f32>());
    weather.season = season;

    log::debug!(
        "Month {}: {:?}, {:?}",
        clock.month,
        weather.season,
        weather.current
    );
}

/// Weighted pick; `sample` is uniform in [0, 1)
pub(crate) fn roll_weather(weights: &WeatherWeights, sample: f32) -> Weather {
    let entries = [
        (Weather::Clear, weights.clear),
        (Weather::Rain, weights.rain),
        (Weather::Heatwave, weights.heatwave),
        (Weather::Snow, weights.snow),
        (Weather::Storm, weights.storm),
    ];

    let total: f32 = entries.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return Weather::Clear;
    }

    let mut cursor = sample.clamp(0.0, 1.0) * total;
    for (weather, weight) in entries {
        let weight = weight.max(0.0);
        if cursor < weight {
            return weather;
        }
        cursor -= weight;
    }
    Weather::Clear
}

/// Output multiplier for a plant under the month's weather
pub fn plant_output_factor(kind: PlantKind, weather: Weather, season: Season) -> f32 {
    match kind {
        PlantKind::Coal => 1.0,
        PlantKind::Wind => match weather {
            Weather::Storm => 1.3,
            Weather::Clear => 0.9,
            _ => 1.0,
        },
        PlantKind::Solar => {
            let sky = match weather {
                Weather::Clear => 1.2,
                Weather::Heatwave => 1.3,
                Weather::Rain => 0.6,
                Weather::Snow => 0.4,
                Weather::Storm => 0.3,
            };
            if season == Season::Winter {
                sky * 0.7
            } else {
                sky
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(clear: f32, rain: f32, heatwave: f32, snow: f32, storm: f32) -> WeatherWeights {
        WeatherWeights {
            clear,
            rain,
            heatwave,
            snow,
            storm,
        }
    }

    #[test]
    fn test_roll_covers_band_edges() {
        let w = weights(50.0, 30.0, 0.0, 0.0, 20.0);
        assert_eq!(roll_weather(&w, 0.0), Weather::Clear);
        assert_eq!(roll_weather(&w, 0.49), Weather::Clear);
        assert_eq!(roll_weather(&w, 0.5), Weather::Rain);
        assert_eq!(roll_weather(&w, 0.99), Weather::Storm);
    }

    #[test]
    fn test_zero_weights_default_to_clear() {
        let w = weights(0.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(roll_weather(&w, 0.7), Weather::Clear);
    }

    #[test]
    fn test_coal_ignores_weather() {
        for weather in [Weather::Clear, Weather::Storm, Weather::Snow] {
            assert_eq!(
                plant_output_factor(PlantKind::Coal, weather, Season::Winter),
                1.0
            );
        }
    }

    #[test]
    fn test_wind_rises_in_storms() {
        let calm = plant_output_factor(PlantKind::Wind, Weather::Clear, Season::Summer);
        let stormy = plant_output_factor(PlantKind::Wind, Weather::Storm, Season::Summer);
        assert!(stormy > calm);
    }

    #[test]
    fn test_solar_fades_in_winter_storms() {
        let summer_clear = plant_output_factor(PlantKind::Solar, Weather::Clear, Season::Summer);
        let winter_storm = plant_output_factor(PlantKind::Solar, Weather::Storm, Season::Winter);
        assert!(winter_storm < summer_clear * 0.3);
    }
}
