use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridtown_core::data::{create_default_data_files, DataLoader};
use gridtown_core::map;
use gridtown_core::notifications::NotificationFeed;
use gridtown_core::resources::{Biome, MapGenConfig};
use gridtown_core::systems::economy::CityLedger;
use gridtown_core::systems::power::{GridStability, PowerGrid};
use gridtown_core::{NewGameConfig, SimulationApp};
use ron::ser::{to_string_pretty, PrettyConfig};
use serde::Serialize;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "gridtown-headless")]
#[command(about = "Gridtown headless simulation runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a city for a number of simulated months
    Run {
        /// Months to simulate
        #[arg(long, default_value = "120")]
        months: u64,

        /// World seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Biome: temperate, desert or alpine
        #[arg(long, default_value = "temperate")]
        biome: Biome,

        /// Difficulty preset name
        #[arg(long, default_value = "mayor")]
        difficulty: String,

        /// Starting scenario: 'demo' for a seeded main street, 'empty'
        /// for a bare map
        #[arg(long, default_value = "demo")]
        scenario: String,

        /// Optional data directory overriding the built-in tables
        #[arg(long)]
        data_dir: Option<String>,

        /// Load a saved game instead of starting the demo city
        #[arg(long)]
        load: Option<String>,

        /// Save the final state to this file
        #[arg(long)]
        save: Option<String>,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Benchmark scenario to run
        #[arg(long, default_value = "standard")]
        scenario: String,

        /// Number of iterations
        #[arg(long, default_value = "5")]
        iterations: u32,
    },

    /// Generate a map and write it out as RON
    GenerateMap {
        #[arg(long, default_value = "generated_map.ron")]
        output: String,

        #[arg(long, default_value = "96")]
        width: u32,

        #[arg(long, default_value = "96")]
        height: u32,

        #[arg(long, default_value = "12345")]
        seed: u64,

        #[arg(long, default_value = "temperate")]
        biome: Biome,
    },

    /// Validate game data files
    ValidateData {
        #[arg(long, default_value = "assets/data")]
        data_dir: String,
    },

    /// Write the built-in data tables out as editable files
    ExportData {
        #[arg(long, default_value = "assets/data")]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            months,
            seed,
            biome,
            difficulty,
            scenario,
            data_dir,
            load,
            save,
            report,
            verbose,
        } => {
            init_logging(verbose);
            run_simulation(
                months,
                seed,
                biome,
                &difficulty,
                &scenario,
                data_dir.as_deref(),
                load.as_deref(),
                save.as_deref(),
                report.as_deref(),
            )
        }
        Commands::Benchmark {
            scenario,
            iterations,
        } => {
            init_logging(false);
            run_benchmark(&scenario, iterations)
        }
        Commands::GenerateMap {
            output,
            width,
            height,
            seed,
            biome,
        } => {
            init_logging(false);
            generate_map(&output, width, height, seed, biome)
        }
        Commands::ValidateData { data_dir } => {
            init_logging(true);
            validate_data(&data_dir)
        }
        Commands::ExportData { data_dir } => {
            init_logging(true);
            create_default_data_files(&data_dir)?;
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// End-of-run summary for scripting and balancing work
#[derive(Serialize)]
struct RunReport {
    months: u64,
    population: u32,
    happiness: f32,
    employment: f32,
    funds: i64,
    housing_capacity: u32,
    jobs: u32,
    grid_supply_kw: f32,
    grid_demand_kw: f32,
    stressed_months: u32,
    last_net_flow: i64,
    notifications: usize,
}

#[allow(clippy::too_many_arguments)]
fn run_simulation(
    months: u64,
    seed: u64,
    biome: Biome,
    difficulty: &str,
    scenario: &str,
    data_dir: Option<&str>,
    load: Option<&str>,
    save: Option<&str>,
    report: Option<&str>,
) -> Result<()> {
    log::info!(
        "Starting simulation: {} months, seed {}, {:?}, difficulty '{}'",
        months,
        seed,
        biome,
        difficulty
    );

    let mut sim = SimulationApp::new();

    if let Some(data_dir) = data_dir {
        let config = DataLoader::load_from_directory(data_dir)?;
        sim.world_mut().insert_resource(config);
        log::info!("Loaded data overrides from {}", data_dir);
    }

    let options = NewGameConfig {
        seed,
        biome,
        difficulty: difficulty.to_string(),
        ..Default::default()
    };

    if let Some(load_file) = load {
        sim.load_state(load_file)?;
    } else if scenario == "demo" {
        sim.start_demo(&options);
    } else {
        sim.new_game(&options);
    }

    let start_time = Instant::now();
    for month in 0..months {
        sim.tick();

        if month % 12 == 0 {
            let city = sim.city();
            log::info!(
                "Year {:>3}: population {}, happiness {:.2}, treasury {}",
                month / 12,
                city.population,
                city.happiness,
                city.funds
            );
        }
    }
    let elapsed = start_time.elapsed();

    let city = sim.city().clone();
    log::info!(
        "Simulated {} months in {:.2}s ({:.0} months/s)",
        months,
        elapsed.as_secs_f32(),
        months as f32 / elapsed.as_secs_f32().max(f32::EPSILON)
    );
    log::info!(
        "Final: population {}, happiness {:.2}, employment {:.2}, treasury {}",
        city.population,
        city.happiness,
        city.employment,
        city.funds
    );

    if let Some(save_file) = save {
        sim.save_state(save_file)?;
    }

    if let Some(report_file) = report {
        let grid = sim.get_resource::<PowerGrid>().context("power grid missing")?;
        let stability = sim
            .get_resource::<GridStability>()
            .context("grid stability missing")?;
        let ledger = sim.get_resource::<CityLedger>().context("ledger missing")?;
        let feed = sim
            .get_resource::<NotificationFeed>()
            .context("notification feed missing")?;

        let run_report = RunReport {
            months,
            population: city.population,
            happiness: city.happiness,
            employment: city.employment,
            funds: city.funds,
            housing_capacity: city.zone_stats.housing_capacity,
            jobs: city.zone_stats.total_jobs(),
            grid_supply_kw: grid.supply_kw,
            grid_demand_kw: grid.demand_kw,
            stressed_months: stability.stressed_months,
            last_net_flow: ledger.net,
            notifications: feed.len(),
        };

        std::fs::write(report_file, serde_json::to_string_pretty(&run_report)?)?;
        log::info!("Report written to {}", report_file);
    }

    Ok(())
}

fn run_benchmark(scenario: &str, iterations: u32) -> Result<()> {
    log::info!(
        "Running benchmark: scenario={}, iterations={}",
        scenario,
        iterations
    );

    let benchmark_months: u64 = match scenario {
        "quick" => 60,
        "standard" => 600,
        "long" => 2400,
        other => {
            log::warn!("Unknown scenario '{}', using standard", other);
            600
        }
    };

    let mut total_time = 0.0f32;

    for i in 0..iterations {
        let mut sim = SimulationApp::new();
        sim.initialize_demo();

        let start_time = Instant::now();
        sim.run_months(benchmark_months);
        let elapsed = start_time.elapsed().as_secs_f32();

        total_time += elapsed;
        log::info!(
            "Iteration {}/{}: {:.2}s, {:.0} months/s",
            i + 1,
            iterations,
            elapsed,
            benchmark_months as f32 / elapsed.max(f32::EPSILON)
        );
    }

    let avg_time = total_time / iterations as f32;
    log::info!("Benchmark results:");
    log::info!("  Average time: {:.2}s", avg_time);
    log::info!(
        "  Average rate: {:.0} months/s",
        benchmark_months as f32 / avg_time.max(f32::EPSILON)
    );

    Ok(())
}

fn generate_map(output: &str, width: u32, height: u32, seed: u64, biome: Biome) -> Result<()> {
    log::info!(
        "Generating map: {}x{}, seed={}, {:?}",
        width,
        height,
        seed,
        biome
    );

    let config = MapGenConfig {
        width,
        height,
        seed,
        ..Default::default()
    };
    let map = map::generate_map_from_config(&config, biome);

    let serialized = to_string_pretty(&map, PrettyConfig::default())?;
    std::fs::write(output, serialized)?;

    log::info!("Map saved to {}", output);
    Ok(())
}

fn validate_data(data_dir: &str) -> Result<()> {
    log::info!("Validating data files in {}", data_dir);

    match DataLoader::load_from_directory(data_dir) {
        Ok(config) => {
            log::info!("Data validation passed");
            log::info!("  Buildings: {}", config.buildings.len());
            log::info!("  Difficulty presets: {}", config.difficulty_presets.len());
            log::info!("  Weather tables: {}", config.weather.len());
            log::info!("  Notification templates: {}", config.notifications.len());
            Ok(())
        }
        Err(e) => {
            log::error!("Data validation failed: {}", e);
            std::process::exit(1);
        }
    }
}
