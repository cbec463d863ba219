//! ubi-runner: headless runner for the UBI telematics pipeline.
//!
//! Usage:
//!   ubi-runner provision --db data/ubi.db [--drivers 5] [--vehicles 2]
//!   ubi-runner simulate  --db data/ubi.db [--seed 42] [--trips 200] [--realtime]
//!   ubi-runner process   --db data/ubi.db [--seed 42] [--cycles 10]
//!                        [--metrics data/ops_metrics.csv] [--models-dir models/artifacts]
//!
//! `process --cycles 0` polls forever; anything else runs a bounded
//! number of cycles and prints a run summary.

use anyhow::Result;
use chrono::{Duration, Utc};
use std::env;
use ubi_core::{
    config::UbiConfig,
    metrics::MetricsSink,
    processor::Processor,
    risk::{RiskScorer, DEFAULT_MODEL_NAME},
    rng::{RngBank, StreamSlot},
    simulator::TripSimulator,
    store::{UbiStore, VehicleRecord},
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("");

    let mut config = UbiConfig::from_env();
    if let Some(db) = str_arg(&args, "--db") {
        config.db_path = db;
    }
    if let Some(metrics) = str_arg(&args, "--metrics") {
        config.metrics_csv = Some(metrics);
    }
    if let Some(models) = str_arg(&args, "--models-dir") {
        config.models_dir = models;
    }

    match mode {
        "provision" => provision(
            &config,
            parse_arg(&args, "--drivers", 5i64),
            parse_arg(&args, "--vehicles", 2i64),
        ),
        "simulate" => simulate(
            &config,
            parse_arg(&args, "--seed", 42u64),
            parse_arg(&args, "--trips", 200u64),
            args.iter().any(|a| a == "--realtime"),
        ),
        "process" => process(
            &config,
            parse_arg(&args, "--seed", 42u64),
            parse_arg(&args, "--cycles", 10u64),
        ),
        _ => {
            eprintln!("usage: ubi-runner <provision|simulate|process> [flags]");
            std::process::exit(2);
        }
    }
}

/// Seed the reference data: drivers, their summary rows, and a small
/// vehicle fleet per driver.
fn provision(config: &UbiConfig, drivers: i64, vehicles_per_driver: i64) -> Result<()> {
    let store = UbiStore::open(&config.db_path)?;
    store.migrate()?;

    if !store.all_vehicles()?.is_empty() {
        println!("Fleet already provisioned in {}; nothing to do", config.db_path);
        return Ok(());
    }

    let makes = ["Toyota", "Honda", "Ford", "Tesla", "Subaru"];
    let models = ["Sedan", "SUV", "Hatch", "EV", "Crossover"];

    for user_id in 1..=drivers {
        store.provision_driver(user_id, &format!("Driver {user_id}"))?;
        for v in 0..vehicles_per_driver {
            let mix = (user_id + v) as usize;
            store.insert_vehicle(&VehicleRecord {
                vehicle_id: None,
                user_id,
                make: makes[user_id as usize % makes.len()].to_string(),
                model: models[v as usize % models.len()].to_string(),
                year: 2018 + (mix as i32 % 6),
                safety_rating: 3.5 + (mix % 2) as f64,
                base_rate: 70.0 + 10.0 * (mix % 3) as f64,
            })?;
        }
    }

    println!(
        "Provisioned {drivers} drivers with {vehicles_per_driver} vehicles each in {}",
        config.db_path
    );
    Ok(())
}

/// Generate trips for random provisioned vehicles.
fn simulate(config: &UbiConfig, seed: u64, trips: u64, realtime: bool) -> Result<()> {
    let store = UbiStore::open(&config.db_path)?;
    store.migrate()?;

    let vehicles = store.all_vehicles()?;
    if vehicles.is_empty() {
        anyhow::bail!("No vehicles in {}; run provision first", config.db_path);
    }

    let bank = RngBank::new(seed);
    let mut fleet_rng = bank.for_stream(StreamSlot::Fleet);
    let mut simulator = TripSimulator::new(&config.simulator, bank.for_stream(StreamSlot::Simulator));

    for _ in 0..trips {
        let vehicle = fleet_rng.choose(&vehicles);
        // Spread starts across the last 24h so night trips occur.
        let start = Utc::now() - Duration::hours(fleet_rng.next_u64_below(24) as i64);
        let simulated = simulator.simulate_trip(
            vehicle.user_id,
            vehicle.vehicle_id.expect("provisioned vehicle has id"),
            start,
        );
        store.insert_trip_with_events(&simulated.trip, &simulated.events)?;
        log::debug!(
            "simulated trip {} ({} events, {:.1} mi)",
            simulated.trip.trip_id,
            simulated.events.len(),
            simulated.trip.miles
        );
        if realtime {
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }

    println!("Generated {trips} trips.");
    Ok(())
}

/// Run the incremental processing loop.
fn process(config: &UbiConfig, seed: u64, cycles: u64) -> Result<()> {
    let store = UbiStore::open(&config.db_path)?;
    store.migrate()?;

    let scorer = RiskScorer::from_artifact_dir(
        &config.models_dir,
        DEFAULT_MODEL_NAME,
        config.risk.clone(),
    );
    let metrics = MetricsSink::new(config.metrics_csv.as_deref());
    let mut processor = Processor::new(config, store, scorer, RngBank::new(seed), metrics);

    if cycles == 0 {
        processor.run_forever();
    }
    processor.run_cycles(cycles)?;
    print_summary(&processor)?;
    Ok(())
}

fn print_summary(processor: &Processor<'_>) -> Result<()> {
    let store = processor.store();

    println!("=== RUN SUMMARY ===");
    println!("  trips:      {}", store.trip_count()?);
    println!("  featured:   {}", store.feature_count()?);
    println!("  labeled:    {}", store.label_count()?);
    println!("  quotes:     {}", store.quote_count()?);
    println!("  rewards:    {}", store.reward_count()?);
    println!("  queue lag:  {}", store.queue_lag()?);

    println!();
    println!("=== DRIVERS ===");
    for driver in store.all_driver_summaries()? {
        let quote = store.latest_quote_for_user(driver.user_id)?;
        match quote {
            Some(q) => println!(
                "  {} | {} pts | risk {:.1} | latest premium ${:.2} {}",
                driver.display_name,
                driver.points,
                driver.risk_score,
                q.breakdown.final_premium,
                serde_json::to_string(&q.breakdown.explanations)?,
            ),
            None => println!(
                "  {} | {} pts | risk {:.1} | no quote yet",
                driver.display_name, driver.points, driver.risk_score
            ),
        }
    }
    Ok(())
}

fn str_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
