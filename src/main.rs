use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use vehicle_sim::messages::{SensorMessage, StatusMessage, StatusType};
use vehicle_sim::simulation::{
    load_config, load_route, SimConfig, SystemClock, Vehicle, VehicleEvent, VehicleState, Wgs84,
};

/// Loop driven when no route file is given
const DEMO_ROUTE: [(f64, f64); 4] = [
    (49.0268, 8.3855),
    (49.0300, 8.3855),
    (49.0300, 8.3920),
    (49.0268, 8.3920),
];

#[derive(Parser)]
#[command(name = "vehicle_sim")]
#[command(about = "Simulates a vehicle driving a closed loop of waypoints")]
struct Cli {
    /// Vehicle identifier reported in every snapshot
    #[arg(long, default_value = "vehicle-1")]
    vehicle_id: String,

    /// JSON file with the route as a list of {latitude, longitude} objects
    #[arg(long)]
    route: Option<PathBuf>,

    /// JSON file with simulation settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to drive, in seconds
    #[arg(long, default_value = "10")]
    seconds: u64,

    /// Milliseconds between two simulation ticks (overrides the config file)
    #[arg(long)]
    period_ms: Option<u64>,

    /// Seed for reproducible target speeds
    #[arg(long)]
    seed: Option<u64>,

    /// Print sensor messages as JSON instead of a summary line
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(period_ms) = cli.period_ms {
        config.tick_period_ms = period_ms;
    }
    config.validate().context("Invalid simulation settings")?;

    let waypoints = match &cli.route {
        Some(path) => load_route(path)?,
        None => DEMO_ROUTE.iter().copied().map(Wgs84::from).collect(),
    };

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    info!(
        "Driving vehicle {} on {} waypoints for {}s (tick every {}ms)",
        cli.vehicle_id,
        waypoints.len(),
        cli.seconds,
        config.tick_period_ms
    );

    let period = Duration::from_millis(config.tick_period_ms);
    let vehicle = Vehicle::with_parts(
        cli.vehicle_id.clone(),
        waypoints,
        config,
        Arc::new(SystemClock),
        Box::new(rng),
    );

    if cli.json {
        print_status(&vehicle, StatusType::VehicleReady, "Vehicle is ready")?;
    }

    vehicle.start();

    let deadline = std::time::Instant::now() + Duration::from_secs(cli.seconds);
    while std::time::Instant::now() < deadline {
        std::thread::sleep(period);
        report_events(&vehicle, cli.json)?;
        print_state(&vehicle.snapshot(), cli.json)?;
    }

    vehicle.stop();
    report_events(&vehicle, cli.json)?;

    info!("=== SIMULATION COMPLETE ===");
    let last = vehicle.snapshot();
    info!("Final state: {}", last.summary());
    print_state(&last, cli.json)?;

    Ok(())
}

fn print_json(json: &[u8]) -> Result<()> {
    let text = std::str::from_utf8(json).context("Message is not valid UTF-8")?;
    println!("{}", text);
    Ok(())
}

fn print_state(state: &VehicleState, json: bool) -> Result<()> {
    if json {
        print_json(&SensorMessage::from(state).to_json()?)
    } else {
        println!("{}", state.summary());
        Ok(())
    }
}

fn print_status(vehicle: &Vehicle, status_type: StatusType, message: &str) -> Result<()> {
    let state = vehicle.snapshot();
    let status = StatusMessage::new(state.time, &state.vehicle_id, status_type, message);
    print_json(&status.to_json()?)
}

fn report_events(vehicle: &Vehicle, json: bool) -> Result<()> {
    for event in vehicle.drain_events() {
        match event {
            VehicleEvent::NoRoute => {
                warn!("No waypoints to drive along, the vehicle stays where it is");
                if json {
                    print_status(vehicle, StatusType::Warning, "No waypoints available")?;
                }
            }
            VehicleEvent::WaypointReached { index, position } => {
                info!("Reached waypoint {} at {}", index, position);
                if json {
                    print_status(
                        vehicle,
                        StatusType::Info,
                        &format!("Reached waypoint {}", index),
                    )?;
                }
            }
            VehicleEvent::NewTarget { kmh } => info!("New target speed: {:.1} km/h", kmh),
            VehicleEvent::Started | VehicleEvent::Stopped => {}
        }
    }
    Ok(())
}
