//! Run a small fleet over a synthetic Berlin street grid and print what the
//! renderer would see.
//!
//! Run with: cargo run -p fleet_core --example fleet_run

use std::io::Write;
use std::time::Duration;

use fleet_core::geo::Coordinate;
use fleet_core::ids::NodeId;
use fleet_core::route_model::MapGraph;
use fleet_core::scenario::{build_simulation, SimParams};

/// Manhattan-style grid over the Berlin bounding box.
fn berlin_grid(side: u32) -> MapGraph {
    const LNG_MIN: f64 = 13.08;
    const LNG_MAX: f64 = 13.76;
    const LAT_MIN: f64 = 52.34;
    const LAT_MAX: f64 = 52.68;

    let mut g = MapGraph::new();
    let steps = f64::from(side - 1);
    for row in 0..side {
        for col in 0..side {
            let lng = LNG_MIN + (LNG_MAX - LNG_MIN) * f64::from(col) / steps;
            let lat = LAT_MIN + (LAT_MAX - LAT_MIN) * f64::from(row) / steps;
            g.add_node(Coordinate::new(lng, lat));
        }
    }
    for row in 0..side {
        for col in 0..side {
            let id = NodeId(row * side + col);
            if col + 1 < side {
                g.add_edge(id, NodeId(row * side + col + 1));
            }
            if row + 1 < side {
                g.add_edge(id, NodeId((row + 1) * side + col));
            }
        }
    }
    g
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    const GRID_SIDE: u32 = 20;
    const RUN_SECS: u64 = 5;

    let params = SimParams::default()
        .with_seed(123)
        .with_fleet_size(10)
        .with_passenger_pool(10);
    let render_ms = params.render_ms;

    let mut sim = build_simulation(berlin_grid(GRID_SIDE), params).expect("valid synthetic map");
    println!(
        "--- Fleet run ({} intersections, 10 vehicles, 10 passengers, {}s) ---",
        sim.snapshot_intersections().len(),
        RUN_SECS
    );

    sim.start();
    let frames = RUN_SECS * 1000 / render_ms;
    for _ in 0..frames {
        std::thread::sleep(Duration::from_millis(render_ms));
        let vehicles = sim.snapshot_vehicles();
        let carrying = vehicles.iter().filter(|v| v.color.is_some()).count();
        print!(
            "\rvehicles: {}  carrying: {}  waiting passengers: {}  rides completed: {}   ",
            vehicles.len(),
            carrying,
            sim.snapshot_new_passengers().len(),
            sim.rides_completed()
        );
        std::io::stdout().flush().ok();
    }
    println!();
    sim.shutdown();

    println!("Total rides completed: {}", sim.rides_completed());
}
