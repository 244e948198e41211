//! Scenario parameters and construction.
//!
//! [`SimParams`] is the full set of tuning knobs, serializable so a
//! parameter set can travel as JSON. [`build_simulation`] validates the map
//! graph, wires the three actors together, and returns a [`Simulation`]
//! ready to start.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::fleet::{FleetConfig, VehicleManager};
use crate::passenger::PassengerQueue;
use crate::planner::{AStarPlanner, CachedPlanner, RoutePlanner, DEFAULT_ROUTE_CACHE_CAPACITY};
use crate::route_model::{MapGraph, RouteModel};
use crate::runtime::Simulation;

/// Drive-loop interval in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 10;
/// Renderer poll interval in milliseconds.
pub const DEFAULT_RENDER_MS: u64 = 33;
/// Passenger-queue loop interval in milliseconds.
pub const DEFAULT_GENERATE_MS: u64 = 50;
/// Matcher selector timeout in milliseconds.
pub const DEFAULT_MATCH_POLL_MS: u64 = 10;

/// Parameters for building a simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    /// Pool size of vehicles.
    pub max_vehicles: usize,
    /// Pool size of passengers.
    pub max_passengers: usize,
    /// Drive-loop interval (ms).
    pub tick_ms: u64,
    /// Renderer interval (ms); consumed by the hosting display loop.
    pub render_ms: u64,
    /// Passenger generate-loop interval (ms).
    pub generate_ms: u64,
    /// Matcher mailbox poll timeout (ms); bounds shutdown latency.
    pub match_poll_ms: u64,
    /// Consecutive match failures before a vehicle cools down.
    pub failure_limit: u32,
    /// Per-tick step length in degrees. `None` derives `|Δlat| / 1000` from
    /// the map bounds.
    pub distance_per_cycle: Option<f64>,
    /// Master RNG seed; per-actor seeds are derived from it.
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            max_vehicles: 10,
            max_passengers: 10,
            tick_ms: DEFAULT_TICK_MS,
            render_ms: DEFAULT_RENDER_MS,
            generate_ms: DEFAULT_GENERATE_MS,
            match_poll_ms: DEFAULT_MATCH_POLL_MS,
            failure_limit: 3,
            distance_per_cycle: None,
            seed: 42,
        }
    }
}

impl SimParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fleet_size(mut self, max_vehicles: usize) -> Self {
        self.max_vehicles = max_vehicles;
        self
    }

    pub fn with_passenger_pool(mut self, max_passengers: usize) -> Self {
        self.max_passengers = max_passengers;
        self
    }

    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn with_failure_limit(mut self, failure_limit: u32) -> Self {
        self.failure_limit = failure_limit;
        self
    }

    /// Override the derived `|Δlat| / 1000` step length.
    pub fn with_distance_per_cycle(mut self, step: f64) -> Self {
        self.distance_per_cycle = Some(step);
        self
    }
}

/// Build a ready-to-start simulation from loader output and parameters.
///
/// The only fatal error path in the system: a graph that fails validation is
/// reported as [`crate::error::SimError::MapLoad`] and nothing is
/// constructed.
pub fn build_simulation(graph: MapGraph, params: SimParams) -> SimResult<Simulation> {
    let model = Arc::new(RouteModel::from_graph(graph)?);
    let step = params
        .distance_per_cycle
        .unwrap_or_else(|| model.bounds().default_step());

    let (matcher_tx, matcher_rx) = mpsc::channel();
    let planner: Arc<dyn RoutePlanner> = Arc::new(CachedPlanner::new(
        Box::new(AStarPlanner::new(model.clone())),
        DEFAULT_ROUTE_CACHE_CAPACITY,
    ));

    let fleet = Arc::new(Mutex::new(VehicleManager::new(
        model.clone(),
        planner,
        matcher_tx.clone(),
        FleetConfig {
            vehicle_count: params.max_vehicles,
            step,
            failure_limit: params.failure_limit,
            seed: params.seed.wrapping_add(1),
        },
    )));
    let queue = Arc::new(Mutex::new(PassengerQueue::new(
        model.clone(),
        matcher_tx.clone(),
        params.max_passengers,
        params.seed.wrapping_add(2),
    )));

    Ok(Simulation::new(
        params, model, fleet, queue, matcher_tx, matcher_rx,
    ))
}
