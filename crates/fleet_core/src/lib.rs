//! # Fleet Simulation Core
//!
//! A concurrent rideshare-fleet simulation over a real road network.
//!
//! ## Overview
//!
//! This crate provides the simulation core, including:
//!
//! - **Route Model**: immutable road graph with nearest-node lookup
//! - **Route Planner**: A\* search producing node paths, with an LRU cache
//! - **Actor Runtime**: vehicle manager, passenger queue, and ride matcher
//!   as long-running threads exchanging id-addressed messages
//! - **Snapshots**: immutable views polled by an external renderer
//!
//! ## Key Concepts
//!
//! - **Ticks**: each actor mutates its own state at its own fixed interval
//! - **FIFO Matching**: the dispatcher pairs the oldest open vehicle request
//!   with the oldest open passenger request
//! - **Ownership Handoff**: a passenger is owned by the queue until pickup,
//!   by the carrying vehicle until drop-off, then destroyed
//! - **Deterministic**: a single seed derives every actor's RNG
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use fleet_core::geo::Coordinate;
//! use fleet_core::route_model::MapGraph;
//! use fleet_core::scenario::{build_simulation, SimParams};
//!
//! let mut graph = MapGraph::new();
//! let a = graph.add_node(Coordinate::new(13.39, 52.51));
//! let b = graph.add_node(Coordinate::new(13.40, 52.52));
//! graph.add_edge(a, b);
//!
//! let params = SimParams::default().with_seed(42).with_fleet_size(5);
//! let mut sim = build_simulation(graph, params).expect("valid map");
//! sim.run_for(Duration::from_secs(2));
//! println!("completed rides: {}", sim.rides_completed());
//! ```

pub mod error;
pub mod fleet;
pub mod geo;
pub mod ids;
pub mod matcher;
pub mod passenger;
pub mod planner;
pub mod route_model;
pub mod runtime;
pub mod scenario;
pub mod snapshot;
pub mod vehicle;

#[cfg(test)]
pub mod test_helpers;
