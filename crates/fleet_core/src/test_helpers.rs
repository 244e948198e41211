//! Shared builders for unit tests: small graphs and wired-up components.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::fleet::{FleetConfig, VehicleManager};
use crate::geo::Coordinate;
use crate::ids::NodeId;
use crate::matcher::{MatcherEvent, RideMatcher};
use crate::passenger::PassengerQueue;
use crate::planner::{AStarPlanner, RoutePlanner};
use crate::route_model::{MapGraph, RouteModel};

/// A `side` × `side` unit-spaced street grid, node ids row-major from the
/// south-west corner.
pub fn grid_graph(side: u32) -> MapGraph {
    let mut g = MapGraph::new();
    for row in 0..side {
        for col in 0..side {
            g.add_node(Coordinate::new(f64::from(col), f64::from(row)));
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

pub fn grid_model(side: u32) -> Arc<RouteModel> {
    Arc::new(RouteModel::from_graph(grid_graph(side)).expect("grid graph is valid"))
}

/// Two disconnected road segments: a mainland pair at the origin and an
/// island pair far north-east. Useful for unroutable scenarios.
pub fn split_model() -> Arc<RouteModel> {
    let mut g = MapGraph::new();
    let a = g.add_node(Coordinate::new(0.0, 0.0));
    let b = g.add_node(Coordinate::new(1.0, 0.0));
    let c = g.add_node(Coordinate::new(10.0, 10.0));
    let d = g.add_node(Coordinate::new(11.0, 10.0));
    g.add_edge(a, b);
    g.add_edge(c, d);
    Arc::new(RouteModel::from_graph(g).expect("split graph is valid"))
}

/// Step length used by test fleets; half a grid edge so motion takes a
/// predictable two ticks per hop.
pub const TEST_STEP: f64 = 0.5;
pub const TEST_FAILURE_LIMIT: u32 = 3;

/// A fully wired trio of components over a 4×4 grid, plus the matcher
/// channel ends for inspection.
pub struct TestFixture {
    pub model: Arc<RouteModel>,
    pub planner: Arc<dyn RoutePlanner>,
    pub queue: Mutex<PassengerQueue>,
    pub fleet: Mutex<VehicleManager>,
    pub matcher: RideMatcher,
    pub tx: Sender<MatcherEvent>,
    pub rx: Receiver<MatcherEvent>,
}

pub fn test_fixture(vehicles: usize, passengers: usize) -> TestFixture {
    fixture_on(grid_model(4), vehicles, passengers)
}

pub fn fixture_on(model: Arc<RouteModel>, vehicles: usize, passengers: usize) -> TestFixture {
    let (tx, rx) = mpsc::channel();
    let planner: Arc<dyn RoutePlanner> = Arc::new(AStarPlanner::new(model.clone()));
    let fleet = Mutex::new(VehicleManager::new(
        model.clone(),
        planner.clone(),
        tx.clone(),
        FleetConfig {
            vehicle_count: vehicles,
            step: TEST_STEP,
            failure_limit: TEST_FAILURE_LIMIT,
            seed: 7,
        },
    ));
    let queue = Mutex::new(PassengerQueue::new(model.clone(), tx.clone(), passengers, 13));
    TestFixture {
        model,
        planner,
        queue,
        fleet,
        matcher: RideMatcher::new(),
        tx,
        rx,
    }
}

/// Drain every event currently sitting in the matcher mailbox.
pub fn drain(rx: &Receiver<MatcherEvent>) -> Vec<MatcherEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
