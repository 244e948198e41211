#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use fleet_core::fleet::{FleetConfig, VehicleManager};
use fleet_core::geo::{Coordinate, Rgb};
use fleet_core::ids::{NodeId, PassengerId};
use fleet_core::matcher::{MatcherEvent, RideMatcher};
use fleet_core::passenger::{Passenger, PassengerQueue};
use fleet_core::planner::{AStarPlanner, RoutePlanner};
use fleet_core::route_model::{MapGraph, RouteModel};

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

/// A 3×3 mainland grid plus a two-node island far to the north-east. The
/// island is routable internally but unreachable from the mainland.
pub fn island_graph() -> MapGraph {
    let mut g = grid_graph(3);
    let a = g.add_node(Coordinate::new(50.0, 50.0));
    let b = g.add_node(Coordinate::new(51.0, 50.0));
    g.add_edge(a, b);
    g
}

pub const ISLAND_WEST: Coordinate = Coordinate { x: 50.0, y: 50.0 };
pub const ISLAND_EAST: Coordinate = Coordinate { x: 51.0, y: 50.0 };

/// A hand-built passenger for scenarios that need exact placement; inject it
/// with `PassengerQueue::reinstate`.
pub fn passenger_at(id: u32, start: Coordinate, destination: Coordinate) -> Passenger {
    Passenger {
        id: PassengerId(id),
        start,
        destination,
        position: start,
        color: Rgb::new(200, 40, 40),
        requested: false,
    }
}

/// The three actors wired over one channel, without any threads: tests tick
/// the fleet and pump the mailbox by hand for deterministic interleavings.
pub struct Components {
    pub model: Arc<RouteModel>,
    pub queue: Mutex<PassengerQueue>,
    pub fleet: Mutex<VehicleManager>,
    pub matcher: RideMatcher,
    pub rx: Receiver<MatcherEvent>,
}

pub fn components(graph: MapGraph, vehicles: usize, passengers: usize, step: f64) -> Components {
    let model = Arc::new(RouteModel::from_graph(graph).expect("valid test graph"));
    let (tx, rx) = mpsc::channel();
    let planner: Arc<dyn RoutePlanner> = Arc::new(AStarPlanner::new(model.clone()));
    let fleet = Mutex::new(VehicleManager::new(
        model.clone(),
        planner,
        tx.clone(),
        FleetConfig {
            vehicle_count: vehicles,
            step,
            failure_limit: 3,
            seed: 21,
        },
    ));
    let queue = Mutex::new(PassengerQueue::new(model.clone(), tx, passengers, 22));
    Components {
        model,
        queue,
        fleet,
        matcher: RideMatcher::new(),
        rx,
    }
}

/// Forward every queued mailbox event into the matcher, as the match loop
/// would. Returns the number of events processed.
pub fn pump_matcher(
    rx: &Receiver<MatcherEvent>,
    matcher: &mut RideMatcher,
    queue: &Mutex<PassengerQueue>,
    fleet: &Mutex<VehicleManager>,
) -> usize {
    let mut processed = 0;
    while let Ok(event) = rx.try_recv() {
        matcher.handle_event(event, queue, fleet);
        processed += 1;
    }
    processed
}
