//! Passengers and the queue that owns them until pickup.
//!
//! The queue generates a pool of ride-wanting passengers at startup and tops
//! it back up after drop-offs. A passenger is exclusively owned here until
//! the matcher confirms a pickup, at which point [`PassengerQueue::hand_off`]
//! moves ownership to the carrying vehicle and only the id stays behind in
//! the in-transit set.

use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::geo::{Coordinate, Rgb};
use crate::ids::PassengerId;
use crate::matcher::MatcherEvent;
use crate::route_model::RouteModel;

/// Attempts at drawing a destination distinct from the start before the
/// sample is accepted as-is (degenerate one-node maps).
const DESTINATION_SAMPLE_ATTEMPTS: usize = 16;

/// A rider. `position` tracks the carrying vehicle once picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    pub id: PassengerId,
    pub start: Coordinate,
    pub destination: Coordinate,
    pub position: Coordinate,
    pub color: Rgb,
    pub requested: bool,
}

/// Owns all waiting passengers and tracks the ids of those in transit.
#[derive(Debug)]
pub struct PassengerQueue {
    model: Arc<RouteModel>,
    matcher: Sender<MatcherEvent>,
    capacity: usize,
    next_id: u32,
    rng: StdRng,
    new_passengers: Vec<Passenger>,
    in_transit: HashSet<PassengerId>,
}

impl PassengerQueue {
    /// Create the queue and generate the initial pool of `capacity`
    /// passengers at random snapped positions.
    pub fn new(
        model: Arc<RouteModel>,
        matcher: Sender<MatcherEvent>,
        capacity: usize,
        seed: u64,
    ) -> Self {
        let mut queue = Self {
            model,
            matcher,
            capacity,
            next_id: 0,
            rng: StdRng::seed_from_u64(seed),
            new_passengers: Vec::with_capacity(capacity),
            in_transit: HashSet::new(),
        };
        queue.top_up();
        queue
    }

    /// Generate one passenger: random start and destination, both snapped to
    /// their nearest nodes, and a random render colour.
    fn generate(&mut self) -> PassengerId {
        let start = self.random_node_position();
        let mut destination = self.random_node_position();
        for _ in 0..DESTINATION_SAMPLE_ATTEMPTS {
            if destination != start {
                break;
            }
            destination = self.random_node_position();
        }
        let id = PassengerId(self.next_id);
        self.next_id += 1;
        self.new_passengers.push(Passenger {
            id,
            start,
            destination,
            position: start,
            color: Rgb::random(&mut self.rng),
            requested: false,
        });
        id
    }

    fn random_node_position(&mut self) -> Coordinate {
        let sample = self.model.random_position(&mut self.rng);
        self.model.position(self.model.closest_node(sample))
    }

    /// Generate replacements until the live population (waiting plus in
    /// transit) reaches the pool size again.
    pub fn top_up(&mut self) {
        while self.population() < self.capacity {
            let id = self.generate();
            debug!(passenger = %id, "passenger generated");
        }
    }

    /// Waiting passengers plus those riding in a vehicle.
    pub fn population(&self) -> usize {
        self.new_passengers.len() + self.in_transit.len()
    }

    /// Register `id` as ride-wanting with the ride matcher and return its
    /// `(start, destination)` pair.
    pub fn request_ride(&mut self, id: PassengerId) -> SimResult<(Coordinate, Coordinate)> {
        let passenger = self
            .new_passengers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(SimError::NotFound(id))?;
        passenger.requested = true;
        let trip = (passenger.start, passenger.destination);
        let _ = self.matcher.send(MatcherEvent::PassengerRequestsRide(id));
        Ok(trip)
    }

    /// Register every not-yet-requested passenger with the matcher. Called
    /// from the queue's own loop each generate tick.
    pub fn request_pending(&mut self) {
        let pending: Vec<PassengerId> = self
            .new_passengers
            .iter()
            .filter(|p| !p.requested)
            .map(|p| p.id)
            .collect();
        for id in pending {
            // The id was just read out of the pool, so this cannot miss.
            let _ = self.request_ride(id);
        }
    }

    /// Start coordinate of a waiting passenger; `None` once handed off or
    /// unknown (the matcher treats both as a stale reference).
    pub fn pickup_location(&self, id: PassengerId) -> Option<Coordinate> {
        self.new_passengers
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.start)
    }

    /// Move `id` out of the waiting pool, transferring ownership to the
    /// caller. The id joins the in-transit set until the drop-off completes.
    pub fn hand_off(&mut self, id: PassengerId) -> SimResult<Passenger> {
        match self.new_passengers.iter().position(|p| p.id == id) {
            Some(at) => {
                let passenger = self.new_passengers.remove(at);
                self.in_transit.insert(id);
                Ok(passenger)
            }
            None if self.in_transit.contains(&id) => Err(SimError::Stale(id)),
            None => Err(SimError::NotFound(id)),
        }
    }

    /// Return a passenger whose trip was abandoned mid-ride. It re-enters
    /// the waiting pool unrequested and will be re-registered with the
    /// matcher on the next generate tick.
    pub fn reinstate(&mut self, mut passenger: Passenger) {
        self.in_transit.remove(&passenger.id);
        passenger.requested = false;
        debug!(passenger = %passenger.id, "passenger reinstated after abandoned trip");
        self.new_passengers.push(passenger);
    }

    /// Retire a dropped-off id from the in-transit set. Returns `false` for
    /// ids this queue was no longer tracking.
    pub fn complete(&mut self, id: PassengerId) -> bool {
        self.in_transit.remove(&id)
    }

    /// Waiting passengers, oldest first (for the renderer and tests).
    pub fn new_passengers(&self) -> &[Passenger] {
        &self.new_passengers
    }

    pub fn in_transit_count(&self) -> usize {
        self.in_transit.len()
    }
}
