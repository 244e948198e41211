//! The vehicle manager: owns the fleet and drives the per-tick state machine.
//!
//! One drive task ticks every vehicle in id order. Per tick a vehicle
//! (re-)plans an empty path, opens a ride request when it has none, then
//! moves one step and reacts to arrival. The ride matcher talks back through
//! [`VehicleManager::assign_passenger`], [`VehicleManager::passenger_into_vehicle`],
//! and [`VehicleManager::match_failed`]; the runtime serialises those against
//! the drive loop with the manager's mutex, so each callback is atomic with
//! respect to a tick.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::geo::Coordinate;
use crate::ids::VehicleId;
use crate::matcher::MatcherEvent;
use crate::passenger::Passenger;
use crate::planner::RoutePlanner;
use crate::route_model::RouteModel;
use crate::vehicle::{Vehicle, VehicleState};

/// Fleet configuration handed down from the scenario parameters.
#[derive(Debug, Clone, Copy)]
pub struct FleetConfig {
    pub vehicle_count: usize,
    /// Maximum Euclidean distance a vehicle advances per tick.
    pub step: f64,
    /// Consecutive match failures before the cooldown kicks in.
    pub failure_limit: u32,
    pub seed: u64,
}

pub struct VehicleManager {
    model: Arc<RouteModel>,
    planner: Arc<dyn RoutePlanner>,
    matcher: Sender<MatcherEvent>,
    rng: StdRng,
    step: f64,
    failure_limit: u32,
    vehicles: Vec<Vehicle>,
    rides_completed: u64,
}

impl std::fmt::Debug for VehicleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleManager")
            .field("model", &self.model)
            .field("step", &self.step)
            .field("failure_limit", &self.failure_limit)
            .field("vehicles", &self.vehicles)
            .field("rides_completed", &self.rides_completed)
            .finish()
    }
}

impl VehicleManager {
    /// Create the fleet: `vehicle_count` vehicles at random snapped
    /// positions, each pointed at a random snapped destination.
    pub fn new(
        model: Arc<RouteModel>,
        planner: Arc<dyn RoutePlanner>,
        matcher: Sender<MatcherEvent>,
        config: FleetConfig,
    ) -> Self {
        let mut manager = Self {
            model,
            planner,
            matcher,
            rng: StdRng::seed_from_u64(config.seed),
            step: config.step,
            failure_limit: config.failure_limit.max(1),
            vehicles: Vec::with_capacity(config.vehicle_count),
            rides_completed: 0,
        };
        for n in 0..config.vehicle_count {
            let position = manager.random_node_position();
            let destination = manager.random_node_position();
            let mut vehicle = Vehicle::new(VehicleId(n as u32), position);
            vehicle.set_destination(destination);
            manager.vehicles.push(vehicle);
        }
        manager
    }

    fn random_node_position(&mut self) -> Coordinate {
        let sample = self.model.random_position(&mut self.rng);
        self.model.position(self.model.closest_node(sample))
    }

    fn send(&self, event: MatcherEvent) {
        if self.matcher.send(event).is_err() {
            debug!("matcher channel closed; event dropped");
        }
    }

    /// One drive-loop iteration over the whole fleet, in id order.
    pub fn tick(&mut self) {
        for i in 0..self.vehicles.len() {
            self.tick_vehicle(i);
        }
    }

    fn tick_vehicle(&mut self, i: usize) {
        // Routing: an empty path is (re-)planned before anything else.
        if self.vehicles[i].path.is_empty() {
            let (start, goal) = {
                let v = &self.vehicles[i];
                (v.position, v.destination)
            };
            match self.planner.plan(start, goal) {
                Some(path) => {
                    let v = &mut self.vehicles[i];
                    v.path = path;
                    v.path_index = 0;
                }
                None => {
                    self.recover_unroutable(i);
                    return;
                }
            }
        }

        match self.vehicles[i].state {
            VehicleState::NoPassengerRequested => {
                let id = self.vehicles[i].id;
                self.vehicles[i].state = VehicleState::NoPassengerQueued;
                self.send(MatcherEvent::VehicleRequestsPassenger(id));
            }
            VehicleState::NoPassengerQueued if self.vehicles[i].cooldown > 0 => {
                let v = &mut self.vehicles[i];
                v.cooldown -= 1;
                if v.cooldown == 0 {
                    v.state = VehicleState::NoPassengerRequested;
                }
            }
            // Parked at the pickup until the handoff arrives.
            VehicleState::Waiting => return,
            _ => {}
        }

        self.vehicles[i].advance(self.step);

        if self.vehicles[i].has_arrived() {
            self.handle_arrival(i);
        }
    }

    /// The planner found no route for this vehicle. Recovery depends on what
    /// the vehicle was doing; see the error-handling rules for `Unroutable`.
    fn recover_unroutable(&mut self, i: usize) {
        let state = self.vehicles[i].state;
        let err = SimError::Unroutable {
            from: self.vehicles[i].position,
            to: self.vehicles[i].destination,
        };
        match state {
            VehicleState::DrivingPassenger => {
                // The carried passenger goes back to the queue, re-snapped
                // at the point the trip broke down.
                let id = self.vehicles[i].id;
                let here = self.snap(self.vehicles[i].position);
                let vehicle = &mut self.vehicles[i];
                if let Some(mut passenger) = vehicle.passenger.take() {
                    warn!(vehicle = %id, passenger = %passenger.id, %err, "abandoning trip");
                    passenger.start = here;
                    passenger.position = here;
                    passenger.requested = false;
                    self.send(MatcherEvent::PassengerReturned(passenger));
                }
                self.vehicles[i].state = VehicleState::NoPassengerRequested;
                self.assign_random_destination(i);
            }
            VehicleState::PassengerQueued => {
                // The matcher decides the failure path; meanwhile the
                // vehicle stops chasing the unreachable pickup.
                let id = self.vehicles[i].id;
                debug!(vehicle = %id, %err, "pickup unreachable");
                self.vehicles[i].state = VehicleState::NoPassengerQueued;
                self.assign_random_destination(i);
                self.send(MatcherEvent::PickupUnreachable(id));
            }
            _ => {
                debug!(vehicle = %self.vehicles[i].id, %err, "re-rolling destination");
                self.assign_random_destination(i);
            }
        }
    }

    fn handle_arrival(&mut self, i: usize) {
        match self.vehicles[i].state {
            VehicleState::NoPassengerRequested | VehicleState::NoPassengerQueued => {
                self.assign_random_destination(i);
            }
            VehicleState::PassengerQueued => {
                let id = self.vehicles[i].id;
                self.vehicles[i].state = VehicleState::Waiting;
                self.send(MatcherEvent::VehicleArrived(id));
            }
            VehicleState::DrivingPassenger => {
                let vehicle = &mut self.vehicles[i];
                if let Some(passenger) = vehicle.passenger.take() {
                    info!(vehicle = %vehicle.id, passenger = %passenger.id, "drop-off");
                    self.rides_completed += 1;
                    self.send(MatcherEvent::PassengerDroppedOff(passenger.id));
                }
                self.vehicles[i].failures = 0;
                self.vehicles[i].state = VehicleState::NoPassengerRequested;
                self.assign_random_destination(i);
            }
            VehicleState::Waiting => {}
        }
    }

    fn assign_random_destination(&mut self, i: usize) {
        let destination = self.random_node_position();
        self.vehicles[i].set_destination(destination);
    }

    fn snap(&self, c: Coordinate) -> Coordinate {
        self.model.position(self.model.closest_node(c))
    }

    // ── Matcher callbacks ──────────────────────────────────────────────

    /// The matcher paired this vehicle with a passenger waiting at `pickup`.
    pub fn assign_passenger(&mut self, id: VehicleId, pickup: Coordinate) -> SimResult<()> {
        let vehicle = self.vehicle_mut(id)?;
        vehicle.set_destination(pickup);
        vehicle.state = VehicleState::PassengerQueued;
        debug!(vehicle = %id, "assigned to pickup");
        Ok(())
    }

    /// Ownership handoff: the passenger boards and their destination becomes
    /// the vehicle's.
    pub fn passenger_into_vehicle(&mut self, id: VehicleId, passenger: Passenger) -> SimResult<()> {
        let vehicle = self.vehicle_mut(id)?;
        let destination = passenger.destination;
        info!(vehicle = %id, passenger = %passenger.id, "passenger aboard");
        let mut passenger = passenger;
        passenger.position = vehicle.position;
        vehicle.passenger = Some(passenger);
        vehicle.set_destination(destination);
        vehicle.state = VehicleState::DrivingPassenger;
        Ok(())
    }

    /// A match fell through. Below the failure limit the vehicle re-requests
    /// on its next tick; at the limit it cools down for a tick with a
    /// rotated destination to avoid livelocking on the same pairing.
    pub fn match_failed(&mut self, id: VehicleId) -> SimResult<()> {
        let limit = self.failure_limit;
        let vehicle = self.vehicle_mut(id)?;
        vehicle.failures += 1;
        if vehicle.failures < limit {
            vehicle.state = VehicleState::NoPassengerRequested;
        } else {
            debug!(vehicle = %id, failures = vehicle.failures, "cooling down");
            vehicle.state = VehicleState::NoPassengerQueued;
            vehicle.cooldown = 1;
            self.assign_random_destination(id.index());
        }
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> SimResult<&Vehicle> {
        self.vehicles
            .get(id.index())
            .ok_or(SimError::UnknownVehicle(id))
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> SimResult<&mut Vehicle> {
        self.vehicles
            .get_mut(id.index())
            .ok_or(SimError::UnknownVehicle(id))
    }

    /// Drop-offs completed since startup.
    pub fn rides_completed(&self) -> u64 {
        self.rides_completed
    }
}
