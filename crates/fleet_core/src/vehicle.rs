//! Per-vehicle state: the ride state machine and incremental motion.

use crate::geo::Coordinate;
use crate::ids::VehicleId;
use crate::passenger::Passenger;

/// Lifecycle stage of a vehicle. There is no terminal state; vehicles roam
/// forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum VehicleState {
    /// Roaming with no outstanding request.
    NoPassengerRequested,
    /// A request is open with the ride matcher.
    NoPassengerQueued,
    /// Matched; heading to the pickup.
    PassengerQueued,
    /// Parked at the pickup awaiting the handoff.
    Waiting,
    /// Carrying the passenger to their destination.
    DrivingPassenger,
}

/// One vehicle of the fleet. Mutated exclusively by the vehicle manager.
#[derive(Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    pub position: Coordinate,
    pub destination: Coordinate,
    /// Planned waypoints toward `destination`, excluding the point the plan
    /// started from. `path_index == path.len()` means the path is spent.
    pub path: Vec<Coordinate>,
    pub path_index: usize,
    /// Exclusively owned while carried; `Some` iff `state` is
    /// [`VehicleState::DrivingPassenger`].
    pub passenger: Option<Passenger>,
    pub state: VehicleState,
    /// Consecutive match failures; cleared on a successful drop-off.
    pub failures: u32,
    /// Ticks left parked out of matching after hitting the failure limit.
    pub cooldown: u32,
}

impl Vehicle {
    pub fn new(id: VehicleId, position: Coordinate) -> Self {
        Self {
            id,
            position,
            destination: position,
            path: Vec::new(),
            path_index: 0,
            passenger: None,
            state: VehicleState::NoPassengerRequested,
            failures: 0,
            cooldown: 0,
        }
    }

    /// Point the vehicle at a new destination, invalidating the current path.
    pub fn set_destination(&mut self, destination: Coordinate) {
        self.destination = destination;
        self.clear_path();
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.path_index = 0;
    }

    pub fn carrying(&self) -> bool {
        self.passenger.is_some()
    }

    pub fn has_arrived(&self) -> bool {
        self.position == self.destination
    }

    /// Advance one tick along the path: move `step` toward the next
    /// waypoint, or snap onto it when it is within reach. A carried
    /// passenger's position follows the vehicle.
    pub fn advance(&mut self, step: f64) {
        if let Some(&next) = self.path.get(self.path_index) {
            let remaining = self.position.distance(next);
            if remaining <= step {
                self.position = next;
                self.path_index += 1;
            } else {
                let heading = (next.y - self.position.y).atan2(next.x - self.position.x);
                self.position.x += step * heading.cos();
                self.position.y += step * heading.sin();
            }
            if let Some(passenger) = self.passenger.as_mut() {
                passenger.position = self.position;
            }
        }
    }
}
