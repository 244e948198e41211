//! The ride matcher: central dispatcher pairing vehicles with passengers.
//!
//! The matcher owns the only inbound mailbox in the system. The vehicle
//! manager and the passenger queue send [`MatcherEvent`]s and never touch
//! matcher state; the matcher's event loop reacts by locking the passenger
//! queue and then the vehicle manager — always in that order — so no actor
//! ever holds another actor's lock while its own is taken.
//!
//! Matching is first-come-first-served on both sides: the head of the open
//! vehicle queue is paired with the head of the open passenger queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::fleet::VehicleManager;
use crate::ids::{PassengerId, VehicleId};
use crate::passenger::{Passenger, PassengerQueue};

/// Everything the matcher can be told. Cross-actor calls travel as values,
/// including the owned passenger on an abandoned trip.
#[derive(Debug)]
pub enum MatcherEvent {
    /// A vehicle with no rider wants a passenger.
    VehicleRequestsPassenger(VehicleId),
    /// The passenger queue registered a new ride-wanting passenger.
    PassengerRequestsRide(PassengerId),
    /// A matched vehicle reached the pickup and is waiting.
    VehicleArrived(VehicleId),
    /// A matched vehicle could not route to the pickup.
    PickupUnreachable(VehicleId),
    /// A trip was abandoned mid-ride; the passenger returns to the queue.
    PassengerReturned(Passenger),
    /// A passenger reached their destination and was destroyed.
    PassengerDroppedOff(PassengerId),
}

/// Dispatcher state: two FIFO queues of open requests plus the matches
/// awaiting a pickup report. Only ids are held here; the entities stay with
/// their owning managers.
#[derive(Debug, Default)]
pub struct RideMatcher {
    open_vehicles: VecDeque<VehicleId>,
    open_passengers: VecDeque<PassengerId>,
    pending_arrival: HashMap<VehicleId, PassengerId>,
}

impl RideMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one event. Atomic with respect to matcher state; each queue
    /// or fleet interaction takes that component's lock for the shortest
    /// possible span.
    pub fn handle_event(
        &mut self,
        event: MatcherEvent,
        queue: &Mutex<PassengerQueue>,
        fleet: &Mutex<VehicleManager>,
    ) {
        match event {
            MatcherEvent::VehicleRequestsPassenger(vehicle) => {
                if self.open_vehicles.contains(&vehicle)
                    || self.pending_arrival.contains_key(&vehicle)
                {
                    return;
                }
                self.open_vehicles.push_back(vehicle);
                self.try_match(queue, fleet);
            }
            MatcherEvent::PassengerRequestsRide(passenger) => {
                if self.open_passengers.contains(&passenger)
                    || self.pending_arrival.values().any(|&p| p == passenger)
                {
                    return;
                }
                self.open_passengers.push_back(passenger);
                self.try_match(queue, fleet);
            }
            MatcherEvent::VehicleArrived(vehicle) => self.complete_pickup(vehicle, queue, fleet),
            MatcherEvent::PickupUnreachable(vehicle) => {
                let Some(passenger) = self.pending_arrival.remove(&vehicle) else {
                    warn!(vehicle = %vehicle, "unreachable pickup for a vehicle with no match");
                    return;
                };
                // The passenger keeps their place at the head of the line.
                if !self.open_passengers.contains(&passenger) {
                    self.open_passengers.push_front(passenger);
                }
                let failed = fleet
                    .lock()
                    .expect("vehicle manager lock")
                    .match_failed(vehicle);
                if let Err(err) = failed {
                    warn!(%err, "match_failed on unknown vehicle");
                }
                self.try_match(queue, fleet);
            }
            MatcherEvent::PassengerReturned(passenger) => {
                queue
                    .lock()
                    .expect("passenger queue lock")
                    .reinstate(passenger);
            }
            MatcherEvent::PassengerDroppedOff(passenger) => {
                let known = queue
                    .lock()
                    .expect("passenger queue lock")
                    .complete(passenger);
                if !known {
                    debug!(passenger = %passenger, "drop-off for an untracked passenger");
                }
            }
        }
    }

    /// The vehicle is parked at the pickup: pull the passenger out of the
    /// queue and hand them over.
    fn complete_pickup(
        &mut self,
        vehicle: VehicleId,
        queue: &Mutex<PassengerQueue>,
        fleet: &Mutex<VehicleManager>,
    ) {
        let Some(passenger) = self.pending_arrival.remove(&vehicle) else {
            warn!(vehicle = %vehicle, "arrival report with no pending match");
            return;
        };
        let handoff = queue
            .lock()
            .expect("passenger queue lock")
            .hand_off(passenger);
        match handoff {
            Ok(passenger) => {
                let boarded = fleet
                    .lock()
                    .expect("vehicle manager lock")
                    .passenger_into_vehicle(vehicle, passenger);
                if let Err(err) = boarded {
                    warn!(%err, "handoff to unknown vehicle");
                }
            }
            // Someone else already took this passenger; nothing to deliver.
            Err(SimError::Stale(id)) => debug!(passenger = %id, "stale handoff discarded"),
            Err(err) => warn!(%err, "handoff failed; state unchanged"),
        }
    }

    /// Pair heads of the two open queues until one side runs dry. Stale
    /// passenger ids (already handed off) are dropped on the floor.
    fn try_match(&mut self, queue: &Mutex<PassengerQueue>, fleet: &Mutex<VehicleManager>) {
        while !self.open_vehicles.is_empty() && !self.open_passengers.is_empty() {
            let passenger = self.open_passengers[0];
            let Some(pickup) = queue
                .lock()
                .expect("passenger queue lock")
                .pickup_location(passenger)
            else {
                debug!(passenger = %passenger, "stale open request discarded");
                self.open_passengers.pop_front();
                continue;
            };

            let vehicle = self.open_vehicles[0];
            let assigned = fleet
                .lock()
                .expect("vehicle manager lock")
                .assign_passenger(vehicle, pickup);
            self.open_vehicles.pop_front();
            match assigned {
                Ok(()) => {
                    self.open_passengers.pop_front();
                    self.pending_arrival.insert(vehicle, passenger);
                    info!(vehicle = %vehicle, passenger = %passenger, "matched");
                }
                Err(err) => {
                    // The vehicle is gone; keep the passenger at the head
                    // for the next candidate.
                    warn!(%err, "assignment failed");
                }
            }
        }
    }

    // ── Accessors (render/test) ────────────────────────────────────────

    pub fn open_vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.open_vehicles.iter().copied()
    }

    pub fn open_passengers(&self) -> impl Iterator<Item = PassengerId> + '_ {
        self.open_passengers.iter().copied()
    }

    pub fn pending_arrivals(&self) -> &HashMap<VehicleId, PassengerId> {
        &self.pending_arrival
    }
}
