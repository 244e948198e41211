//! Simulation error type.
//!
//! Only [`SimError::MapLoad`] propagates out of the crate; the remaining
//! variants are operational and absorbed by the actor that observes them,
//! surfacing only as state-machine transitions or log records.

use thiserror::Error;

use crate::geo::Coordinate;
use crate::ids::{PassengerId, VehicleId};

#[derive(Debug, Error)]
pub enum SimError {
    /// The map graph handed to the scenario builder is unusable. Fatal.
    #[error("map load failed: {0}")]
    MapLoad(String),

    /// The planner exhausted its open set without reaching the goal.
    #[error("no route from ({:.5}, {:.5}) to ({:.5}, {:.5})", .from.x, .from.y, .to.x, .to.y)]
    Unroutable { from: Coordinate, to: Coordinate },

    /// The matcher referred to a passenger already handed off.
    #[error("passenger {0} already handed off")]
    Stale(PassengerId),

    /// A handoff addressed an id the queue has never held.
    #[error("passenger {0} not found")]
    NotFound(PassengerId),

    /// A matcher callback addressed a vehicle outside the fleet.
    #[error("vehicle {0} not found")]
    UnknownVehicle(VehicleId),
}

/// Shorthand result type used across the crate.
pub type SimResult<T> = Result<T, SimError>;
