//! Immutable view records handed to the renderer.
//!
//! The visualization loop is a pure consumer: it polls these snapshots at
//! its own interval and projects coordinates to pixels via
//! [`crate::geo::to_pixel`]. Nothing here refers back into live simulation
//! state.

use serde::Serialize;

use crate::geo::{Coordinate, Rgb};
use crate::ids::{PassengerId, VehicleId};
use crate::vehicle::VehicleState;

/// One vehicle as seen by the renderer. `color` is the carried passenger's
/// colour, if any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub position: Coordinate,
    pub state: VehicleState,
    pub color: Option<Rgb>,
}

/// One waiting passenger as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassengerSnapshot {
    pub id: PassengerId,
    pub start: Coordinate,
    pub destination: Coordinate,
    pub color: Rgb,
}
