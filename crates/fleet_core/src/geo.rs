//! Geographic primitives: degree-plane coordinates, bounds, pixel projection.
//!
//! Positions are `(x = longitude, y = latitude)` in degrees. Distances are
//! Euclidean over the degree plane; the maps this simulation runs on bound a
//! small region, so the planar approximation holds. Coordinate equality is
//! exact float equality — the motion code snaps positions to node snapshots,
//! so bitwise matches occur by construction.

use serde::{Deserialize, Serialize};

/// A point on the map: `x` = longitude, `y` = latitude, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other` on the degree plane.
    pub fn distance(&self, other: Coordinate) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Render-only colour carried by each passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn random<R: rand::Rng>(rng: &mut R) -> Self {
        Self {
            r: rng.gen(),
            g: rng.gen(),
            b: rng.gen(),
        }
    }
}

/// Rectangular map bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Per-tick step length derived from the map extent: `|Δlat| / 1000`.
    pub fn default_step(&self) -> f64 {
        (self.max_lat - self.min_lat).abs() / 1000.0
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.x >= self.min_lon && c.x <= self.max_lon && c.y >= self.min_lat && c.y <= self.max_lat
    }
}

/// Project a map coordinate into a `width` × `height` pixel frame.
///
/// `py` grows downward (screen convention), so latitude is flipped.
pub fn to_pixel(c: Coordinate, bounds: Bounds, width: u32, height: u32) -> (f64, f64) {
    let px = (c.x - bounds.min_lon) / (bounds.max_lon - bounds.min_lon) * f64::from(width);
    let py = (bounds.max_lat - c.y) / (bounds.max_lat - bounds.min_lat) * f64::from(height);
    (px, py)
}
