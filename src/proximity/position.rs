//! Polar-to-cartesian placement of the entity on the radar.
//!
//! The on-screen angle is the entity's base angle plus the device's heading
//! change, so the entity keeps its apparent bearing as the device rotates.
//! Positions are always derived from `(base angle, heading change, distance)`
//! and never stored on their own.

use rand::Rng;
use serde::Serialize;
use std::f64::consts::TAU;

/// 2D radar position, origin at the radar centre
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Distance from the radar centre
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Resolve a position from a base angle (radians), a heading change
/// (degrees) and a distance
pub fn resolve_position(base_angle: f64, heading_change_degrees: f64, distance: f64) -> Position {
    let angle = base_angle + heading_change_degrees.to_radians();
    Position {
        x: angle.cos() * distance,
        y: angle.sin() * distance,
    }
}

/// Position resolver that remembers its latest inputs
///
/// Each setter recomputes the position and returns it only if it changed,
/// so callers publish one position per effective change.
#[derive(Debug, Clone, Default)]
pub struct PositionResolver {
    base_angle: f64,
    heading_change: f64,
    distance: f64,
    last: Option<Position>,
}

impl PositionResolver {
    pub fn new(base_angle: f64, distance: f64) -> Self {
        Self {
            base_angle,
            heading_change: 0.0,
            distance,
            last: None,
        }
    }

    pub fn set_base_angle(&mut self, base_angle: f64) -> Option<Position> {
        self.base_angle = base_angle;
        self.recompute()
    }

    pub fn set_heading_change(&mut self, heading_change_degrees: f64) -> Option<Position> {
        self.heading_change = heading_change_degrees;
        self.recompute()
    }

    pub fn set_distance(&mut self, distance: f64) -> Option<Position> {
        self.distance = distance;
        self.recompute()
    }

    /// Position for the current inputs
    pub fn position(&self) -> Position {
        resolve_position(self.base_angle, self.heading_change, self.distance)
    }

    /// Effective on-screen angle in radians (unwrapped)
    pub fn angle(&self) -> f64 {
        self.base_angle + self.heading_change.to_radians()
    }

    fn recompute(&mut self) -> Option<Position> {
        let position = self.position();
        if self.last == Some(position) {
            return None;
        }
        self.last = Some(position);
        Some(position)
    }
}

/// The simulated entity: an approach angle and a radar distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Perturbation {
    /// Approach angle in radians, in [0, 2π)
    pub base_angle: f64,
    /// Radar distance from the centre
    pub distance: f64,
}

impl Perturbation {
    /// Create an entity at the given angle, or a uniformly random one
    pub fn new<R: Rng + ?Sized>(angle: Option<f64>, distance: f64, rng: &mut R) -> Self {
        Self {
            base_angle: angle.unwrap_or_else(|| random_angle(rng)),
            distance,
        }
    }

    /// Derived position for a given heading change (degrees)
    pub fn position(&self, heading_change_degrees: f64) -> Position {
        resolve_position(self.base_angle, heading_change_degrees, self.distance)
    }
}

/// Uniform angle in [0, 2π)
pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..TAU)
}

#[cfg(test)]
#[path = "position_test.rs"]
mod tests;
