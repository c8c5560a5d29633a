// Heading tracker: converts absolute compass bearings into a change relative
// to a latched reference heading.

use crate::{debug, trace, warn};

/// Tracks heading change from a reference bearing
///
/// The first bearing observed latches the reference. The change is a plain
/// difference in degrees with no wraparound: turning across north (359° to
/// 1°) produces a jump of -358°. The angle fed to the position resolver is
/// periodic, so the jump only matters to consumers of the raw change value.
#[derive(Debug, Clone, Default)]
pub struct HeadingTracker {
    /// Bearing the change is measured from (None until the first event)
    reference_heading: Option<f64>,
    /// Most recent bearing observed
    current_heading: Option<f64>,
    /// Most recent heading change in degrees
    last_change: f64,
}

impl HeadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a bearing event and return the new heading change (degrees)
    ///
    /// Non-finite bearings are ignored and the previous change is returned.
    pub fn on_bearing(&mut self, bearing_degrees: f64) -> f64 {
        if !bearing_degrees.is_finite() {
            warn!("[heading] Ignoring non-finite bearing {}", bearing_degrees);
            return self.last_change;
        }

        let reference = *self.reference_heading.get_or_insert_with(|| {
            debug!("[heading] Reference latched at {:.1}°", bearing_degrees);
            bearing_degrees
        });

        self.current_heading = Some(bearing_degrees);
        self.last_change = bearing_degrees - reference;
        trace!(
            "[heading] bearing={:.1}° reference={:.1}° change={:.1}°",
            bearing_degrees,
            reference,
            self.last_change
        );
        self.last_change
    }

    /// Re-anchor the reference to an explicit bearing (degrees)
    pub fn reset_reference(&mut self, to: f64) {
        debug!("[heading] Reference reset to {:.1}°", to);
        self.reference_heading = Some(to);
        self.last_change = self.current_heading.map(|c| c - to).unwrap_or(0.0);
    }

    /// Re-anchor the reference to the current bearing, so the change
    /// restarts at zero
    ///
    /// Before any bearing has been seen the reference is cleared instead and
    /// the next event latches it.
    ///
    /// Used on relocation in place of `reset_reference(new_angle)`: the new
    /// base angle already carries the rotation, so the change restarts from
    /// the bearing the user is facing now.
    pub fn relatch(&mut self) {
        match self.current_heading {
            Some(current) => self.reset_reference(current),
            None => {
                self.reference_heading = None;
                self.last_change = 0.0;
            }
        }
    }

    /// Current heading change in degrees (0 until a reference is latched)
    pub fn heading_change(&self) -> f64 {
        self.last_change
    }

    pub fn reference_heading(&self) -> Option<f64> {
        self.reference_heading
    }

    pub fn current_heading(&self) -> Option<f64> {
        self.current_heading
    }
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;
