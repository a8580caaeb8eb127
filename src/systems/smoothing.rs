use log::debug;

use crate::{geometry_utils::lerp, tracking::HeadPoint};

/// Depth readings at or below this (mm) are the sensor saying "no data"
const MIN_VALID_DEPTH: f32 = 1.;

/// Exponential smoothing of the head position across frames.
///
/// `retention` is how much of the previous smoothed value is kept each update:
/// 1.0 freezes the output, 0.0 passes raw values straight through.
#[derive(Debug, Default)]
pub struct HeadSmoother {
    smoothed: Option<HeadPoint>,
    has_depth: bool,
}

impl HeadSmoother {
    pub fn new() -> Self {
        HeadSmoother::default()
    }

    /// Fold a new raw head position into the smoothed state. The raw `z` is only
    /// used if it is a valid depth reading; otherwise the previous depth is kept.
    pub fn update(&mut self, raw: &HeadPoint, retention: f32) -> HeadPoint {
        let depth_is_valid = raw.z > MIN_VALID_DEPTH;

        let next = match self.smoothed {
            None => HeadPoint::new(raw.x, raw.y, if depth_is_valid { raw.z } else { 0. }),
            Some(previous) => HeadPoint {
                x: lerp(raw.x, previous.x, retention),
                y: lerp(raw.y, previous.y, retention),
                z: match (depth_is_valid, self.has_depth) {
                    (true, true) => lerp(raw.z, previous.z, retention),
                    (true, false) => raw.z,
                    (false, _) => previous.z,
                },
            },
        };

        if !depth_is_valid {
            debug!("Ignoring invalid depth {} at raw head position", raw.z);
        }
        self.has_depth |= depth_is_valid;
        self.smoothed = Some(next);
        next
    }

    /// None until the first detection
    pub fn smoothed(&self) -> Option<&HeadPoint> {
        self.smoothed.as_ref()
    }

    pub fn reset(&mut self) {
        *self = HeadSmoother::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_until_first_update() {
        let mut smoother = HeadSmoother::new();
        assert!(smoother.smoothed().is_none());
        let first = smoother.update(&HeadPoint::new(10., 20., 1500.), 0.7);
        assert_eq!(first, HeadPoint::new(10., 20., 1500.));
        assert_eq!(smoother.smoothed(), Some(&first));
    }

    #[test]
    fn test_no_smoothing_passes_through() {
        let mut smoother = HeadSmoother::new();
        smoother.update(&HeadPoint::new(0., 0., 1000.), 0.);
        let raw = HeadPoint::new(308., 156., 2000.);
        assert_eq!(smoother.update(&raw, 0.), raw);
    }

    #[test]
    fn test_retention_keeps_old_value() {
        let mut smoother = HeadSmoother::new();
        smoother.update(&HeadPoint::new(100., 100., 1000.), 0.7);
        let next = smoother.update(&HeadPoint::new(200., 0., 2000.), 0.7);
        assert!((next.x - 130.).abs() < 1e-3);
        assert!((next.y - 70.).abs() < 1e-3);
        assert!((next.z - 1300.).abs() < 1e-2);

        // Full retention freezes everything
        let frozen = smoother.update(&HeadPoint::new(999., 999., 3000.), 1.);
        assert_eq!(frozen, next);
    }

    #[test]
    fn test_invalid_depth_keeps_previous_z() {
        let mut smoother = HeadSmoother::new();
        smoother.update(&HeadPoint::new(100., 100., 1000.), 0.5);
        for z in [0., 1.] {
            let next = smoother.update(&HeadPoint::new(100., 100., z), 0.5);
            assert_eq!(next.z, 1000.);
        }
    }

    #[test]
    fn test_first_valid_depth_is_taken_directly() {
        let mut smoother = HeadSmoother::new();
        let first = smoother.update(&HeadPoint::new(100., 100., 0.), 0.5);
        assert_eq!(first.z, 0.);

        // No blending up from the placeholder zero
        let second = smoother.update(&HeadPoint::new(100., 100., 1800.), 0.5);
        assert_eq!(second.z, 1800.);

        let third = smoother.update(&HeadPoint::new(100., 100., 2000.), 0.5);
        assert_eq!(third.z, 1900.);
    }
}
