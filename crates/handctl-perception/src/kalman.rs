//! Local-level Kalman smoothing for scalars and orientations.
//!
//! The local-level model treats the tracked quantity as a slowly drifting
//! level observed through noise:
//!
//! ```text
//! p     ← p + σw
//! gain  = p / (p + σv)
//! value ← value + gain · (observed − value)
//! p     ← p · (1 − gain)
//! ```
//!
//! `σw` is the process noise and `σv` the observation noise.  Only their
//! ratio shapes the steady-state response: a larger `σv / σw` yields heavier
//! smoothing (slower response, less jitter).
//!
//! [`QuaternionKalmanFilter`] runs three scalar filters over the Euler
//! components of an orientation, shifted by `zero_to` degrees so that a
//! signal oscillating around 0°/360° stays numerically continuous.
//!
//! # Example
//!
//! ```rust
//! use handctl_perception::kalman::LocalLevelModelKalmanFilter;
//!
//! let mut filter = LocalLevelModelKalmanFilter::new(1.0, 4.0);
//! let first = filter.next(10.0);
//! assert!(first > 0.0 && first < 10.0);
//! ```

use crate::transform::{Quaternion, Vec3, wrap_degrees};

/// Default offset applied to Euler angles before filtering (degrees).
pub const DEFAULT_ZERO_TO: f32 = 180.0;

// ────────────────────────────────────────────────────────────────────────────
// LocalLevelModelKalmanFilter
// ────────────────────────────────────────────────────────────────────────────

/// One-dimensional Kalman filter for a slowly varying signal.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalLevelModelKalmanFilter {
    sigma_w: f32,
    sigma_v: f32,
    p: f32,
    value: f32,
}

impl LocalLevelModelKalmanFilter {
    /// Create a filter starting at `0` with zero variance.
    ///
    /// - `sigma_w` – process noise.
    /// - `sigma_v` – observation noise.
    pub fn new(sigma_w: f32, sigma_v: f32) -> Self {
        Self::with_initial(sigma_w, sigma_v, 0.0, 0.0)
    }

    /// Create a filter with an explicit initial estimate `value0` and
    /// variance `p0`.
    pub fn with_initial(sigma_w: f32, sigma_v: f32, value0: f32, p0: f32) -> Self {
        Self {
            sigma_w,
            sigma_v,
            p: p0,
            value: value0,
        }
    }

    /// Current estimate.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Current variance estimate.
    pub fn variance(&self) -> f32 {
        self.p
    }

    /// Fold in a new observation and return the updated estimate.
    pub fn next(&mut self, observed: f32) -> f32 {
        self.p += self.sigma_w;

        let denominator = self.p + self.sigma_v;
        // σw = σv = 0 with p = 0: nothing to blend, keep the level.
        let gain = if denominator > 0.0 { self.p / denominator } else { 0.0 };
        self.value += gain * (observed - self.value);
        self.p *= 1.0 - gain;

        self.value
    }

    /// Replace the estimate with `value` and clear the variance.
    pub fn reset_to(&mut self, value: f32) {
        self.value = value;
        self.p = 0.0;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// QuaternionKalmanFilter
// ────────────────────────────────────────────────────────────────────────────

/// Smooths an orientation by filtering each Euler component independently.
#[derive(Debug, Clone, PartialEq)]
pub struct QuaternionKalmanFilter {
    x: LocalLevelModelKalmanFilter,
    y: LocalLevelModelKalmanFilter,
    z: LocalLevelModelKalmanFilter,
    zero_to: f32,
}

impl QuaternionKalmanFilter {
    /// Create a filter using [`DEFAULT_ZERO_TO`] as the wraparound offset.
    pub fn new(sigma_w: f32, sigma_v: f32) -> Self {
        Self::with_zero_to(sigma_w, sigma_v, DEFAULT_ZERO_TO)
    }

    /// Create a filter that shifts every Euler component by `zero_to`
    /// degrees before filtering.
    ///
    /// With the default of 180°, an orientation wobbling around 0° is seen by
    /// the scalar filters as values around 180° (−10° → 170°, +10° → 190°).
    pub fn with_zero_to(sigma_w: f32, sigma_v: f32, zero_to: f32) -> Self {
        Self {
            x: LocalLevelModelKalmanFilter::new(sigma_w, sigma_v),
            y: LocalLevelModelKalmanFilter::new(sigma_w, sigma_v),
            z: LocalLevelModelKalmanFilter::new(sigma_w, sigma_v),
            zero_to,
        }
    }

    /// Fold in a new observed orientation and return the filtered one.
    pub fn next(&mut self, observed: Quaternion) -> Quaternion {
        let shifted = self.shift(observed);
        let x = self.x.next(shifted.x);
        let y = self.y.next(shifted.y);
        let z = self.z.next(shifted.z);
        self.unshift(Vec3::new(x, y, z))
    }

    /// Current filtered orientation.
    pub fn value(&self) -> Quaternion {
        self.unshift(Vec3::new(self.x.value(), self.y.value(), self.z.value()))
    }

    /// Replace the estimate with `orientation` and clear the variances.
    pub fn reset_to(&mut self, orientation: Quaternion) {
        let shifted = self.shift(orientation);
        self.x.reset_to(shifted.x);
        self.y.reset_to(shifted.y);
        self.z.reset_to(shifted.z);
    }

    fn shift(&self, orientation: Quaternion) -> Vec3 {
        orientation
            .to_euler_degrees()
            .map(|a| wrap_degrees(a + self.zero_to))
    }

    fn unshift(&self, filtered: Vec3) -> Quaternion {
        Quaternion::from_euler_degrees(filtered.map(|a| wrap_degrees(a - self.zero_to)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_moves_between_previous_and_observation() {
        let mut filter = LocalLevelModelKalmanFilter::new(0.5, 2.0);
        let observations = [3.0, -1.0, 10.0, 10.0, 4.5, -7.0, 0.0];
        let mut previous = filter.value();
        for observed in observations {
            let next = filter.next(observed);
            let (lo, hi) = if previous <= observed {
                (previous, observed)
            } else {
                (observed, previous)
            };
            assert!(next >= lo - 1e-6 && next <= hi + 1e-6, "{next} outside [{lo}, {hi}]");
            previous = next;
        }
    }

    #[test]
    fn first_update_uses_process_over_total_noise() {
        let mut filter = LocalLevelModelKalmanFilter::new(1.0, 3.0);
        // p = 1, gain = 1 / 4
        let v = filter.next(8.0);
        assert!((v - 2.0).abs() < 1e-6);
        // p = 1 * (1 - 0.25)
        assert!((filter.variance() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn converges_to_constant_signal() {
        let mut filter = LocalLevelModelKalmanFilter::new(1.0, 5.0);
        for _ in 0..80 {
            filter.next(2.5);
        }
        assert!((filter.value() - 2.5).abs() < 1e-4);
    }

    #[test]
    fn larger_observation_noise_smooths_more() {
        let mut light = LocalLevelModelKalmanFilter::new(1.0, 1.0);
        let mut heavy = LocalLevelModelKalmanFilter::new(1.0, 20.0);
        for _ in 0..5 {
            light.next(1.0);
            heavy.next(1.0);
        }
        assert!(heavy.value() < light.value());
    }

    #[test]
    fn zero_noise_holds_the_level() {
        let mut filter = LocalLevelModelKalmanFilter::with_initial(0.0, 0.0, 4.0, 0.0);
        assert_eq!(filter.next(100.0), 4.0);
    }

    #[test]
    fn reset_to_seeds_value() {
        let mut filter = LocalLevelModelKalmanFilter::new(1.0, 5.0);
        filter.next(3.0);
        filter.reset_to(42.0);
        assert_eq!(filter.value(), 42.0);
        assert_eq!(filter.variance(), 0.0);
    }

    #[test]
    fn quaternion_filter_is_continuous_across_zero() {
        let mut filter = QuaternionKalmanFilter::new(1.0, 4.0);
        filter.reset_to(Quaternion::identity());
        // Roll alternates between -10° and +10°; a naive filter would average
        // 350° and 10° to 180°.
        for i in 0..40 {
            let roll = if i % 2 == 0 { 350.0 } else { 10.0 };
            filter.next(Quaternion::from_euler_degrees(Vec3::new(0.0, 0.0, roll)));
        }
        let angle = filter.value().angle_to(Quaternion::identity());
        assert!(angle < 10.0, "filtered orientation drifted {angle}°");
    }

    #[test]
    fn quaternion_filter_converges_to_observation() {
        let target = Quaternion::from_euler_degrees(Vec3::new(20.0, 60.0, 5.0));
        let mut filter = QuaternionKalmanFilter::new(1.0, 2.0);
        filter.reset_to(Quaternion::from_euler_degrees(Vec3::new(10.0, 50.0, 0.0)));
        for _ in 0..60 {
            filter.next(target);
        }
        assert!(filter.value().angle_to(target) < 0.1);
    }

    #[test]
    fn quaternion_reset_round_trips() {
        let q = Quaternion::from_euler_degrees(Vec3::new(30.0, 200.0, 15.0));
        let mut filter = QuaternionKalmanFilter::new(1.0, 2.0);
        filter.reset_to(q);
        assert!(filter.value().angle_to(q) < 0.05);
    }
}
