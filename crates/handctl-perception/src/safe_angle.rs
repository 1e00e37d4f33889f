//! [`SafeAngle`] – axis-aligned acceptance box over Euler angles.
//!
//! A box is given by two corners `min` and `max` in degrees.  Its center and
//! per-axis half widths are derived once (see [`SafeAngle::reset`]); a query
//! angle is re-centered on the box center, wrapped into `[-180, 180)` per
//! axis, and accepted only when every axis deviation is strictly within its
//! half width.
//!
//! Corners may extend below 0° or above 360° so that boxes straddling the
//! 0°/360° seam can be written naturally, e.g. `min.x = -30`, `max.x = 30`.
//!
//! # Example
//!
//! ```rust
//! use handctl_perception::safe_angle::SafeAngle;
//! use handctl_perception::transform::Vec3;
//!
//! let region = SafeAngle::new(Vec3::new(-30.0, 150.0, -20.0), Vec3::new(30.0, 210.0, 20.0));
//! assert!(region.contains(Vec3::new(350.0, 180.0, 10.0)));
//! assert!(!region.contains(Vec3::new(40.0, 180.0, 0.0)));
//! ```

use crate::transform::Vec3;

/// Three-axis angular acceptance region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeAngle {
    pub min: Vec3,
    pub max: Vec3,
    center: Vec3,
    threshold: Vec3,
}

impl SafeAngle {
    /// Build a region from its corners.  The derived center and half widths
    /// are ready to use.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        let mut region = Self {
            min,
            max,
            center: Vec3::zero(),
            threshold: Vec3::zero(),
        };
        region.reset();
        region
    }

    /// Recompute center and half widths.  Call after editing `min`/`max`.
    pub fn reset(&mut self) {
        self.center = (self.min + self.max) * 0.5;
        self.threshold = self.max - self.center;
    }

    /// Center of the box in degrees.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Per-axis half widths in degrees.
    pub fn threshold(&self) -> Vec3 {
        self.threshold
    }

    /// `true` when `angle` is inside the box on all three axes.
    pub fn contains(&self, angle: Vec3) -> bool {
        let d = self.deviation(angle);
        d.x.abs() < self.threshold.x && d.y.abs() < self.threshold.y && d.z.abs() < self.threshold.z
    }

    /// Signed per-axis offset of `angle` from the center, each in `[-180, 180)`.
    pub fn deviation(&self, angle: Vec3) -> Vec3 {
        // Shift so the center lands on 180° in a [0, 360) domain, then back.
        let shifted = angle - (self.center - Vec3::splat(360.0 + 180.0));
        shifted.map(|a| a.rem_euclid(360.0) - 180.0)
    }

    /// The box for the opposite hand: Y and Z reflected around 360°, X kept.
    pub fn mirror(&self) -> Self {
        Self::new(
            Vec3::new(self.min.x, 360.0 - self.max.y, 360.0 - self.max.z),
            Vec3::new(self.max.x, 360.0 - self.min.y, 360.0 - self.min.z),
        )
    }

    /// Reflect an Euler angle the same way [`mirror`][Self::mirror] reflects
    /// the box.
    pub fn mirror_angle(angle: Vec3) -> Vec3 {
        Vec3::new(angle.x, 360.0 - angle.y, 360.0 - angle.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_region() -> SafeAngle {
        SafeAngle::new(Vec3::new(-40.0, 100.0, 150.0), Vec3::new(20.0, 160.0, 250.0))
    }

    #[test]
    fn center_is_contained() {
        for region in [
            sample_region(),
            SafeAngle::new(Vec3::new(300.0, 10.0, 0.0), Vec3::new(420.0, 30.0, 1.0)),
            SafeAngle::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
        ] {
            assert!(region.contains(region.center()), "{region:?}");
        }
    }

    #[test]
    fn derived_center_and_threshold() {
        let region = sample_region();
        assert_eq!(region.center(), Vec3::new(-10.0, 130.0, 200.0));
        assert_eq!(region.threshold(), Vec3::new(30.0, 30.0, 50.0));
    }

    #[test]
    fn box_straddles_the_seam() {
        let region = sample_region();
        // x = 345° is -15°, inside [-40, 20].
        assert!(region.contains(Vec3::new(345.0, 130.0, 200.0)));
        // x = 25° is past max.
        assert!(!region.contains(Vec3::new(25.0, 130.0, 200.0)));
    }

    #[test]
    fn each_axis_must_agree() {
        let region = sample_region();
        assert!(!region.contains(Vec3::new(-10.0, 170.0, 200.0)));
        assert!(!region.contains(Vec3::new(-10.0, 130.0, 100.0)));
        assert!(region.contains(Vec3::new(-10.0, 159.0, 249.0)));
    }

    #[test]
    fn boundary_is_excluded() {
        let region = sample_region();
        assert!(!region.contains(Vec3::new(20.0, 130.0, 200.0)));
    }

    #[test]
    fn input_may_be_outside_0_360() {
        let region = sample_region();
        assert!(region.contains(Vec3::new(350.0 - 720.0, 130.0 + 360.0, 200.0)));
    }

    #[test]
    fn mirrored_region_contains_mirrored_angles() {
        let region = sample_region();
        let mirrored = region.mirror();
        let probes = [
            Vec3::new(-10.0, 130.0, 200.0),
            Vec3::new(5.0, 110.0, 160.0),
            Vec3::new(0.0, 10.0, 200.0),
            Vec3::new(300.0, 140.0, 240.0),
            Vec3::new(30.0, 130.0, 200.0),
            Vec3::new(-10.0, 130.0, 90.0),
        ];
        for angle in probes {
            assert_eq!(
                mirrored.contains(SafeAngle::mirror_angle(angle)),
                region.contains(angle),
                "{angle:?}"
            );
        }
    }

    #[test]
    fn mirror_keeps_x_and_reflects_y_z() {
        let mirrored = sample_region().mirror();
        assert_eq!(mirrored.min, Vec3::new(-40.0, 200.0, 110.0));
        assert_eq!(mirrored.max, Vec3::new(20.0, 260.0, 210.0));
    }

    #[test]
    fn reset_applies_edited_corners() {
        let mut region = sample_region();
        region.max.x = 80.0;
        region.reset();
        assert!(region.contains(Vec3::new(40.0, 130.0, 200.0)));
    }
}
