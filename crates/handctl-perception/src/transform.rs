//! Rigid-body geometry for tracked hand joints.
//!
//! Provides the small vector / quaternion toolkit the hand pipeline needs:
//! component-wise vectors, Hamilton-product quaternions, Euler angles in the
//! sensor's convention, and the angular distance between two orientations.
//!
//! # Euler convention
//!
//! Euler angles are expressed in **degrees** and follow the left-handed,
//! Y-up convention used by the hand-tracking sensor: a rotation
//! `(x, y, z)` applies `z` around the forward axis first, then `x` around the
//! right axis, then `y` around the up axis (`q = q_y * q_x * q_z`).
//! [`Quaternion::to_euler_degrees`] returns each component in `[0, 360)`.
//!
//! # Example
//!
//! ```rust
//! use handctl_perception::transform::{Quaternion, Vec3};
//!
//! let yaw = Quaternion::from_euler_degrees(Vec3::new(0.0, 90.0, 0.0));
//! let r = yaw.rotate(Vec3::new(0.0, 0.0, 1.0));
//! assert!((r.x - 1.0).abs() < 1e-5);
//!
//! let angle = Quaternion::identity().angle_to(yaw);
//! assert!((angle - 90.0).abs() < 1e-3);
//! ```

use std::ops::{Add, Mul, Neg, Sub};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vectors
// ────────────────────────────────────────────────────────────────────────────

/// A 2-D vector, used for joystick / trackpad style input.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A 3-D vector (metres for positions, degrees for Euler angles).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// A vector with every component set to `v`.
    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// World up (+Y).
    pub fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// World forward (+Z).
    pub fn forward() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Apply `f` to every component.
    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_deg` degrees around a unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle_deg: f32) -> Self {
        let half = angle_deg.to_radians() * 0.5;
        let s = half.sin();
        Self::new(half.cos(), axis.x * s, axis.y * s, axis.z * s)
    }

    /// Build a rotation from Euler angles in degrees (`q_y * q_x * q_z`).
    pub fn from_euler_degrees(angles: Vec3) -> Self {
        let qx = Self::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), angles.x);
        let qy = Self::from_axis_angle(Vec3::up(), angles.y);
        let qz = Self::from_axis_angle(Vec3::forward(), angles.z);
        qy.mul(qx).mul(qz)
    }

    /// Decompose into Euler angles in degrees, each in `[0, 360)`.
    pub fn to_euler_degrees(self) -> Vec3 {
        let Self { w, x, y, z } = self.normalized();

        let r00 = 1.0 - 2.0 * (y * y + z * z);
        let r02 = 2.0 * (x * z + w * y);
        let r10 = 2.0 * (x * y + w * z);
        let r11 = 1.0 - 2.0 * (x * x + z * z);
        let r12 = 2.0 * (y * z - w * x);
        let r20 = 2.0 * (x * z - w * y);
        let r22 = 1.0 - 2.0 * (x * x + y * y);

        let sin_x = (-r12).clamp(-1.0, 1.0);
        let (ex, ey, ez) = if sin_x.abs() > 0.99999 {
            // Gimbal lock: roll folds into yaw.
            (sin_x.asin(), (-r20).atan2(r00), 0.0)
        } else {
            (sin_x.asin(), r02.atan2(r22), r10.atan2(r11))
        };

        Vec3::new(ex, ey, ez).map(|a| wrap_degrees(a.to_degrees()))
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Inverse rotation.  Falls back to the identity for a zero quaternion.
    pub fn inverse(self) -> Self {
        let norm_sq = self.dot(self);
        if norm_sq <= f32::EPSILON {
            return Self::identity();
        }
        let c = self.conjugate();
        Self::new(c.w / norm_sq, c.x / norm_sq, c.y / norm_sq, c.z / norm_sq)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Scale to unit length.  A zero quaternion becomes the identity.
    pub fn normalized(self) -> Self {
        let n = self.dot(self).sqrt();
        if n <= f32::EPSILON {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // Express v as a pure quaternion.
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Angle in degrees between two orientations, in `[0, 180]`.
    pub fn angle_to(self, other: Self) -> f32 {
        let dot = self.normalized().dot(other.normalized()).abs().min(1.0);
        if dot > 1.0 - 1e-6 {
            0.0
        } else {
            (dot.acos() * 2.0).to_degrees()
        }
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Signed shortest difference `to - from` in degrees, in `[-180, 180)`.
pub fn delta_angle(from: f32, to: f32) -> f32 {
    (to - from + 540.0).rem_euclid(360.0) - 180.0
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Position and orientation of a tracked body (head or joint).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    /// The pose at the origin with no rotation.
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Mirror from the sensor's left-handed frame into the right-handed frame
    /// used by the streaming host (Z axis flipped).
    pub fn to_streaming_space(self) -> Self {
        let p = self.position;
        let q = self.rotation;
        Self::new(
            Vec3::new(p.x, p.y, -p.z),
            Quaternion::new(q.w, -q.x, -q.y, q.z),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
