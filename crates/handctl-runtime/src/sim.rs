//! Synthetic hands for tests and demos without a sensor.
//!
//! [`SimHand`] builds a [`HandFrame`] from a palm pose and a handful of
//! gesture parameters.  Finger joints are placed so that the measurements the
//! pipeline takes recover those parameters exactly: the angle between index
//! proximal and index middle equals the trigger curl, and so on.
//!
//! # Example
//!
//! ```rust
//! use handctl_runtime::sim::{SimHand, palm_facing_front};
//! use handctl_types::{HandJoint, Pose, Vec3};
//!
//! let head = Pose::new(Vec3::new(0.0, 1.6, 0.0), Default::default());
//! let frame = SimHand::new(palm_facing_front(head, Vec3::new(-0.2, 1.4, 0.3)))
//!     .trigger_curl(50.0)
//!     .build();
//!
//! let proximal = frame.get(HandJoint::IndexProximal).pose.rotation;
//! let middle = frame.get(HandJoint::IndexMiddle).pose.rotation;
//! assert!((proximal.angle_to(middle) - 50.0).abs() < 0.01);
//! ```

use handctl_types::{Hand, HandJoint, Pose, Quaternion, Vec3};

use crate::hand_tracking::FACING_BACK_EULER;
use crate::source::{HandFrame, HandsSnapshot, RecordedFrame};

/// Head-relative palm orientation that the default settings classify as
/// facing front.
pub const FACING_FRONT_EULER: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 180.0 };

/// Palm at `position` facing front relative to `head`.
pub fn palm_facing_front(head: Pose, position: Vec3) -> Pose {
    Pose::new(position, head.rotation.mul(Quaternion::from_euler_degrees(FACING_FRONT_EULER)))
}

/// Palm at `position` facing back relative to `head`.
pub fn palm_facing_back(head: Pose, position: Vec3) -> Pose {
    Pose::new(position, head.rotation.mul(Quaternion::from_euler_degrees(FACING_BACK_EULER)))
}

// ────────────────────────────────────────────────────────────────────────────
// SimHand
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a fully tracked synthetic hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimHand {
    palm: Pose,
    trigger_curl: f32,
    grip_curl: f32,
    ring_curl: f32,
    thumb_bend: f32,
    pinch: f32,
}

impl SimHand {
    /// Open hand: fingers straight, thumb straight and 6 cm from the index.
    pub fn new(palm: Pose) -> Self {
        Self {
            palm,
            trigger_curl: 0.0,
            grip_curl: 0.0,
            ring_curl: 0.0,
            thumb_bend: 0.0,
            pinch: 0.06,
        }
    }

    /// Index curl in degrees.
    pub fn trigger_curl(mut self, degrees: f32) -> Self {
        self.trigger_curl = degrees;
        self
    }

    /// Middle curl in degrees.  The ring finger follows.
    pub fn grip_curl(mut self, degrees: f32) -> Self {
        self.grip_curl = degrees;
        self.ring_curl = degrees;
        self
    }

    /// Thumb metacarpal → tip bend in degrees.
    pub fn thumb_bend(mut self, degrees: f32) -> Self {
        self.thumb_bend = degrees;
        self
    }

    /// Distance from thumb tip to index proximal in meters.
    pub fn pinch(mut self, meters: f32) -> Self {
        self.pinch = meters;
        self
    }

    pub fn build(&self) -> HandFrame {
        let palm = self.palm;
        let local = |offset: Vec3| palm.position + palm.rotation.rotate(offset);
        let bent = |degrees: f32| {
            palm.rotation
                .mul(Quaternion::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), degrees))
        };

        let index_proximal = local(Vec3::new(0.02, 0.0, 0.08));
        let thumb_tip = index_proximal + palm.rotation.rotate(Vec3::new(self.pinch, 0.0, 0.0));

        HandFrame::new()
            .with(HandJoint::Palm, palm)
            .with(HandJoint::ThumbMetacarpal, Pose::new(local(Vec3::new(0.04, 0.0, 0.02)), palm.rotation))
            .with(HandJoint::ThumbDistal, Pose::new(thumb_tip, bent(self.thumb_bend * 0.5)))
            .with(HandJoint::ThumbTip, Pose::new(thumb_tip, bent(self.thumb_bend)))
            .with(HandJoint::IndexProximal, Pose::new(index_proximal, palm.rotation))
            .with(HandJoint::IndexMiddle, Pose::new(local(Vec3::new(0.02, 0.0, 0.12)), bent(self.trigger_curl)))
            .with(HandJoint::MiddleProximal, Pose::new(local(Vec3::new(0.0, 0.0, 0.085)), palm.rotation))
            .with(HandJoint::MiddleMiddle, Pose::new(local(Vec3::new(0.0, 0.0, 0.13)), bent(self.grip_curl)))
            .with(HandJoint::RingProximal, Pose::new(local(Vec3::new(-0.02, 0.0, 0.08)), palm.rotation))
            .with(HandJoint::RingMiddle, Pose::new(local(Vec3::new(-0.02, 0.0, 0.12)), bent(self.ring_curl)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted session
// ────────────────────────────────────────────────────────────────────────────

/// Frames per phase of [`scripted_session`].
pub const PHASE_FRAMES: u64 = 90;

/// A short session exercising every mode, one frame every `delta_ms`:
///
/// 1. right palm facing front while the index curls from 0° to 90°,
/// 2. right palm facing back, sliding 6 cm to the right,
/// 3. right hand lost.
///
/// The left hand is never tracked.
pub fn scripted_session(delta_ms: f32) -> Vec<RecordedFrame> {
    let head = Pose::new(Vec3::new(0.0, 1.6, 0.0), Quaternion::identity());
    let home = Vec3::new(0.15, 1.4, 0.35);

    (0..PHASE_FRAMES * 3)
        .map(|frame_index| {
            let phase = frame_index / PHASE_FRAMES;
            let t = (frame_index % PHASE_FRAMES) as f32 / (PHASE_FRAMES - 1) as f32;

            let mut hands = HandsSnapshot::default();
            match phase {
                0 => {
                    let palm = palm_facing_front(head, home);
                    *hands.hand_mut(Hand::Right) = SimHand::new(palm).trigger_curl(90.0 * t).build();
                }
                1 => {
                    let palm = palm_facing_back(head, home + Vec3::new(0.06 * t, 0.0, 0.0));
                    *hands.hand_mut(Hand::Right) = SimHand::new(palm).build();
                }
                _ => {}
            }

            RecordedFrame {
                frame_index,
                delta_ms,
                head,
                hands,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> Pose {
        Pose::new(
            Vec3::new(0.0, 1.6, 0.0),
            Quaternion::from_euler_degrees(Vec3::new(0.0, 35.0, 0.0)),
        )
    }

    #[test]
    fn built_hand_is_fully_tracked() {
        let frame = SimHand::new(palm_facing_front(head(), Vec3::zero())).build();
        assert!(frame.is_tracked());
    }

    #[test]
    fn curls_are_recoverable() {
        let frame = SimHand::new(palm_facing_back(head(), Vec3::zero()))
            .trigger_curl(42.0)
            .grip_curl(65.0)
            .thumb_bend(33.0)
            .build();
        let angle = |a: HandJoint, b: HandJoint| frame.get(a).pose.rotation.angle_to(frame.get(b).pose.rotation);
        assert!((angle(HandJoint::IndexProximal, HandJoint::IndexMiddle) - 42.0).abs() < 0.01);
        assert!((angle(HandJoint::MiddleProximal, HandJoint::MiddleMiddle) - 65.0).abs() < 0.01);
        assert!((angle(HandJoint::ThumbMetacarpal, HandJoint::ThumbTip) - 33.0).abs() < 0.01);
    }

    #[test]
    fn pinch_sets_thumb_index_distance() {
        let frame = SimHand::new(palm_facing_front(head(), Vec3::new(0.1, 1.3, 0.2)))
            .pinch(0.015)
            .build();
        let tip = frame.get(HandJoint::ThumbTip).pose.position;
        let index = frame.get(HandJoint::IndexProximal).pose.position;
        assert!((tip.distance(index) - 0.015).abs() < 1e-5);
    }

    #[test]
    fn palm_helpers_are_head_relative() {
        let head = head();
        let palm = palm_facing_back(head, Vec3::zero());
        let relative = head.rotation.inverse().mul(palm.rotation);
        let reference = Quaternion::from_euler_degrees(FACING_BACK_EULER);
        assert!(relative.angle_to(reference) < 0.01);
    }

    #[test]
    fn scripted_session_covers_three_phases() {
        let frames = scripted_session(16.0);
        assert_eq!(frames.len() as u64, PHASE_FRAMES * 3);
        assert!(frames[0].hands.right.is_tracked());
        assert!(!frames[0].hands.left.is_tracked());
        assert!(frames[PHASE_FRAMES as usize].hands.right.is_tracked());
        assert!(!frames[(PHASE_FRAMES * 2) as usize].hands.right.is_tracked());
    }
}
