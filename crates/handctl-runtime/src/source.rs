//! Joint pose input.
//!
//! The pipeline only ever reads joints through [`JointPoseSource`], so a live
//! sensor binding, a recorded session and the simulator in [`crate::sim`] are
//! interchangeable.

use std::collections::BTreeMap;

use handctl_types::{Hand, HandJoint, JointPose, Pose};
use serde::{Deserialize, Serialize};

/// Per-frame access to tracked hand joints.
pub trait JointPoseSource {
    /// Pose of `joint` on `hand` for the current frame.
    fn joint_pose(&self, hand: Hand, joint: HandJoint) -> JointPose;
}

impl<F> JointPoseSource for F
where
    F: Fn(Hand, HandJoint) -> JointPose,
{
    fn joint_pose(&self, hand: Hand, joint: HandJoint) -> JointPose {
        self(hand, joint)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshots
// ────────────────────────────────────────────────────────────────────────────

/// Tracked joints of one hand.  Joints absent from the map are untracked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandFrame {
    joints: BTreeMap<HandJoint, Pose>,
}

impl HandFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, joint: HandJoint, pose: Pose) {
        self.joints.insert(joint, pose);
    }

    pub fn with(mut self, joint: HandJoint, pose: Pose) -> Self {
        self.set(joint, pose);
        self
    }

    pub fn get(&self, joint: HandJoint) -> JointPose {
        self.joints
            .get(&joint)
            .map(|pose| JointPose::tracked(*pose))
            .unwrap_or_default()
    }

    /// `true` when every joint the pipeline reads is present.
    pub fn is_tracked(&self) -> bool {
        HandJoint::ALL.iter().all(|j| self.joints.contains_key(j))
    }
}

/// Both hands for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandsSnapshot {
    #[serde(default)]
    pub left: HandFrame,
    #[serde(default)]
    pub right: HandFrame,
}

impl HandsSnapshot {
    pub fn hand(&self, hand: Hand) -> &HandFrame {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn hand_mut(&mut self, hand: Hand) -> &mut HandFrame {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }
}

impl JointPoseSource for HandsSnapshot {
    fn joint_pose(&self, hand: Hand, joint: HandJoint) -> JointPose {
        self.hand(hand).get(joint)
    }
}

/// One line of a recorded session (JSON lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub frame_index: u64,
    /// Time since the previous frame in milliseconds.
    pub delta_ms: f32,
    pub head: Pose,
    #[serde(default)]
    pub hands: HandsSnapshot,
}
