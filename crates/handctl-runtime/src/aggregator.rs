//! Latest controller state for both hands, shared with the streaming side.
//!
//! The pipeline owns the [`ControllerStateAggregator`] and publishes one
//! [`ControllerSnapshot`] per frame.  Consumers hold a [`StateReader`]; both
//! implement [`TrackingStateProducer`], the pull interface a transport calls
//! once per outgoing frame.
//!
//! Both hands, the head pose and the head pose history are replaced inside a
//! single `watch` update, so a reader never sees the left hand of one frame
//! next to the right hand of another.
//!
//! # Example
//!
//! ```rust
//! use handctl_runtime::aggregator::{ControllerStateAggregator, TrackingStateProducer};
//! use handctl_types::{Hand, HandControllerState, Pose};
//!
//! let aggregator = ControllerStateAggregator::new();
//! let reader = aggregator.reader();
//!
//! let mut right = HandControllerState::untracked(0);
//! right.trigger = 0.5;
//! aggregator.publish(1, Pose::identity(), HandControllerState::untracked(0), right);
//!
//! assert_eq!(reader.controller_state(Hand::Right).trigger, 0.5);
//! assert!(reader.head_pose(1).is_some());
//! ```

use handctl_types::{Hand, HandControllerState, Pose};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::head_pose_history::HeadPoseHistory;

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

/// Everything published for one frame.
#[derive(Debug, Clone, Default)]
pub struct ControllerSnapshot {
    pub frame_index: u64,
    pub head: Pose,
    pub left: HandControllerState,
    pub right: HandControllerState,
    pub history: HeadPoseHistory,
}

impl ControllerSnapshot {
    pub fn hand(&self, hand: Hand) -> &HandControllerState {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }
}

/// Head and palm poses for one frame, converted to the streaming host's
/// coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingFrame {
    pub frame_index: u64,
    pub head: Pose,
    pub left: HandControllerState,
    pub right: HandControllerState,
}

// ────────────────────────────────────────────────────────────────────────────
// Producer interface
// ────────────────────────────────────────────────────────────────────────────

/// Pull interface for a tracking/streaming transport.
pub trait TrackingStateProducer {
    /// Latest state of `hand`.
    fn controller_state(&self, hand: Hand) -> HandControllerState;

    /// Head pose that was current when `frame_index` was produced, or
    /// `None` once the frame has left the history window.
    fn head_pose(&self, frame_index: u64) -> Option<Pose>;

    /// Head pose for `frame_index` plus the latest hand states, in streaming
    /// space.  `None` when the frame is no longer in the history; the caller
    /// should skip latency compensation for it.
    fn tracking_frame(&self, frame_index: u64) -> Option<TrackingFrame>;
}

fn to_streaming(state: HandControllerState) -> HandControllerState {
    let pose = Pose::new(state.position, state.orientation).to_streaming_space();
    HandControllerState {
        position: pose.position,
        orientation: pose.rotation,
        ..state
    }
}

fn tracking_frame_of(snapshot: &ControllerSnapshot, frame_index: u64) -> Option<TrackingFrame> {
    let head = snapshot.history.lookup(frame_index)?;
    Some(TrackingFrame {
        frame_index,
        head: head.to_streaming_space(),
        left: to_streaming(snapshot.left),
        right: to_streaming(snapshot.right),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregator
// ────────────────────────────────────────────────────────────────────────────

/// Single-writer holder of the latest [`ControllerSnapshot`].
#[derive(Debug)]
pub struct ControllerStateAggregator {
    sender: watch::Sender<ControllerSnapshot>,
}

impl Default for ControllerStateAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerStateAggregator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ControllerSnapshot::default());
        Self { sender }
    }

    /// Replace both hands and record `head` for `frame_index` in one update.
    pub fn publish(
        &self,
        frame_index: u64,
        head: Pose,
        left: HandControllerState,
        right: HandControllerState,
    ) {
        self.sender.send_modify(|snapshot| {
            snapshot.frame_index = frame_index;
            snapshot.head = head;
            snapshot.left = left;
            snapshot.right = right;
            snapshot.history.add(frame_index, head);
        });
    }

    /// Overwrite both hands without touching the frame index or history.
    pub fn publish_hands(&self, left: HandControllerState, right: HandControllerState) {
        self.sender.send_modify(|snapshot| {
            snapshot.left = left;
            snapshot.right = right;
        });
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.sender.borrow().clone()
    }

    /// A new reader.  Readers may live on other threads.
    pub fn reader(&self) -> StateReader {
        StateReader {
            receiver: self.sender.subscribe(),
        }
    }
}

impl TrackingStateProducer for ControllerStateAggregator {
    fn controller_state(&self, hand: Hand) -> HandControllerState {
        *self.sender.borrow().hand(hand)
    }

    fn head_pose(&self, frame_index: u64) -> Option<Pose> {
        self.sender.borrow().history.lookup(frame_index)
    }

    fn tracking_frame(&self, frame_index: u64) -> Option<TrackingFrame> {
        tracking_frame_of(&self.sender.borrow(), frame_index)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reader
// ────────────────────────────────────────────────────────────────────────────

/// Read-only handle on the aggregator.
#[derive(Debug, Clone)]
pub struct StateReader {
    receiver: watch::Receiver<ControllerSnapshot>,
}

impl StateReader {
    /// Copy of the current snapshot; marks it as seen.
    pub fn snapshot(&mut self) -> ControllerSnapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait until a frame newer than the last one seen is published.
    /// Returns `false` once the aggregator is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl TrackingStateProducer for StateReader {
    fn controller_state(&self, hand: Hand) -> HandControllerState {
        *self.receiver.borrow().hand(hand)
    }

    fn head_pose(&self, frame_index: u64) -> Option<Pose> {
        self.receiver.borrow().history.lookup(frame_index)
    }

    fn tracking_frame(&self, frame_index: u64) -> Option<TrackingFrame> {
        tracking_frame_of(&self.receiver.borrow(), frame_index)
    }
}
