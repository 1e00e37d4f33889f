//! [`HeadPoseHistory`] – the head pose that was current for each recent frame
//! index, so a late "frame rendered" notification can report the pose the
//! frame was actually rendered with.

use handctl_types::Pose;

/// Frames retained before a slot is reused.
pub const HISTORY_CAPACITY: usize = 64;

/// Fixed ring of head poses keyed by `frame_index % HISTORY_CAPACITY`.
#[derive(Debug, Clone)]
pub struct HeadPoseHistory {
    entries: [Option<(u64, Pose)>; HISTORY_CAPACITY],
}

impl Default for HeadPoseHistory {
    fn default() -> Self {
        Self {
            entries: [None; HISTORY_CAPACITY],
        }
    }
}

impl HeadPoseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, frame_index: u64, head: Pose) {
        self.entries[slot(frame_index)] = Some((frame_index, head));
    }

    /// `true` when the slot for `frame_index` still holds that frame.
    pub fn has(&self, frame_index: u64) -> bool {
        matches!(self.entries[slot(frame_index)], Some((stored, _)) if stored == frame_index)
    }

    /// Pose in the slot for `frame_index`.  Slots are shared between indices
    /// `HISTORY_CAPACITY` apart; check [`has`][Self::has] first.
    pub fn get(&self, frame_index: u64) -> Pose {
        self.entries[slot(frame_index)]
            .map(|(_, pose)| pose)
            .unwrap_or_else(Pose::identity)
    }

    /// [`has`][Self::has] and [`get`][Self::get] in one call.
    pub fn lookup(&self, frame_index: u64) -> Option<Pose> {
        self.has(frame_index).then(|| self.get(frame_index))
    }
}

fn slot(frame_index: u64) -> usize {
    (frame_index % HISTORY_CAPACITY as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use handctl_types::Vec3;

    fn pose_at(x: f32) -> Pose {
        Pose::new(Vec3::new(x, 0.0, 0.0), Default::default())
    }

    #[test]
    fn empty_history_has_nothing() {
        let history = HeadPoseHistory::new();
        // Slot 0 must not pass for frame 0 just because it is zero-initialised.
        assert!(!history.has(0));
        assert_eq!(history.lookup(5), None);
    }

    #[test]
    fn stored_frame_is_found() {
        let mut history = HeadPoseHistory::new();
        history.add(10, pose_at(1.0));
        assert!(history.has(10));
        assert_eq!(history.get(10), pose_at(1.0));
        assert_eq!(history.lookup(10), Some(pose_at(1.0)));
    }

    #[test]
    fn indices_a_capacity_apart_alias() {
        let mut history = HeadPoseHistory::new();
        history.add(3, pose_at(1.0));
        history.add(3 + HISTORY_CAPACITY as u64, pose_at(2.0));

        assert!(!history.has(3));
        assert!(history.has(67));
        // `get` without `has` silently returns the newer pose.
        assert_eq!(history.get(3), pose_at(2.0));
        assert_eq!(history.lookup(3), None);
    }

    #[test]
    fn keeps_a_full_window() {
        let mut history = HeadPoseHistory::new();
        for i in 100..100 + HISTORY_CAPACITY as u64 {
            history.add(i, pose_at(i as f32));
        }
        assert!((100..100 + HISTORY_CAPACITY as u64).all(|i| history.has(i)));
        assert!(!history.has(99));
    }
}
