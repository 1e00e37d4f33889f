//! JSON-lines session recordings and replay through the pipeline.
//!
//! One [`RecordedFrame`] per line; blank lines are skipped.

use std::fs;
use std::path::Path;
use std::time::Duration;

use handctl_runtime::aggregator::ControllerSnapshot;
use handctl_runtime::{HandTracking, RecordedFrame};
use handctl_types::{Hand, HandControllerState};
use tracing::{debug, info};

/// Parse a JSON-lines recording.  Errors carry the 1-based line number.
pub fn parse(text: &str) -> Result<Vec<RecordedFrame>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| format!("Line {}: {}", i + 1, e))
        })
        .collect()
}

pub fn load(path: &Path) -> Result<Vec<RecordedFrame>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read recording at {}: {}", path.display(), e))?;
    parse(&raw)
}

pub fn to_json_lines(frames: &[RecordedFrame]) -> Result<String, String> {
    let mut out = String::new();
    for frame in frames {
        let line = serde_json::to_string(frame)
            .map_err(|e| format!("Failed to serialize frame {}: {}", frame.frame_index, e))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

pub fn save(path: &Path, frames: &[RecordedFrame]) -> Result<(), String> {
    let raw = to_json_lines(frames)?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write recording at {}: {}", path.display(), e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Replay
// ─────────────────────────────────────────────────────────────────────────────

/// Per-hand counters gathered during a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandSummary {
    pub tracked: usize,
    pub input: usize,
    pub input_2d: usize,
    pub button_panel: usize,
    pub peak_trigger: f32,
    pub peak_grip: f32,
}

impl HandSummary {
    fn record(&mut self, state: &HandControllerState) {
        if !state.tracked {
            return;
        }
        self.tracked += 1;
        self.input += usize::from(state.modes.input);
        self.input_2d += usize::from(state.modes.input_2d);
        self.button_panel += usize::from(state.modes.button_panel);
        self.peak_trigger = self.peak_trigger.max(state.trigger);
        self.peak_grip = self.peak_grip.max(state.grip);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub frames: usize,
    pub hands: [HandSummary; 2],
    pub last: Option<ControllerSnapshot>,
}

impl ReplaySummary {
    pub fn hand(&self, hand: Hand) -> &HandSummary {
        &self.hands[hand.index()]
    }
}

/// Feed `frames` through `tracking` in a fresh session.
///
/// Each frame's `delta_ms` drives the frame-rate estimate; negative or
/// non-finite deltas count as zero.
pub fn run(tracking: &mut HandTracking, frames: &[RecordedFrame]) -> ReplaySummary {
    tracking.disable();
    tracking.enable();
    let mut summary = ReplaySummary::default();

    for frame in frames {
        let delta = Duration::try_from_secs_f32(frame.delta_ms / 1000.0).unwrap_or_default();
        let snapshot = tracking.update(frame.frame_index, delta, frame.head, &frame.hands);
        for hand in Hand::ALL {
            summary.hands[hand.index()].record(snapshot.hand(hand));
        }
        summary.frames += 1;
        summary.last = Some(snapshot);
    }

    if let Some(last) = &summary.last {
        debug!(frame_index = last.frame_index, "replay reached last frame");
    }
    info!(frames = summary.frames, "replay finished");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use handctl_runtime::TrackingSettings;
    use handctl_runtime::sim::{PHASE_FRAMES, scripted_session};

    #[test]
    fn parse_skips_blank_lines() {
        let frames = scripted_session(16.0);
        let text = to_json_lines(&frames[..3]).expect("serialize");
        let spaced = text.replace('\n', "\n\n");

        let parsed = parse(&spaced).expect("parse");
        assert_eq!(parsed, frames[..3].to_vec());
    }

    #[test]
    fn parse_reports_line_number() {
        let frames = scripted_session(16.0);
        let mut text = to_json_lines(&frames[..1]).expect("serialize");
        text.push_str("{not json}\n");

        let err = parse(&text).unwrap_err();
        assert!(err.starts_with("Line 2:"), "unexpected error: {err}");
    }

    #[test]
    fn save_and_load_recording() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("session.jsonl");
        let frames = scripted_session(11.0);

        save(&path, &frames).expect("save");
        let loaded = load(&path).expect("load");
        assert_eq!(loaded.len(), frames.len());
        assert_eq!(loaded[0].delta_ms, 11.0);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load(&dir.path().join("absent.jsonl")).unwrap_err();
        assert!(err.contains("Failed to read recording"));
    }

    #[test]
    fn scripted_session_replays_every_mode() {
        let mut tracking = HandTracking::new(TrackingSettings::default()).expect("valid settings");
        let summary = run(&mut tracking, &scripted_session(16.0));

        assert_eq!(summary.frames as u64, PHASE_FRAMES * 3);
        assert_eq!(summary.hand(Hand::Left).tracked, 0);

        let right = summary.hand(Hand::Right);
        assert_eq!(right.tracked as u64, PHASE_FRAMES * 2);
        assert!(right.input > 0);
        assert!(right.input_2d > 0);
        assert!(right.peak_trigger > 0.9);
        assert_eq!(right.button_panel, 0);

        let last = summary.last.expect("last snapshot");
        assert!(!last.right.tracked);
    }

    #[test]
    fn replay_starts_a_fresh_session() {
        let mut tracking = HandTracking::new(TrackingSettings::default()).expect("valid settings");
        assert!(!tracking.is_enabled());
        run(&mut tracking, &[]);
        assert!(tracking.is_enabled());
    }
}
