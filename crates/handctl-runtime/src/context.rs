//! [`HandTrackingContext`] – the filter bank and transient state of one hand.
//!
//! A context lives for one tracking session.  It is rebuilt from the current
//! [`TrackingSettings`] whenever the session is (re)enabled or the settings
//! change, which also drops every filter estimate and the 2-D origin.

use handctl_perception::kalman::{LocalLevelModelKalmanFilter, QuaternionKalmanFilter};
use handctl_perception::safe_angle::SafeAngle;
use handctl_perception::smoothing::{DataSampleFilter, IntervalTimeRecorder, MovingAverage};
use handctl_types::{Hand, InputModes, Pose, Vec3};
use tracing::debug;

use crate::settings::{ThumbTouchSource, TrackingSettings};

/// Raw per-frame measurements taken from the joints, before filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandObservation {
    pub palm: Pose,
    /// Angle between the head-relative palm and the facing-back reference.
    pub facing_back_angle: f32,
    /// Index proximal → middle.
    pub trigger_curl: f32,
    /// Middle proximal → middle.
    pub grip_curl: f32,
    /// Bend angle or thumb–index distance, per [`ThumbTouchSource`].
    pub thumb: f32,
}

/// Per-axis Kalman filter for a position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFilter {
    x: LocalLevelModelKalmanFilter,
    y: LocalLevelModelKalmanFilter,
    z: LocalLevelModelKalmanFilter,
}

impl PositionFilter {
    pub fn new(sigma_w: f32, sigma_v: f32) -> Self {
        Self {
            x: LocalLevelModelKalmanFilter::new(sigma_w, sigma_v),
            y: LocalLevelModelKalmanFilter::new(sigma_w, sigma_v),
            z: LocalLevelModelKalmanFilter::new(sigma_w, sigma_v),
        }
    }

    pub fn next(&mut self, observed: Vec3) -> Vec3 {
        Vec3::new(self.x.next(observed.x), self.y.next(observed.y), self.z.next(observed.z))
    }

    pub fn value(&self) -> Vec3 {
        Vec3::new(self.x.value(), self.y.value(), self.z.value())
    }

    pub fn reset_to(&mut self, position: Vec3) {
        self.x.reset_to(position.x);
        self.y.reset_to(position.y);
        self.z.reset_to(position.z);
    }
}

/// Everything the pipeline remembers about one hand between frames.
#[derive(Debug, Clone)]
pub struct HandTrackingContext {
    pub hand: Hand,
    pub facing_front: SafeAngle,
    pub palm_rotation: QuaternionKalmanFilter,
    pub palm_position: PositionFilter,
    pub facing_back_angle: LocalLevelModelKalmanFilter,
    pub trigger_curl: LocalLevelModelKalmanFilter,
    pub grip_curl: LocalLevelModelKalmanFilter,
    pub thumb: LocalLevelModelKalmanFilter,
    pub interval: IntervalTimeRecorder,
    /// Head-relative palm yaw, throttled to a fixed rate per real-time window.
    pub twist: MovingAverage,
    /// Filtered palm position captured when 2-D input became active.
    pub origin_2d: Option<Vec3>,
    pub previous_modes: InputModes,
    pub was_tracked: bool,
    primed: bool,
}

impl HandTrackingContext {
    pub fn new(settings: &TrackingSettings, hand: Hand) -> Self {
        let angle = || LocalLevelModelKalmanFilter::new(settings.sigma_w_angle, settings.sigma_v_angle);
        let thumb = match settings.thumb_touch_source {
            ThumbTouchSource::Angle => angle(),
            ThumbTouchSource::Distance => {
                LocalLevelModelKalmanFilter::new(settings.sigma_w_position, settings.sigma_v_position)
            }
        };

        let interval = IntervalTimeRecorder::new(settings.interval_samples);
        let sampler = DataSampleFilter::new(
            interval.handle(),
            settings.twist_average_window_ms,
            settings.average_window_samples,
        );

        Self {
            hand,
            facing_front: settings.facing_front(hand == Hand::Left),
            palm_rotation: QuaternionKalmanFilter::new(settings.sigma_w_angle, settings.sigma_v_angle),
            palm_position: PositionFilter::new(settings.sigma_w_position, settings.sigma_v_position),
            facing_back_angle: angle(),
            trigger_curl: angle(),
            grip_curl: angle(),
            thumb,
            interval,
            twist: MovingAverage::with_sampler(settings.average_window_samples, sampler),
            origin_2d: None,
            previous_modes: InputModes::default(),
            was_tracked: false,
            primed: false,
        }
    }

    /// Rebuild from `settings`, dropping all filter state.
    pub fn reset(&mut self, settings: &TrackingSettings) {
        *self = Self::new(settings, self.hand);
    }

    /// `true` once the filters have been seeded by a tracked frame.
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Seed every filter with `observation` so the first outputs start at the
    /// measured values.  No-op once primed.
    pub fn prime(&mut self, observation: &HandObservation) {
        if self.primed {
            return;
        }
        self.palm_rotation.reset_to(observation.palm.rotation);
        self.palm_position.reset_to(observation.palm.position);
        self.facing_back_angle.reset_to(observation.facing_back_angle);
        self.trigger_curl.reset_to(observation.trigger_curl);
        self.grip_curl.reset_to(observation.grip_curl);
        self.thumb.reset_to(observation.thumb);
        self.primed = true;
        debug!(hand = %self.hand, "filters primed");
    }

    /// Forget the 2-D origin so the next activation re-seeds it.
    pub fn clear_origin(&mut self) {
        if self.origin_2d.take().is_some() {
            debug!(hand = %self.hand, "2-D input origin cleared");
        }
    }
}
