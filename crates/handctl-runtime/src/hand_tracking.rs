//! [`HandTracking`] – the per-frame gesture pipeline.
//!
//! Once per rendered frame the embedding loop calls [`HandTracking::update`]
//! with the head pose and a [`JointPoseSource`].  For each hand the pipeline:
//!
//! 1. reports an untracked state (external buttons only) when any joint is
//!    missing, leaving the filter estimates untouched;
//! 2. classifies the head-relative palm as facing front (inside the
//!    [`SafeAngle`][handctl_perception::safe_angle::SafeAngle] box) or
//!    facing back (filtered angle to a reference orientation), gated by the
//!    head–palm height difference and a wrist-twist guard;
//! 3. filters and exports the palm pose on every tracked frame;
//! 4. outside button-panel mode, maps the filtered index and middle curls to
//!    trigger and grip and the thumb to a touch bit;
//! 5. while the palm faces back, maps palm displacement from a re-seeded
//!    origin to the 2-D input;
//! 6. ORs in the externally held buttons and publishes both hands atomically.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use handctl_runtime::hand_tracking::HandTracking;
//! use handctl_runtime::settings::TrackingSettings;
//! use handctl_runtime::sim::{SimHand, palm_facing_front};
//! use handctl_runtime::source::HandsSnapshot;
//! use handctl_types::{Pose, Vec3};
//!
//! let mut tracking = HandTracking::new(TrackingSettings::default()).unwrap();
//! tracking.enable();
//!
//! let head = Pose::new(Vec3::new(0.0, 1.6, 0.0), Default::default());
//! let mut hands = HandsSnapshot::default();
//! hands.left = SimHand::new(palm_facing_front(head, Vec3::new(-0.2, 1.4, 0.3)))
//!     .trigger_curl(90.0)
//!     .build();
//!
//! let snapshot = tracking.update(0, Duration::from_millis(16), head, &hands);
//! assert!(snapshot.left.modes.input);
//! assert_eq!(snapshot.left.trigger, 1.0);
//! assert!(!snapshot.right.tracked);
//! ```

use std::time::Duration;

use handctl_perception::transform::delta_angle;
use handctl_types::{
    ControllerError, ControllerInput, Hand, HandControllerState, HandJoint, InputModes, JointPose,
    Pose, Quaternion, Vec2, Vec3,
};
use tracing::{Span, debug, info, info_span};
use uuid::Uuid;

use crate::aggregator::{ControllerSnapshot, ControllerStateAggregator, StateReader};
use crate::button_map::{ExternalButton, ExternalButtons};
use crate::context::{HandObservation, HandTrackingContext};
use crate::settings::{ThumbTouchSource, TrackingSettings};
use crate::source::JointPoseSource;

/// Analog values within this distance of 0 or 1 count as released or fully
/// pressed.
pub const ANALOG_EPSILON: f32 = 1e-4;

/// Head-relative palm orientation (Euler degrees) that counts as facing back.
pub const FACING_BACK_EULER: Vec3 = Vec3 { x: 0.0, y: 180.0, z: 0.0 };

const THUMB_TOUCH: u64 = ControllerInput::mask(&[ControllerInput::JoystickTouch, ControllerInput::TrackpadTouch]);

// ────────────────────────────────────────────────────────────────────────────
// Mapping helpers
// ────────────────────────────────────────────────────────────────────────────

/// Dead zone, then linear, then clamp.  `|value| <= min` maps to 0,
/// `|value| >= max` to ±1; the sign of `value` is kept.
pub fn to_ratio(value: f32, min: f32, max: f32) -> f32 {
    let ratio = ((value.abs() - min) / (max - min)).clamp(0.0, 1.0);
    if value < 0.0 { -ratio } else { ratio }
}

/// Linear remap of a curl angle from `threshold` (0) to `max` (1), clamped.
pub fn curl_ratio(angle: f32, threshold: f32, max: f32) -> f32 {
    ((angle - threshold) / (max - threshold)).clamp(0.0, 1.0)
}

/// Touch bit once the value leaves 0, click bit once it reaches 1.
fn analog_bits(value: f32, touch: ControllerInput, click: ControllerInput) -> u64 {
    let mut bits = 0;
    if value > ANALOG_EPSILON {
        bits |= touch.flag();
    }
    if value >= 1.0 - ANALOG_EPSILON {
        bits |= click.flag();
    }
    bits
}

// ────────────────────────────────────────────────────────────────────────────
// HandTracking
// ────────────────────────────────────────────────────────────────────────────

/// Hand-tracking session: owns both hand contexts, the external button state
/// and the aggregator the streaming side reads from.
#[derive(Debug)]
pub struct HandTracking {
    settings: TrackingSettings,
    facing_back_reference: Quaternion,
    contexts: [HandTrackingContext; 2],
    external: ExternalButtons,
    panel_toggle: bool,
    enabled: bool,
    session: Span,
    aggregator: ControllerStateAggregator,
}

impl HandTracking {
    /// Validate `settings` and build a disabled pipeline.  Call
    /// [`enable`][Self::enable] to start a session.
    pub fn new(settings: TrackingSettings) -> Result<Self, ControllerError> {
        settings.validate()?;
        Ok(Self {
            facing_back_reference: Quaternion::from_euler_degrees(FACING_BACK_EULER),
            contexts: [
                HandTrackingContext::new(&settings, Hand::Left),
                HandTrackingContext::new(&settings, Hand::Right),
            ],
            settings,
            external: ExternalButtons::new(),
            panel_toggle: false,
            enabled: false,
            session: Span::none(),
            aggregator: ControllerStateAggregator::new(),
        })
    }

    pub fn settings(&self) -> &TrackingSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start a session with fresh filters.  No-op when already enabled.
    pub fn enable(&mut self) {
        if self.enabled {
            return;
        }
        let session_id = Uuid::new_v4();
        self.session = info_span!("hand_tracking_session", %session_id);
        self.reset_contexts();
        self.enabled = true;
        self.session.in_scope(|| info!("hand tracking enabled"));
    }

    /// End the session.  Both hands are published as untracked.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.session.in_scope(|| info!("hand tracking disabled"));
        self.enabled = false;
        self.reset_contexts();
        self.aggregator.publish_hands(
            HandControllerState::untracked(self.external.mask(Hand::Left)),
            HandControllerState::untracked(self.external.mask(Hand::Right)),
        );
        self.session = Span::none();
    }

    /// Swap in new settings.  Invalid settings are rejected and the current
    /// ones kept; valid settings restart the filters.
    pub fn apply_settings(&mut self, settings: TrackingSettings) -> Result<(), ControllerError> {
        settings.validate()?;
        self.settings = settings;
        self.reset_contexts();
        self.session.in_scope(|| info!("tracking settings applied"));
        Ok(())
    }

    // ── External UI ─────────────────────────────────────────────────────────

    pub fn press_button(&mut self, hand: Hand, id: u8) -> Result<ExternalButton, ControllerError> {
        let button = self.external.press(hand, id)?;
        debug!(%hand, %button, "external button pressed");
        Ok(button)
    }

    pub fn release_button(&mut self, hand: Hand, id: u8) -> Result<ExternalButton, ControllerError> {
        let button = self.external.release(hand, id)?;
        debug!(%hand, %button, "external button released");
        Ok(button)
    }

    /// Release every external button on both hands.
    pub fn release_all(&mut self) {
        self.external.release_all();
        debug!("all external buttons released");
    }

    pub fn external_buttons(&self) -> &ExternalButtons {
        &self.external
    }

    /// Global toggle for button-panel mode.  The mode is only active on a
    /// hand whose palm faces back.
    pub fn set_button_panel_enabled(&mut self, enabled: bool) {
        if self.panel_toggle != enabled {
            debug!(enabled, "button panel toggled");
        }
        self.panel_toggle = enabled;
    }

    pub fn button_panel_enabled(&self) -> bool {
        self.panel_toggle
    }

    // ── Output ──────────────────────────────────────────────────────────────

    pub fn aggregator(&self) -> &ControllerStateAggregator {
        &self.aggregator
    }

    pub fn reader(&self) -> StateReader {
        self.aggregator.reader()
    }

    pub fn context(&self, hand: Hand) -> &HandTrackingContext {
        &self.contexts[hand.index()]
    }

    // ── Frame ───────────────────────────────────────────────────────────────

    /// Run one frame and publish the result.
    ///
    /// `delta` is the time since the previous frame; it feeds the frame-rate
    /// estimate that throttles the twist average.  While disabled, both hands
    /// are reported untracked and no filter is touched.
    pub fn update(
        &mut self,
        frame_index: u64,
        delta: Duration,
        head: Pose,
        source: &impl JointPoseSource,
    ) -> ControllerSnapshot {
        let _entered = self.session.enter();

        let [left, right] = Hand::ALL.map(|hand| {
            let external = self.external.mask(hand);
            if !self.enabled {
                return HandControllerState::untracked(external);
            }
            let ctx = &mut self.contexts[hand.index()];
            ctx.interval.record(delta);
            let frame = FrameInput {
                head,
                external,
                panel_toggle: self.panel_toggle,
                facing_back_reference: self.facing_back_reference,
            };
            track_hand(ctx, &self.settings, &frame, source)
        });

        self.aggregator.publish(frame_index, head, left, right);
        self.aggregator.snapshot()
    }

    fn reset_contexts(&mut self) {
        for ctx in &mut self.contexts {
            ctx.reset(&self.settings);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-hand pipeline
// ────────────────────────────────────────────────────────────────────────────

struct FrameInput {
    head: Pose,
    external: u64,
    panel_toggle: bool,
    facing_back_reference: Quaternion,
}

fn observe(
    joints: &[JointPose; HandJoint::COUNT],
    settings: &TrackingSettings,
    frame: &FrameInput,
) -> (HandObservation, Quaternion) {
    let pose = |joint: HandJoint| joints[joint.index()].pose;
    let curl = |from: HandJoint, to: HandJoint| pose(from).rotation.angle_to(pose(to).rotation);

    let palm = pose(HandJoint::Palm);
    let relative = frame.head.rotation.inverse().mul(palm.rotation).normalized();

    let thumb = match settings.thumb_touch_source {
        ThumbTouchSource::Angle => curl(HandJoint::ThumbMetacarpal, HandJoint::ThumbTip),
        ThumbTouchSource::Distance => pose(HandJoint::ThumbTip)
            .position
            .distance(pose(HandJoint::IndexProximal).position),
    };

    let observation = HandObservation {
        palm,
        facing_back_angle: relative.angle_to(frame.facing_back_reference),
        trigger_curl: curl(HandJoint::IndexProximal, HandJoint::IndexMiddle),
        grip_curl: curl(HandJoint::MiddleProximal, HandJoint::MiddleMiddle),
        thumb,
    };
    (observation, relative)
}

fn track_hand(
    ctx: &mut HandTrackingContext,
    settings: &TrackingSettings,
    frame: &FrameInput,
    source: &impl JointPoseSource,
) -> HandControllerState {
    let hand = ctx.hand;
    let joints = HandJoint::ALL.map(|joint| source.joint_pose(hand, joint));

    if !joints.iter().all(|j| j.tracked) {
        if ctx.was_tracked {
            debug!(%hand, "hand tracking lost");
        }
        ctx.was_tracked = false;
        ctx.previous_modes = InputModes::default();
        ctx.clear_origin();
        return HandControllerState::untracked(frame.external);
    }
    if !ctx.was_tracked {
        debug!(%hand, "hand tracking acquired");
        ctx.was_tracked = true;
    }

    let (observation, relative) = observe(&joints, settings, frame);
    ctx.prime(&observation);
    let palm = observation.palm;

    // Palm pose is filtered on every tracked frame.
    let orientation = ctx.palm_rotation.next(palm.rotation);
    let position = ctx.palm_position.next(palm.position);
    let head_forward = frame.head.rotation.rotate(Vec3::forward());
    let exported = position
        + Vec3::up() * settings.hand_upward_movement
        + head_forward * settings.hand_forward_movement;

    // Facing classification.
    let relative_euler = relative.to_euler_degrees();
    let facing_back_angle = ctx.facing_back_angle.next(observation.facing_back_angle);
    let near_head = (frame.head.position.y - palm.position.y).abs() <= settings.threshold_y_distance_enable_tracking;
    let facing_front = near_head && ctx.facing_front.contains(relative_euler);
    let facing_back = near_head && facing_back_angle < settings.threshold_angle_palm_facing_back;

    // Twist guard: yaw samples are unwrapped around the running average.
    let yaw = relative_euler.y + 180.0;
    let twisting = if ctx.twist.is_empty() {
        ctx.twist.next(yaw);
        false
    } else {
        let average = ctx.twist.average();
        let deviation = delta_angle(average, yaw);
        ctx.twist.next(average + deviation);
        deviation.abs() > settings.threshold_angle_twist
    };

    let input = (facing_front || facing_back) && !twisting;
    let modes = InputModes {
        input,
        input_2d: input && facing_back,
        button_panel: input && facing_back && frame.panel_toggle,
    };
    if modes != ctx.previous_modes {
        debug!(
            %hand,
            input = modes.input,
            input_2d = modes.input_2d,
            button_panel = modes.button_panel,
            twisting,
            "input modes changed"
        );
        ctx.previous_modes = modes;
    }

    let mut state = HandControllerState {
        tracked: true,
        orientation,
        position: exported,
        input_2d_position: Vec2::zero(),
        trigger: 0.0,
        grip: 0.0,
        buttons: frame.external,
        modes,
    };

    if !modes.input {
        ctx.clear_origin();
        return state;
    }

    if !modes.button_panel {
        let trigger_curl = ctx.trigger_curl.next(observation.trigger_curl);
        let grip_curl = ctx.grip_curl.next(observation.grip_curl);
        state.trigger = curl_ratio(trigger_curl, settings.threshold_angle_trigger, settings.max_angle_trigger);
        state.grip = curl_ratio(grip_curl, settings.threshold_angle_grip, settings.max_angle_grip);
        state.buttons |= analog_bits(state.trigger, ControllerInput::TriggerTouch, ControllerInput::TriggerClick);
        state.buttons |= analog_bits(state.grip, ControllerInput::GripTouch, ControllerInput::GripClick);

        let thumb = ctx.thumb.next(observation.thumb);
        let thumb_touch = match settings.thumb_touch_source {
            ThumbTouchSource::Angle => thumb > settings.threshold_angle_bend_thumb,
            ThumbTouchSource::Distance => thumb < settings.threshold_distance_thumb_index,
        };
        if thumb_touch {
            state.buttons |= THUMB_TOUCH;
        }
    }

    if modes.input_2d {
        match ctx.origin_2d {
            None => {
                ctx.origin_2d = Some(position);
                debug!(%hand, "2-D input origin seeded");
            }
            Some(origin) => {
                let local = frame.head.rotation.inverse().rotate(position - origin);
                let (min, max) = (settings.min_distance_2d_input, settings.max_distance_2d_input);
                state.input_2d_position = Vec2::new(to_ratio(local.x, min, max), to_ratio(local.y, min, max));
            }
        }
    } else {
        ctx.clear_origin();
    }

    state
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
