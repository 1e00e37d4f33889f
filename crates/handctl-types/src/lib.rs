//! Shared types for the hand controller.
//!
//! Everything the pipeline, the aggregator and the CLI exchange: which
//! [`Hand`] and [`HandJoint`] a pose belongs to, the per-frame
//! [`HandControllerState`] with its [`InputModes`] and the
//! [`ControllerInput`] bit catalogue behind `buttons`, plus the
//! [`ControllerError`] raised when configuring the pipeline.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use handctl_perception::transform::{Pose, Quaternion, Vec2, Vec3};

// ────────────────────────────────────────────────────────────────────────────
// Hands and joints
// ────────────────────────────────────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const ALL: [Hand; 2] = [Hand::Left, Hand::Right];

    /// Array slot for per-hand storage (`0` left, `1` right).
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Hand {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            other => Err(ControllerError::SettingsFormat(format!(
                "'{other}' is not a hand (expected left or right)"
            ))),
        }
    }
}

/// The joints the gesture pipeline reads each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HandJoint {
    Palm,
    ThumbMetacarpal,
    ThumbDistal,
    ThumbTip,
    IndexProximal,
    IndexMiddle,
    MiddleProximal,
    MiddleMiddle,
    RingProximal,
    RingMiddle,
}

impl HandJoint {
    pub const COUNT: usize = 10;

    pub const ALL: [HandJoint; Self::COUNT] = [
        Self::Palm,
        Self::ThumbMetacarpal,
        Self::ThumbDistal,
        Self::ThumbTip,
        Self::IndexProximal,
        Self::IndexMiddle,
        Self::MiddleProximal,
        Self::MiddleMiddle,
        Self::RingProximal,
        Self::RingMiddle,
    ];

    /// Array slot (`0..COUNT`).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Palm => "palm",
            Self::ThumbMetacarpal => "thumb_metacarpal",
            Self::ThumbDistal => "thumb_distal",
            Self::ThumbTip => "thumb_tip",
            Self::IndexProximal => "index_proximal",
            Self::IndexMiddle => "index_middle",
            Self::MiddleProximal => "middle_proximal",
            Self::MiddleMiddle => "middle_middle",
            Self::RingProximal => "ring_proximal",
            Self::RingMiddle => "ring_middle",
        }
    }
}

/// Pose of one joint as reported by the sensor.  `pose` is meaningless when
/// `tracked` is false.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct JointPose {
    pub tracked: bool,
    pub pose: Pose,
}

impl JointPose {
    pub fn tracked(pose: Pose) -> Self {
        Self { tracked: true, pose }
    }

    pub fn untracked() -> Self {
        Self::default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller state
// ────────────────────────────────────────────────────────────────────────────

/// Interaction modes derived from palm facing for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct InputModes {
    /// Palm faces front or back: gestures drive the controller.
    pub input: bool,
    /// Palm faces back: lateral movement drives the 2-D input.
    pub input_2d: bool,
    /// Palm faces back and the panel toggle is on: the hand is a UI surface.
    pub button_panel: bool,
}

/// Synthetic controller state for one hand, rewritten every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HandControllerState {
    pub tracked: bool,
    /// Filtered palm orientation.
    pub orientation: Quaternion,
    /// Filtered palm position in meters.
    pub position: Vec3,
    /// Each component in `[-1, 1]`.
    pub input_2d_position: Vec2,
    /// `[0, 1]`
    pub trigger: f32,
    /// `[0, 1]`
    pub grip: f32,
    /// Bitmask of [`ControllerInput::flag`] values.
    pub buttons: u64,
    pub modes: InputModes,
}

impl HandControllerState {
    /// State reported while the hand is lost: only externally held buttons
    /// survive.
    pub fn untracked(external_buttons: u64) -> Self {
        Self {
            tracked: false,
            orientation: Quaternion::identity(),
            position: Vec3::zero(),
            input_2d_position: Vec2::zero(),
            trigger: 0.0,
            grip: 0.0,
            buttons: external_buttons,
            modes: InputModes::default(),
        }
    }

    pub fn is_set(&self, input: ControllerInput) -> bool {
        self.buttons & input.flag() != 0
    }
}

impl Default for HandControllerState {
    fn default() -> Self {
        Self::untracked(0)
    }
}

/// Input surface of a generic VR controller.  The discriminant is the bit
/// position in [`HandControllerState::buttons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[repr(u8)]
pub enum ControllerInput {
    SystemClick = 0,
    ApplicationMenuClick = 1,
    GripClick = 2,
    GripValue = 3,
    GripTouch = 4,
    DpadLeft = 5,
    DpadUp = 6,
    DpadRight = 7,
    DpadDown = 8,
    AClick = 9,
    ATouch = 10,
    BClick = 11,
    BTouch = 12,
    XClick = 13,
    XTouch = 14,
    YClick = 15,
    YTouch = 16,
    TriggerLeftValue = 17,
    TriggerRightValue = 18,
    ShoulderLeft = 19,
    ShoulderRight = 20,
    JoystickLeftClick = 21,
    JoystickLeftX = 22,
    JoystickLeftY = 23,
    JoystickRightClick = 24,
    JoystickRightX = 25,
    JoystickRightY = 26,
    JoystickClick = 27,
    JoystickX = 28,
    JoystickY = 29,
    JoystickTouch = 30,
    BackClick = 31,
    GuideClick = 32,
    StartClick = 33,
    TriggerClick = 34,
    TriggerValue = 35,
    TriggerTouch = 36,
    TrackpadX = 37,
    TrackpadY = 38,
    TrackpadClick = 39,
    TrackpadTouch = 40,
}

impl ControllerInput {
    /// Single-bit mask for this input.
    pub const fn flag(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Union of the masks of `inputs`.
    pub const fn mask(inputs: &[ControllerInput]) -> u64 {
        let mut mask = 0;
        let mut i = 0;
        while i < inputs.len() {
            mask |= inputs[i].flag();
            i += 1;
        }
        mask
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Errors raised while configuring the hand controller.  The per-frame path
/// never fails.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControllerError {
    #[error("Invalid configuration for {parameter}: {details}")]
    InvalidConfig { parameter: String, details: String },

    #[error("Unknown external button id {0}")]
    UnknownButton(u8),

    #[error("Settings format error: {0}")]
    SettingsFormat(String),
}
