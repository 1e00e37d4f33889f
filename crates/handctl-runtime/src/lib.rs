//! `handctl-runtime` – turns tracked hands into a synthetic VR controller.
//!
//! The embedding application drives the pipeline from its own frame loop and
//! hands a reader to whatever streams controller state to the host.
//!
//! # Modules
//!
//! - [`hand_tracking`] – [`HandTracking`][hand_tracking::HandTracking]: the
//!   per-frame gesture pipeline.  Classifies palm facing, filters the palm
//!   pose, maps finger curls to trigger and grip and palm displacement to
//!   2-D input.
//! - [`context`] – [`HandTrackingContext`][context::HandTrackingContext]:
//!   filter bank and transient state of one hand for one session.
//! - [`settings`] – [`TrackingSettings`][settings::TrackingSettings]:
//!   calibration, validation and `name=value` overrides.
//! - [`button_map`] – [`ExternalButtons`][button_map::ExternalButtons]:
//!   application-driven buttons and their per-hand flag tables.
//! - [`aggregator`] – [`ControllerStateAggregator`][aggregator::ControllerStateAggregator]
//!   and [`StateReader`][aggregator::StateReader]: atomic publication of both
//!   hands, exposed through [`TrackingStateProducer`][aggregator::TrackingStateProducer].
//! - [`head_pose_history`] – [`HeadPoseHistory`][head_pose_history::HeadPoseHistory]:
//!   head pose per recent frame index for latency-compensated reporting.
//! - [`source`] – [`JointPoseSource`][source::JointPoseSource] and the
//!   snapshot / recording types.
//! - [`sim`] – synthetic hands for tests and demos.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: log
//!   subscriber with optional OTLP export.

pub mod aggregator;
pub mod button_map;
pub mod context;
pub mod hand_tracking;
pub mod head_pose_history;
pub mod settings;
pub mod sim;
pub mod source;
pub mod telemetry;

pub use aggregator::{ControllerSnapshot, ControllerStateAggregator, StateReader, TrackingStateProducer};
pub use button_map::{ExternalButton, ExternalButtons};
pub use hand_tracking::HandTracking;
pub use settings::{ThumbTouchSource, TrackingSettings};
pub use source::{HandFrame, HandsSnapshot, JointPoseSource, RecordedFrame};
pub use telemetry::{TracerProviderGuard, init_tracing};
