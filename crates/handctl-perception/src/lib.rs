//! `handctl-perception` – geometry and signal conditioning for tracked hands.
//!
//! Everything here is engine-agnostic math: the hand pipeline in
//! `handctl-runtime` composes these pieces once per frame.
//!
//! # Modules
//!
//! - [`transform`] – [`Vec3`][transform::Vec3], [`Quaternion`][transform::Quaternion]
//!   and [`Pose`][transform::Pose] with the sensor's Euler convention and
//!   the angular distance between orientations.
//! - [`kalman`] – [`LocalLevelModelKalmanFilter`][kalman::LocalLevelModelKalmanFilter]
//!   for scalars and [`QuaternionKalmanFilter`][kalman::QuaternionKalmanFilter]
//!   for orientations.
//! - [`smoothing`] – [`MovingAverage`][smoothing::MovingAverage],
//!   [`IntervalTimeRecorder`][smoothing::IntervalTimeRecorder] and the
//!   frame-rate independent [`DataSampleFilter`][smoothing::DataSampleFilter].
//! - [`safe_angle`] – [`SafeAngle`][safe_angle::SafeAngle]: per-axis
//!   acceptance box over Euler angles, used to classify palm facing.

pub mod kalman;
pub mod safe_angle;
pub mod smoothing;
pub mod transform;
