//! [`TrackingSettings`] – every tunable of the hand pipeline in one flat
//! struct.
//!
//! The values are empirical calibration constants.  None of them is
//! authoritative; they are expected to be tuned per sensor and per user.
//!
//! Besides `serde` (used by the CLI's TOML config) the settings speak a
//! line-based `name=value` text format for quick edits:
//!
//! ```text
//! sigma_v_angle=6
//! facing_front_min=(-40, -45, 135)
//! thumb_touch_source=distance
//! ```
//!
//! [`TrackingSettings::apply_overrides`] applies such text field by field and
//! collects a message per rejected line instead of failing.  The
//! [`Display`][std::fmt::Display] impl renders the same format.
//!
//! # Example
//!
//! ```rust
//! use handctl_runtime::settings::TrackingSettings;
//!
//! let mut settings = TrackingSettings::default();
//! let problems = settings.apply_overrides("sigma_v_angle=6\nnot_a_field=1");
//! assert_eq!(settings.sigma_v_angle, 6.0);
//! assert_eq!(problems, vec!["not_a_field is invalid name".to_string()]);
//! ```

use std::fmt;

use handctl_perception::safe_angle::SafeAngle;
use handctl_types::{ControllerError, Vec3};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Which measurement drives the thumb touch bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThumbTouchSource {
    /// Bend between thumb metacarpal and tip exceeds
    /// `threshold_angle_bend_thumb`.
    #[default]
    Angle,
    /// Thumb tip closer to the index proximal joint than
    /// `threshold_distance_thumb_index`.
    Distance,
}

/// Calibration of the gesture pipeline.  Angles in degrees, distances in
/// meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrackingSettings {
    /// Lower corner of the palm-facing-front box (left hand, head-relative
    /// Euler angles).  The right hand uses the mirrored box.
    pub facing_front_min: Vec3,
    /// Upper corner of the palm-facing-front box.
    pub facing_front_max: Vec3,
    /// Maximum filtered angle between the head-relative palm and the
    /// facing-back reference orientation.
    pub threshold_angle_palm_facing_back: f32,
    /// Palm farther than this below or above the head disables
    /// classification.
    pub threshold_y_distance_enable_tracking: f32,
    /// 2-D input dead zone.
    pub min_distance_2d_input: f32,
    /// Displacement mapped to full deflection.
    pub max_distance_2d_input: f32,
    pub thumb_touch_source: ThumbTouchSource,
    pub threshold_angle_bend_thumb: f32,
    pub threshold_distance_thumb_index: f32,
    /// Index curl at which the trigger starts to move.
    pub threshold_angle_trigger: f32,
    /// Index curl at which the trigger is fully pressed.
    pub max_angle_trigger: f32,
    pub threshold_angle_grip: f32,
    pub max_angle_grip: f32,
    /// Process noise for angle channels.
    pub sigma_w_angle: f32,
    /// Observation noise for angle channels.  Raise for smoother, slower
    /// response.
    pub sigma_v_angle: f32,
    pub sigma_w_position: f32,
    pub sigma_v_position: f32,
    /// Palm yaw departing further than this from its recent average
    /// suppresses input for the frame.
    pub threshold_angle_twist: f32,
    /// Real-time span of the yaw average.
    pub twist_average_window_ms: f32,
    /// Samples the yaw average keeps over that span.
    pub average_window_samples: usize,
    /// Frame intervals averaged to estimate the frame rate.
    pub interval_samples: usize,
    /// Exported palm position is raised by this much.
    pub hand_upward_movement: f32,
    /// Exported palm position is pushed along the head's forward axis by
    /// this much.
    pub hand_forward_movement: f32,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            facing_front_min: Vec3::new(-45.0, -45.0, 135.0),
            facing_front_max: Vec3::new(45.0, 45.0, 225.0),
            threshold_angle_palm_facing_back: 45.0,
            threshold_y_distance_enable_tracking: 0.4,
            min_distance_2d_input: 0.02,
            max_distance_2d_input: 0.08,
            thumb_touch_source: ThumbTouchSource::Angle,
            threshold_angle_bend_thumb: 30.0,
            threshold_distance_thumb_index: 0.03,
            threshold_angle_trigger: 30.0,
            max_angle_trigger: 70.0,
            threshold_angle_grip: 30.0,
            max_angle_grip: 70.0,
            sigma_w_angle: 1.0,
            sigma_v_angle: 3.0,
            sigma_w_position: 1.0,
            sigma_v_position: 5.0,
            threshold_angle_twist: 40.0,
            twist_average_window_ms: 1000.0,
            average_window_samples: 30,
            interval_samples: 60,
            hand_upward_movement: 0.0,
            hand_forward_movement: 0.0,
        }
    }
}

impl TrackingSettings {
    /// Palm-facing-front box for `left`, or its mirror for the right hand.
    pub fn facing_front(&self, left: bool) -> SafeAngle {
        let region = SafeAngle::new(self.facing_front_min, self.facing_front_max);
        if left { region } else { region.mirror() }
    }

    /// Reject settings that would divide by zero or never match.
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ControllerError> {
        for (parameter, value) in self.scalars() {
            if !value.is_finite() {
                return Err(invalid(parameter, format!("{value} is not a finite number")));
            }
        }
        for (parameter, corner) in [
            ("facing_front_min", self.facing_front_min),
            ("facing_front_max", self.facing_front_max),
        ] {
            if ![corner.x, corner.y, corner.z].iter().all(|v| v.is_finite()) {
                return Err(invalid(parameter, "every component must be finite".into()));
            }
        }

        for (parameter, lo, hi) in [
            ("max_angle_trigger", self.threshold_angle_trigger, self.max_angle_trigger),
            ("max_angle_grip", self.threshold_angle_grip, self.max_angle_grip),
            ("max_distance_2d_input", self.min_distance_2d_input, self.max_distance_2d_input),
        ] {
            if hi - lo <= 0.0 {
                return Err(invalid(parameter, format!("{hi} must exceed its threshold {lo}")));
            }
        }

        for (parameter, value) in [
            ("min_distance_2d_input", self.min_distance_2d_input),
            ("threshold_angle_bend_thumb", self.threshold_angle_bend_thumb),
            ("threshold_distance_thumb_index", self.threshold_distance_thumb_index),
        ] {
            if value < 0.0 {
                return Err(invalid(parameter, format!("{value} must not be negative")));
            }
        }

        for (parameter, value) in [
            ("sigma_w_angle", self.sigma_w_angle),
            ("sigma_v_angle", self.sigma_v_angle),
            ("sigma_w_position", self.sigma_w_position),
            ("sigma_v_position", self.sigma_v_position),
            ("threshold_angle_palm_facing_back", self.threshold_angle_palm_facing_back),
            ("threshold_y_distance_enable_tracking", self.threshold_y_distance_enable_tracking),
            ("threshold_angle_twist", self.threshold_angle_twist),
            ("twist_average_window_ms", self.twist_average_window_ms),
        ] {
            if value <= 0.0 {
                return Err(invalid(parameter, format!("{value} must be positive")));
            }
        }

        let (min, max) = (self.facing_front_min, self.facing_front_max);
        if max.x <= min.x || max.y <= min.y || max.z <= min.z {
            return Err(invalid(
                "facing_front_max",
                format!("({}, {}, {}) must exceed facing_front_min on every axis", max.x, max.y, max.z),
            ));
        }

        if self.average_window_samples == 0 {
            return Err(invalid("average_window_samples", "must be at least 1".into()));
        }
        if self.interval_samples == 0 {
            return Err(invalid("interval_samples", "must be at least 1".into()));
        }

        Ok(())
    }

    /// Apply `name=value` lines on top of the current values.
    ///
    /// Each bad line produces one message and leaves its field untouched;
    /// the remaining lines still apply.  Blank lines are ignored.  Call
    /// [`validate`][Self::validate] afterwards.
    pub fn apply_overrides(&mut self, text: &str) -> Vec<String> {
        let mut messages = Vec::new();
        let mut fields = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                messages.push("settings could not be enumerated".to_string());
                return messages;
            }
        };

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut parts = line.split('=');
            let (Some(name), Some(raw), None) = (parts.next(), parts.next(), parts.next()) else {
                messages.push(format!("'{line}' is invalid format"));
                continue;
            };
            let (name, raw) = (name.trim(), raw.trim());

            let Some(current) = fields.get(name) else {
                messages.push(format!("{name} is invalid name"));
                continue;
            };

            match parse_like(current, raw) {
                Ok(value) => {
                    let mut candidate = fields.clone();
                    candidate.insert(name.to_string(), value);
                    if serde_json::from_value::<TrackingSettings>(Value::Object(candidate.clone())).is_ok() {
                        fields = candidate;
                    } else {
                        messages.push(format!("{name} has unsupported value '{raw}'"));
                    }
                }
                Err(expected) => messages.push(format!("{name} must be {expected}")),
            }
        }

        match serde_json::from_value(Value::Object(fields)) {
            Ok(updated) => *self = updated,
            Err(e) => messages.push(format!("settings could not be rebuilt: {e}")),
        }

        for message in &messages {
            warn!(%message, "tracking settings override rejected");
        }
        messages
    }

    /// Parse a complete `name=value` document over the defaults.
    pub fn parse(text: &str) -> Result<Self, ControllerError> {
        let mut settings = Self::default();
        let messages = settings.apply_overrides(text);
        if !messages.is_empty() {
            return Err(ControllerError::SettingsFormat(messages.join("; ")));
        }
        settings.validate()?;
        Ok(settings)
    }

    fn scalars(&self) -> [(&'static str, f32); 18] {
        [
            ("threshold_angle_palm_facing_back", self.threshold_angle_palm_facing_back),
            ("threshold_y_distance_enable_tracking", self.threshold_y_distance_enable_tracking),
            ("min_distance_2d_input", self.min_distance_2d_input),
            ("max_distance_2d_input", self.max_distance_2d_input),
            ("threshold_angle_bend_thumb", self.threshold_angle_bend_thumb),
            ("threshold_distance_thumb_index", self.threshold_distance_thumb_index),
            ("threshold_angle_trigger", self.threshold_angle_trigger),
            ("max_angle_trigger", self.max_angle_trigger),
            ("threshold_angle_grip", self.threshold_angle_grip),
            ("max_angle_grip", self.max_angle_grip),
            ("sigma_w_angle", self.sigma_w_angle),
            ("sigma_v_angle", self.sigma_v_angle),
            ("sigma_w_position", self.sigma_w_position),
            ("sigma_v_position", self.sigma_v_position),
            ("threshold_angle_twist", self.threshold_angle_twist),
            ("twist_average_window_ms", self.twist_average_window_ms),
            ("hand_upward_movement", self.hand_upward_movement),
            ("hand_forward_movement", self.hand_forward_movement),
        ]
    }
}

impl fmt::Display for TrackingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(Value::Object(fields)) = serde_json::to_value(self) else {
            return Err(fmt::Error);
        };
        for (name, value) in &fields {
            writeln!(f, "{name}={}", render(value))?;
        }
        Ok(())
    }
}

fn invalid(parameter: &str, details: String) -> ControllerError {
    ControllerError::InvalidConfig {
        parameter: parameter.to_string(),
        details,
    }
}

/// Parse `raw` into a value of the same JSON shape as `current`.  On failure
/// returns a description of the expected shape.
fn parse_like(current: &Value, raw: &str) -> Result<Value, &'static str> {
    match current {
        Value::Number(n) if n.is_u64() => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| "a non-negative integer"),
        Value::Number(_) => parse_f32(raw).map(Value::from).ok_or("float"),
        Value::String(_) => Ok(Value::String(raw.to_ascii_lowercase())),
        Value::Object(map) if is_vector(map) => parse_vector(raw).ok_or("a vector like (x, y, z)"),
        _ => Err("a supported value"),
    }
}

fn parse_f32(raw: &str) -> Option<f32> {
    raw.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

fn is_vector(map: &Map<String, Value>) -> bool {
    map.len() == 3 && ["x", "y", "z"].iter().all(|k| map.contains_key(*k))
}

fn parse_vector(raw: &str) -> Option<Value> {
    let inner = raw.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(parse_f32);
    let (Some(Some(x)), Some(Some(y)), Some(Some(z)), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    serde_json::to_value(Vec3::new(x, y, z)).ok()
}

fn render(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
        // Values originate as f32; print them without f64 widening noise.
        Value::Number(n) => format!("{}", n.as_f64().unwrap_or_default() as f32),
        Value::String(s) => s.clone(),
        Value::Object(map) if is_vector(map) => {
            let axis = |k: &str| render(map.get(k).unwrap_or(&Value::Null));
            format!("({}, {}, {})", axis("x"), axis("y"), axis("z"))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(TrackingSettings::default().validate(), Ok(()));
    }

    #[test]
    fn empty_trigger_range_is_rejected() {
        let settings = TrackingSettings {
            threshold_angle_trigger: 60.0,
            max_angle_trigger: 60.0,
            ..TrackingSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            ControllerError::InvalidConfig { ref parameter, .. } if parameter == "max_angle_trigger"
        ));
    }

    #[test]
    fn inverted_2d_range_is_rejected() {
        let settings = TrackingSettings {
            min_distance_2d_input: 0.1,
            max_distance_2d_input: 0.05,
            ..TrackingSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn non_positive_sigma_is_rejected() {
        let settings = TrackingSettings {
            sigma_v_position: 0.0,
            ..TrackingSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("sigma_v_position"));
    }

    #[test]
    fn empty_facing_box_is_rejected() {
        let settings = TrackingSettings {
            facing_front_max: Vec3::new(45.0, -45.0, 225.0),
            ..TrackingSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        let settings = TrackingSettings {
            average_window_samples: 0,
            ..TrackingSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn nan_is_rejected() {
        let settings = TrackingSettings {
            hand_upward_movement: f32::NAN,
            ..TrackingSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn bad_thumb_thresholds_are_rejected() {
        let negative = TrackingSettings {
            threshold_distance_thumb_index: -0.01,
            ..TrackingSettings::default()
        };
        let err = negative.validate().unwrap_err();
        assert!(err.to_string().contains("threshold_distance_thumb_index"));

        let negative_bend = TrackingSettings {
            threshold_angle_bend_thumb: -5.0,
            ..TrackingSettings::default()
        };
        assert!(negative_bend.validate().is_err());

        let nan = TrackingSettings {
            threshold_distance_thumb_index: f32::NAN,
            ..TrackingSettings::default()
        };
        let err = nan.validate().unwrap_err();
        assert!(err.to_string().contains("threshold_distance_thumb_index"));
    }

    #[test]
    fn overrides_apply_each_kind_of_field() {
        let mut settings = TrackingSettings::default();
        let messages = settings.apply_overrides(
            "sigma_v_angle = 6.5\n\
             facing_front_min=(-30, -40.5, 120)\n\
             thumb_touch_source=Distance\n\
             interval_samples=90\n",
        );
        assert!(messages.is_empty(), "{messages:?}");
        assert_eq!(settings.sigma_v_angle, 6.5);
        assert_eq!(settings.facing_front_min, Vec3::new(-30.0, -40.5, 120.0));
        assert_eq!(settings.thumb_touch_source, ThumbTouchSource::Distance);
        assert_eq!(settings.interval_samples, 90);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let mut settings = TrackingSettings::default();
        let messages = settings.apply_overrides(
            "no delimiter here\n\
             a=b=c\n\
             unknown_field=1\n\
             sigma_w_angle=abc\n\
             facing_front_max=45,45,225\n\
             facing_front_min=(1, x, 3)\n\
             thumb_touch_source=telepathy\n\
             interval_samples=-3\n\
             sigma_w_position=2\n",
        );
        assert_eq!(
            messages,
            vec![
                "'no delimiter here' is invalid format".to_string(),
                "'a=b=c' is invalid format".to_string(),
                "unknown_field is invalid name".to_string(),
                "sigma_w_angle must be float".to_string(),
                "facing_front_max must be a vector like (x, y, z)".to_string(),
                "facing_front_min must be a vector like (x, y, z)".to_string(),
                "thumb_touch_source has unsupported value 'telepathy'".to_string(),
                "interval_samples must be a non-negative integer".to_string(),
            ]
        );
        let defaults = TrackingSettings::default();
        assert_eq!(settings.sigma_w_angle, defaults.sigma_w_angle);
        assert_eq!(settings.facing_front_max, defaults.facing_front_max);
        assert_eq!(settings.sigma_w_position, 2.0);
    }

    #[test]
    fn display_round_trips_through_overrides() {
        let original = TrackingSettings {
            sigma_v_angle: 7.25,
            facing_front_min: Vec3::new(-10.0, -20.0, 100.0),
            thumb_touch_source: ThumbTouchSource::Distance,
            threshold_y_distance_enable_tracking: 0.35,
            ..TrackingSettings::default()
        };
        let text = original.to_string();
        assert!(text.contains("sigma_v_angle=7.25\n"));
        assert!(text.contains("facing_front_min=(-10, -20, 100)\n"));
        assert!(text.contains("threshold_y_distance_enable_tracking=0.35\n"));

        let mut parsed = TrackingSettings::default();
        assert!(parsed.apply_overrides(&text).is_empty());
        assert_eq!(parsed, original);
    }

    #[test]
    fn parse_reports_format_errors() {
        let err = TrackingSettings::parse("sigma_v_angle=oops").unwrap_err();
        assert!(matches!(err, ControllerError::SettingsFormat(_)));
        let err = TrackingSettings::parse("sigma_v_angle=0").unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig { .. }));
    }

    #[test]
    fn right_hand_uses_mirrored_box() {
        let settings = TrackingSettings::default();
        let left = settings.facing_front(true);
        let right = settings.facing_front(false);
        assert_eq!(right, left.mirror());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: TrackingSettings = serde_json::from_str(r#"{"sigma_v_angle": 9.0}"#).unwrap();
        assert_eq!(settings.sigma_v_angle, 9.0);
        assert_eq!(settings.max_angle_grip, TrackingSettings::default().max_angle_grip);
    }
}
