//! Configuration vault – reads/writes `~/.handctl/config.toml`.

use handctl_runtime::TrackingSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.handctl/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Time between frames when replaying or simulating, in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: f32,

    /// Gesture calibration.  Missing fields take their defaults.
    #[serde(default)]
    pub tracking: TrackingSettings,
}

fn default_frame_interval_ms() -> f32 {
    1000.0 / 72.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            tracking: TrackingSettings::default(),
        }
    }
}

/// Return the path to `~/.handctl/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".handctl").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    cfg.tracking
        .validate()
        .map_err(|e| format!("Config at {} is invalid: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `HANDCTL_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HANDCTL_FRAME_INTERVAL_MS` | `frame_interval_ms` |
/// | `HANDCTL_SIGMA_V_ANGLE` | `tracking.sigma_v_angle` |
/// | `HANDCTL_SIGMA_V_POSITION` | `tracking.sigma_v_position` |
///
/// Values that do not parse as a positive number are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_positive("HANDCTL_FRAME_INTERVAL_MS") {
        cfg.frame_interval_ms = v;
    }
    if let Some(v) = env_positive("HANDCTL_SIGMA_V_ANGLE") {
        cfg.tracking.sigma_v_angle = v;
    }
    if let Some(v) = env_positive("HANDCTL_SIGMA_V_POSITION") {
        cfg.tracking.sigma_v_position = v;
    }
}

fn env_positive(name: &str) -> Option<f32> {
    let v = std::env::var(name).ok()?.trim().parse::<f32>().ok()?;
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Save the config to disk, creating `~/.handctl/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use handctl_runtime::ThumbTouchSource;
    use handctl_types::Vec3;
    use std::sync::{Mutex, MutexGuard};

    // Loading applies env overrides, so every test that loads or touches
    // `HANDCTL_*` holds this.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn roundtrip_customised_config() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.frame_interval_ms = 11.0;
        cfg.tracking.thumb_touch_source = ThumbTouchSource::Distance;
        cfg.tracking.facing_front_min = Vec3::new(-30.0, -40.0, 140.0);
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.frame_interval_ms, 11.0);
        assert_eq!(loaded.tracking.thumb_touch_source, ThumbTouchSource::Distance);
        assert_eq!(loaded.tracking.facing_front_min, Vec3::new(-30.0, -40.0, 140.0));
    }

    #[test]
    fn partial_file_takes_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nmax_angle_trigger = 80.0\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.tracking.max_angle_trigger, 80.0);
        assert_eq!(loaded.tracking.max_angle_grip, TrackingSettings::default().max_angle_grip);
        assert_eq!(loaded.frame_interval_ms, default_frame_interval_ms());
    }

    #[test]
    fn invalid_tracking_settings_are_rejected() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nmax_angle_trigger = 10.0\n").expect("write");

        let err = load_from(&path).unwrap_err();
        assert!(err.contains("max_angle_trigger"), "unexpected error: {err}");
    }

    #[test]
    fn config_path_points_to_handctl_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".handctl"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn apply_env_overrides_changes_frame_interval() {
        let _env = env_lock();
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("HANDCTL_FRAME_INTERVAL_MS", "8.5") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.frame_interval_ms, 8.5);
        unsafe { std::env::remove_var("HANDCTL_FRAME_INTERVAL_MS") };
    }

    #[test]
    fn apply_env_overrides_changes_sigmas() {
        let _env = env_lock();
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe {
            std::env::set_var("HANDCTL_SIGMA_V_ANGLE", "6");
            std::env::set_var("HANDCTL_SIGMA_V_POSITION", "2.5");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tracking.sigma_v_angle, 6.0);
        assert_eq!(cfg.tracking.sigma_v_position, 2.5);
        unsafe {
            std::env::remove_var("HANDCTL_SIGMA_V_ANGLE");
            std::env::remove_var("HANDCTL_SIGMA_V_POSITION");
        }
    }

    #[test]
    fn apply_env_overrides_ignores_non_positive_values() {
        let _env = env_lock();
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("HANDCTL_SIGMA_V_ANGLE", "-1") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.tracking.sigma_v_angle, TrackingSettings::default().sigma_v_angle);
        unsafe { std::env::remove_var("HANDCTL_SIGMA_V_ANGLE") };
    }
}
