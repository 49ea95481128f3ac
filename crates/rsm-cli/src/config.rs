//! Configuration vault – reads/writes `~/.rsm/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use rsm_runtime::ControllerConfig;
use rsm_types::ExplorationModePolicy;
use serde::{Deserialize, Serialize};

/// Persisted controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control-loop tick rate (Hz).
    #[serde(default = "default_loop_rate_hz")]
    pub loop_rate_hz: u32,

    /// Distance (m) within which two goal poses count as the same goal.
    #[serde(default = "default_goal_tolerance")]
    pub exploration_goal_tolerance: f64,

    /// `complete_goal` or `interrupt_on_vanish`.
    #[serde(default)]
    pub exploration_mode: ExplorationModePolicy,

    /// Start with reverse driving enabled.
    #[serde(default)]
    pub reverse_mode: bool,

    /// Per-topic event bus buffer.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    #[serde(default = "default_sensor_joint_id")]
    pub sensor_joint_id: String,

    /// Position (rad) `/reset-sensor` drives the joint to.
    #[serde(default)]
    pub sensor_home_position: f64,
}

fn default_loop_rate_hz() -> u32 {
    20
}
fn default_goal_tolerance() -> f64 {
    0.5
}
fn default_bus_capacity() -> usize {
    256
}
fn default_sensor_joint_id() -> String {
    "sensor_tilt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loop_rate_hz: default_loop_rate_hz(),
            exploration_goal_tolerance: default_goal_tolerance(),
            exploration_mode: ExplorationModePolicy::default(),
            reverse_mode: false,
            bus_capacity: default_bus_capacity(),
            sensor_joint_id: default_sensor_joint_id(),
            sensor_home_position: 0.0,
        }
    }
}

impl Config {
    /// Reject values the controller cannot run with. The same bounds the
    /// `RSM_*` overrides enforce.
    pub fn validate(&self) -> Result<(), String> {
        if self.loop_rate_hz == 0 {
            return Err("loop_rate_hz must be greater than 0".to_string());
        }
        if !(self.exploration_goal_tolerance.is_finite() && self.exploration_goal_tolerance >= 0.0) {
            return Err(format!(
                "exploration_goal_tolerance must be a non-negative number, got {}",
                self.exploration_goal_tolerance
            ));
        }
        if self.bus_capacity == 0 {
            return Err("bus_capacity must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            loop_rate_hz: self.loop_rate_hz,
            goal_tolerance: self.exploration_goal_tolerance,
            exploration_mode: self.exploration_mode,
            reverse_mode: self.reverse_mode,
            bus_capacity: self.bus_capacity,
            sensor_joint_id: self.sensor_joint_id.clone(),
            sensor_home_position: self.sensor_home_position,
        }
    }
}

/// Return the path to `~/.rsm/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rsm").join("config.toml")
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
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Parse a policy name as written in the config file or on the REPL.
pub fn parse_policy(value: &str) -> Option<ExplorationModePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "complete" | "complete_goal" => Some(ExplorationModePolicy::CompleteGoal),
        "interrupt" | "interrupt_on_vanish" => Some(ExplorationModePolicy::InterruptOnVanish),
        _ => None,
    }
}

/// Apply `RSM_*` environment variable overrides to `cfg`. Values that do not
/// parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `RSM_LOOP_RATE_HZ` | `loop_rate_hz` |
/// | `RSM_GOAL_TOLERANCE` | `exploration_goal_tolerance` |
/// | `RSM_EXPLORATION_MODE` | `exploration_mode` |
/// | `RSM_BUS_CAPACITY` | `bus_capacity` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("RSM_LOOP_RATE_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && hz > 0
    {
        cfg.loop_rate_hz = hz;
    }
    if let Ok(v) = std::env::var("RSM_GOAL_TOLERANCE")
        && let Ok(tolerance) = v.parse::<f64>()
        && tolerance >= 0.0
    {
        cfg.exploration_goal_tolerance = tolerance;
    }
    if let Ok(v) = std::env::var("RSM_EXPLORATION_MODE")
        && let Some(policy) = parse_policy(&v)
    {
        cfg.exploration_mode = policy;
    }
    if let Ok(v) = std::env::var("RSM_BUS_CAPACITY")
        && let Ok(capacity) = v.parse::<usize>()
        && capacity > 0
    {
        cfg.bus_capacity = capacity;
    }
}

/// Save the config to disk, creating `~/.rsm/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.loop_rate_hz, 20);
        assert_eq!(loaded.exploration_goal_tolerance, 0.5);
        assert_eq!(loaded.exploration_mode, ExplorationModePolicy::CompleteGoal);
        assert_eq!(loaded.sensor_joint_id, "sensor_tilt");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "exploration_mode = \"interrupt_on_vanish\"\nreverse_mode = true\n")
            .expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.exploration_mode, ExplorationModePolicy::InterruptOnVanish);
        assert!(loaded.reverse_mode);
        assert_eq!(loaded.bus_capacity, 256);
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "exploration_mode = \"sometimes\"\n").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn zero_bus_capacity_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "bus_capacity = 0\n").expect("write");
        let err = load_from(&path).expect_err("zero capacity");
        assert!(err.contains("bus_capacity"), "{err}");
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let cfg: Config = toml::from_str("exploration_goal_tolerance = -0.5\n").expect("parse");
        let err = cfg.validate().expect_err("negative tolerance");
        assert!(err.contains("exploration_goal_tolerance"), "{err}");
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
        let zero_rate = Config {
            loop_rate_hz: 0,
            ..Config::default()
        };
        assert!(zero_rate.validate().is_err());
    }

    #[test]
    fn config_path_points_to_rsm_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".rsm"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn controller_config_carries_every_field() {
        let cfg = Config {
            loop_rate_hz: 10,
            exploration_goal_tolerance: 0.25,
            exploration_mode: ExplorationModePolicy::InterruptOnVanish,
            reverse_mode: true,
            bus_capacity: 64,
            sensor_joint_id: "mast".to_string(),
            sensor_home_position: 0.3,
        };
        let cc = cfg.to_controller_config();
        assert_eq!(cc.loop_rate_hz, 10);
        assert_eq!(cc.goal_tolerance, 0.25);
        assert_eq!(cc.exploration_mode, ExplorationModePolicy::InterruptOnVanish);
        assert!(cc.reverse_mode);
        assert_eq!(cc.sensor_joint_id, "mast");
    }

    #[test]
    fn policy_names() {
        assert_eq!(parse_policy("complete"), Some(ExplorationModePolicy::CompleteGoal));
        assert_eq!(
            parse_policy(" Interrupt_On_Vanish "),
            Some(ExplorationModePolicy::InterruptOnVanish)
        );
        assert_eq!(parse_policy("maybe"), None);
    }

    #[test]
    fn apply_env_overrides_changes_loop_rate() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("RSM_LOOP_RATE_HZ", "50") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.loop_rate_hz, 50);
        unsafe { std::env::remove_var("RSM_LOOP_RATE_HZ") };
    }

    #[test]
    fn apply_env_overrides_changes_tolerance() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("RSM_GOAL_TOLERANCE", "0.75") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.exploration_goal_tolerance, 0.75);
        unsafe { std::env::remove_var("RSM_GOAL_TOLERANCE") };
    }

    #[test]
    fn apply_env_overrides_changes_exploration_mode() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("RSM_EXPLORATION_MODE", "interrupt") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.exploration_mode, ExplorationModePolicy::InterruptOnVanish);
        unsafe { std::env::remove_var("RSM_EXPLORATION_MODE") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_capacity() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("RSM_BUS_CAPACITY", "lots") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bus_capacity, 256);
        unsafe { std::env::remove_var("RSM_BUS_CAPACITY") };
    }
}
