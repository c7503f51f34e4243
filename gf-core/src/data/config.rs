//! Configuration management
//!
//! The whole configuration is read once at startup from a JSON file and is
//! immutable afterwards. Any problem here is fatal: the control loop never
//! starts on a half-valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{defaults, limits, paths, pwm, timing};
use crate::data::types::{ActuatorId, Zone};
use crate::data::validation::{validate_config, validate_file_size};
use crate::error::{GpufanError, Result};

/// Top-level document: everything lives under `fan_control`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub fan_control: Config,
}

/// Complete daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PWM control file for each actuator
    pub fans: FanPaths,

    pub temperature_thresholds: TemperatureThresholds,

    pub power_thresholds: PowerThresholds,

    #[serde(default)]
    pub vrm: VrmThresholds,

    /// Per-zone rate limits
    #[serde(default)]
    pub smoothing: SmoothingLimits,

    #[serde(default)]
    pub control: ControlSettings,
}

/// PWM paths, one per actuator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FanPaths {
    pub cpu: PathBuf,
    pub gpu1: PathBuf,
    pub gpu2: PathBuf,
    pub vrm: PathBuf,
}

impl FanPaths {
    /// PWM path for an actuator
    pub fn path(&self, id: ActuatorId) -> &Path {
        match id {
            ActuatorId::Cpu => &self.cpu,
            ActuatorId::Gpu1 => &self.gpu1,
            ActuatorId::Gpu2 => &self.gpu2,
            ActuatorId::Vrm => &self.vrm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemperatureThresholds {
    pub cpu: CpuThresholds,
    pub gpu: GpuThresholds,
}

/// CPU fan curve: `min_speed` below `min_temp`, linear up to 100% at `max_temp`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpuThresholds {
    pub min_temp: f32,
    pub max_temp: f32,
    pub min_speed: u8,
}

/// GPU fan curve: 0% at `min_temp`, linear up to 100% at `max_temp`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuThresholds {
    pub min_temp: f32,
    pub max_temp: f32,
    /// Any GPU at or above this forces CPU and both GPU fans to 100%
    pub critical_temp: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerThresholds {
    /// Any GPU drawing at least this forces the CPU fan to 100%
    pub gpu_critical_power: f32,
}

/// VRM fan triggers; the fan is binary above its quiescent default
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VrmThresholds {
    #[serde(default = "default_vrm_activation_power")]
    pub activation_power: f32,
    #[serde(default = "default_vrm_cpu_temp")]
    pub cpu_temp_threshold: f32,
    #[serde(default = "default_vrm_gpu_temp")]
    pub gpu_temp_threshold: f32,
    #[serde(default = "default_vrm_speed")]
    pub default_speed: u8,
}

impl Default for VrmThresholds {
    fn default() -> Self {
        Self {
            activation_power: defaults::VRM_ACTIVATION_POWER,
            cpu_temp_threshold: defaults::VRM_CPU_TEMP,
            gpu_temp_threshold: defaults::VRM_GPU_TEMP,
            default_speed: defaults::VRM_SPEED,
        }
    }
}

/// Maximum change per tick, in percent, for one zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneLimits {
    pub max_step_up: u8,
    pub max_step_down: u8,
}

impl Default for ZoneLimits {
    fn default() -> Self {
        Self {
            max_step_up: defaults::STEP_UP,
            max_step_down: defaults::STEP_DOWN,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SmoothingLimits {
    #[serde(default)]
    pub cpu: ZoneLimits,
    #[serde(default)]
    pub gpu: ZoneLimits,
    #[serde(default)]
    pub vrm: ZoneLimits,
}

impl SmoothingLimits {
    /// Same limits for every zone
    pub fn uniform(max_step_up: u8, max_step_down: u8) -> Self {
        let zone = ZoneLimits { max_step_up, max_step_down };
        Self { cpu: zone, gpu: zone, vrm: zone }
    }

    pub fn for_zone(&self, zone: Zone) -> ZoneLimits {
        match zone {
            Zone::Cpu => self.cpu,
            Zone::Gpu => self.gpu,
            Zone::Vrm => self.vrm,
        }
    }
}

/// Loop timing, duty range and logging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlSettings {
    /// Tick interval in seconds
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Duty value corresponding to 100%
    #[serde(default = "default_pwm_max")]
    pub pwm_max: u32,

    /// Log level name (DEBUG, INFO, WARNING, ERROR)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Wait after forcing fans to maximum during shutdown, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Directory for `fan_control.log`; `null` disables the log file
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
            pwm_max: default_pwm_max(),
            log_level: default_log_level(),
            settle_delay_ms: default_settle_delay_ms(),
            log_dir: default_log_dir(),
        }
    }
}

impl ControlSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_vrm_activation_power() -> f32 {
    defaults::VRM_ACTIVATION_POWER
}

fn default_vrm_cpu_temp() -> f32 {
    defaults::VRM_CPU_TEMP
}

fn default_vrm_gpu_temp() -> f32 {
    defaults::VRM_GPU_TEMP
}

fn default_vrm_speed() -> u8 {
    defaults::VRM_SPEED
}

fn default_update_interval() -> u64 {
    timing::DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_pwm_max() -> u32 {
    pwm::DEFAULT_MAX_VALUE
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

fn default_settle_delay_ms() -> u64 {
    timing::DEFAULT_SETTLE_DELAY.as_millis() as u64
}

fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from(defaults::LOG_DIR))
}

/// Parse and validate a configuration document
pub fn parse_config(content: &str) -> Result<Config> {
    let file: ConfigFile = serde_json::from_str(content)?;
    validate_config(&file.fan_control)?;
    Ok(file.fan_control)
}

/// Load and validate the configuration file at `path`
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(GpufanError::FileNotFound(path.to_path_buf()));
    }
    validate_file_size(path, limits::MAX_CONFIG_SIZE)?;

    let content = fs::read_to_string(path).map_err(|source| GpufanError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content).map_err(|e| match e {
        GpufanError::JsonParse(err) => {
            GpufanError::config(format!("{}: {}", path.display(), err))
        }
        other => other,
    })
}

/// Pick the configuration file: explicit path first, then the search list
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let candidates = paths::config_search_paths();
    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| {
            GpufanError::config(format!(
                "No configuration file found (searched: {})",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}
