//! Constants and configuration defaults for gpufan
//!
//! Centralizes magic numbers, paths and fallback readings.

use std::time::Duration;

/// System paths
pub mod paths {
    use std::path::PathBuf;

    /// Base path for hwmon devices
    pub const HWMON_BASE: &str = "/sys/class/hwmon";

    /// Only PWM files below this prefix are accepted as actuators
    pub const SYSFS_ROOT: &str = "/sys/";

    /// System-wide configuration directory
    pub const SYSTEM_CONFIG_DIR: &str = "/etc/gpufan";

    /// Application directory name under the user config dir
    pub const APP_DIR: &str = "gpufan";

    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";

    /// Log file name inside the configured log directory
    pub const LOG_FILE: &str = "fan_control.log";

    /// systemd journal socket, present when journald is running
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";

    /// Candidate configuration files, highest priority first
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
        }
        candidates.push(PathBuf::from(SYSTEM_CONFIG_DIR).join(CONFIG_FILE));
        candidates
    }
}

/// PWM control constants
pub mod pwm {
    /// Default maximum PWM duty value for hwmon channels
    pub const DEFAULT_MAX_VALUE: u32 = 255;

    /// PWM enable values
    pub mod enable {
        /// Manual PWM control
        pub const MANUAL: u8 = 1;
        /// Automatic/thermal control
        pub const AUTOMATIC: u8 = 2;
    }

    /// Convert a percentage (0-100) to a duty value, truncating
    #[inline]
    pub fn from_percent(percent: u8, pwm_max: u32) -> u32 {
        // Result never exceeds pwm_max, so narrowing back is lossless
        (u64::from(percent.min(100)) * u64::from(pwm_max) / 100) as u32
    }

    /// Convert a duty value to a percentage (0-100), truncating
    #[inline]
    pub fn to_percent(duty: u32, pwm_max: u32) -> u8 {
        if pwm_max == 0 {
            return 0;
        }
        (u64::from(duty) * 100 / u64::from(pwm_max)).min(100) as u8
    }
}

/// Temperature constants
pub mod temperature {
    /// Temperature readings are in millidegrees, divide by this to get Celsius
    pub const MILLIDEGREE_DIVISOR: f32 = 1000.0;

    /// hwmon chip name for Intel CPUs
    pub const CORETEMP_CHIP: &str = "coretemp";

    /// hwmon chip name for AMD CPUs
    pub const K10TEMP_CHIP: &str = "k10temp";

    /// Sensor label fragments that identify a CPU package/core reading
    pub const CPU_LABEL_MARKERS: &[&str] = &["Package", "Core"];
}

/// Readings substituted when a sensor cannot be read
///
/// Chosen to be moderate: high enough that fans keep spinning, low enough
/// that no critical override fires on a missing sensor alone.
pub mod fallback {
    /// CPU temperature (Celsius)
    pub const CPU_TEMP: f32 = 50.0;

    /// GPU temperature (Celsius)
    pub const GPU_TEMP: f32 = 40.0;

    /// GPU power draw (watts)
    pub const GPU_POWER: f32 = 50.0;

    /// Current actuator duty when the PWM file is unreadable
    pub const DUTY: u32 = 0;
}

/// Timing constants for the control loop and shutdown
pub mod timing {
    use super::*;

    /// Default tick interval in seconds
    pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 2;

    /// Default wait after forcing fans to maximum, before releasing them
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(5000);
}

/// Validation limits
pub mod limits {
    /// Maximum config file size (1 MB)
    pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

    /// Maximum fan speed percentage
    pub const MAX_PERCENT: u8 = 100;

    /// Largest `pwm_max` accepted in the config
    pub const MAX_PWM_VALUE: u32 = 65535;

    /// Highest temperature accepted in thresholds (Celsius)
    pub const MAX_THRESHOLD_TEMP: f32 = 150.0;

    /// Number of GPUs the fixed topology expects
    pub const EXPECTED_GPUS: usize = 2;
}

/// Defaults for optional configuration sections
pub mod defaults {
    /// GPU power at which the VRM fan goes to 100% (watts)
    pub const VRM_ACTIVATION_POWER: f32 = 150.0;

    /// CPU temperature at which the VRM fan goes to 100% (Celsius)
    pub const VRM_CPU_TEMP: f32 = 70.0;

    /// GPU temperature at which the VRM fan goes to 100% (Celsius)
    pub const VRM_GPU_TEMP: f32 = 65.0;

    /// Quiescent VRM fan speed (percent)
    pub const VRM_SPEED: u8 = 40;

    /// Default ramp-up step, percent per tick
    pub const STEP_UP: u8 = 20;

    /// Default ramp-down step, percent per tick
    pub const STEP_DOWN: u8 = 10;

    /// Default log level name
    pub const LOG_LEVEL: &str = "INFO";

    /// Default log directory (relative to the working directory)
    pub const LOG_DIR: &str = "logs";
}
