//! Configuration validation for gpufan
//!
//! Every check here runs before the control loop starts. A failure is a
//! startup error, never a runtime one.

use std::path::Path;

use crate::constants::{limits, paths};
use crate::data::config::{Config, ZoneLimits};
use crate::data::types::ActuatorId;
use crate::error::{GpufanError, Result};

/// Validates a whole configuration
pub fn validate_config(config: &Config) -> Result<()> {
    for id in ActuatorId::ALL {
        validate_pwm_path(config.fans.path(id))
            .map_err(|e| GpufanError::invalid_config(format!("fans.{}", id), e.to_string()))?;
    }

    let cpu = &config.temperature_thresholds.cpu;
    validate_temperature("temperature_thresholds.cpu.min_temp", cpu.min_temp)?;
    validate_temperature("temperature_thresholds.cpu.max_temp", cpu.max_temp)?;
    validate_range("temperature_thresholds.cpu", cpu.min_temp, cpu.max_temp)?;
    validate_percent("temperature_thresholds.cpu.min_speed", cpu.min_speed)?;

    let gpu = &config.temperature_thresholds.gpu;
    validate_temperature("temperature_thresholds.gpu.min_temp", gpu.min_temp)?;
    validate_temperature("temperature_thresholds.gpu.max_temp", gpu.max_temp)?;
    validate_temperature("temperature_thresholds.gpu.critical_temp", gpu.critical_temp)?;
    validate_range("temperature_thresholds.gpu", gpu.min_temp, gpu.max_temp)?;

    validate_power(
        "power_thresholds.gpu_critical_power",
        config.power_thresholds.gpu_critical_power,
    )?;

    let vrm = &config.vrm;
    validate_power("vrm.activation_power", vrm.activation_power)?;
    validate_temperature("vrm.cpu_temp_threshold", vrm.cpu_temp_threshold)?;
    validate_temperature("vrm.gpu_temp_threshold", vrm.gpu_temp_threshold)?;
    validate_percent("vrm.default_speed", vrm.default_speed)?;

    validate_zone_limits("smoothing.cpu", config.smoothing.cpu)?;
    validate_zone_limits("smoothing.gpu", config.smoothing.gpu)?;
    validate_zone_limits("smoothing.vrm", config.smoothing.vrm)?;

    let control = &config.control;
    if control.update_interval == 0 {
        return Err(GpufanError::invalid_config("control.update_interval", "must be at least 1 second"));
    }
    if control.pwm_max == 0 || control.pwm_max > limits::MAX_PWM_VALUE {
        return Err(GpufanError::invalid_config(
            "control.pwm_max",
            format!("must be between 1 and {}", limits::MAX_PWM_VALUE),
        ));
    }

    Ok(())
}

/// Validates that a path names a hwmon `pwmN` control file under /sys
///
/// The check is lexical; the file is not required to exist yet.
pub fn validate_pwm_path(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(GpufanError::invalid_path(path, "path must be absolute"));
    }

    let path_str = path.to_string_lossy();
    if !path_str.starts_with(paths::SYSFS_ROOT) {
        return Err(GpufanError::invalid_path(path, "path must be under /sys"));
    }

    if path_str.contains("..") {
        return Err(GpufanError::invalid_path(path, "path traversal detected"));
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GpufanError::invalid_path(path, "invalid filename"))?;

    let is_pwm = filename
        .strip_prefix("pwm")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    if !is_pwm {
        return Err(GpufanError::invalid_path(path, "not a pwmN control file"));
    }

    Ok(())
}

/// Validates file size to prevent memory exhaustion
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<()> {
    let metadata = std::fs::metadata(path)?;
    let size = metadata.len();

    if size > max_size {
        return Err(GpufanError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size,
        });
    }

    Ok(())
}

fn validate_temperature(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=limits::MAX_THRESHOLD_TEMP).contains(&value) {
        return Err(GpufanError::invalid_config(
            field,
            format!("{} is outside 0-{}°C", value, limits::MAX_THRESHOLD_TEMP),
        ));
    }
    Ok(())
}

fn validate_range(field: &str, min: f32, max: f32) -> Result<()> {
    if min >= max {
        return Err(GpufanError::invalid_config(
            field,
            format!("min_temp ({}) must be below max_temp ({})", min, max),
        ));
    }
    Ok(())
}

fn validate_percent(field: &str, value: u8) -> Result<()> {
    if value > limits::MAX_PERCENT {
        return Err(GpufanError::invalid_config(field, format!("{} is above 100%", value)));
    }
    Ok(())
}

fn validate_power(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GpufanError::invalid_config(field, format!("{} W is not a valid power", value)));
    }
    Ok(())
}

// A zero step would pin the fan in that direction forever.
fn validate_zone_limits(field: &str, zone: ZoneLimits) -> Result<()> {
    for (name, step) in [("max_step_up", zone.max_step_up), ("max_step_down", zone.max_step_down)] {
        if step == 0 || step > limits::MAX_PERCENT {
            return Err(GpufanError::invalid_config(
                format!("{}.{}", field, name),
                format!("{} must be within 1-100", step),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::config::tests::sample_config;
    use std::path::PathBuf;

    #[test]
    fn test_pwm_path_accepts_hwmon_channel() {
        assert!(validate_pwm_path(Path::new("/sys/class/hwmon/hwmon3/pwm2")).is_ok());
    }

    #[test]
    fn test_pwm_path_rejections() {
        for bad in [
            "relative/pwm1",
            "/etc/passwd",
            "/sys/class/hwmon/hwmon3/../../pwm1",
            "/sys/class/hwmon/hwmon3/pwm1_enable",
            "/sys/class/hwmon/hwmon3/pwm",
            "/sys/class/hwmon/hwmon3/fan1_input",
        ] {
            assert!(validate_pwm_path(Path::new(bad)).is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_inverted_cpu_range_rejected() {
        let mut config = sample_config();
        config.temperature_thresholds.cpu.min_temp = 70.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("temperature_thresholds.cpu"));
    }

    #[test]
    fn test_zero_step_rejected() {
        let mut config = sample_config();
        config.smoothing.vrm.max_step_down = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("smoothing.vrm.max_step_down"));
    }

    #[test]
    fn test_bad_fan_path_names_actuator() {
        let mut config = sample_config();
        config.fans.gpu2 = PathBuf::from("/tmp/pwm1");
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("fans.gpu2"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = sample_config();
        config.control.update_interval = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_pwm_max_bounds() {
        let mut config = sample_config();
        config.control.pwm_max = 100_000_000;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("control.pwm_max"));

        config.control.pwm_max = 0;
        assert!(validate_config(&config).is_err());

        config.control.pwm_max = limits::MAX_PWM_VALUE;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_speed_above_100_rejected() {
        let mut config = sample_config();
        config.vrm.default_speed = 101;
        assert!(validate_config(&config).is_err());
    }
}
