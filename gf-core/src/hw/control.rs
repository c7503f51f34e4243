//! PWM and sensor control functions
//!
//! Low-level read/write operations on hwmon sysfs files.
//!
//! # PWM Values
//!
//! Duty values range from 0 to the channel's maximum (255 on almost every
//! chip). Each `pwmN` file has an optional `pwmN_enable` sibling:
//! - 1 = manual (software control)
//! - 2 = automatic (hardware thermal control)
//!
//! # Temperature Values
//!
//! Linux hwmon reports temperatures in millidegrees Celsius.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::temperature;
use crate::error::{GpufanError, Result};

/// Write a raw duty value to a `pwmN` file
pub fn set_pwm_value(pwm_path: &Path, value: u32) -> Result<()> {
    fs::write(pwm_path, value.to_string())
        .map_err(|e| write_error(pwm_path, format!("Failed to write PWM value {}", value), e))
}

fn write_error(path: &Path, what: String, e: io::Error) -> GpufanError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        GpufanError::PermissionDenied(format!("{} (run as root to control fans)", path.display()))
    } else {
        GpufanError::PwmWrite {
            path: path.to_path_buf(),
            reason: format!("{}: {}", what, e),
        }
    }
}

/// Read the raw duty value from a `pwmN` file
pub fn read_pwm_value(pwm_path: &Path) -> Result<u32> {
    let content = fs::read_to_string(pwm_path).map_err(|e| GpufanError::PwmRead {
        path: pwm_path.to_path_buf(),
        reason: format!("Failed to read: {}", e),
    })?;

    content.trim().parse::<u32>().map_err(|e| GpufanError::PwmRead {
        path: pwm_path.to_path_buf(),
        reason: format!("Failed to parse '{}': {}", content.trim(), e),
    })
}

/// `pwmN_enable` next to a `pwmN` file
pub fn enable_path_for(pwm_path: &Path) -> PathBuf {
    let mut name = pwm_path.as_os_str().to_os_string();
    name.push("_enable");
    PathBuf::from(name)
}

/// Read a `pwmN_enable` value; `None` when the channel has no enable file
pub fn read_pwm_enable(enable_path: &Path) -> Result<Option<u8>> {
    if !enable_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(enable_path).map_err(|e| GpufanError::PwmRead {
        path: enable_path.to_path_buf(),
        reason: format!("Failed to read: {}", e),
    })?;

    content
        .trim()
        .parse::<u8>()
        .map(Some)
        .map_err(|e| GpufanError::PwmRead {
            path: enable_path.to_path_buf(),
            reason: format!("Failed to parse '{}': {}", content.trim(), e),
        })
}

/// Set a `pwmN_enable` mode
///
/// No enable file means the channel is always under manual control, so that
/// is not an error. The file is only written when the value differs; some
/// drivers reset the duty on every enable write.
pub fn set_pwm_enable(enable_path: &Path, value: u8) -> Result<()> {
    match read_pwm_enable(enable_path) {
        Ok(None) => return Ok(()),
        Ok(Some(current)) if current == value => return Ok(()),
        _ => {}
    }

    fs::write(enable_path, value.to_string())
        .map_err(|e| write_error(enable_path, format!("Failed to set PWM mode {}", value), e))
}

/// Read temperature sensor value in degrees Celsius
pub fn read_temperature(temp_path: &Path) -> Result<f32> {
    let content = fs::read_to_string(temp_path).map_err(|e| GpufanError::TemperatureRead {
        path: temp_path.to_path_buf(),
        reason: format!("Failed to read: {}", e),
    })?;

    let millidegrees = content.trim().parse::<i32>().map_err(|e| GpufanError::TemperatureRead {
        path: temp_path.to_path_buf(),
        reason: format!("Failed to parse '{}': {}", content.trim(), e),
    })?;

    Ok(millidegrees as f32 / temperature::MILLIDEGREE_DIVISOR)
}
