//! CPU temperature discovery
//!
//! Lookup order over `/sys/class/hwmon/*`:
//! 1. `coretemp` (Intel): hottest of its `tempN_input` readings
//! 2. `k10temp` (AMD): its first reading
//! 3. any chip: first sensor whose label mentions `Package` or `Core`

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::constants::temperature;
use crate::error::{GpufanError, Result};
use crate::hw::control::read_temperature;

/// Read the CPU temperature in Celsius from the hwmon tree at `hwmon_base`
pub fn read_cpu_temperature(hwmon_base: &Path) -> Result<f32> {
    let chips = list_chips(hwmon_base)?;

    if let Some((_, dir)) = chips.iter().find(|(name, _)| name == temperature::CORETEMP_CHIP) {
        let readings: Vec<f32> = temp_inputs(dir)
            .iter()
            .filter_map(|(_, input)| read_temperature(input).ok())
            .collect();
        if let Some(max) = readings.into_iter().reduce(f32::max) {
            trace!("coretemp max: {:.1}°C", max);
            return Ok(max);
        }
    }

    if let Some((_, dir)) = chips.iter().find(|(name, _)| name == temperature::K10TEMP_CHIP) {
        if let Some((_, input)) = temp_inputs(dir).first() {
            return read_temperature(input);
        }
    }

    for (name, dir) in &chips {
        for (index, input) in temp_inputs(dir) {
            let label_path = dir.join(format!("temp{}_label", index));
            let Ok(label) = fs::read_to_string(&label_path) else {
                continue;
            };
            let label = label.trim();
            if temperature::CPU_LABEL_MARKERS.iter().any(|m| label.contains(m)) {
                if let Ok(value) = read_temperature(&input) {
                    debug!("Using CPU sensor '{}' on {}", label, name);
                    return Ok(value);
                }
            }
        }
    }

    Err(GpufanError::TemperatureRead {
        path: hwmon_base.to_path_buf(),
        reason: "no CPU temperature sensor found".to_string(),
    })
}

/// hwmon chips as (name, directory), in directory order
fn list_chips(hwmon_base: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(hwmon_base)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    dirs.sort();

    Ok(dirs
        .into_iter()
        .filter_map(|dir| {
            let name = fs::read_to_string(dir.join("name")).ok()?;
            Some((name.trim().to_string(), dir))
        })
        .collect())
}

/// `tempN_input` files of one chip as (N, path), sorted by N
fn temp_inputs(chip_dir: &Path) -> Vec<(u32, PathBuf)> {
    let Ok(entries) = fs::read_dir(chip_dir) else {
        return Vec::new();
    };

    let mut inputs: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let index = file_name
                .to_str()?
                .strip_prefix("temp")?
                .strip_suffix("_input")?
                .parse::<u32>()
                .ok()?;
            Some((index, entry.path()))
        })
        .collect();
    inputs.sort_by_key(|(index, _)| *index);
    inputs
}
