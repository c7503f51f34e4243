//! System telemetry source
//!
//! Assembles a [`TelemetrySnapshot`] from hwmon (CPU temperature, current
//! duty values) and `nvidia-smi` (GPU temperature and power). Every reading
//! that cannot be obtained is replaced by its fallback and logged.

use std::path::PathBuf;
use tracing::warn;

use gf_gpu::GpuTelemetry;

use crate::constants::{fallback, paths};
use crate::data::{ActuatorMap, FanPaths, TelemetrySnapshot};
use crate::engine::TelemetrySource;
use crate::error::Result;
use crate::hw::control::read_pwm_value;
use crate::hw::cpu::read_cpu_temperature;

/// GPU query, injectable for tests
pub type GpuReader = Box<dyn FnMut() -> Result<Vec<GpuTelemetry>> + Send>;

/// Reads the live system
pub struct SystemTelemetry {
    hwmon_base: PathBuf,
    fans: FanPaths,
    gpu_reader: GpuReader,
}

impl SystemTelemetry {
    pub fn new(fans: FanPaths) -> Self {
        Self {
            hwmon_base: PathBuf::from(paths::HWMON_BASE),
            fans,
            gpu_reader: Box::new(gf_gpu::read_gpu_telemetry),
        }
    }

    pub fn with_hwmon_base(mut self, hwmon_base: impl Into<PathBuf>) -> Self {
        self.hwmon_base = hwmon_base.into();
        self
    }

    pub fn with_gpu_reader(
        mut self,
        reader: impl FnMut() -> Result<Vec<GpuTelemetry>> + Send + 'static,
    ) -> Self {
        self.gpu_reader = Box::new(reader);
        self
    }

    fn cpu_temp(&self) -> f32 {
        match read_cpu_temperature(&self.hwmon_base) {
            Ok(t) if t.is_finite() => t,
            Ok(t) => {
                warn!("CPU temperature reading {} is not usable, assuming {}°C", t, fallback::CPU_TEMP);
                fallback::CPU_TEMP
            }
            Err(e) => {
                warn!("Failed to read CPU temperature: {} - assuming {}°C", e, fallback::CPU_TEMP);
                fallback::CPU_TEMP
            }
        }
    }

    fn gpu_readings(&mut self) -> ([f32; 2], [f32; 2]) {
        let gpus = match (self.gpu_reader)() {
            Ok(gpus) => gpus,
            Err(e) => {
                warn!(
                    "Failed to read GPU telemetry: {} - assuming {}°C / {}W",
                    e,
                    fallback::GPU_TEMP,
                    fallback::GPU_POWER
                );
                Vec::new()
            }
        };

        let mut temps = [fallback::GPU_TEMP; 2];
        let mut power = [fallback::GPU_POWER; 2];
        for slot in 0..2 {
            let gpu = gf_gpu::find_gpu(&gpus, slot as u32);
            if gpu.is_none() && !gpus.is_empty() {
                warn!("GPU{} not reported by the driver, using fallback readings", slot + 1);
            }
            if let Some(t) = gpu.and_then(|g| g.temperature).filter(|t| t.is_finite()) {
                temps[slot] = t;
            }
            if let Some(w) = gpu.and_then(|g| g.power_watts).filter(|w| w.is_finite()) {
                power[slot] = w;
            }
        }
        (temps, power)
    }

    fn current_duty(&self) -> ActuatorMap<u32> {
        ActuatorMap::from_fn(|id| {
            read_pwm_value(self.fans.path(id)).unwrap_or_else(|e| {
                warn!("Failed to read current {} fan duty: {}", id, e);
                fallback::DUTY
            })
        })
    }
}

impl TelemetrySource for SystemTelemetry {
    fn read(&mut self) -> TelemetrySnapshot {
        let cpu_temp = self.cpu_temp();
        let (gpu_temp, gpu_power) = self.gpu_readings();
        TelemetrySnapshot {
            cpu_temp,
            gpu_temp,
            gpu_power,
            current_duty: self.current_duty(),
        }
    }
}
