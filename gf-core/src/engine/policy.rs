//! Speed policy: telemetry snapshot in, one target speed per fan out
//!
//! # Rules
//!
//! Cross-zone overrides are checked first and short-circuit the zone's own
//! curve:
//!
//! - **CPU fan**: 100% when either GPU is at critical power or critical
//!   temperature, otherwise `min_speed` below `min_temp`, 100% at `max_temp`,
//!   linear in between.
//! - **GPU fans**: 100% for *both* fans when *either* GPU is at critical
//!   temperature. A hot GPU1 therefore spins up GPU2's fan even when GPU2 is
//!   idle; the two cards share airflow. Otherwise 0% at `min_temp`, 100% at
//!   `max_temp`, linear in between.
//! - **VRM fan**: 100% on high GPU power, hot CPU or hot GPU, otherwise a
//!   fixed default. No linear zone.
//!
//! Linear zones interpolate in floating point and truncate toward zero.
//!
//! The policy is a pure function of the snapshot and the thresholds.

use crate::data::{
    ActuatorId, ActuatorMap, Config, CpuThresholds, Decisions, GpuThresholds, PowerThresholds,
    SpeedDecision, TelemetrySnapshot, VrmThresholds,
};

const FULL_SPEED: u8 = 100;

/// Threshold-based fan speed rules
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedPolicy {
    cpu: CpuThresholds,
    gpu: GpuThresholds,
    power: PowerThresholds,
    vrm: VrmThresholds,
}

impl SpeedPolicy {
    pub fn new(
        cpu: CpuThresholds,
        gpu: GpuThresholds,
        power: PowerThresholds,
        vrm: VrmThresholds,
    ) -> Self {
        Self { cpu, gpu, power, vrm }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.temperature_thresholds.cpu.clone(),
            config.temperature_thresholds.gpu.clone(),
            config.power_thresholds.clone(),
            config.vrm.clone(),
        )
    }

    /// Target speed and justification for every fan
    pub fn decide(&self, snapshot: &TelemetrySnapshot) -> Decisions {
        ActuatorMap::from_fn(|id| {
            let (percent, reason) = match id {
                ActuatorId::Cpu => self.cpu_speed(snapshot),
                ActuatorId::Gpu1 => self.gpu_speed(snapshot, 0),
                ActuatorId::Gpu2 => self.gpu_speed(snapshot, 1),
                ActuatorId::Vrm => self.vrm_speed(snapshot),
            };
            SpeedDecision::new(id, percent, reason)
        })
    }

    fn gpu_power_critical(&self, s: &TelemetrySnapshot) -> bool {
        s.max_gpu_power() >= self.power.gpu_critical_power
    }

    fn gpu_temp_critical(&self, s: &TelemetrySnapshot) -> bool {
        s.max_gpu_temp() >= self.gpu.critical_temp
    }

    fn gpu_temp_critical_reason(&self, s: &TelemetrySnapshot) -> String {
        format!(
            "GPU temp critical (GPU1: {:.1}°C, GPU2: {:.1}°C >= {}°C)",
            s.gpu_temp[0], s.gpu_temp[1], self.gpu.critical_temp
        )
    }

    fn cpu_speed(&self, s: &TelemetrySnapshot) -> (u8, String) {
        if self.gpu_power_critical(s) {
            return (
                FULL_SPEED,
                format!(
                    "GPU power critical (GPU1: {:.1}W, GPU2: {:.1}W >= {}W)",
                    s.gpu_power[0], s.gpu_power[1], self.power.gpu_critical_power
                ),
            );
        }

        if self.gpu_temp_critical(s) {
            return (FULL_SPEED, self.gpu_temp_critical_reason(s));
        }

        let cpu = &self.cpu;
        let t = s.cpu_temp;
        if t >= cpu.max_temp {
            (
                FULL_SPEED,
                format!("CPU temp at maximum ({:.1}°C >= {}°C)", t, cpu.max_temp),
            )
        } else if t >= cpu.min_temp {
            let speed = interpolate(t, cpu.min_temp, cpu.max_temp, cpu.min_speed);
            (
                speed,
                format!(
                    "CPU temp linear control ({:.1}°C, {}-{}°C)",
                    t, cpu.min_temp, cpu.max_temp
                ),
            )
        } else {
            (
                cpu.min_speed,
                format!("CPU minimum fan speed ({:.1}°C < {}°C)", t, cpu.min_temp),
            )
        }
    }

    fn gpu_speed(&self, s: &TelemetrySnapshot, gpu: usize) -> (u8, String) {
        // Coupled override: either card being critical forces both fans.
        if self.gpu_temp_critical(s) {
            return (FULL_SPEED, self.gpu_temp_critical_reason(s));
        }

        let name = if gpu == 0 { "GPU1" } else { "GPU2" };
        let t = s.gpu_temp[gpu];
        let g = &self.gpu;
        if t <= g.min_temp {
            (0, format!("{} temp normal ({:.1}°C <= {}°C)", name, t, g.min_temp))
        } else if t >= g.max_temp {
            (
                FULL_SPEED,
                format!("{} temp at maximum ({:.1}°C >= {}°C)", name, t, g.max_temp),
            )
        } else {
            (
                interpolate(t, g.min_temp, g.max_temp, 0),
                format!(
                    "{} temp linear control ({:.1}°C, {}-{}°C)",
                    name, t, g.min_temp, g.max_temp
                ),
            )
        }
    }

    fn vrm_speed(&self, s: &TelemetrySnapshot) -> (u8, String) {
        let v = &self.vrm;
        if s.max_gpu_power() >= v.activation_power {
            (
                FULL_SPEED,
                format!(
                    "GPU power above VRM activation (GPU1: {:.1}W, GPU2: {:.1}W >= {}W)",
                    s.gpu_power[0], s.gpu_power[1], v.activation_power
                ),
            )
        } else if s.cpu_temp >= v.cpu_temp_threshold {
            (
                FULL_SPEED,
                format!(
                    "CPU temp above VRM threshold ({:.1}°C >= {}°C)",
                    s.cpu_temp, v.cpu_temp_threshold
                ),
            )
        } else if s.max_gpu_temp() >= v.gpu_temp_threshold {
            (
                FULL_SPEED,
                format!(
                    "GPU temp above VRM threshold (GPU1: {:.1}°C, GPU2: {:.1}°C >= {}°C)",
                    s.gpu_temp[0], s.gpu_temp[1], v.gpu_temp_threshold
                ),
            )
        } else {
            (v.default_speed, "VRM default speed".to_string())
        }
    }
}

/// Linear ramp from `floor` at `min_temp` to 100 at `max_temp`, truncated
fn interpolate(temp: f32, min_temp: f32, max_temp: f32, floor: u8) -> u8 {
    let span = f64::from(max_temp) - f64::from(min_temp);
    if span <= 0.0 {
        return FULL_SPEED;
    }
    let floor = f64::from(floor);
    let speed = floor + (f64::from(temp) - f64::from(min_temp)) * (100.0 - floor) / span;
    speed.clamp(0.0, 100.0).trunc() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SpeedPolicy {
        SpeedPolicy::new(
            CpuThresholds { min_temp: 40.0, max_temp: 60.0, min_speed: 50 },
            GpuThresholds { min_temp: 40.0, max_temp: 60.0, critical_temp: 60.0 },
            PowerThresholds { gpu_critical_power: 100.0 },
            VrmThresholds {
                activation_power: 150.0,
                cpu_temp_threshold: 70.0,
                gpu_temp_threshold: 55.0,
                default_speed: 30,
            },
        )
    }

    fn snapshot(cpu: f32, gpu: [f32; 2], power: [f32; 2]) -> TelemetrySnapshot {
        TelemetrySnapshot {
            cpu_temp: cpu,
            gpu_temp: gpu,
            gpu_power: power,
            current_duty: ActuatorMap::splat(0),
        }
    }

    #[test]
    fn test_cpu_linear_truncates() {
        // 50 + 15 * 50 / 20 = 87.5
        let d = policy().decide(&snapshot(55.0, [30.0, 30.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Cpu].target_percent, 87);
        assert!(d[ActuatorId::Cpu].reason.contains("linear"));
    }

    #[test]
    fn test_cpu_below_min_uses_min_speed() {
        let d = policy().decide(&snapshot(30.0, [30.0, 30.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Cpu].target_percent, 50);
    }

    #[test]
    fn test_cpu_at_max_is_full() {
        let d = policy().decide(&snapshot(60.0, [30.0, 30.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Cpu].target_percent, 100);
    }

    #[test]
    fn test_cpu_at_min_temp_is_linear_start() {
        let d = policy().decide(&snapshot(40.0, [30.0, 30.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Cpu].target_percent, 50);
    }

    #[test]
    fn test_cpu_linear_zone_is_monotonic() {
        let p = policy();
        let mut last = 0;
        let mut t = 40.0_f32;
        while t <= 60.0 {
            let speed = p.decide(&snapshot(t, [30.0, 30.0], [20.0, 20.0]))[ActuatorId::Cpu].target_percent;
            assert!(speed >= last, "speed dropped at {}°C: {} < {}", t, speed, last);
            last = speed;
            t += 0.1;
        }
    }

    #[test]
    fn test_gpu_power_forces_cpu_fan() {
        let d = policy().decide(&snapshot(30.0, [30.0, 30.0], [20.0, 100.0]));
        assert_eq!(d[ActuatorId::Cpu].target_percent, 100);
        assert!(d[ActuatorId::Cpu].reason.starts_with("GPU power critical"));
        // GPU fans are not affected by power
        assert_eq!(d[ActuatorId::Gpu2].target_percent, 0);
    }

    #[test]
    fn test_gpu_temp_critical_forces_cpu_fan() {
        let d = policy().decide(&snapshot(30.0, [30.0, 61.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Cpu].target_percent, 100);
        assert!(d[ActuatorId::Cpu].reason.starts_with("GPU temp critical"));
    }

    #[test]
    fn test_power_override_checked_before_temp_override() {
        let d = policy().decide(&snapshot(30.0, [70.0, 30.0], [120.0, 20.0]));
        assert!(d[ActuatorId::Cpu].reason.starts_with("GPU power critical"));
    }

    #[test]
    fn test_coupled_gpu_override() {
        // GPU1 critical, GPU2 cold: both GPU fans go to 100%
        let d = policy().decide(&snapshot(30.0, [70.0, 30.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Gpu1].target_percent, 100);
        assert_eq!(d[ActuatorId::Gpu2].target_percent, 100);
        assert!(d[ActuatorId::Gpu2].reason.starts_with("GPU temp critical"));
    }

    #[test]
    fn test_coupled_gpu_override_with_zero_reading() {
        let d = policy().decide(&snapshot(30.0, [60.0, 0.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Gpu1].target_percent, 100);
        assert_eq!(d[ActuatorId::Gpu2].target_percent, 100);
    }

    #[test]
    fn test_gpu_individual_curve() {
        let d = policy().decide(&snapshot(30.0, [40.0, 50.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Gpu1].target_percent, 0);
        assert_eq!(d[ActuatorId::Gpu2].target_percent, 50);
        assert!(d[ActuatorId::Gpu2].reason.starts_with("GPU2"));
    }

    #[test]
    fn test_gpu_at_max_below_critical() {
        let mut p = policy();
        p.gpu.critical_temp = 80.0;
        let d = p.decide(&snapshot(30.0, [65.0, 20.0], [20.0, 20.0]));
        assert_eq!(d[ActuatorId::Gpu1].target_percent, 100);
        assert!(d[ActuatorId::Gpu1].reason.contains("at maximum"));
        assert_eq!(d[ActuatorId::Gpu2].target_percent, 0);
    }

    #[test]
    fn test_vrm_default() {
        let d = policy().decide(&snapshot(45.0, [40.0, 40.0], [50.0, 50.0]));
        assert_eq!(d[ActuatorId::Vrm].target_percent, 30);
        assert_eq!(d[ActuatorId::Vrm].reason, "VRM default speed");
    }

    #[test]
    fn test_vrm_triggers() {
        let p = policy();
        let power = p.decide(&snapshot(45.0, [40.0, 40.0], [50.0, 150.0]));
        assert_eq!(power[ActuatorId::Vrm].target_percent, 100);
        assert!(power[ActuatorId::Vrm].reason.starts_with("GPU power"));

        let cpu = p.decide(&snapshot(70.0, [40.0, 40.0], [50.0, 50.0]));
        assert_eq!(cpu[ActuatorId::Vrm].target_percent, 100);
        assert!(cpu[ActuatorId::Vrm].reason.starts_with("CPU temp"));

        let gpu = p.decide(&snapshot(45.0, [40.0, 55.0], [50.0, 50.0]));
        assert_eq!(gpu[ActuatorId::Vrm].target_percent, 100);
        assert!(gpu[ActuatorId::Vrm].reason.starts_with("GPU temp"));
    }

    #[test]
    fn test_decide_is_deterministic() {
        let p = policy();
        let s = snapshot(52.3, [47.0, 58.9], [88.0, 12.0]);
        assert_eq!(p.decide(&s), p.decide(&s));
    }

    #[test]
    fn test_decisions_tagged_with_actuator() {
        let d = policy().decide(&snapshot(45.0, [40.0, 40.0], [50.0, 50.0]));
        for (id, decision) in d.iter() {
            assert_eq!(decision.actuator, id);
        }
    }
}
