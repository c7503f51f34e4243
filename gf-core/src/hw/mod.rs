//! Hardware interaction modules
//!
//! Contains all low-level access to hwmon sysfs files and the adapters that
//! implement the engine's ports on top of them.

mod actuator;
mod control;
mod cpu;
mod telemetry;

pub use actuator::HwmonActuators;
pub use control::{
    enable_path_for, read_pwm_enable, read_pwm_value, read_temperature, set_pwm_enable,
    set_pwm_value,
};
pub use cpu::read_cpu_temperature;
pub use telemetry::{GpuReader, SystemTelemetry};
