//! Data types, configuration, and validation modules

mod config;
mod types;
mod validation;

pub use config::{
    load_config, parse_config, resolve_config_path, Config, ConfigFile, ControlSettings,
    CpuThresholds, FanPaths, GpuThresholds, PowerThresholds, SmoothingLimits,
    TemperatureThresholds, VrmThresholds, ZoneLimits,
};
pub use types::{
    ActuatorId, ActuatorMap, ActuatorMode, Decisions, SpeedDecision, TelemetrySnapshot, Zone,
};
pub use validation::{validate_config, validate_file_size, validate_pwm_path};
