//! gpufan Core Library
//!
//! Threshold-based control of four case fans (CPU, GPU1, GPU2, VRM) from
//! CPU temperature and per-GPU temperature and power.
//!
//! # Module Structure
//!
//! - `data/` - Data types, configuration, validation
//! - `engine/` - Speed policy, smoothing, shutdown sequencer and ports
//! - `hw/` - hwmon sysfs access and the telemetry/actuator adapters
//!
//! # Example
//!
//! ```no_run
//! use gf_core::{load_config, SmoothingEngine, SpeedPolicy, SystemTelemetry, TelemetrySource};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("/etc/gpufan/config.json")).unwrap();
//! let policy = SpeedPolicy::from_config(&config);
//! let mut telemetry = SystemTelemetry::new(config.fans.clone());
//!
//! let snapshot = telemetry.read();
//! let mut smoothing =
//!     SmoothingEngine::from_snapshot(config.smoothing, &snapshot, config.control.pwm_max);
//! let applied = smoothing.smooth(policy.decide(&snapshot));
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod display;
pub mod error;
pub mod system;

// Re-export primary types from data/
pub use data::{
    ActuatorId, ActuatorMap, ActuatorMode, Decisions, SpeedDecision, TelemetrySnapshot, Zone,
};

// Re-export config types and functions from data/
pub use data::{
    load_config, parse_config, resolve_config_path, Config, ConfigFile, ControlSettings,
    CpuThresholds, FanPaths, GpuThresholds, PowerThresholds, SmoothingLimits,
    TemperatureThresholds, VrmThresholds, ZoneLimits,
};

// Re-export validation functions from data/
pub use data::{validate_config, validate_file_size, validate_pwm_path};

// Re-export error types
pub use error::{GpufanError, Result};

// Re-export engine types
pub use engine::{
    ActuatorSink, ShutdownReport, ShutdownSequencer, ShutdownState, SmoothingEngine,
    SpeedPolicy, TelemetrySource,
};

// Re-export hardware adapters from hw/
pub use hw::{HwmonActuators, SystemTelemetry};
