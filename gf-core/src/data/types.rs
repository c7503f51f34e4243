//! Core data types for gpufan
//!
//! The actuator topology is closed: four fans, addressed by [`ActuatorId`],
//! with per-actuator data held in a fixed-size [`ActuatorMap`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the four controlled fans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorId {
    Cpu,
    Gpu1,
    Gpu2,
    Vrm,
}

impl ActuatorId {
    /// Number of actuators
    pub const COUNT: usize = 4;

    /// All actuators in their fixed processing order
    pub const ALL: [ActuatorId; Self::COUNT] = [
        ActuatorId::Cpu,
        ActuatorId::Gpu1,
        ActuatorId::Gpu2,
        ActuatorId::Vrm,
    ];

    /// Position in [`ActuatorId::ALL`]
    pub const fn index(self) -> usize {
        match self {
            ActuatorId::Cpu => 0,
            ActuatorId::Gpu1 => 1,
            ActuatorId::Gpu2 => 2,
            ActuatorId::Vrm => 3,
        }
    }

    /// Smoothing zone this actuator belongs to
    pub const fn zone(self) -> Zone {
        match self {
            ActuatorId::Cpu => Zone::Cpu,
            ActuatorId::Gpu1 | ActuatorId::Gpu2 => Zone::Gpu,
            ActuatorId::Vrm => Zone::Vrm,
        }
    }

    /// Config key / display name
    pub const fn name(self) -> &'static str {
        match self {
            ActuatorId::Cpu => "cpu",
            ActuatorId::Gpu1 => "gpu1",
            ActuatorId::Gpu2 => "gpu2",
            ActuatorId::Vrm => "vrm",
        }
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Class of actuators sharing smoothing limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Cpu,
    Gpu,
    Vrm,
}

/// Who drives an actuator's duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorMode {
    /// Software writes the duty value
    Manual,
    /// Hardware/firmware thermal control
    Automatic,
}

impl ActuatorMode {
    /// Value written to a hwmon `pwmN_enable` file
    pub const fn enable_value(self) -> u8 {
        match self {
            ActuatorMode::Manual => crate::constants::pwm::enable::MANUAL,
            ActuatorMode::Automatic => crate::constants::pwm::enable::AUTOMATIC,
        }
    }
}

impl fmt::Display for ActuatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorMode::Manual => f.write_str("manual"),
            ActuatorMode::Automatic => f.write_str("automatic"),
        }
    }
}

/// Fixed map with exactly one entry per [`ActuatorId`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorMap<T>([T; ActuatorId::COUNT]);

impl<T> ActuatorMap<T> {
    /// Build a map by evaluating `f` for every actuator
    pub fn from_fn(mut f: impl FnMut(ActuatorId) -> T) -> Self {
        Self(ActuatorId::ALL.map(&mut f))
    }

    /// Iterate entries in [`ActuatorId::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (ActuatorId, &T)> {
        ActuatorId::ALL.into_iter().zip(self.0.iter())
    }

    /// Values in [`ActuatorId::ALL`] order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    /// Transform every entry
    pub fn map<U>(self, mut f: impl FnMut(ActuatorId, T) -> U) -> ActuatorMap<U> {
        // Arrays map in index order.
        let mut i = 0;
        ActuatorMap(self.0.map(|value| {
            let id = ActuatorId::ALL[i];
            i += 1;
            f(id, value)
        }))
    }
}

impl<T: Copy> ActuatorMap<T> {
    /// Map with the same value for every actuator
    pub fn splat(value: T) -> Self {
        Self([value; ActuatorId::COUNT])
    }
}

impl<T> Index<ActuatorId> for ActuatorMap<T> {
    type Output = T;

    fn index(&self, id: ActuatorId) -> &T {
        &self.0[id.index()]
    }
}

impl<T> IndexMut<ActuatorId> for ActuatorMap<T> {
    fn index_mut(&mut self, id: ActuatorId) -> &mut T {
        &mut self.0[id.index()]
    }
}

/// Telemetry captured once per tick
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// CPU package temperature in Celsius
    pub cpu_temp: f32,
    /// GPU core temperatures in Celsius, GPU1 first
    pub gpu_temp: [f32; 2],
    /// GPU power draw in watts, GPU1 first
    pub gpu_power: [f32; 2],
    /// Raw duty value currently set on each actuator
    pub current_duty: ActuatorMap<u32>,
}

impl TelemetrySnapshot {
    /// Hottest GPU temperature
    pub fn max_gpu_temp(&self) -> f32 {
        self.gpu_temp[0].max(self.gpu_temp[1])
    }

    /// Highest GPU power draw
    pub fn max_gpu_power(&self) -> f32 {
        self.gpu_power[0].max(self.gpu_power[1])
    }
}

/// Target speed for one actuator, with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeedDecision {
    pub actuator: ActuatorId,
    /// Fan speed, 0-100
    pub target_percent: u8,
    /// Human-readable justification
    pub reason: String,
}

impl SpeedDecision {
    pub fn new(actuator: ActuatorId, target_percent: u8, reason: impl Into<String>) -> Self {
        Self {
            actuator,
            target_percent: target_percent.min(crate::constants::limits::MAX_PERCENT),
            reason: reason.into(),
        }
    }
}

/// One decision per actuator
pub type Decisions = ActuatorMap<SpeedDecision>;
