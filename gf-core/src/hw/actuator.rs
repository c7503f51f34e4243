//! hwmon PWM actuators

use tracing::trace;

use crate::constants::{limits, pwm};
use crate::data::{ActuatorId, ActuatorMode, FanPaths};
use crate::engine::ActuatorSink;
use crate::error::{GpufanError, Result};
use crate::hw::control::{enable_path_for, set_pwm_enable, set_pwm_value};

/// Drives the four configured `pwmN` files
#[derive(Debug, Clone)]
pub struct HwmonActuators {
    fans: FanPaths,
    pwm_max: u32,
}

impl HwmonActuators {
    pub fn new(fans: FanPaths, pwm_max: u32) -> Self {
        Self { fans, pwm_max }
    }
}

impl ActuatorSink for HwmonActuators {
    fn set_mode(&mut self, actuator: ActuatorId, mode: ActuatorMode) -> Result<()> {
        let enable = enable_path_for(self.fans.path(actuator));
        trace!("{} fan -> {} ({:?})", actuator, mode, enable);
        set_pwm_enable(&enable, mode.enable_value())
    }

    fn set_duty(&mut self, actuator: ActuatorId, percent: u8) -> Result<()> {
        if percent > limits::MAX_PERCENT {
            return Err(GpufanError::InvalidPercentage { value: u32::from(percent) });
        }
        let duty = pwm::from_percent(percent, self.pwm_max);
        trace!("{} fan -> {}% (duty {})", actuator, percent, duty);
        set_pwm_value(self.fans.path(actuator), duty)
    }
}
