//! Port traits between the control engine and the hardware
//!
//! ```text
//!   sysfs / nvidia-smi ──▶ TelemetrySource ──▶ policy + smoothing ──▶ ActuatorSink ──▶ sysfs
//! ```
//!
//! The engine and the driver only talk to hardware through these traits, so
//! tests can substitute in-memory implementations.

use crate::data::{ActuatorId, ActuatorMode, TelemetrySnapshot};
use crate::error::Result;

/// Read side: produces one snapshot per tick
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySource {
    /// Read every sensor.
    ///
    /// Never fails: implementations substitute conservative defaults for
    /// readings they cannot obtain.
    fn read(&mut self) -> TelemetrySnapshot;
}

/// Write side: commands fans
///
/// Failures are independent per actuator; an error on one call says nothing
/// about the others.
#[cfg_attr(test, mockall::automock)]
pub trait ActuatorSink {
    /// Hand an actuator to software control or back to hardware control
    fn set_mode(&mut self, actuator: ActuatorId, mode: ActuatorMode) -> Result<()>;

    /// Set an actuator's speed, 0-100 percent
    fn set_duty(&mut self, actuator: ActuatorId, percent: u8) -> Result<()>;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn read(&mut self) -> TelemetrySnapshot {
        (**self).read()
    }
}

impl<T: ActuatorSink + ?Sized> ActuatorSink for Box<T> {
    fn set_mode(&mut self, actuator: ActuatorId, mode: ActuatorMode) -> Result<()> {
        (**self).set_mode(actuator, mode)
    }

    fn set_duty(&mut self, actuator: ActuatorId, percent: u8) -> Result<()> {
        (**self).set_duty(actuator, percent)
    }
}
