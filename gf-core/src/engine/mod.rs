//! Fan control engine modules
//!
//! Contains the speed policy, the smoothing engine, the shutdown sequencer
//! and the ports they use to reach hardware.

mod policy;
pub mod ports;
mod shutdown;
mod smoothing;

pub use policy::SpeedPolicy;
pub use ports::{ActuatorSink, TelemetrySource};
pub use shutdown::{ShutdownReport, ShutdownSequencer, ShutdownState};
pub use smoothing::SmoothingEngine;
