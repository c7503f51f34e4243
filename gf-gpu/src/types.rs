//! GPU data types

use serde::{Deserialize, Serialize};

/// One GPU's thermal and power reading
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GpuTelemetry {
    /// GPU index as reported by the driver (0, 1, ...)
    pub index: u32,
    /// Core temperature in Celsius
    pub temperature: Option<f32>,
    /// Board power draw in watts
    pub power_watts: Option<f32>,
}

impl GpuTelemetry {
    /// Whether both readings are present and finite
    pub fn is_complete(&self) -> bool {
        matches!(self.temperature, Some(t) if t.is_finite())
            && matches!(self.power_watts, Some(p) if p.is_finite())
    }
}
