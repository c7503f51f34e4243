//! GPU telemetry for gpufan
//!
//! Reads per-GPU core temperature and power draw. Only NVIDIA boards are
//! supported; they are queried through `nvidia-smi`.

pub mod nvidia;

pub mod constants;
mod types;

pub use types::*;

use gf_error::GpufanError;
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, GpufanError>;

/// Read telemetry for all GPUs using the default query timeout
pub fn read_gpu_telemetry() -> Result<Vec<GpuTelemetry>> {
    nvidia::query_telemetry(constants::QUERY_TIMEOUT)
}

/// Look up one GPU by index in a telemetry batch
pub fn find_gpu(gpus: &[GpuTelemetry], index: u32) -> Option<&GpuTelemetry> {
    gpus.iter().find(|g| g.index == index)
}

/// Count the GPUs the driver reports (0 when nvidia-smi is unavailable)
pub fn count_gpus() -> usize {
    match read_gpu_telemetry() {
        Ok(gpus) => {
            info!("Detected {} NVIDIA GPU(s)", gpus.len());
            gpus.len()
        }
        Err(e) => {
            debug!("No NVIDIA GPUs detected: {}", e);
            0
        }
    }
}
