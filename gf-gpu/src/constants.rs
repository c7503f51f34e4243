//! GPU-related constants

use std::time::Duration;

/// Binary used to query NVIDIA GPUs
pub const NVIDIA_SMI: &str = "nvidia-smi";

/// Fields requested from nvidia-smi, in column order
pub const TELEMETRY_QUERY: &str = "--query-gpu=index,temperature.gpu,power.draw";

/// Output format for nvidia-smi queries
pub const CSV_FORMAT: &str = "--format=csv,noheader,nounits";

/// Upper bound on a single nvidia-smi invocation
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval while waiting for nvidia-smi to exit
pub const QUERY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Markers nvidia-smi prints in place of a value
pub const UNAVAILABLE_MARKERS: &[&str] = &["N/A", "[N/A]", "[Not Supported]", "[Unknown Error]"];
