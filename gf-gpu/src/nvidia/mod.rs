//! NVIDIA GPU telemetry
//!
//! Temperature and power are read with a single `nvidia-smi` query per call.
//! The child process is killed if it does not finish within the timeout, so a
//! wedged driver cannot stall the caller.

use crate::constants::{CSV_FORMAT, NVIDIA_SMI, QUERY_POLL_INTERVAL, TELEMETRY_QUERY, UNAVAILABLE_MARKERS};
use crate::{GpuTelemetry, Result};
use gf_error::GpufanError;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Query temperature and power draw for every NVIDIA GPU
pub fn query_telemetry(timeout: Duration) -> Result<Vec<GpuTelemetry>> {
    let mut cmd = Command::new(NVIDIA_SMI);
    cmd.args([TELEMETRY_QUERY, CSV_FORMAT]);

    let output = run_with_timeout(&mut cmd, timeout)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GpufanError::GpuError(format!("nvidia-smi failed: {}", stderr.trim())));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_telemetry(&stdout))
}

/// Parse `index, temperature.gpu, power.draw` CSV rows
pub fn parse_telemetry(stdout: &str) -> Vec<GpuTelemetry> {
    let mut gpus = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() < 3 {
            trace!("Skipping malformed nvidia-smi line: {}", line);
            continue;
        }

        let index = match parts[0].parse::<u32>() {
            Ok(idx) => idx,
            Err(e) => {
                warn!("Failed to parse GPU index '{}': {}", parts[0], e);
                continue;
            }
        };

        gpus.push(GpuTelemetry {
            index,
            temperature: parse_nvidia_value_f32(parts[1]),
            power_watts: parse_nvidia_value_f32(parts[2]),
        });
    }

    gpus
}

fn parse_nvidia_value_f32(s: &str) -> Option<f32> {
    if s.is_empty() || UNAVAILABLE_MARKERS.contains(&s) {
        None
    } else {
        s.parse().ok()
    }
}

/// Run a command, killing it once `timeout` has elapsed
fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GpufanError::GpuError(format!("{} not found: {}", NVIDIA_SMI, e)))?;

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => {
                return child
                    .wait_with_output()
                    .map_err(|e| GpufanError::GpuError(format!("Failed to collect {} output: {}", NVIDIA_SMI, e)));
            }
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(GpufanError::Timeout(format!(
                    "{} did not respond within {}ms",
                    NVIDIA_SMI,
                    timeout.as_millis()
                )));
            }
            Ok(None) => std::thread::sleep(QUERY_POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(GpufanError::GpuError(format!("Failed to wait for {}: {}", NVIDIA_SMI, e)));
            }
        }
    }
}
