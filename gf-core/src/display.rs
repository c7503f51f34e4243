//! Display formatting helpers
//!
//! Plain-text rendering of a tick for the observe mode report.

use std::fmt::Write;

use crate::constants::pwm;
use crate::data::{Decisions, TelemetrySnapshot};

const RULE_WIDTH: usize = 80;

/// Format a temperature with one decimal place
pub fn format_temp(temp_celsius: f32) -> String {
    format!("{:.1}°C", temp_celsius)
}

/// Format a power reading with one decimal place
pub fn format_power(watts: f32) -> String {
    format!("{:.1}W", watts)
}

/// Format a speed as percent plus the raw duty value
pub fn format_speed(percent: u8, duty: u32) -> String {
    format!("{}% (PWM: {})", percent, duty)
}

/// One observe-mode report block
///
/// `timestamp` is preformatted by the caller so the output stays
/// deterministic under test.
pub fn format_status_report(
    timestamp: &str,
    snapshot: &TelemetrySnapshot,
    recommended: &Decisions,
    pwm_max: u32,
) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", heavy);
    let _ = writeln!(out, "Time: {}", timestamp);
    let _ = writeln!(out, "{}", light);
    let _ = writeln!(out, "System status:");
    let _ = writeln!(out, "  CPU temp: {}", format_temp(snapshot.cpu_temp));
    for gpu in 0..2 {
        let _ = writeln!(
            out,
            "  GPU{} temp: {}, power: {}",
            gpu + 1,
            format_temp(snapshot.gpu_temp[gpu]),
            format_power(snapshot.gpu_power[gpu])
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Current fan speeds:");
    for (id, duty) in snapshot.current_duty.iter() {
        let _ = writeln!(out, "  {}: {}", id, format_speed(pwm::to_percent(*duty, pwm_max), *duty));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recommended fan speeds:");
    for (id, decision) in recommended.iter() {
        let duty = pwm::from_percent(decision.target_percent, pwm_max);
        let _ = writeln!(out, "  {}: {}", id, format_speed(decision.target_percent, duty));
        let _ = writeln!(out, "    reason: {}", decision.reason);
    }

    out
}
