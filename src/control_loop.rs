/*
 * This file is part of gpufan.
 *
 * Copyright (C) 2025 gpufan contributors
 *
 * gpufan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * gpufan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gpufan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Control loop driver
//!
//! One tick: read telemetry, decide, smooth, then apply (enforce mode) or
//! print (observe mode). Between ticks the driver waits on either the tick
//! timer or the shutdown token, whichever comes first.
//!
//! In enforce mode the driver owns the fans until it is dropped: leaving
//! [`Driver::run`] or unwinding out of it always runs the shutdown sequence.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use gf_core::display::format_status_report;
use gf_core::{
    ActuatorId, ActuatorMode, ActuatorSink, Config, Decisions, ShutdownReport, ShutdownSequencer,
    SmoothingEngine, SmoothingLimits, SpeedPolicy, TelemetrySnapshot, TelemetrySource,
};

/// What the driver does with its decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compute and print; never write to an actuator
    Observe,
    /// Compute and apply
    Enforce,
}

/// Outcome of applying one tick's decisions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    pub applied: Vec<ActuatorId>,
    pub failed: Vec<ActuatorId>,
    /// Shutdown was requested before every actuator was written
    pub abandoned: bool,
}

pub struct Driver<T: TelemetrySource, S: ActuatorSink> {
    mode: Mode,
    policy: SpeedPolicy,
    limits: SmoothingLimits,
    smoothing: Option<SmoothingEngine>,
    pwm_max: u32,
    interval: Duration,
    telemetry: T,
    sink: S,
    sequencer: Arc<ShutdownSequencer>,
}

impl<T: TelemetrySource, S: ActuatorSink> Driver<T, S> {
    pub fn new(
        mode: Mode,
        config: &Config,
        telemetry: T,
        sink: S,
        sequencer: Arc<ShutdownSequencer>,
    ) -> Self {
        Self {
            mode,
            policy: SpeedPolicy::from_config(config),
            limits: config.smoothing,
            smoothing: None,
            pwm_max: config.control.pwm_max,
            interval: config.control.tick_interval(),
            telemetry,
            sink,
            sequencer,
        }
    }

    pub fn smoothing(&self) -> Option<&SmoothingEngine> {
        self.smoothing.as_ref()
    }

    /// Tick until shutdown is requested, then run the shutdown sequence
    ///
    /// Returns the shutdown report in enforce mode, `None` in observe mode.
    pub async fn run(&mut self) -> Option<ShutdownReport> {
        match self.mode {
            Mode::Observe => info!("Monitor mode started (no fan writes)"),
            Mode::Enforce => info!("Control mode started"),
        }
        let token = self.sequencer.token();

        while !token.is_cancelled() {
            self.tick();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = token.cancelled() => {}
            }
        }

        info!("Termination requested, leaving control loop");
        self.finish()
    }

    /// One iteration; returns the smoothed decisions
    pub fn tick(&mut self) -> Decisions {
        let snapshot = self.telemetry.read();
        debug!(
            "Telemetry: CPU {:.1}°C, GPU1 {:.1}°C/{:.1}W, GPU2 {:.1}°C/{:.1}W",
            snapshot.cpu_temp,
            snapshot.gpu_temp[0],
            snapshot.gpu_power[0],
            snapshot.gpu_temp[1],
            snapshot.gpu_power[1]
        );

        let decisions = self.policy.decide(&snapshot);
        let (limits, pwm_max) = (self.limits, self.pwm_max);
        let smoothing = self
            .smoothing
            .get_or_insert_with(|| SmoothingEngine::from_snapshot(limits, &snapshot, pwm_max));
        let smoothed = smoothing.smooth(decisions);

        match self.mode {
            Mode::Observe => self.report(&snapshot, &smoothed),
            Mode::Enforce => {
                self.apply(&smoothed);
            }
        }
        smoothed
    }

    fn report(&self, snapshot: &TelemetrySnapshot, decisions: &Decisions) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        println!(
            "\n{}",
            format_status_report(&timestamp, snapshot, decisions, self.pwm_max)
        );
    }

    /// Write every decision, stopping early once shutdown is requested
    pub fn apply(&mut self, decisions: &Decisions) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for (id, decision) in decisions.iter() {
            if self.sequencer.is_requested() {
                debug!("Shutdown requested, skipping remaining fan writes");
                outcome.abandoned = true;
                break;
            }

            let result = self
                .sink
                .set_mode(id, ActuatorMode::Manual)
                .and_then(|_| self.sink.set_duty(id, decision.target_percent));
            match result {
                Ok(()) => outcome.applied.push(id),
                Err(e) => {
                    error!("Failed to control {} fan: {}", id, e);
                    outcome.failed.push(id);
                }
            }
        }

        if !outcome.failed.is_empty() {
            error!("Some fans could not be controlled: {:?}", outcome.failed);
        } else if !outcome.abandoned {
            info!("Fan speeds applied");
            for (id, decision) in decisions.iter() {
                info!("  {}: {}% - {}", id, decision.target_percent, decision.reason);
            }
        }
        outcome
    }

    fn finish(&mut self) -> Option<ShutdownReport> {
        match self.mode {
            Mode::Observe => {
                info!("Monitoring stopped");
                None
            }
            Mode::Enforce => self.sequencer.execute(&mut self.sink),
        }
    }
}

// Exit guard: covers early returns and panics unwinding out of `run`.
impl<T: TelemetrySource, S: ActuatorSink> Drop for Driver<T, S> {
    fn drop(&mut self) {
        if self.mode == Mode::Enforce && self.sequencer.execute(&mut self.sink).is_some() {
            info!("Fans released by exit guard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gf_core::{parse_config, ActuatorMap, GpufanError};
    use std::sync::Mutex;

    const CONFIG: &str = r#"{
        "fan_control": {
            "fans": {
                "cpu": "/sys/class/hwmon/hwmon2/pwm1",
                "gpu1": "/sys/class/hwmon/hwmon2/pwm2",
                "gpu2": "/sys/class/hwmon/hwmon2/pwm3",
                "vrm": "/sys/class/hwmon/hwmon2/pwm4"
            },
            "temperature_thresholds": {
                "cpu": { "min_temp": 40, "max_temp": 60, "min_speed": 50 },
                "gpu": { "min_temp": 40, "max_temp": 60, "critical_temp": 60 }
            },
            "power_thresholds": { "gpu_critical_power": 100 },
            "smoothing": {
                "cpu": { "max_step_up": 100, "max_step_down": 100 },
                "gpu": { "max_step_up": 100, "max_step_down": 100 },
                "vrm": { "max_step_up": 100, "max_step_down": 100 }
            },
            "control": { "update_interval": 1, "settle_delay_ms": 0, "log_dir": null }
        }
    }"#;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Mode(ActuatorId, ActuatorMode),
        Duty(ActuatorId, u8),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<Call>>>,
        fail: Option<ActuatorId>,
    }

    impl ActuatorSink for RecordingSink {
        fn set_mode(&mut self, id: ActuatorId, mode: ActuatorMode) -> gf_core::Result<()> {
            self.calls.lock().unwrap().push(Call::Mode(id, mode));
            Ok(())
        }

        fn set_duty(&mut self, id: ActuatorId, percent: u8) -> gf_core::Result<()> {
            self.calls.lock().unwrap().push(Call::Duty(id, percent));
            if self.fail == Some(id) {
                return Err(GpufanError::generic("write failed"));
            }
            Ok(())
        }
    }

    struct FixedTelemetry(TelemetrySnapshot);

    impl TelemetrySource for FixedTelemetry {
        fn read(&mut self) -> TelemetrySnapshot {
            self.0.clone()
        }
    }

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            cpu_temp: 55.0,
            gpu_temp: [70.0, 30.0],
            gpu_power: [50.0, 50.0],
            current_duty: ActuatorMap::splat(0),
        }
    }

    fn driver(mode: Mode, sink: RecordingSink) -> Driver<FixedTelemetry, RecordingSink> {
        let config = parse_config(CONFIG).unwrap();
        Driver::new(
            mode,
            &config,
            FixedTelemetry(snapshot()),
            sink,
            Arc::new(ShutdownSequencer::new(Duration::ZERO)),
        )
    }

    #[test]
    fn test_tick_applies_policy() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut d = driver(Mode::Enforce, sink);

        let applied = d.tick();
        assert_eq!(applied[ActuatorId::Cpu].target_percent, 100);
        assert_eq!(applied[ActuatorId::Gpu2].target_percent, 100);

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 8);
        assert_eq!(calls[0], Call::Mode(ActuatorId::Cpu, ActuatorMode::Manual));
        assert_eq!(calls[1], Call::Duty(ActuatorId::Cpu, 100));
    }

    #[test]
    fn test_observe_never_writes() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        {
            let mut d = driver(Mode::Observe, sink);
            d.tick();
            d.tick();
        }
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_actuator_does_not_stop_others() {
        let sink = RecordingSink { fail: Some(ActuatorId::Gpu1), ..Default::default() };
        let mut d = driver(Mode::Enforce, sink);
        let decisions = ActuatorMap::from_fn(|id| gf_core::SpeedDecision::new(id, 60, "test"));

        let outcome = d.apply(&decisions);
        assert_eq!(outcome.failed, vec![ActuatorId::Gpu1]);
        assert_eq!(outcome.applied.len(), 3);
        assert!(!outcome.abandoned);
    }

    #[test]
    fn test_apply_abandoned_after_request() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut d = driver(Mode::Enforce, sink);
        d.sequencer.request();

        let decisions = ActuatorMap::from_fn(|id| gf_core::SpeedDecision::new(id, 60, "test"));
        let outcome = d.apply(&decisions);
        assert!(outcome.abandoned);
        assert!(outcome.applied.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_runs_shutdown_in_enforce_mode() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let sequencer = {
            let d = driver(Mode::Enforce, sink);
            d.sequencer.clone()
        };

        assert_eq!(sequencer.state(), gf_core::ShutdownState::Done);
        let calls = calls.lock().unwrap();
        assert!(calls.contains(&Call::Duty(ActuatorId::Vrm, 100)));
        assert_eq!(calls.last(), Some(&Call::Mode(ActuatorId::Vrm, ActuatorMode::Automatic)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_request() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut d = driver(Mode::Enforce, sink);
        let sequencer = d.sequencer.clone();

        let trigger = sequencer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.request();
        });

        let report = d.run().await.expect("enforce mode returns a report");
        assert!(report.is_clean());
        assert_eq!(sequencer.state(), gf_core::ShutdownState::Done);

        // 3 ticks at t=0,1,2 s, then force + release
        let calls = calls.lock().unwrap();
        let duty_writes = calls.iter().filter(|c| matches!(c, Call::Duty(..))).count();
        assert_eq!(duty_writes, 3 * 4 + 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_run_returns_none() {
        let sink = RecordingSink::default();
        let calls = sink.calls.clone();
        let mut d = driver(Mode::Observe, sink);
        d.sequencer.request();
        assert!(d.run().await.is_none());
        // Triggered, but nothing was written so nothing is released
        assert_eq!(d.sequencer.state(), gf_core::ShutdownState::ShuttingDown);
        assert!(calls.lock().unwrap().is_empty());
    }
}
