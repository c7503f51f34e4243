//! Rate limiting between policy output and the fans
//!
//! Each tick an actuator moves toward its target by at most the zone's
//! `max_step_up` / `max_step_down`. The engine remembers what it last
//! applied; it never re-reads hardware to find out.

use crate::constants::pwm;
use crate::data::{ActuatorMap, Decisions, SmoothingLimits, SpeedDecision, TelemetrySnapshot};

/// Per-zone step limiter with memory of the last applied speed
#[derive(Debug, Clone)]
pub struct SmoothingEngine {
    limits: SmoothingLimits,
    last_applied: ActuatorMap<u8>,
}

impl SmoothingEngine {
    pub fn new(limits: SmoothingLimits, initial: ActuatorMap<u8>) -> Self {
        Self {
            limits,
            last_applied: initial.map(|_, p| p.min(100)),
        }
    }

    /// Seed the memory from the duty values found on the hardware at startup
    pub fn from_snapshot(limits: SmoothingLimits, snapshot: &TelemetrySnapshot, pwm_max: u32) -> Self {
        let initial = snapshot
            .current_duty
            .clone()
            .map(|_, duty| pwm::to_percent(duty, pwm_max));
        Self::new(limits, initial)
    }

    pub fn last_applied(&self) -> &ActuatorMap<u8> {
        &self.last_applied
    }

    /// Limit every decision and remember the result as applied
    ///
    /// A limited decision keeps its reason, with the clamp appended.
    pub fn smooth(&mut self, decisions: Decisions) -> Decisions {
        decisions.map(|id, decision| {
            let zone = self.limits.for_zone(id.zone());
            let previous = self.last_applied[id];
            let target = decision.target_percent;

            let applied = if target > previous {
                previous.saturating_add(zone.max_step_up).min(target)
            } else {
                previous.saturating_sub(zone.max_step_down).max(target)
            };
            self.last_applied[id] = applied;

            if applied == target {
                return decision;
            }

            let delta = i16::from(applied) - i16::from(previous);
            let wanted = i16::from(target) - i16::from(previous);
            let reason = format!(
                "{} [rate limited: {:+}% of {:+}% toward {}%]",
                decision.reason, delta, wanted, target
            );
            SpeedDecision::new(id, applied, reason)
        })
    }
}
