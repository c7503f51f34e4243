//! Shutdown sequencer
//!
//! Hands every fan back to hardware control without ever leaving one parked
//! at a low speed:
//!
//! 1. force every actuator to manual 100%
//! 2. wait the settle delay
//! 3. release every actuator to automatic, whatever happened in step 1
//!
//! The first termination trigger moves the state to `ShuttingDown`; later
//! ones are no-ops. The sequence itself runs at most once per process, in
//! whichever caller owns the actuators (the signal handler only triggers).

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::data::{ActuatorId, ActuatorMap, ActuatorMode};
use crate::engine::ports::ActuatorSink;

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const DONE: u8 = 2;

/// Lifecycle of the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
    Done,
}

impl ShutdownState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => ShutdownState::Running,
            SHUTTING_DOWN => ShutdownState::ShuttingDown,
            _ => ShutdownState::Done,
        }
    }
}

/// Per-actuator outcome of one shutdown run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Step 1: manual mode + 100%
    pub forced: ActuatorMap<Result<(), String>>,
    /// Step 3: back to automatic
    pub released: ActuatorMap<Result<(), String>>,
}

impl ShutdownReport {
    /// Every write in both steps succeeded
    pub fn is_clean(&self) -> bool {
        self.forced.values().chain(self.released.values()).all(Result::is_ok)
    }

    /// Actuators that could not be handed back to hardware control
    pub fn unreleased(&self) -> Vec<ActuatorId> {
        self.released
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(id, _)| id)
            .collect()
    }
}

/// Guarded, run-once shutdown sequence
#[derive(Debug)]
pub struct ShutdownSequencer {
    state: AtomicU8,
    executed: AtomicBool,
    settle_delay: Duration,
    token: CancellationToken,
}

impl ShutdownSequencer {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
            executed: AtomicBool::new(false),
            settle_delay,
            token: CancellationToken::new(),
        }
    }

    /// Termination trigger. Safe from any thread; does no I/O.
    ///
    /// Returns `true` for the trigger that moved the state out of `Running`.
    pub fn request(&self) -> bool {
        let first = self
            .state
            .compare_exchange(RUNNING, SHUTTING_DOWN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        self.token.cancel();
        first
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token cancelled by [`request`](Self::request) and by [`execute`](Self::execute)
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Run the sequence against `sink`
    ///
    /// Counts as a trigger when nothing requested shutdown yet. Returns
    /// `None` when another caller already ran (or is running) it.
    /// Individual write failures are logged and reported, never propagated.
    pub fn execute<S: ActuatorSink + ?Sized>(&self, sink: &mut S) -> Option<ShutdownReport> {
        if self
            .executed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        self.request();

        info!("SHUTDOWN: forcing all fans to 100%");
        let forced = ActuatorMap::from_fn(|id| {
            // Always attempt the duty write: on channels without an enable
            // file the mode write is a no-op anyway.
            let mode = sink.set_mode(id, ActuatorMode::Manual);
            let duty = sink.set_duty(id, 100);
            let outcome = mode.and(duty).map_err(|e| e.to_string());
            if let Err(e) = &outcome {
                error!("SHUTDOWN: failed to force {} fan to 100%: {}", id, e);
            }
            outcome
        });

        if !self.settle_delay.is_zero() {
            info!("SHUTDOWN: settling for {:?}", self.settle_delay);
            std::thread::sleep(self.settle_delay);
        }

        info!("SHUTDOWN: returning fans to automatic control");
        let released = ActuatorMap::from_fn(|id| {
            let outcome = sink
                .set_mode(id, ActuatorMode::Automatic)
                .map_err(|e| e.to_string());
            if let Err(e) = &outcome {
                error!("SHUTDOWN: failed to release {} fan: {}", id, e);
            }
            outcome
        });

        self.state.store(DONE, Ordering::SeqCst);

        let report = ShutdownReport { forced, released };
        if report.is_clean() {
            info!("SHUTDOWN: all fans returned to automatic control");
        } else {
            warn!(
                "SHUTDOWN: completed with errors; fans not released: {:?}",
                report.unreleased()
            );
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ports::MockActuatorSink;
    use crate::error::GpufanError;
    use mockall::predicate::*;
    use mockall::Sequence;

    #[test]
    fn test_sequence_order() {
        let mut sink = MockActuatorSink::new();
        let mut seq = Sequence::new();
        for id in ActuatorId::ALL {
            sink.expect_set_mode()
                .with(eq(id), eq(ActuatorMode::Manual))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
            sink.expect_set_duty()
                .with(eq(id), eq(100))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }
        for id in ActuatorId::ALL {
            sink.expect_set_mode()
                .with(eq(id), eq(ActuatorMode::Automatic))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }

        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        let report = sequencer.execute(&mut sink).unwrap();
        assert!(report.is_clean());
        assert_eq!(sequencer.state(), ShutdownState::Done);
    }

    #[test]
    fn test_all_writes_failing_still_completes() {
        let mut sink = MockActuatorSink::new();
        sink.expect_set_mode()
            .with(always(), eq(ActuatorMode::Manual))
            .times(4)
            .returning(|_, _| Err(GpufanError::PermissionDenied("read-only".into())));
        sink.expect_set_duty()
            .times(4)
            .returning(|_, _| Err(GpufanError::PermissionDenied("read-only".into())));
        sink.expect_set_mode()
            .with(always(), eq(ActuatorMode::Automatic))
            .times(4)
            .returning(|_, _| Err(GpufanError::PermissionDenied("read-only".into())));

        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        let report = sequencer.execute(&mut sink).unwrap();

        assert_eq!(sequencer.state(), ShutdownState::Done);
        assert!(!report.is_clean());
        assert_eq!(report.unreleased(), ActuatorId::ALL.to_vec());
        assert!(report.forced.values().all(|r| r.is_err()));
    }

    #[test]
    fn test_release_attempted_after_partial_failure() {
        let mut sink = MockActuatorSink::new();
        sink.expect_set_mode()
            .with(eq(ActuatorId::Gpu2), eq(ActuatorMode::Manual))
            .returning(|_, _| Err(GpufanError::generic("gone")));
        sink.expect_set_mode()
            .with(always(), eq(ActuatorMode::Manual))
            .returning(|_, _| Ok(()));
        sink.expect_set_duty().times(4).returning(|_, _| Ok(()));
        sink.expect_set_mode()
            .with(always(), eq(ActuatorMode::Automatic))
            .times(4)
            .returning(|_, _| Ok(()));

        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        let report = sequencer.execute(&mut sink).unwrap();

        assert!(report.forced[ActuatorId::Gpu2].is_err());
        assert!(report.forced[ActuatorId::Cpu].is_ok());
        assert!(report.unreleased().is_empty());
    }

    #[test]
    fn test_execute_runs_once() {
        let mut sink = MockActuatorSink::new();
        sink.expect_set_mode().times(8).returning(|_, _| Ok(()));
        sink.expect_set_duty().times(4).returning(|_, _| Ok(()));

        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        assert!(sequencer.execute(&mut sink).is_some());
        assert!(sequencer.execute(&mut sink).is_none());
        assert_eq!(sequencer.state(), ShutdownState::Done);
    }

    #[test]
    fn test_first_trigger_enters_shutting_down() {
        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        assert!(!sequencer.is_requested());
        assert_eq!(sequencer.state(), ShutdownState::Running);

        assert!(sequencer.request());
        assert!(!sequencer.request());
        assert!(sequencer.is_requested());
        assert!(sequencer.token().is_cancelled());
        assert_eq!(sequencer.state(), ShutdownState::ShuttingDown);
    }

    #[test]
    fn test_execute_after_request_still_runs() {
        let mut sink = MockActuatorSink::new();
        sink.expect_set_mode().times(8).returning(|_, _| Ok(()));
        sink.expect_set_duty().times(4).returning(|_, _| Ok(()));

        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        sequencer.request();
        assert!(sequencer.execute(&mut sink).is_some());
        assert_eq!(sequencer.state(), ShutdownState::Done);

        // Triggers after completion leave the terminal state alone
        assert!(!sequencer.request());
        assert_eq!(sequencer.state(), ShutdownState::Done);
    }

    #[test]
    fn test_concurrent_execute_runs_once() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::{Arc, Barrier};

        const CALLERS: usize = 8;

        let sequencer = Arc::new(ShutdownSequencer::new(Duration::from_millis(10)));
        let duty_writes = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(CALLERS));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let sequencer = Arc::clone(&sequencer);
                let duty_writes = Arc::clone(&duty_writes);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let mut sink = MockActuatorSink::new();
                    sink.expect_set_mode().returning(|_, _| Ok(()));
                    let writes = Arc::clone(&duty_writes);
                    sink.expect_set_duty().returning(move |_, _| {
                        writes.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    });
                    barrier.wait();
                    sequencer.execute(&mut sink).is_some()
                })
            })
            .collect();

        let executions = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ran| *ran)
            .count();

        assert_eq!(executions, 1);
        assert_eq!(duty_writes.load(Ordering::SeqCst), ActuatorId::COUNT);
        assert_eq!(sequencer.state(), ShutdownState::Done);
    }

    #[test]
    fn test_execute_cancels_token() {
        let mut sink = MockActuatorSink::new();
        sink.expect_set_mode().returning(|_, _| Ok(()));
        sink.expect_set_duty().returning(|_, _| Ok(()));

        let sequencer = ShutdownSequencer::new(Duration::ZERO);
        sequencer.execute(&mut sink);
        assert!(sequencer.is_requested());
    }

    #[test]
    fn test_settle_delay_is_waited() {
        let mut sink = MockActuatorSink::new();
        sink.expect_set_mode().returning(|_, _| Ok(()));
        sink.expect_set_duty().returning(|_, _| Ok(()));

        let sequencer = ShutdownSequencer::new(Duration::from_millis(50));
        let start = std::time::Instant::now();
        sequencer.execute(&mut sink);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
