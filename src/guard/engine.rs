//! # Decision Engine
//!
//! Runs the sampling loop on a dedicated thread:
//!
//! ```text
//! Idle --start--> Sampling --stop--> Idle
//!                    |  \
//!                    |   `--capture failure--> Idle (run ends, reported)
//!                    `--fill in (0.1, threshold]--> Halted (key pressed once)
//! ```
//!
//! ## Threading
//! - The run flag is the only cancellation signal. It is checked at the top
//!   of each cycle, so a stop lands at the next cycle boundary.
//! - The worker owns the probe, emitter and sink while a run is active and
//!   is handed back when the thread is joined. `stop()` joins before
//!   returning and `start()` joins any worker that halted on its own, so two
//!   loops never coexist and no thread is leaked.
//! - Status goes out through the [`StatusSink`]; the worker never waits on
//!   the shell.

use super::events::{RunEnd, Severity, StatusSink};
use super::probe::GaugeProbe;
use super::session::{self, GuardConfig, Phase, SessionState, Verdict};
use crate::automation::ActionEmitter;
use crate::error::{GuardError, GuardResult};
use crate::vision::template::GaugeKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Pause between cycles. Not corrected for time spent inside a cycle.
pub const CYCLE_INTERVAL: Duration = Duration::from_millis(300);

/// State shared between the controller and the sampling thread.
struct Shared {
    running: AtomicBool,
    state: Mutex<SessionState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
}

struct Worker<P, E, S> {
    probe: P,
    emitter: E,
    sink: S,
    shared: Arc<Shared>,
    cadence: Duration,
}

impl<P: GaugeProbe, E: ActionEmitter, S: StatusSink> Worker<P, E, S> {
    fn run(mut self) -> Self {
        log::info!(">>> Monitor thread started.");

        while self.shared.is_running() {
            match self.cycle() {
                Ok(Flow::Continue) => self.pause(),
                Ok(Flow::Halt) => break,
                Err(e) => {
                    self.fault(e);
                    break;
                }
            }
        }

        log::info!(">>> Monitor thread terminated.");
        self
    }

    /// One capture → locate → classify → decide pass.
    fn cycle(&mut self) -> GuardResult<Flow> {
        let (gauge, threshold, key) = {
            let state = self.shared.state();
            (state.gauge, state.threshold_percent, state.trigger_key)
        };

        let reading = self.probe.probe(gauge)?;
        let verdict = session::judge(reading, threshold as f64);
        let (message, severity) = verdict.status();
        self.sink.on_status(message, severity);

        if verdict != Verdict::Trigger {
            return Ok(Flow::Continue);
        }

        log::info!(
            "*** {} below {}%! Pressing {} ***",
            gauge.label(),
            threshold,
            key
        );
        self.emitter.press_key(key);
        {
            // Latch and stop together so no observer sees one without the other.
            let mut state = self.shared.state();
            state.halt();
            self.shared.running.store(false, Ordering::SeqCst);
        }
        self.sink.on_run_ended(RunEnd::Halted);
        Ok(Flow::Halt)
    }

    fn fault(&mut self, error: GuardError) {
        log::error!("Monitoring aborted: {}", error);
        {
            let mut state = self.shared.state();
            state.stop();
            self.shared.running.store(false, Ordering::SeqCst);
        }
        let reason = error.to_string();
        self.sink.on_status(&capitalize(&reason), Severity::Danger);
        self.sink.on_run_ended(RunEnd::Faulted(reason));
    }

    /// Sleep for one cadence, waking early only if the run was cancelled.
    fn pause(&self) {
        let deadline = Instant::now() + self.cadence;
        while self.shared.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Start/stop controller around the sampling worker.
pub struct DecisionEngine<P, E, S> {
    shared: Arc<Shared>,
    sink: S,
    worker: Option<Worker<P, E, S>>,
    handle: Option<JoinHandle<Worker<P, E, S>>>,
}

impl<P, E, S> DecisionEngine<P, E, S>
where
    P: GaugeProbe + 'static,
    E: ActionEmitter + 'static,
    S: StatusSink + Clone + 'static,
{
    pub fn new(probe: P, emitter: E, sink: S, config: GuardConfig) -> Self {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(false),
            state: Mutex::new(SessionState::new(config)),
        });
        let worker = Worker {
            probe,
            emitter,
            sink: sink.clone(),
            shared: shared.clone(),
            cadence: CYCLE_INTERVAL,
        };
        Self {
            shared,
            sink,
            worker: Some(worker),
            handle: None,
        }
    }

    /// Override the pause between cycles.
    #[cfg(test)]
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        if let Some(worker) = self.worker.as_mut() {
            worker.cadence = cadence;
        }
        self
    }

    /// Begin a run. Returns `Ok(false)` if a run is already active.
    pub fn start(&mut self, config: GuardConfig) -> GuardResult<bool> {
        if self.shared.is_running() {
            return Ok(false);
        }
        self.reclaim()?;
        let worker = self.worker.take().ok_or(GuardError::WorkerPanicked)?;

        {
            let mut state = self.shared.state();
            state.begin(config);
            self.shared.running.store(true, Ordering::SeqCst);
        }
        log::info!(
            "Monitoring {} (threshold {}%, key {})",
            config.gauge,
            config.threshold_percent,
            config.trigger_key
        );

        self.handle = Some(thread::spawn(move || worker.run()));
        Ok(true)
    }

    /// Cancel the active run, if any, and wait for the worker to exit.
    ///
    /// A run that halted or faulted in the meantime keeps its final status.
    pub fn stop(&mut self) -> GuardResult<()> {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
        self.reclaim()?;

        let stopped = {
            let mut state = self.shared.state();
            let sampling = state.phase == Phase::Sampling;
            state.stop();
            sampling
        };
        if stopped {
            log::info!("Monitoring stopped.");
            self.sink.on_status(session::STATUS_STOPPED, Severity::Neutral);
        }
        Ok(())
    }

    fn reclaim(&mut self) -> GuardResult<()> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(worker) => self.worker = Some(worker),
                Err(_) => {
                    log::error!("Sampling worker panicked");
                    return Err(GuardError::WorkerPanicked);
                }
            }
        }
        Ok(())
    }
}

impl<P, E, S> DecisionEngine<P, E, S> {
    /// Select the gauge; takes effect at the next cycle.
    pub fn set_gauge(&self, gauge: GaugeKind) {
        self.shared.state().gauge = gauge;
    }

    pub fn phase(&self) -> Phase {
        self.shared.state().phase
    }

    pub fn is_latched(&self) -> bool {
        self.shared.state().latched
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

impl<P, E, S> Drop for DecisionEngine<P, E, S> {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}
