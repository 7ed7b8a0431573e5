//! Status delivery from the sampling worker to the shell.

use crossbeam_channel::Sender;

/// Display category of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Orbs not detected.
    Info,
    /// Gauge above threshold.
    Safe,
    /// Trigger fired, or the run failed.
    Danger,
    /// Idle.
    Neutral,
}

/// Why a run ended without the user pressing stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    /// The trigger fired and the latch is set.
    Halted,
    /// A fatal error ended the run.
    Faulted(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardEvent {
    Status { message: String, severity: Severity },
    RunEnded(RunEnd),
}

/// Receives status updates. Implementations must not block the caller.
pub trait StatusSink: Send {
    fn on_status(&self, message: &str, severity: Severity);

    /// The run stopped by itself; the shell should reset its toggle.
    fn on_run_ended(&self, _end: RunEnd) {}
}

impl StatusSink for Sender<GuardEvent> {
    fn on_status(&self, message: &str, severity: Severity) {
        // A closed channel means the shell is gone; nothing left to tell.
        let _ = self.send(GuardEvent::Status {
            message: message.to_string(),
            severity,
        });
    }

    fn on_run_ended(&self, end: RunEnd) {
        let _ = self.send(GuardEvent::RunEnded(end));
    }
}
