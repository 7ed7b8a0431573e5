//! Session state and the threshold/latch decision.

use super::events::Severity;
use crate::automation::TriggerKey;
use crate::vision::template::GaugeKind;

/// Fill percentages at or below this are indistinguishable from "no orb".
///
/// Treating them as not detected can hide a truly empty gauge; the boundary
/// is kept as is because moving it changes when the trigger fires.
pub const EMPTY_FLOOR_PERCENT: f64 = 0.1;

pub const STATUS_PROTECTED: &str = "PROTECTED";
pub const STATUS_UNPROTECTED: &str = "UNPROTECTED";
pub const STATUS_NOT_DETECTED: &str = "Orbs not detected";
pub const STATUS_STOPPED: &str = "Monitoring stopped";

/// Outcome of one sampling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Template confidence below the localization threshold.
    Miss,
    /// Template found; percentage of the orb matching the gauge colour.
    Filled(f64),
}

/// What a cycle decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NotDetected,
    Protected,
    Trigger,
}

impl Verdict {
    pub fn status(self) -> (&'static str, Severity) {
        match self {
            Verdict::NotDetected => (STATUS_NOT_DETECTED, Severity::Info),
            Verdict::Protected => (STATUS_PROTECTED, Severity::Safe),
            Verdict::Trigger => (STATUS_UNPROTECTED, Severity::Danger),
        }
    }
}

/// Classify a reading against `threshold_percent`.
///
/// `(EMPTY_FLOOR_PERCENT, threshold]` triggers; anything above the
/// threshold is protected; the rest counts as not detected.
pub fn judge(reading: Reading, threshold_percent: f64) -> Verdict {
    match reading {
        Reading::Miss => Verdict::NotDetected,
        Reading::Filled(p) if p > threshold_percent => Verdict::Protected,
        Reading::Filled(p) if p > EMPTY_FLOOR_PERCENT => Verdict::Trigger,
        Reading::Filled(_) => Verdict::NotDetected,
    }
}

/// Values supplied by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    pub gauge: GaugeKind,
    pub threshold_percent: u32,
    pub trigger_key: TriggerKey,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            gauge: GaugeKind::Mana,
            threshold_percent: crate::settings::DEFAULT_THRESHOLD,
            trigger_key: TriggerKey::Esc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sampling,
    /// Trigger fired; terminal until the next start.
    Halted,
}

/// Per-engine session state.
///
/// `phase` and `latched` are written by start/stop and by the worker on
/// halt. `threshold_percent` and `trigger_key` are fixed for a run;
/// `gauge` may change at any time and is read once per cycle.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub latched: bool,
    pub threshold_percent: u32,
    pub trigger_key: TriggerKey,
    pub gauge: GaugeKind,
}

impl SessionState {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            phase: Phase::Idle,
            latched: false,
            threshold_percent: config.threshold_percent,
            trigger_key: config.trigger_key,
            gauge: config.gauge,
        }
    }

    /// Enter a fresh run: reset the latch and take the run's settings.
    pub fn begin(&mut self, config: GuardConfig) {
        self.phase = Phase::Sampling;
        self.latched = false;
        self.threshold_percent = config.threshold_percent;
        self.trigger_key = config.trigger_key;
        self.gauge = config.gauge;
    }

    pub fn halt(&mut self) {
        self.latched = true;
        self.phase = Phase::Halted;
    }

    pub fn stop(&mut self) {
        if self.phase == Phase::Sampling {
            self.phase = Phase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_threshold_is_protected() {
        assert_eq!(judge(Reading::Filled(50.0), 10.0), Verdict::Protected);
        assert_eq!(judge(Reading::Filled(10.01), 10.0), Verdict::Protected);
    }

    #[test]
    fn threshold_itself_triggers() {
        assert_eq!(judge(Reading::Filled(10.0), 10.0), Verdict::Trigger);
        assert_eq!(judge(Reading::Filled(5.0), 10.0), Verdict::Trigger);
        assert_eq!(judge(Reading::Filled(0.11), 10.0), Verdict::Trigger);
    }

    #[test]
    fn near_zero_is_not_detected() {
        assert_eq!(judge(Reading::Filled(0.1), 10.0), Verdict::NotDetected);
        assert_eq!(judge(Reading::Filled(0.05), 10.0), Verdict::NotDetected);
        assert_eq!(judge(Reading::Filled(0.0), 10.0), Verdict::NotDetected);
    }

    #[test]
    fn miss_is_not_detected() {
        assert_eq!(judge(Reading::Miss, 10.0), Verdict::NotDetected);
    }

    #[test]
    fn verdict_statuses() {
        assert_eq!(Verdict::Protected.status(), ("PROTECTED", Severity::Safe));
        assert_eq!(Verdict::Trigger.status(), ("UNPROTECTED", Severity::Danger));
        assert_eq!(Verdict::NotDetected.status().1, Severity::Info);
    }

    #[test]
    fn begin_resets_latch_and_snapshots_config() {
        let mut state = SessionState::new(GuardConfig::default());
        state.begin(GuardConfig::default());
        state.halt();
        assert!(state.latched);
        assert_eq!(state.phase, Phase::Halted);

        let config = GuardConfig {
            gauge: GaugeKind::Life,
            threshold_percent: 30,
            trigger_key: TriggerKey::F9,
        };
        state.begin(config);
        assert!(!state.latched);
        assert_eq!(state.phase, Phase::Sampling);
        assert_eq!(state.threshold_percent, 30);
        assert_eq!(state.trigger_key, TriggerKey::F9);
        assert_eq!(state.gauge, GaugeKind::Life);
    }

    #[test]
    fn stop_does_not_leave_halted() {
        let mut state = SessionState::new(GuardConfig::default());
        state.begin(GuardConfig::default());
        state.halt();
        state.stop();
        assert_eq!(state.phase, Phase::Halted);
    }
}
