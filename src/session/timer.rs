use std::collections::HashSet;

/// Discrete countdown events surfaced by one tick. The caller performs the
/// side effects; the timer only tracks what fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    /// A configured warning threshold was reached; carries seconds remaining.
    Warning(u64),
    AutoSave,
    Expired,
}

/// Second-granularity countdown for one exam session. Driven externally by
/// `tick()`, one call per elapsed second, so the same timer serves both the
/// wall-clock runtime and the virtual clock used in replay.
#[derive(Debug, Clone)]
pub(crate) struct SessionTimer {
    total_seconds: u64,
    remaining: u64,
    running: bool,
    warning_thresholds: Vec<u64>,
    warnings_fired: HashSet<u64>,
    auto_save_interval: Option<u64>,
    seconds_since_save: u64,
}

impl SessionTimer {
    pub(crate) fn new(
        total_seconds: u64,
        warning_thresholds: &[u64],
        auto_save_interval: Option<u64>,
    ) -> Self {
        let mut thresholds: Vec<u64> =
            warning_thresholds.iter().copied().filter(|&t| t > 0).collect();
        thresholds.sort_unstable();
        thresholds.dedup();

        Self {
            total_seconds,
            remaining: total_seconds,
            running: false,
            warning_thresholds: thresholds,
            warnings_fired: HashSet::new(),
            auto_save_interval: auto_save_interval.filter(|&interval| interval > 0),
            seconds_since_save: 0,
        }
    }

    pub(crate) fn start(&mut self) {
        // An expired run stays stopped until reset; expiry fires once per run.
        if self.remaining > 0 {
            self.running = true;
        }
    }

    pub(crate) fn pause(&mut self) {
        self.running = false;
    }

    // Restores the full duration and re-arms fired warnings. The engine
    // builds a fresh timer per attempt, so only embedding hosts call this.
    #[allow(dead_code)]
    pub(crate) fn reset(&mut self) {
        self.remaining = self.total_seconds;
        self.running = false;
        self.warnings_fired.clear();
        self.seconds_since_save = 0;
    }

    /// Advances the countdown by one second. Returns the events that fired
    /// on this tick, warnings before expiry. A paused or expired timer is a
    /// no-op.
    pub(crate) fn tick(&mut self) -> Vec<TimerEvent> {
        if !self.is_running() || self.is_expired() {
            return Vec::new();
        }

        self.remaining -= 1;
        let mut events = Vec::new();

        for &threshold in &self.warning_thresholds {
            if self.remaining == threshold && self.warnings_fired.insert(threshold) {
                events.push(TimerEvent::Warning(threshold));
            }
        }

        if self.remaining > 0 {
            if let Some(interval) = self.auto_save_interval {
                self.seconds_since_save += 1;
                if self.seconds_since_save >= interval {
                    self.seconds_since_save = 0;
                    events.push(TimerEvent::AutoSave);
                }
            }
        } else {
            self.running = false;
            events.push(TimerEvent::Expired);
        }

        events
    }

    pub(crate) fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// In-session display format: `H:MM:SS` past the hour mark, `M:SS` below.
    pub(crate) fn format_remaining(&self) -> String {
        let hours = self.remaining / 3600;
        let minutes = (self.remaining % 3600) / 60;
        let seconds = self.remaining % 60;

        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}
