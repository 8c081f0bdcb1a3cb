use std::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::monitor::ACTIVITY_DROP_SECS;

/// What the monitor should do after a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to do
    Steady,
    /// Idle time is within the warning lead: show the dialog
    StartWarning,
    /// The dialog reported `SAFE`: close it and keep monitoring
    Acknowledged,
    /// Input arrived during the warning; wait briefly for `SAFE` then call `resolve`
    AwaitAcknowledgement,
    /// Input arrived without acknowledgment: lock and capture
    Intrusion,
}

/// Idle/warning state machine, fed one idle reading per poll
pub struct Tracker {
    threshold: f64,
    lead: f64,
    last_idle: f64,
    initialized: bool,
    warning_started: Option<Instant>,
}

impl Tracker {
    pub fn new(threshold: f64, lead: f64) -> Self {
        Self {
            threshold,
            lead,
            last_idle: 0.0,
            initialized: false,
            warning_started: None,
        }
    }

    pub fn warning_active(&self) -> bool {
        self.warning_started.is_some()
    }

    /// Feed the current idle time (seconds) and whether the dialog acknowledged
    pub fn poll(&mut self, idle: f64, acknowledged: bool) -> Verdict {
        if !self.initialized {
            self.last_idle = idle;
            self.initialized = true;
            debug!(idle, "tracker initialized");
            return Verdict::Steady;
        }

        if self.warning_active() {
            if acknowledged {
                info!("SAFE signal received - resetting idle timer");
                self.warning_started = None;
                self.last_idle = idle;
                return Verdict::Acknowledged;
            }

            // The activity may be the owner reaching for the hidden region
            if idle < self.last_idle && self.last_idle - idle > ACTIVITY_DROP_SECS {
                warn!(idle, last_idle = self.last_idle, "activity during warning, checking for SAFE signal");
                return Verdict::AwaitAcknowledgement;
            }

            // The warning stays up until acknowledged or interrupted
            self.last_idle = idle;
            return Verdict::Steady;
        }

        let until_threshold = self.threshold - idle;
        if until_threshold > 0.0 && until_threshold <= self.lead {
            self.warning_started = Some(Instant::now());
            self.last_idle = idle;
            return Verdict::StartWarning;
        }

        if self.last_idle > self.threshold && idle < self.last_idle {
            warn!(idle, last_idle = self.last_idle, "access detected after idle period");
            return Verdict::Intrusion;
        }

        self.last_idle = idle;
        Verdict::Steady
    }

    /// Settle an `AwaitAcknowledgement`. The warning ends either way.
    pub fn resolve(&mut self, acknowledged: bool, idle: f64) -> Verdict {
        self.warning_started = None;
        if acknowledged {
            info!("SAFE signal received after activity - resetting");
            self.last_idle = idle;
            Verdict::Acknowledged
        } else {
            warn!("activity during warning without SAFE signal");
            Verdict::Intrusion
        }
    }

    /// The dialog could not be started; retry on a later poll
    pub fn warning_failed(&mut self) {
        self.warning_started = None;
    }

    /// Forget all readings so the next session starts fresh
    pub fn reset(&mut self) {
        self.last_idle = 0.0;
        self.initialized = false;
        self.warning_started = None;
        info!("state reset - waiting for new session");
    }

    /// One-line console status for the current reading
    pub fn status_line(&self, idle: f64) -> String {
        if let Some(started) = self.warning_started {
            format!(
                "WARNING ACTIVE: {:.0}s elapsed | waiting for acknowledgment",
                started.elapsed().as_secs_f64()
            )
        } else if idle > self.threshold {
            format!("System waiting | Idle: {idle:.0}s | Waiting for activity to lock...")
        } else {
            format!(
                "Monitoring | Idle: {idle:.0}s | Threshold in: {:.0}s",
                self.threshold - idle
            )
        }
    }
}
