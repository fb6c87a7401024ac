//! Engine events and timing seams
//!
//! The engine reports every step as an [`EngineEvent`] rather than logging
//! directly, and sleeps through a [`Sleeper`], so tests can observe both
//! without capturing output or waiting.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{AttemptError, Mismatch, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    AttemptStarted {
        mode: String,
        attempt: usize,
        max_attempts: usize,
    },
    CatalogBuilt {
        paths: usize,
        serials: Vec<String>,
    },
    /// A path whose target could not be identified was left out of the catalog
    PathSkipped {
        index: usize,
        reason: String,
    },
    PathSelected {
        serial: String,
        name: String,
        path_index: usize,
        source_id: u32,
        /// Every candidate's source was already claimed; the output may clone
        forced_collision: bool,
    },
    /// Advisory only, the apply call still goes ahead
    ValidationRejected(ServiceError),
    Applied {
        paths: usize,
        modes: usize,
    },
    Verified {
        active: Vec<String>,
        mismatches: Vec<Mismatch>,
    },
    AttemptFailed {
        attempt: usize,
        error: AttemptError,
    },
    BackingOff(Duration),
    Succeeded {
        mode: String,
        attempt: usize,
    },
    RestoreIssued(Result<(), ServiceError>),
}

/// Destination for engine events
pub trait EventSink {
    fn emit(&mut self, event: EngineEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::AttemptStarted { mode, attempt, max_attempts } => {
                info!(mode = %mode, attempt, max_attempts, "applying mode");
            }
            EngineEvent::CatalogBuilt { paths, serials } => {
                debug!(paths, serials = ?serials, "built path catalog");
            }
            EngineEvent::PathSkipped { index, reason } => {
                debug!(index, reason = %reason, "skipping path");
            }
            EngineEvent::PathSelected { serial, name, path_index, source_id, forced_collision } => {
                if forced_collision {
                    warn!(serial = %serial, name = %name, path_index, source_id, "no unused source left, display may be cloned");
                } else {
                    info!(serial = %serial, name = %name, path_index, source_id, "selected path");
                }
            }
            EngineEvent::ValidationRejected(e) => {
                warn!(error = %e, "validation rejected configuration, applying anyway");
            }
            EngineEvent::Applied { paths, modes } => {
                info!(paths, modes, "configuration applied");
            }
            EngineEvent::Verified { active, mismatches } => {
                if mismatches.is_empty() {
                    info!(active = ?active, "display state verified");
                } else {
                    for m in &mismatches {
                        warn!(serial = %m.serial, expected = m.expected_active, actual = m.actual_active, "display state mismatch");
                    }
                }
            }
            EngineEvent::AttemptFailed { attempt, error } => {
                warn!(attempt, error = %error, "attempt failed");
            }
            EngineEvent::BackingOff(delay) => {
                debug!(delay_ms = delay.as_millis() as u64, "waiting before next attempt");
            }
            EngineEvent::Succeeded { mode, attempt } => {
                info!(mode = %mode, attempt, "mode applied");
            }
            EngineEvent::RestoreIssued(Ok(())) => {
                warn!("restored last known good configuration");
            }
            EngineEvent::RestoreIssued(Err(e)) => {
                error!(error = %e, "restoring last known good configuration failed");
            }
        }
    }
}

/// Collects events in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<EngineEvent>,
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }
}

/// Blocking delay
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without waiting
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pub delays: Vec<Duration>,
}

#[cfg(test)]
impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.delays.push(duration);
    }
}
