//! Retry and restore around the whole apply pipeline
//!
//! ```text
//! Idle -> Attempting(1) -> Success
//!              | fail, back off
//!         Attempting(2) -> Success
//!              | fail, back off
//!         Attempting(3) -> Success
//!              | fail
//!         Restoring -> Failed
//! ```

use std::time::Duration;

use super::builder::build_configuration;
use super::catalog::build_catalog;
use super::controller::apply_and_verify;
use super::events::{EngineEvent, EventSink, Sleeper, ThreadSleeper, TracingSink};
use super::identity::IdentityIndex;
use super::selector::select_paths;
use crate::constants::retry::{BACKOFF_MS, MAX_ATTEMPTS};
use crate::error::{AttemptError, ServiceError};
use crate::platform::{ApplyFlags, DisplayConfigService};
use crate::types::ResolvedMode;

/// Final verdict of [`Supervisor::apply_mode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        attempt: usize,
    },
    Failed {
        last_error: AttemptError,
        /// Result of the last-known-good restore; does not change the verdict
        restore: Result<(), ServiceError>,
    },
}

impl ApplyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }
}

pub struct Supervisor<S, Z = ThreadSleeper, E = TracingSink> {
    service: S,
    identity: IdentityIndex,
    sleeper: Z,
    sink: E,
}

impl<S: DisplayConfigService> Supervisor<S> {
    pub fn new(service: S, identity: IdentityIndex) -> Self {
        Self::with_seams(service, identity, ThreadSleeper, TracingSink)
    }
}

impl<S, Z, E> Supervisor<S, Z, E>
where
    S: DisplayConfigService,
    Z: Sleeper,
    E: EventSink,
{
    pub fn with_seams(service: S, identity: IdentityIndex, sleeper: Z, sink: E) -> Self {
        Self { service, identity, sleeper, sink }
    }

    /// Apply a mode with up to [`MAX_ATTEMPTS`] attempts, restoring the
    /// platform's last known good configuration if they all fail
    pub fn apply_mode(&mut self, mode: &ResolvedMode) -> ApplyOutcome {
        let mut attempt = 1;
        let last_error = loop {
            self.sink.emit(EngineEvent::AttemptStarted {
                mode: mode.name.clone(),
                attempt,
                max_attempts: MAX_ATTEMPTS,
            });

            match self.run_attempt(mode) {
                Ok(()) => {
                    self.sink.emit(EngineEvent::Succeeded { mode: mode.name.clone(), attempt });
                    return ApplyOutcome::Applied { attempt };
                }
                Err(error) => {
                    self.sink.emit(EngineEvent::AttemptFailed { attempt, error: error.clone() });
                    if attempt == MAX_ATTEMPTS {
                        break error;
                    }
                }
            }

            let delay = Duration::from_millis(BACKOFF_MS[attempt - 1]);
            self.sink.emit(EngineEvent::BackingOff(delay));
            self.sleeper.sleep(delay);
            attempt += 1;
        };

        let restore = self.service.apply(None, ApplyFlags::restore());
        self.sink.emit(EngineEvent::RestoreIssued(restore.clone()));
        ApplyOutcome::Failed { last_error, restore }
    }

    /// One pass of catalog, select, build, apply and verify. The catalog is
    /// queried fresh every time.
    fn run_attempt(&mut self, mode: &ResolvedMode) -> Result<(), AttemptError> {
        let catalog = build_catalog(&self.service, &self.identity, &mut self.sink)?;
        let enabled = mode.enabled();
        let selection = select_paths(&enabled, &catalog.candidates, catalog.paths())?;
        for assignment in &selection.assignments {
            self.sink.emit(EngineEvent::PathSelected {
                serial: assignment.display.serial.clone(),
                name: assignment.display.display_name.clone(),
                path_index: assignment.path_index,
                source_id: assignment.source_id,
                forced_collision: assignment.forced_collision,
            });
        }

        let config = build_configuration(&selection, catalog.paths());
        apply_and_verify(
            &mut self.service,
            &self.identity,
            &config,
            mode,
            &mut self.sleeper,
            &mut self.sink,
        )
    }

    #[cfg(test)]
    pub fn parts(&self) -> (&S, &Z, &E) {
        (&self.service, &self.sleeper, &self.sink)
    }
}
