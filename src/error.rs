//! Error taxonomy
//!
//! Config errors are caught before the engine runs. Everything that can go
//! wrong inside one apply attempt is an `AttemptError`, which the supervisor
//! absorbs and retries.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration file could not be used
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("no mode named or numbered '{requested}' (available: {})", .available.join(", "))]
    UnknownMode {
        requested: String,
        available: Vec<String>,
    },
}

/// Which external call a service error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    SizeProbe,
    QueryPaths,
    TargetDescriptor,
    Apply,
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceCall::SizeProbe => "size probe",
            ServiceCall::QueryPaths => "path query",
            ServiceCall::TargetDescriptor => "target descriptor",
            ServiceCall::Apply => "apply",
        };
        f.write_str(name)
    }
}

/// Non-success result from the display configuration service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{call} failed with status {code}")]
    Status { call: ServiceCall, code: i32 },

    #[error("display configuration is not supported on this platform")]
    Unsupported,
}

impl ServiceError {
    pub fn status(call: ServiceCall, code: i32) -> Self {
        ServiceError::Status { call, code }
    }
}

/// Observed activity of one monitor disagreed with the mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub serial: String,
    pub expected_active: bool,
    pub actual_active: bool,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = |active: bool| if active { "active" } else { "inactive" };
        write!(
            f,
            "{} expected {} but is {}",
            self.serial,
            state(self.expected_active),
            state(self.actual_active)
        )
    }
}

/// Failure of a single apply attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("monitor {serial} not found among connected displays (available: {})", .available.join(", "))]
    IdentityResolution {
        serial: String,
        available: Vec<String>,
    },

    #[error("no candidate display path for monitor {serial}")]
    Selection { serial: String },

    #[error("querying display paths failed: {0}")]
    Query(#[source] ServiceError),

    #[error("applying display configuration failed: {0}")]
    Apply(#[source] ServiceError),

    #[error("display state after apply does not match the mode: {}", join_mismatches(.0))]
    Verification(Vec<Mismatch>),
}

fn join_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
