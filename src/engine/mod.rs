//! Mode switching engine
//!
//! - **identity**: device path uid segment to configured serial
//! - **catalog**: every known path, grouped by serial
//! - **selector**: one path per enabled display, sources kept unique
//! - **builder**: path and mode arrays for the apply call
//! - **controller**: validate, commit, settle and verify
//! - **supervisor**: retries with backoff and the final restore
//! - **events**: event sink and sleeper seams

pub mod builder;
pub mod catalog;
pub mod controller;
pub mod events;
pub mod identity;
pub mod selector;
pub mod supervisor;

pub use identity::IdentityIndex;
pub use supervisor::{ApplyOutcome, Supervisor};
