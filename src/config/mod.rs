//! Configuration management for monitor-modes
//!
//! This module provides the JSON config model and its validation:
//! - **file**: serde model of the config file plus discovery and loading
//! - **resolve**: semantic checks and mode lookup producing display specs

pub mod file;
pub mod resolve;

// Re-export commonly used types
pub use file::{ConfigFile, MonitorDefinition};
