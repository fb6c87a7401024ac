//! Core value types shared by config resolution and the display engine

use serde::{Deserialize, Serialize};

/// Desktop coordinates of a display's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One display entry of a mode, resolved against the monitor definitions.
/// Disabled entries carry zeroed geometry; only `serial` and `enabled` matter for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySpec {
    pub serial: String,
    pub display_name: String,
    pub enabled: bool,
    pub is_primary: bool,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    pub position: Position,
}

impl DisplaySpec {
    /// Enabled display at the given geometry
    pub fn enabled(
        serial: &str,
        width: u32,
        height: u32,
        refresh_rate: u32,
        position: Position,
        is_primary: bool,
    ) -> Self {
        Self {
            serial: serial.to_string(),
            display_name: serial.to_string(),
            enabled: true,
            is_primary,
            width,
            height,
            refresh_rate,
            position,
        }
    }

    /// Display that the mode turns off
    pub fn disabled(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            display_name: serial.to_string(),
            enabled: false,
            is_primary: false,
            width: 0,
            height: 0,
            refresh_rate: 0,
            position: Position::default(),
        }
    }
}

/// A validated mode ready for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMode {
    pub name: String,
    /// Every display of the mode in definition order, enabled and disabled alike
    pub displays: Vec<DisplaySpec>,
}

impl ResolvedMode {
    /// Enabled displays in definition order
    pub fn enabled(&self) -> Vec<&DisplaySpec> {
        self.displays.iter().filter(|d| d.enabled).collect()
    }
}
