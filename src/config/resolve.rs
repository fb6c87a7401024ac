//! Semantic validation and mode resolution
//!
//! Everything the engine relies on about a mode is checked here, before any
//! display call is made.

use std::collections::HashSet;

use super::file::{ConfigFile, DisplayEntry, ModeDefinition};
use crate::error::ConfigError;
use crate::types::{DisplaySpec, ResolvedMode};

/// Listing row for `--modes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSummary {
    pub index: usize,
    pub name: String,
    pub enabled_monitors: Vec<String>,
}

impl ConfigFile {
    /// Collect every semantic problem in the file
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let mut serials = HashSet::new();
        let mut uids = HashSet::new();
        for (alias, monitor) in &self.monitors {
            if monitor.serial.is_empty() {
                problems.push(format!("monitor '{alias}': serial is empty"));
            } else if !serials.insert(monitor.serial.as_str()) {
                problems.push(format!("monitor '{alias}': serial '{}' is used by another monitor", monitor.serial));
            }
            if monitor.uid.is_empty() {
                problems.push(format!("monitor '{alias}': uid is empty"));
            } else if !uids.insert(monitor.uid.to_lowercase()) {
                problems.push(format!("monitor '{alias}': uid '{}' is used by another monitor", monitor.uid));
            }
        }

        for (name, mode) in &self.modes {
            self.validate_mode(name, mode, &mut problems);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    fn validate_mode(&self, name: &str, mode: &ModeDefinition, problems: &mut Vec<String>) {
        let mut seen = HashSet::new();
        let mut enabled = 0;
        let mut primaries = 0;

        for (i, display) in mode.displays.iter().enumerate() {
            let at = format!("mode '{name}' display #{}", i + 1);

            if !self.monitors.contains_key(&display.monitor) {
                problems.push(format!("{at}: unknown monitor '{}'", display.monitor));
            }
            if !seen.insert(display.monitor.as_str()) {
                problems.push(format!("{at}: monitor '{}' appears more than once", display.monitor));
            }

            if !display.enabled {
                continue;
            }
            enabled += 1;

            match display.primary {
                Some(true) => primaries += 1,
                Some(false) => {}
                None => problems.push(format!("{at}: missing 'primary'")),
            }
            for (field, value) in [
                ("width", display.width),
                ("height", display.height),
                ("refreshRate", display.refresh_rate),
            ] {
                match value {
                    None => problems.push(format!("{at}: missing '{field}'")),
                    Some(0) => problems.push(format!("{at}: '{field}' must be nonzero")),
                    Some(_) => {}
                }
            }
            if display.position.is_none() {
                problems.push(format!("{at}: missing 'position'"));
            }
        }

        if enabled == 0 {
            problems.push(format!("mode '{name}': at least one display must be enabled"));
        } else if primaries != 1 {
            problems.push(format!(
                "mode '{name}': exactly one enabled display must be primary (found {primaries})"
            ));
        }
    }

    /// Find a mode by exact name, then by 1-based index in file order
    pub fn find_mode(&self, requested: &str) -> Result<(&str, &ModeDefinition), ConfigError> {
        if let Some((name, mode)) = self.modes.get_key_value(requested) {
            return Ok((name.as_str(), mode));
        }

        requested
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.modes.get_index(i))
            .map(|(name, mode)| (name.as_str(), mode))
            .ok_or_else(|| ConfigError::UnknownMode {
                requested: requested.to_string(),
                available: self.modes.keys().cloned().collect(),
            })
    }

    /// Look up a mode and turn its entries into display specs
    pub fn resolve_mode(&self, requested: &str) -> Result<ResolvedMode, ConfigError> {
        let (name, mode) = self.find_mode(requested)?;
        let displays = mode
            .displays
            .iter()
            .map(|entry| self.resolve_display(name, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedMode {
            name: name.to_string(),
            displays,
        })
    }

    fn resolve_display(&self, mode: &str, entry: &DisplayEntry) -> Result<DisplaySpec, ConfigError> {
        let monitor = self.monitors.get(&entry.monitor).ok_or_else(|| {
            ConfigError::Invalid(vec![format!("mode '{mode}': unknown monitor '{}'", entry.monitor)])
        })?;

        Ok(DisplaySpec {
            serial: monitor.serial.clone(),
            display_name: monitor.name.clone(),
            enabled: entry.enabled,
            is_primary: entry.enabled && entry.primary.unwrap_or(false),
            width: entry.width.unwrap_or(0),
            height: entry.height.unwrap_or(0),
            refresh_rate: entry.refresh_rate.unwrap_or(0),
            position: entry.position.unwrap_or_default(),
        })
    }

    pub fn mode_summaries(&self) -> Vec<ModeSummary> {
        self.modes
            .iter()
            .enumerate()
            .map(|(i, (name, mode))| ModeSummary {
                index: i + 1,
                name: name.clone(),
                enabled_monitors: mode
                    .displays
                    .iter()
                    .filter(|d| d.enabled)
                    .map(|d| {
                        self.monitors
                            .get(&d.monitor)
                            .map_or_else(|| d.monitor.clone(), |m| m.name.clone())
                    })
                    .collect(),
            })
            .collect()
    }
}
