//! Stable monitor identity
//!
//! Platform device paths look like `\\?\DISPLAY#DEL41A8#5&2b3c9d1&0&UID4352#{e6f07b5f-...}`.
//! The third `#` field survives reboots and port swaps, so it is what the
//! config's `uid` matches against.

use std::collections::HashMap;

use crate::config::MonitorDefinition;
use crate::constants::display::{DEVICE_PATH_SEPARATOR, DEVICE_PATH_UID_FIELD};

/// Case-insensitive map from device path uid segment to configured serial
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    by_uid: HashMap<String, String>,
}

impl IdentityIndex {
    pub fn new<'a>(monitors: impl IntoIterator<Item = &'a MonitorDefinition>) -> Self {
        let by_uid = monitors
            .into_iter()
            .map(|m| (m.uid.to_lowercase(), m.serial.clone()))
            .collect();
        Self { by_uid }
    }

    /// Serial for a device path, `None` when unparseable or not configured
    pub fn resolve(&self, device_path: &str) -> Option<&str> {
        let uid = uid_segment(device_path)?;
        self.by_uid.get(&uid.to_lowercase()).map(String::as_str)
    }
}

/// Third `#`-delimited field of a device path
pub fn uid_segment(device_path: &str) -> Option<&str> {
    device_path
        .split(DEVICE_PATH_SEPARATOR)
        .nth(DEVICE_PATH_UID_FIELD)
        .filter(|segment| !segment.is_empty())
}
