//! `--list`: every monitor the platform knows about and how it maps to the config

use indexmap::IndexMap;
use std::io::{self, Write};
use tracing::debug;

use crate::engine::IdentityIndex;
use crate::error::ServiceError;
use crate::platform::{DisplayConfigService, QueryScope};

/// One physical monitor as seen through its paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRow {
    pub friendly_name: String,
    pub device_path: String,
    /// `None` when the uid is not in the config
    pub serial: Option<String>,
    pub active: bool,
    pub source_id: u32,
    pub target_id: u32,
}

/// Query all paths and collapse them to one row per device path.
///
/// A monitor with an active path is reported with that path's ids, otherwise
/// with its first path. Targets whose descriptor cannot be read are left out.
pub fn detected_monitors<S>(service: &S, identity: &IdentityIndex) -> Result<Vec<MonitorRow>, ServiceError>
where
    S: DisplayConfigService + ?Sized,
{
    let topology = service.query(QueryScope::All)?;
    let mut rows: IndexMap<String, MonitorRow> = IndexMap::new();

    for path in &topology.paths {
        let descriptor = match service.target_descriptor(path.adapter_id, path.target_id) {
            Ok(d) => d,
            Err(e) => {
                debug!(target_id = path.target_id, error = %e, "no descriptor for target");
                continue;
            }
        };
        if descriptor.device_path.is_truncated() {
            debug!(target_id = path.target_id, "device path truncated");
        }
        let device_path = descriptor.device_path.as_str().to_string();

        if let Some(row) = rows.get_mut(&device_path) {
            if path.active && !row.active {
                row.active = true;
                row.source_id = path.source_id;
                row.target_id = path.target_id;
            }
            continue;
        }

        rows.insert(device_path.clone(), MonitorRow {
            friendly_name: descriptor.friendly_name.to_string(),
            serial: identity.resolve(&device_path).map(str::to_string),
            device_path,
            active: path.active,
            source_id: path.source_id,
            target_id: path.target_id,
        });
    }

    Ok(rows.into_values().collect())
}

pub fn write_rows(out: &mut impl Write, rows: &[MonitorRow]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "no monitors detected");
    }
    for row in rows {
        let name = if row.friendly_name.is_empty() { "(unnamed)" } else { &row.friendly_name };
        writeln!(
            out,
            "{name}\n  serial: {}\n  state:  {}\n  source: {}  target: {}\n  path:   {}",
            row.serial.as_deref().unwrap_or("(not in config)"),
            if row.active { "active" } else { "inactive" },
            row.source_id,
            row.target_id,
            row.device_path,
        )?;
    }
    Ok(())
}
