//! Path catalog: every path the platform knows about, grouped by monitor serial

use std::collections::{BTreeMap, BTreeSet};

use super::events::{EngineEvent, EventSink};
use super::identity::IdentityIndex;
use crate::error::AttemptError;
use crate::platform::{DisplayConfigService, PathRecord, QueryScope, Topology};

/// Serial → candidate path positions, active paths first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateIndex {
    by_serial: BTreeMap<String, Vec<usize>>,
}

impl CandidateIndex {
    /// Group path positions by serial. Within a group active paths come first,
    /// otherwise catalog order is kept.
    pub fn from_resolved(paths: &[PathRecord], serials: &[(usize, String)]) -> Self {
        let mut by_serial: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, serial) in serials {
            by_serial.entry(serial.clone()).or_default().push(*index);
        }
        for group in by_serial.values_mut() {
            group.sort_by_key(|&i| !paths[i].active);
        }
        Self { by_serial }
    }

    pub fn candidates(&self, serial: &str) -> Option<&[usize]> {
        self.by_serial.get(serial).map(Vec::as_slice)
    }

    /// Known serials, sorted
    pub fn serials(&self) -> Vec<String> {
        self.by_serial.keys().cloned().collect()
    }

    #[cfg(test)]
    pub fn insert(&mut self, serial: &str, candidates: Vec<usize>) {
        self.by_serial.insert(serial.to_string(), candidates);
    }
}

/// Full topology plus its candidate index
#[derive(Debug, Clone)]
pub struct PathCatalog {
    pub topology: Topology,
    pub candidates: CandidateIndex,
}

impl PathCatalog {
    pub fn paths(&self) -> &[PathRecord] {
        &self.topology.paths
    }
}

/// Serial of each path that can be identified. Targets whose descriptor
/// cannot be read or whose uid is not configured are skipped.
fn resolve_serials<S, E>(
    service: &S,
    identity: &IdentityIndex,
    paths: &[PathRecord],
    sink: &mut E,
) -> Vec<(usize, String)>
where
    S: DisplayConfigService + ?Sized,
    E: EventSink + ?Sized,
{
    let mut resolved = Vec::new();
    for (index, path) in paths.iter().enumerate() {
        let descriptor = match service.target_descriptor(path.adapter_id, path.target_id) {
            Ok(d) => d,
            Err(e) => {
                sink.emit(EngineEvent::PathSkipped { index, reason: e.to_string() });
                continue;
            }
        };
        match identity.resolve(descriptor.device_path.as_str()) {
            Some(serial) => resolved.push((index, serial.to_string())),
            None => sink.emit(EngineEvent::PathSkipped {
                index,
                reason: format!("monitor '{}' not in config", descriptor.friendly_name),
            }),
        }
    }
    resolved
}

/// Query every path, active or not, and index them by serial.
/// Inactive paths are needed to turn disabled monitors back on.
pub fn build_catalog<S, E>(
    service: &S,
    identity: &IdentityIndex,
    sink: &mut E,
) -> Result<PathCatalog, AttemptError>
where
    S: DisplayConfigService + ?Sized,
    E: EventSink + ?Sized,
{
    let topology = service.query(QueryScope::All).map_err(AttemptError::Query)?;
    let serials = resolve_serials(service, identity, &topology.paths, sink);
    let candidates = CandidateIndex::from_resolved(&topology.paths, &serials);

    sink.emit(EngineEvent::CatalogBuilt {
        paths: topology.paths.len(),
        serials: candidates.serials(),
    });
    Ok(PathCatalog { topology, candidates })
}

/// Serials of the monitors currently driven by an active path
pub fn active_serials<S, E>(
    service: &S,
    identity: &IdentityIndex,
    sink: &mut E,
) -> Result<BTreeSet<String>, AttemptError>
where
    S: DisplayConfigService + ?Sized,
    E: EventSink + ?Sized,
{
    let topology = service.query(QueryScope::ActiveOnly).map_err(AttemptError::Query)?;
    Ok(resolve_serials(service, identity, &topology.paths, sink)
        .into_iter()
        .map(|(_, serial)| serial)
        .collect())
}
