//! In-memory display configuration service for tests

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::MonitorDefinition;
use crate::engine::identity::IdentityIndex;
use crate::error::{ServiceCall, ServiceError};
use crate::platform::{
    AdapterId, ApplyFlags, BufferSizes, DevicePath, DisplayConfigService, DisplayConfiguration,
    FriendlyName, PathRecord, QueryScope, TargetDescriptor, Topology,
};

/// ERROR_GEN_FAILURE
const GEN_FAILURE: i32 = 31;
/// ERROR_INSUFFICIENT_BUFFER
const INSUFFICIENT_BUFFER: i32 = 122;

#[derive(Debug, Clone)]
struct FakeMonitor {
    serial: String,
    uid: String,
}

/// Simulated platform: a fixed catalog of paths with a live active set and a
/// persisted database the restore call goes back to
#[derive(Debug, Default)]
pub struct FakeService {
    paths: Vec<PathRecord>,
    monitors: HashMap<u32, FakeMonitor>,
    database: Vec<bool>,
    failing_probes: Cell<usize>,
    failing_descriptors: HashSet<u32>,
    ignored_targets: HashSet<u32>,
    pub validate_status: Option<i32>,
    pub commit_status: Option<i32>,
    pub restore_status: Option<i32>,
    /// Commit reports success but changes nothing
    pub commit_is_noop: bool,
    /// Every apply call in order
    pub applies: Vec<(ApplyFlags, Option<DisplayConfiguration>)>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog path for the monitor attached to `target_id`
    pub fn add_path(&mut self, serial: &str, uid: &str, source_id: u32, target_id: u32, active: bool) {
        self.monitors.insert(target_id, FakeMonitor {
            serial: serial.to_string(),
            uid: uid.to_string(),
        });
        self.paths.push(PathRecord {
            adapter_id: AdapterId::default(),
            source_id,
            target_id,
            active,
            source_mode_index: None,
            target_mode_index: None,
        });
        self.database.push(active);
    }

    /// Change live state without persisting it
    pub fn set_active(&mut self, index: usize, active: bool) {
        self.paths[index].active = active;
    }

    pub fn fail_next_probes(&mut self, count: usize) {
        self.failing_probes.set(count);
    }

    pub fn fail_descriptor(&mut self, target_id: u32) {
        self.failing_descriptors.insert(target_id);
    }

    /// Monitor on this target never lights up
    pub fn ignore_target(&mut self, target_id: u32) {
        self.ignored_targets.insert(target_id);
    }

    /// Identity index covering every monitor in the fake
    pub fn identity(&self) -> IdentityIndex {
        let defs: Vec<MonitorDefinition> = self
            .monitors
            .values()
            .map(|m| MonitorDefinition {
                serial: m.serial.clone(),
                uid: m.uid.clone(),
                name: m.serial.clone(),
            })
            .collect();
        IdentityIndex::new(&defs)
    }

    pub fn active_serials(&self) -> BTreeSet<String> {
        self.paths
            .iter()
            .filter(|p| p.active)
            .map(|p| self.monitors[&p.target_id].serial.clone())
            .collect()
    }

    pub fn last_commit(&self) -> Option<&DisplayConfiguration> {
        self.applies
            .iter()
            .rev()
            .find(|(flags, _)| flags.commit && !flags.restore_from_database)
            .and_then(|(_, config)| config.as_ref())
    }

    fn scoped_paths(&self, scope: QueryScope) -> Vec<PathRecord> {
        self.paths
            .iter()
            .filter(|p| scope == QueryScope::All || p.active)
            .cloned()
            .collect()
    }

    fn commit(&mut self, config: &DisplayConfiguration, persist: bool) {
        if self.commit_is_noop {
            return;
        }
        for path in &mut self.paths {
            path.active = !self.ignored_targets.contains(&path.target_id)
                && config.paths.iter().any(|c| {
                    c.active
                        && c.adapter_id == path.adapter_id
                        && c.source_id == path.source_id
                        && c.target_id == path.target_id
                });
        }
        if persist {
            self.database = self.paths.iter().map(|p| p.active).collect();
        }
    }
}

pub fn identity_for(monitors: &[(&str, &str)]) -> IdentityIndex {
    let defs: Vec<MonitorDefinition> = monitors
        .iter()
        .map(|(serial, uid)| MonitorDefinition {
            serial: serial.to_string(),
            uid: uid.to_string(),
            name: serial.to_string(),
        })
        .collect();
    IdentityIndex::new(&defs)
}

impl DisplayConfigService for FakeService {
    fn size_probe(&self, scope: QueryScope) -> Result<BufferSizes, ServiceError> {
        let failing = self.failing_probes.get();
        if failing > 0 {
            self.failing_probes.set(failing - 1);
            return Err(ServiceError::status(ServiceCall::SizeProbe, GEN_FAILURE));
        }
        Ok(BufferSizes {
            paths: self.scoped_paths(scope).len() as u32,
            modes: 0,
        })
    }

    fn query_paths(&self, scope: QueryScope, sizes: BufferSizes) -> Result<Topology, ServiceError> {
        let paths = self.scoped_paths(scope);
        if paths.len() as u32 != sizes.paths || sizes.modes != 0 {
            return Err(ServiceError::status(ServiceCall::QueryPaths, INSUFFICIENT_BUFFER));
        }
        Ok(Topology { paths, modes: Vec::new() })
    }

    fn target_descriptor(
        &self,
        _adapter_id: AdapterId,
        target_id: u32,
    ) -> Result<TargetDescriptor, ServiceError> {
        if self.failing_descriptors.contains(&target_id) {
            return Err(ServiceError::status(ServiceCall::TargetDescriptor, GEN_FAILURE));
        }
        let monitor = self
            .monitors
            .get(&target_id)
            .ok_or(ServiceError::status(ServiceCall::TargetDescriptor, GEN_FAILURE))?;
        Ok(TargetDescriptor {
            friendly_name: FriendlyName::from_text(&format!("Fake {}", monitor.serial)),
            device_path: DevicePath::from_text(&format!(
                r"\\?\DISPLAY#FAK{target_id:04}#{}#{{e6f07b5f-ee97-4a90-b076-33f57bf4eaa7}}",
                monitor.uid
            )),
        })
    }

    fn apply(
        &mut self,
        config: Option<&DisplayConfiguration>,
        flags: ApplyFlags,
    ) -> Result<(), ServiceError> {
        self.applies.push((flags, config.cloned()));

        let status = if flags.validate_only {
            self.validate_status
        } else if flags.restore_from_database {
            self.restore_status
        } else {
            self.commit_status
        };
        if let Some(code) = status {
            return Err(ServiceError::status(ServiceCall::Apply, code));
        }

        if flags.restore_from_database {
            for (path, active) in self.paths.iter_mut().zip(&self.database) {
                path.active = *active;
            }
        } else if flags.commit {
            if let Some(config) = config {
                self.commit(config, flags.persist_to_database);
            }
        }
        Ok(())
    }
}
