//! Unique-source path selection
//!
//! Two targets driven from the same source mirror each other, so each enabled
//! display gets the first candidate whose source is still unclaimed. When every
//! candidate's source is taken the first candidate is used anyway and the
//! collision is left for the platform to resolve under "allow changes".

use std::collections::HashSet;

use super::catalog::CandidateIndex;
use crate::error::AttemptError;
use crate::platform::PathRecord;
use crate::types::DisplaySpec;

/// Chosen path for one enabled display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub display: DisplaySpec,
    pub path_index: usize,
    pub source_id: u32,
    /// No unclaimed source was available
    pub forced_collision: bool,
}

/// One assignment per enabled display, in mode order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub assignments: Vec<Assignment>,
}

impl Selection {
    #[cfg(test)]
    pub fn path_for(&self, serial: &str) -> Option<usize> {
        self.assignments
            .iter()
            .find(|a| a.display.serial == serial)
            .map(|a| a.path_index)
    }
}

/// Assign each enabled display to a catalog path, preferring unclaimed sources.
///
/// Deterministic: displays are taken in the given order and candidates in
/// index order. A display with no candidates fails the whole selection.
pub fn select_paths(
    displays: &[&DisplaySpec],
    candidates: &CandidateIndex,
    paths: &[PathRecord],
) -> Result<Selection, AttemptError> {
    let mut claimed: HashSet<u32> = HashSet::new();
    let mut assignments = Vec::with_capacity(displays.len());

    for display in displays {
        let options = candidates.candidates(&display.serial).ok_or_else(|| {
            AttemptError::IdentityResolution {
                serial: display.serial.clone(),
                available: candidates.serials(),
            }
        })?;
        let first = *options.first().ok_or_else(|| AttemptError::Selection {
            serial: display.serial.clone(),
        })?;

        let unclaimed = options
            .iter()
            .copied()
            .find(|&i| !claimed.contains(&paths[i].source_id));
        let (path_index, forced_collision) = match unclaimed {
            Some(i) => (i, false),
            None => (first, true),
        };

        claimed.insert(paths[path_index].source_id);
        assignments.push(Assignment {
            display: (*display).clone(),
            path_index,
            source_id: paths[path_index].source_id,
            forced_collision,
        });
    }

    Ok(Selection { assignments })
}
