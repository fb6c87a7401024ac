//! Builds the path and mode arrays submitted to the platform.
//!
//! Only displays being turned on get a path; anything left out of the arrays
//! is turned off by omission when the configuration is applied with
//! "use supplied configuration only".

use super::selector::Selection;
use crate::constants::display::BITS_PER_PIXEL;
use crate::platform::{
    ConfiguredPath, DisplayConfiguration, ModeEntry, ModeInfo, PathRecord, Rational, Rotation,
    Scaling, ScanLineOrdering, SourceMode, TargetMode,
};

/// One path plus a source mode and a target mode per selected display.
/// Path `k` references modes `2k` (source) and `2k + 1` (target).
pub fn build_configuration(selection: &Selection, paths: &[PathRecord]) -> DisplayConfiguration {
    let mut config = DisplayConfiguration {
        paths: Vec::with_capacity(selection.assignments.len()),
        modes: Vec::with_capacity(selection.assignments.len() * 2),
    };

    for assignment in &selection.assignments {
        let record = &paths[assignment.path_index];
        let display = &assignment.display;
        let source_mode_index = config.modes.len() as u32;

        config.modes.push(ModeEntry {
            adapter_id: record.adapter_id,
            id: record.source_id,
            info: ModeInfo::Source(SourceMode {
                width: display.width,
                height: display.height,
                bits_per_pixel: BITS_PER_PIXEL,
                position_x: display.position.x,
                position_y: display.position.y,
            }),
        });
        config.modes.push(ModeEntry {
            adapter_id: record.adapter_id,
            id: record.target_id,
            info: ModeInfo::Target(TargetMode {
                active_width: display.width,
                active_height: display.height,
                total_width: display.width,
                total_height: display.height,
                vsync: Rational::whole(display.refresh_rate),
                // let the driver pick the horizontal timing
                hsync: Rational::unspecified(),
                scan_line_ordering: ScanLineOrdering::Progressive,
            }),
        });

        config.paths.push(ConfiguredPath {
            adapter_id: record.adapter_id,
            source_id: record.source_id,
            target_id: record.target_id,
            active: true,
            source_mode_index,
            target_mode_index: source_mode_index + 1,
            refresh_rate: Rational::whole(display.refresh_rate),
            rotation: Rotation::Identity,
            scaling: Scaling::Identity,
            scan_line_ordering: ScanLineOrdering::Progressive,
        });
    }

    config
}
