//! Native backend over the Windows display configuration API (CCD)

use std::mem;

use tracing::{debug, trace};
use windows::Win32::Devices::Display::{
    DisplayConfigGetDeviceInfo, GetDisplayConfigBufferSizes, QueryDisplayConfig, SetDisplayConfig,
    DISPLAYCONFIG_2DREGION, DISPLAYCONFIG_SOURCE_MODE, DISPLAYCONFIG_TARGET_MODE,
    DISPLAYCONFIG_VIDEO_SIGNAL_INFO,
    DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME, DISPLAYCONFIG_DEVICE_INFO_HEADER,
    DISPLAYCONFIG_MODE_INFO, DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE,
    DISPLAYCONFIG_MODE_INFO_TYPE_TARGET, DISPLAYCONFIG_PATH_INFO, DISPLAYCONFIG_RATIONAL,
    DISPLAYCONFIG_ROTATION, DISPLAYCONFIG_ROTATION_IDENTITY, DISPLAYCONFIG_ROTATION_ROTATE180,
    DISPLAYCONFIG_ROTATION_ROTATE270, DISPLAYCONFIG_ROTATION_ROTATE90, DISPLAYCONFIG_SCALING,
    DISPLAYCONFIG_SCALING_ASPECTRATIOCENTEREDMAX, DISPLAYCONFIG_SCALING_CENTERED,
    DISPLAYCONFIG_SCALING_IDENTITY, DISPLAYCONFIG_SCALING_PREFERRED,
    DISPLAYCONFIG_SCALING_STRETCHED, DISPLAYCONFIG_SCANLINE_ORDERING,
    DISPLAYCONFIG_SCANLINE_ORDERING_INTERLACED, DISPLAYCONFIG_SCANLINE_ORDERING_PROGRESSIVE,
    DISPLAYCONFIG_SCANLINE_ORDERING_UNSPECIFIED, DISPLAYCONFIG_TARGET_DEVICE_NAME,
    DISPLAYCONFIG_PIXELFORMAT, DISPLAYCONFIGPIXELFORMAT_16BPP, DISPLAYCONFIGPIXELFORMAT_24BPP,
    DISPLAYCONFIGPIXELFORMAT_32BPP, DISPLAYCONFIGPIXELFORMAT_8BPP,
};
use windows::Win32::Foundation::{ERROR_SUCCESS, LUID, POINTL};
use windows::Win32::Graphics::Gdi::{
    QDC_ALL_PATHS, QDC_ONLY_ACTIVE_PATHS, QUERY_DISPLAY_CONFIG_FLAGS, SDC_ALLOW_CHANGES,
    SDC_APPLY, SDC_SAVE_TO_DATABASE, SDC_USE_DATABASE_CURRENT, SDC_USE_SUPPLIED_DISPLAY_CONFIG,
    SDC_VALIDATE, SET_DISPLAY_CONFIG_FLAGS,
};

use super::{
    AdapterId, ApplyFlags, BufferSizes, ConfiguredPath, DevicePath, DisplayConfigService,
    DisplayConfiguration, FriendlyName, ModeEntry, ModeInfo, PathRecord, QueryScope, Rational,
    Rotation, Scaling, ScanLineOrdering, SourceMode, TargetDescriptor, TargetMode, Topology,
};
use crate::error::{ServiceCall, ServiceError};

const PATH_ACTIVE: u32 = 0x0000_0001;
const MODE_IDX_INVALID: u32 = 0xffff_ffff;

/// Display configuration service backed by `QueryDisplayConfig`/`SetDisplayConfig`
#[derive(Debug, Default)]
pub struct NativeService;

impl NativeService {
    pub fn new() -> Self {
        Self
    }
}

fn query_flags(scope: QueryScope) -> QUERY_DISPLAY_CONFIG_FLAGS {
    match scope {
        QueryScope::All => QDC_ALL_PATHS,
        QueryScope::ActiveOnly => QDC_ONLY_ACTIVE_PATHS,
    }
}

fn set_flags(flags: ApplyFlags) -> SET_DISPLAY_CONFIG_FLAGS {
    let mut native = SET_DISPLAY_CONFIG_FLAGS(0);
    if flags.validate_only {
        native |= SDC_VALIDATE;
    }
    if flags.commit {
        native |= SDC_APPLY;
    }
    if flags.allow_source_changes {
        native |= SDC_ALLOW_CHANGES;
    }
    if flags.persist_to_database {
        native |= SDC_SAVE_TO_DATABASE;
    }
    if flags.use_supplied_config_only {
        native |= SDC_USE_SUPPLIED_DISPLAY_CONFIG;
    }
    if flags.restore_from_database {
        native |= SDC_USE_DATABASE_CURRENT;
    }
    native
}

fn adapter_from_luid(luid: LUID) -> AdapterId {
    AdapterId { low: luid.LowPart, high: luid.HighPart }
}

fn luid_from_adapter(adapter: AdapterId) -> LUID {
    LUID { LowPart: adapter.low, HighPart: adapter.high }
}

fn mode_index(raw: u32) -> Option<u32> {
    (raw != MODE_IDX_INVALID).then_some(raw)
}

fn rational_from_native(r: DISPLAYCONFIG_RATIONAL) -> Rational {
    Rational { numerator: r.Numerator, denominator: r.Denominator }
}

fn rational_to_native(r: Rational) -> DISPLAYCONFIG_RATIONAL {
    DISPLAYCONFIG_RATIONAL { Numerator: r.numerator, Denominator: r.denominator }
}

fn scan_line_from_native(s: DISPLAYCONFIG_SCANLINE_ORDERING) -> ScanLineOrdering {
    if s == DISPLAYCONFIG_SCANLINE_ORDERING_PROGRESSIVE {
        ScanLineOrdering::Progressive
    } else if s == DISPLAYCONFIG_SCANLINE_ORDERING_UNSPECIFIED {
        ScanLineOrdering::Unspecified
    } else {
        ScanLineOrdering::Interlaced
    }
}

fn scan_line_to_native(s: ScanLineOrdering) -> DISPLAYCONFIG_SCANLINE_ORDERING {
    match s {
        ScanLineOrdering::Unspecified => DISPLAYCONFIG_SCANLINE_ORDERING_UNSPECIFIED,
        ScanLineOrdering::Progressive => DISPLAYCONFIG_SCANLINE_ORDERING_PROGRESSIVE,
        ScanLineOrdering::Interlaced => DISPLAYCONFIG_SCANLINE_ORDERING_INTERLACED,
    }
}

fn rotation_to_native(r: Rotation) -> DISPLAYCONFIG_ROTATION {
    match r {
        Rotation::Identity => DISPLAYCONFIG_ROTATION_IDENTITY,
        Rotation::Rotate90 => DISPLAYCONFIG_ROTATION_ROTATE90,
        Rotation::Rotate180 => DISPLAYCONFIG_ROTATION_ROTATE180,
        Rotation::Rotate270 => DISPLAYCONFIG_ROTATION_ROTATE270,
    }
}

fn scaling_to_native(s: Scaling) -> DISPLAYCONFIG_SCALING {
    match s {
        Scaling::Identity => DISPLAYCONFIG_SCALING_IDENTITY,
        Scaling::Centered => DISPLAYCONFIG_SCALING_CENTERED,
        Scaling::Stretched => DISPLAYCONFIG_SCALING_STRETCHED,
        Scaling::AspectRatioCentered => DISPLAYCONFIG_SCALING_ASPECTRATIOCENTEREDMAX,
        Scaling::Preferred => DISPLAYCONFIG_SCALING_PREFERRED,
    }
}

fn bits_from_pixel_format(format: DISPLAYCONFIG_PIXELFORMAT) -> u32 {
    match format.0 {
        1 => 8,
        2 => 16,
        3 => 24,
        4 => 32,
        // non-GDI formats
        _ => 0,
    }
}

fn pixel_format_from_bits(bits: u32) -> DISPLAYCONFIG_PIXELFORMAT {
    match bits {
        8 => DISPLAYCONFIGPIXELFORMAT_8BPP,
        16 => DISPLAYCONFIGPIXELFORMAT_16BPP,
        24 => DISPLAYCONFIGPIXELFORMAT_24BPP,
        _ => DISPLAYCONFIGPIXELFORMAT_32BPP,
    }
}

fn path_from_native(path: &DISPLAYCONFIG_PATH_INFO) -> PathRecord {
    // SAFETY: without virtual mode support the union holds a plain mode index
    let (source_idx, target_idx) = unsafe {
        (
            path.sourceInfo.Anonymous.modeInfoIdx,
            path.targetInfo.Anonymous.modeInfoIdx,
        )
    };
    PathRecord {
        adapter_id: adapter_from_luid(path.targetInfo.adapterId),
        source_id: path.sourceInfo.id,
        target_id: path.targetInfo.id,
        active: path.flags & PATH_ACTIVE != 0,
        source_mode_index: mode_index(source_idx),
        target_mode_index: mode_index(target_idx),
    }
}

fn mode_from_native(mode: &DISPLAYCONFIG_MODE_INFO) -> ModeEntry {
    let info = if mode.infoType == DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE {
        // SAFETY: infoType selects the active union member
        let source = unsafe { mode.Anonymous.sourceMode };
        ModeInfo::Source(SourceMode {
            width: source.width,
            height: source.height,
            bits_per_pixel: bits_from_pixel_format(source.pixelFormat),
            position_x: source.position.x,
            position_y: source.position.y,
        })
    } else if mode.infoType == DISPLAYCONFIG_MODE_INFO_TYPE_TARGET {
        // SAFETY: infoType selects the active union member
        let signal = unsafe { mode.Anonymous.targetMode.targetVideoSignalInfo };
        ModeInfo::Target(TargetMode {
            active_width: signal.activeSize.cx,
            active_height: signal.activeSize.cy,
            total_width: signal.totalSize.cx,
            total_height: signal.totalSize.cy,
            vsync: rational_from_native(signal.vSyncFreq),
            hsync: rational_from_native(signal.hSyncFreq),
            scan_line_ordering: scan_line_from_native(signal.scanLineOrdering),
        })
    } else {
        ModeInfo::Other
    };
    ModeEntry {
        adapter_id: adapter_from_luid(mode.adapterId),
        id: mode.id,
        info,
    }
}

fn path_to_native(path: &ConfiguredPath) -> DISPLAYCONFIG_PATH_INFO {
    let adapter = luid_from_adapter(path.adapter_id);
    // SAFETY: all-zero is a valid bit pattern for this plain C struct
    let mut native: DISPLAYCONFIG_PATH_INFO = unsafe { mem::zeroed() };

    native.sourceInfo.adapterId = adapter;
    native.sourceInfo.id = path.source_id;
    native.sourceInfo.Anonymous.modeInfoIdx = path.source_mode_index;

    native.targetInfo.adapterId = adapter;
    native.targetInfo.id = path.target_id;
    native.targetInfo.Anonymous.modeInfoIdx = path.target_mode_index;
    native.targetInfo.rotation = rotation_to_native(path.rotation);
    native.targetInfo.scaling = scaling_to_native(path.scaling);
    native.targetInfo.refreshRate = rational_to_native(path.refresh_rate);
    native.targetInfo.scanLineOrdering = scan_line_to_native(path.scan_line_ordering);
    native.targetInfo.targetAvailable = true.into();

    if path.active {
        native.flags = PATH_ACTIVE;
    }
    native
}

fn mode_to_native(mode: &ModeEntry) -> DISPLAYCONFIG_MODE_INFO {
    // SAFETY: all-zero is a valid bit pattern for this plain C struct
    let mut native: DISPLAYCONFIG_MODE_INFO = unsafe { mem::zeroed() };
    native.adapterId = luid_from_adapter(mode.adapter_id);
    native.id = mode.id;

    match &mode.info {
        ModeInfo::Source(source) => {
            native.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_SOURCE;
            native.Anonymous.sourceMode = DISPLAYCONFIG_SOURCE_MODE {
                width: source.width,
                height: source.height,
                pixelFormat: pixel_format_from_bits(source.bits_per_pixel),
                position: POINTL { x: source.position_x, y: source.position_y },
            };
        }
        ModeInfo::Target(target) => {
            // SAFETY: all-zero is a valid bit pattern for this plain C struct
            let mut signal: DISPLAYCONFIG_VIDEO_SIGNAL_INFO = unsafe { mem::zeroed() };
            signal.activeSize = DISPLAYCONFIG_2DREGION { cx: target.active_width, cy: target.active_height };
            signal.totalSize = DISPLAYCONFIG_2DREGION { cx: target.total_width, cy: target.total_height };
            signal.vSyncFreq = rational_to_native(target.vsync);
            signal.hSyncFreq = rational_to_native(target.hsync);
            signal.scanLineOrdering = scan_line_to_native(target.scan_line_ordering);

            native.infoType = DISPLAYCONFIG_MODE_INFO_TYPE_TARGET;
            native.Anonymous.targetMode = DISPLAYCONFIG_TARGET_MODE { targetVideoSignalInfo: signal };
        }
        ModeInfo::Other => {}
    }
    native
}

impl DisplayConfigService for NativeService {
    fn size_probe(&self, scope: QueryScope) -> Result<BufferSizes, ServiceError> {
        let mut sizes = BufferSizes::default();
        // SAFETY: both out-pointers reference live locals
        let status = unsafe {
            GetDisplayConfigBufferSizes(query_flags(scope), &mut sizes.paths, &mut sizes.modes)
        };
        if status != ERROR_SUCCESS {
            return Err(ServiceError::status(ServiceCall::SizeProbe, status.0 as i32));
        }
        trace!(?scope, paths = sizes.paths, modes = sizes.modes, "probed display config sizes");
        Ok(sizes)
    }

    fn query_paths(&self, scope: QueryScope, sizes: BufferSizes) -> Result<Topology, ServiceError> {
        // SAFETY: zeroed plain C structs used only as output buffers
        let mut paths: Vec<DISPLAYCONFIG_PATH_INFO> =
            vec![unsafe { mem::zeroed() }; sizes.paths as usize];
        let mut modes: Vec<DISPLAYCONFIG_MODE_INFO> =
            vec![unsafe { mem::zeroed() }; sizes.modes as usize];
        let mut path_count = sizes.paths;
        let mut mode_count = sizes.modes;

        // SAFETY: buffers are sized exactly as the counts passed alongside them
        let status = unsafe {
            QueryDisplayConfig(
                query_flags(scope),
                &mut path_count,
                paths.as_mut_ptr(),
                &mut mode_count,
                modes.as_mut_ptr(),
                None,
            )
        };
        if status != ERROR_SUCCESS {
            return Err(ServiceError::status(ServiceCall::QueryPaths, status.0 as i32));
        }

        paths.truncate(path_count as usize);
        modes.truncate(mode_count as usize);
        debug!(?scope, paths = paths.len(), modes = modes.len(), "queried display config");

        Ok(Topology {
            paths: paths.iter().map(path_from_native).collect(),
            modes: modes.iter().map(mode_from_native).collect(),
        })
    }

    fn target_descriptor(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> Result<TargetDescriptor, ServiceError> {
        // SAFETY: all-zero is a valid bit pattern for this plain C struct
        let mut request: DISPLAYCONFIG_TARGET_DEVICE_NAME = unsafe { mem::zeroed() };
        request.header = DISPLAYCONFIG_DEVICE_INFO_HEADER {
            r#type: DISPLAYCONFIG_DEVICE_INFO_GET_TARGET_NAME,
            size: mem::size_of::<DISPLAYCONFIG_TARGET_DEVICE_NAME>() as u32,
            adapterId: luid_from_adapter(adapter_id),
            id: target_id,
        };

        // SAFETY: the header is the first field and size covers the whole request
        let status = unsafe { DisplayConfigGetDeviceInfo(&mut request.header) };
        if status != 0 {
            return Err(ServiceError::status(ServiceCall::TargetDescriptor, status));
        }

        Ok(TargetDescriptor {
            friendly_name: FriendlyName::from_utf16(&request.monitorFriendlyDeviceName),
            device_path: DevicePath::from_utf16(&request.monitorDevicePath),
        })
    }

    fn apply(
        &mut self,
        config: Option<&DisplayConfiguration>,
        flags: ApplyFlags,
    ) -> Result<(), ServiceError> {
        let native_flags = set_flags(flags);
        let status = match config {
            Some(config) => {
                let paths: Vec<_> = config.paths.iter().map(path_to_native).collect();
                let modes: Vec<_> = config.modes.iter().map(mode_to_native).collect();
                // SAFETY: slices outlive the call
                unsafe { SetDisplayConfig(Some(&paths), Some(&modes), native_flags) }
            }
            // SAFETY: no arrays are passed
            None => unsafe { SetDisplayConfig(None, None, native_flags) },
        };
        if status != 0 {
            return Err(ServiceError::status(ServiceCall::Apply, status));
        }
        Ok(())
    }
}
