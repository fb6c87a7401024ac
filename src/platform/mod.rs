//! Display configuration service
//!
//! The engine talks to the operating system's display configuration database
//! only through [`DisplayConfigService`]. Paths, modes and descriptors are
//! modelled here in platform-neutral form; the native backend converts them to
//! and from the OS structures.

// Several variants and fields are only produced by the native backend
#![cfg_attr(not(windows), allow(dead_code))]

use crate::error::ServiceError;

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use self::win32::NativeService;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use self::unsupported::NativeService;

/// Which paths a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Active and inactive paths (the full catalog)
    All,
    /// Only paths currently driving a monitor
    ActiveOnly,
}

/// Display adapter locally unique identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AdapterId {
    pub low: u32,
    pub high: i32,
}

/// Array sizes reported by a size probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferSizes {
    pub paths: u32,
    pub modes: u32,
}

/// One platform-reported path binding a source to a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    pub adapter_id: AdapterId,
    pub source_id: u32,
    pub target_id: u32,
    pub active: bool,
    pub source_mode_index: Option<u32>,
    pub target_mode_index: Option<u32>,
}

/// Vertical or horizontal sync frequency as a rational; `0/0` lets the driver choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub fn whole(value: u32) -> Self {
        Self { numerator: value, denominator: 1 }
    }

    pub fn unspecified() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanLineOrdering {
    Unspecified,
    Progressive,
    Interlaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    Identity,
    Centered,
    Stretched,
    AspectRatioCentered,
    Preferred,
}

/// Desktop surface of a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMode {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub position_x: i32,
    pub position_y: i32,
}

/// Signal timing of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMode {
    pub active_width: u32,
    pub active_height: u32,
    pub total_width: u32,
    pub total_height: u32,
    pub vsync: Rational,
    pub hsync: Rational,
    pub scan_line_ordering: ScanLineOrdering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeInfo {
    Source(SourceMode),
    Target(TargetMode),
    /// Mode kinds the engine never builds (desktop image info and the like)
    Other,
}

/// Entry of the mode array, referenced from paths by index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEntry {
    pub adapter_id: AdapterId,
    /// Source id for source modes, target id for target modes
    pub id: u32,
    pub info: ModeInfo,
}

/// Result of a path query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub paths: Vec<PathRecord>,
    pub modes: Vec<ModeEntry>,
}

/// Path entry of a configuration submitted for apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredPath {
    pub adapter_id: AdapterId,
    pub source_id: u32,
    pub target_id: u32,
    pub active: bool,
    pub source_mode_index: u32,
    pub target_mode_index: u32,
    pub refresh_rate: Rational,
    pub rotation: Rotation,
    pub scaling: Scaling,
    pub scan_line_ordering: ScanLineOrdering,
}

/// Path and mode arrays submitted together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayConfiguration {
    pub paths: Vec<ConfiguredPath>,
    pub modes: Vec<ModeEntry>,
}

/// Text decoded from a fixed-size native buffer.
///
/// Decoding stops at the first NUL and never keeps more than `CAP` code units,
/// so an unterminated buffer is truncated rather than overrun.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BoundedText<const CAP: usize> {
    text: String,
    truncated: bool,
}

impl<const CAP: usize> BoundedText<CAP> {
    pub fn from_utf16(units: &[u16]) -> Self {
        let len = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        Self {
            text: String::from_utf16_lossy(&units[..len.min(CAP)]),
            truncated: len > CAP,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        Self::from_utf16(&units)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when the source held more than `CAP` units before its terminator
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl<const CAP: usize> std::fmt::Display for BoundedText<CAP> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

pub type FriendlyName = BoundedText<{ crate::constants::descriptor::FRIENDLY_NAME_LEN }>;
pub type DevicePath = BoundedText<{ crate::constants::descriptor::DEVICE_PATH_LEN }>;

/// Monitor information for a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub friendly_name: FriendlyName,
    pub device_path: DevicePath,
}

/// Behaviour requested from an apply call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyFlags {
    pub validate_only: bool,
    pub commit: bool,
    pub allow_source_changes: bool,
    pub persist_to_database: bool,
    pub use_supplied_config_only: bool,
    pub restore_from_database: bool,
}

impl ApplyFlags {
    /// Dry run of a supplied configuration
    pub fn validate() -> Self {
        Self {
            validate_only: true,
            use_supplied_config_only: true,
            allow_source_changes: true,
            ..Self::default()
        }
    }

    /// Commit a supplied configuration and save it
    pub fn commit() -> Self {
        Self {
            commit: true,
            use_supplied_config_only: true,
            allow_source_changes: true,
            persist_to_database: true,
            ..Self::default()
        }
    }

    /// Reapply whatever the database currently holds
    pub fn restore() -> Self {
        Self {
            commit: true,
            restore_from_database: true,
            ..Self::default()
        }
    }
}

/// External display configuration service.
///
/// Every call is fallible and returns a structured error; no non-success
/// status escapes as a bare code.
pub trait DisplayConfigService {
    /// Array sizes needed for a subsequent [`query_paths`](Self::query_paths)
    fn size_probe(&self, scope: QueryScope) -> Result<BufferSizes, ServiceError>;

    /// Fetch paths and modes using exactly the probed sizes
    fn query_paths(&self, scope: QueryScope, sizes: BufferSizes) -> Result<Topology, ServiceError>;

    /// Friendly name and device path of a target
    fn target_descriptor(
        &self,
        adapter_id: AdapterId,
        target_id: u32,
    ) -> Result<TargetDescriptor, ServiceError>;

    /// Submit a configuration; `None` submits no arrays (restore)
    fn apply(
        &mut self,
        config: Option<&DisplayConfiguration>,
        flags: ApplyFlags,
    ) -> Result<(), ServiceError>;

    /// Probe then fetch
    fn query(&self, scope: QueryScope) -> Result<Topology, ServiceError> {
        let sizes = self.size_probe(scope)?;
        self.query_paths(scope, sizes)
    }
}
