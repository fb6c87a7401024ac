//! Backend for platforms without a display configuration database

use super::{
    AdapterId, ApplyFlags, BufferSizes, DisplayConfigService, DisplayConfiguration, QueryScope,
    TargetDescriptor, Topology,
};
use crate::error::ServiceError;

/// Every call fails with [`ServiceError::Unsupported`]
#[derive(Debug, Default)]
pub struct NativeService;

impl NativeService {
    pub fn new() -> Self {
        Self
    }
}

impl DisplayConfigService for NativeService {
    fn size_probe(&self, _scope: QueryScope) -> Result<BufferSizes, ServiceError> {
        Err(ServiceError::Unsupported)
    }

    fn query_paths(&self, _scope: QueryScope, _sizes: BufferSizes) -> Result<Topology, ServiceError> {
        Err(ServiceError::Unsupported)
    }

    fn target_descriptor(
        &self,
        _adapter_id: AdapterId,
        _target_id: u32,
    ) -> Result<TargetDescriptor, ServiceError> {
        Err(ServiceError::Unsupported)
    }

    fn apply(
        &mut self,
        _config: Option<&DisplayConfiguration>,
        _flags: ApplyFlags,
    ) -> Result<(), ServiceError> {
        Err(ServiceError::Unsupported)
    }
}
