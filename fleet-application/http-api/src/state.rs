//! 应用状态

use std::sync::Arc;

use fleet_common::{is_valid_guest_id, ResourceHandle, MIN_GUEST_ID};
use fleet_ops::{locate, FleetError, FleetHandle, FleetOps};

use crate::error::ApiResult;

#[derive(Clone)]
pub struct AppState {
    pub handle: Arc<FleetHandle>,
}

impl AppState {
    pub fn new(handle: FleetHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// 集群操作入口；未配置时返回 503
    pub fn ops(&self) -> ApiResult<&FleetOps> {
        Ok(self.handle.ops()?)
    }
}

/// 校验 ID 下限并定位资源
pub fn resolve(node: &str, vmid: u32, kind: &str) -> ApiResult<ResourceHandle> {
    ensure_guest_id("vmid", vmid)?;
    Ok(locate(node, vmid, kind)?)
}

/// ID 必须 >= 100
pub fn ensure_guest_id(field: &str, id: u32) -> ApiResult<()> {
    if !is_valid_guest_id(id) {
        return Err(FleetError::InvalidArgument(format!(
            "{} 必须大于等于 {}: {}",
            field, MIN_GUEST_ID, id
        ))
        .into());
    }
    Ok(())
}
