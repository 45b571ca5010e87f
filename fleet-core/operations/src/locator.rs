//! 资源定位
//!
//! 只校验负载类型；ID 下限 (>= 100) 属于前端策略，不在这里检查。

use fleet_common::{GuestKind, ResourceHandle};

use crate::error::{FleetError, Result};

/// 解析负载类型名称
pub fn parse_kind(kind: &str) -> Result<GuestKind> {
    GuestKind::from_name(kind).ok_or_else(|| FleetError::InvalidKind(kind.to_string()))
}

/// 由 (节点, ID, 类型) 构造资源句柄
pub fn locate(node: &str, id: u32, kind: &str) -> Result<ResourceHandle> {
    let kind = parse_kind(kind)?;
    Ok(ResourceHandle::new(node, id, kind))
}
