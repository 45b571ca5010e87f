//! 负载类型策略表
//!
//! 每种负载类型对应一份远程调用形态：路径段、配置写入方式、克隆名称参数、
//! 以及是否支持 cloud-init / guest agent。操作层只查表，不按类型分支。

use fleet_common::{GuestKind, ResourceHandle};
use fleet_pve::RemoteCall;

use crate::error::{FleetError, Result};

/// 配置写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWrite {
    /// `POST …/config`，后端异步执行并返回任务令牌
    Post,
    /// `PUT …/config`，后端同步执行，无任务令牌
    Put,
}

/// 单一负载类型的远程调用形态
#[derive(Debug)]
pub struct KindStrategy {
    pub kind: GuestKind,

    /// 路径段 (`qemu` / `lxc`)
    pub segment: &'static str,

    pub config_write: ConfigWrite,

    /// 克隆时新名称使用的参数名
    pub clone_name_param: &'static str,

    pub cloud_init: bool,

    pub guest_agent: bool,
}

static VM_STRATEGY: KindStrategy = KindStrategy {
    kind: GuestKind::Vm,
    segment: "qemu",
    config_write: ConfigWrite::Post,
    clone_name_param: "name",
    cloud_init: true,
    guest_agent: true,
};

static CONTAINER_STRATEGY: KindStrategy = KindStrategy {
    kind: GuestKind::Container,
    segment: "lxc",
    config_write: ConfigWrite::Put,
    clone_name_param: "hostname",
    cloud_init: false,
    guest_agent: false,
};

/// 查询负载类型对应的策略
pub fn strategy(kind: GuestKind) -> &'static KindStrategy {
    match kind {
        GuestKind::Vm => &VM_STRATEGY,
        GuestKind::Container => &CONTAINER_STRATEGY,
    }
}

impl KindStrategy {
    /// 节点上该类型的列表路径
    pub fn list_path(&self, node: &str) -> Result<String> {
        Ok(format!("/nodes/{}/{}", path_segment(node)?, self.segment))
    }

    /// 单个资源的路径，`suffix` 为空时即资源根路径
    ///
    /// `suffix` 由调用方拼好，其中来自外部的名称需先经 [`path_segment`] 编码。
    pub fn resource_path(&self, handle: &ResourceHandle, suffix: &str) -> Result<String> {
        let base = format!(
            "/nodes/{}/{}/{}",
            path_segment(&handle.node)?,
            self.segment,
            handle.id
        );
        if suffix.is_empty() {
            Ok(base)
        } else {
            Ok(format!("{}/{}", base, suffix.trim_start_matches('/')))
        }
    }

    /// 配置写入调用
    pub fn config_call(&self, handle: &ResourceHandle) -> Result<RemoteCall> {
        let path = self.resource_path(handle, "config")?;
        Ok(match self.config_write {
            ConfigWrite::Post => RemoteCall::post(path),
            ConfigWrite::Put => RemoteCall::put(path),
        })
    }
}

/// 把外部给出的名称（节点、存储、快照）编码为单个路径段
///
/// 编码后 `/`、`?`、`#` 不再有结构含义；`.` 与 `..` 编码前后都会被
/// URL 解析当作目录跳转，只能拒绝。
pub fn path_segment(name: &str) -> Result<String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FleetError::invalid(format!("无效的路径名称: {:?}", name)));
    }
    Ok(urlencoding::encode(name).into_owned())
}
