//! Fleet 通用类型定义
//!
//! 此 crate 包含 fleet-ops 与两个前端（HTTP / 工具协议）之间共享的类型。
//! 所有实体都是每次调用时临时计算的值，不做本地持久化。

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 前端约定的最小资源 ID
///
/// 集群约定 ID 从 100 开始，但后端本身并不强制；由前端自行决定是否校验。
pub const MIN_GUEST_ID: u32 = 100;

/// 检查资源 ID 是否满足前端约定
pub fn is_valid_guest_id(id: u32) -> bool {
    id >= MIN_GUEST_ID
}

// ============================================
// 负载类型
// ============================================

/// 负载类型（虚拟机 / 容器）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestKind {
    /// 完整虚拟机 (QEMU)
    #[serde(alias = "qemu")]
    Vm,
    /// 轻量容器 (LXC)
    #[serde(alias = "lxc")]
    Container,
}

impl GuestKind {
    /// 全部负载类型，按聚合时的遍历顺序排列
    pub const ALL: [GuestKind; 2] = [GuestKind::Vm, GuestKind::Container];

    /// 从名称解析
    ///
    /// 接受 `vm`/`qemu` 与 `container`/`lxc`/`ct`，不区分大小写。
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "vm" | "qemu" => Some(Self::Vm),
            "container" | "lxc" | "ct" => Some(Self::Container),
            _ => None,
        }
    }

    /// 规范名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::Container => "container",
        }
    }

    /// 摘要中使用的短标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Vm => "VM",
            Self::Container => "CT",
        }
    }
}

impl fmt::Display for GuestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// 资源定位
// ============================================

/// 资源句柄：(节点, ID, 类型) 三元组，在集群内唯一定位一个负载
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// 所在节点
    pub node: String,

    /// 资源 ID
    pub id: u32,

    /// 负载类型
    pub kind: GuestKind,
}

impl ResourceHandle {
    pub fn new(node: impl Into<String>, id: u32, kind: GuestKind) -> Self {
        Self {
            node: node.into(),
            id,
            kind,
        }
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.node, self.kind, self.id)
    }
}

// ============================================
// 节点
// ============================================

/// 节点状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Unknown,
}

impl NodeStatus {
    /// 从后端状态字符串转换，无法识别的值视为 Unknown
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// 节点资源使用情况
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeUsage {
    /// CPU 使用率 [0, 1]
    pub cpu: f64,

    /// 已用内存 (字节)
    pub memory_used: u64,

    /// 总内存 (字节)
    pub memory_total: u64,
}

impl NodeUsage {
    /// 内存使用率 [0, 1]，总量为 0 时返回 0
    pub fn memory_fraction(&self) -> f64 {
        if self.memory_total == 0 {
            0.0
        } else {
            self.memory_used as f64 / self.memory_total as f64
        }
    }
}

/// 集群节点快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// 节点名称（集群内唯一）
    pub name: String,

    /// 状态
    pub status: NodeStatus,

    /// 资源使用（离线节点没有）
    pub usage: Option<NodeUsage>,
}

/// 基础设施概览中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOverview {
    pub node: Node,

    /// 节点状态接口是否可达
    pub reachable: bool,
}

// ============================================
// 负载
// ============================================

/// 负载生命周期状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestStatus {
    Running,
    Stopped,
    /// 后端上报的其他状态，原样保留（已转为小写）
    Other(String),
}

impl GuestStatus {
    pub fn from_name(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            _ => Self::Other(lowered),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GuestStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GuestStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_name(&raw))
    }
}

/// 统一的受管资源（虚拟机或容器）
///
/// 查找时总是使用 id + node + kind 作为键，node 始终随 id 一起携带。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedResource {
    /// 资源 ID
    pub id: u32,

    /// 所在节点
    pub node: String,

    /// 负载类型
    pub kind: GuestKind,

    /// 显示名称
    pub name: Option<String>,

    /// 生命周期状态
    pub status: GuestStatus,

    /// 运行时间（秒）
    pub uptime: Option<u64>,
}

impl ManagedResource {
    /// 对应的资源句柄
    pub fn handle(&self) -> ResourceHandle {
        ResourceHandle::new(self.node.clone(), self.id, self.kind)
    }
}

// ============================================
// 存储
// ============================================

/// 节点上的存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageVolume {
    /// 所在节点
    pub node: String,

    /// 存储名称
    pub storage: String,

    /// 存储类型 (dir, rbd, lvmthin ...)
    pub storage_type: Option<String>,

    /// 声明的内容类型 (iso, backup, images ...)
    pub content: BTreeSet<String>,

    /// 使用率 [0, 1]
    pub used_fraction: f64,

    /// 总容量 (字节)
    pub total: u64,

    /// 已用 (字节)
    pub used: u64,

    /// 可用 (字节)
    pub available: u64,

    /// 是否激活
    pub active: bool,

    /// 是否共享存储
    pub shared: bool,
}

impl StorageVolume {
    /// 是否声明了指定内容类型
    pub fn accepts(&self, content: &str) -> bool {
        self.content.contains(content)
    }
}

// ============================================
// 快照
// ============================================

/// 资源快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 所属资源
    pub resource: ResourceHandle,

    /// 快照名称（同一资源内唯一）
    pub name: String,

    /// 描述
    pub description: Option<String>,

    /// 创建时间
    pub created_at: Option<DateTime<Utc>>,

    /// 父快照
    pub parent: Option<String>,
}

// ============================================
// 异步任务
// ============================================

/// 后端异步任务引用
///
/// 只表示请求已被后端接受执行，不代表最终成功。本层不轮询任务状态。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskReference(String);

impl TaskReference {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TaskReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// 防火墙
// ============================================

/// 防火墙动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FirewallAction {
    #[serde(alias = "accept")]
    Accept,
    #[serde(alias = "drop")]
    Drop,
    #[serde(alias = "reject")]
    Reject,
}

impl FirewallAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" => Some(Self::Accept),
            "DROP" => Some(Self::Drop),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }

    /// 后端使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
            Self::Reject => "REJECT",
        }
    }
}

/// 防火墙方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallDirection {
    In,
    Out,
}

impl FirewallDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// 防火墙规则
///
/// 规则与位置无关；提交时不去重，等价规则可以重复存在。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    /// 后端返回的位置（新建时为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<u32>,

    pub action: FirewallAction,

    pub direction: FirewallDirection,

    /// 协议 (tcp, udp, icmp ...)
    #[serde(default)]
    pub protocol: Option<String>,

    /// 目的端口
    #[serde(default)]
    pub dest_port: Option<String>,

    /// 源端口
    #[serde(default)]
    pub source_port: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub comment: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl FirewallRule {
    /// 创建一条启用状态的规则
    pub fn new(action: FirewallAction, direction: FirewallDirection) -> Self {
        Self {
            pos: None,
            action,
            direction,
            protocol: None,
            dest_port: None,
            source_port: None,
            enabled: true,
            comment: None,
        }
    }

    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = Some(protocol.to_string());
        self
    }

    pub fn with_dest_port(mut self, port: &str) -> Self {
        self.dest_port = Some(port.to_string());
        self
    }

    pub fn with_source_port(mut self, port: &str) -> Self {
        self.source_port = Some(port.to_string());
        self
    }
}
