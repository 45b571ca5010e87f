//! 集群后端数据模型
//!
//! **数据来源**: 管理 API 实时查询，无本地持久化。
//!
//! 后端的数值字段并不统一：布尔值常以 0/1 返回，容器列表中的 `vmid`
//! 在部分版本中是字符串。这里的反序列化对两种形式都兼容。

use serde::{Deserialize, Deserializer, Serialize};

/// 节点列表项 (`GET /nodes`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    /// 节点名称
    pub node: String,

    /// 状态 (online/offline/unknown)
    #[serde(default)]
    pub status: Option<String>,

    /// CPU 使用率 [0, 1]
    #[serde(default)]
    pub cpu: Option<f64>,

    /// CPU 核心数
    #[serde(default)]
    pub maxcpu: Option<u32>,

    /// 已用内存 (字节)
    #[serde(default)]
    pub mem: Option<u64>,

    /// 总内存 (字节)
    #[serde(default)]
    pub maxmem: Option<u64>,

    /// 运行时间（秒）
    #[serde(default)]
    pub uptime: Option<u64>,
}

/// 节点实时状态 (`GET /nodes/{node}/status`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusEntry {
    /// CPU 使用率 [0, 1]
    #[serde(default)]
    pub cpu: f64,

    /// 内存信息
    #[serde(default)]
    pub memory: MemoryEntry,

    /// 运行时间（秒）
    #[serde(default)]
    pub uptime: Option<u64>,
}

/// 内存信息 (字节)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(default)]
    pub used: u64,

    #[serde(default)]
    pub total: u64,

    #[serde(default)]
    pub free: u64,
}

/// 负载列表项 (`GET /nodes/{node}/qemu`, `GET /nodes/{node}/lxc`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestEntry {
    #[serde(deserialize_with = "de_u32_flexible")]
    pub vmid: u32,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub uptime: Option<u64>,

    /// 逗号或分号分隔的标签
    #[serde(default)]
    pub tags: Option<String>,

    /// 是否为模板
    #[serde(default, deserialize_with = "de_flag")]
    pub template: bool,
}

/// 存储列表项 (`GET /nodes/{node}/storage`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntry {
    pub storage: String,

    #[serde(rename = "type", default)]
    pub storage_type: Option<String>,

    /// 逗号分隔的内容类型，例如 `iso,vztmpl,backup`
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub used: Option<u64>,

    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub avail: Option<u64>,

    #[serde(default)]
    pub used_fraction: Option<f64>,

    #[serde(default, deserialize_with = "de_flag")]
    pub active: bool,

    #[serde(default, deserialize_with = "de_flag")]
    pub shared: bool,
}

impl StorageEntry {
    /// 拆分内容类型
    pub fn content_types(&self) -> Vec<String> {
        self.content
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 使用率，后端未提供时由 used/total 计算
    pub fn fraction(&self) -> f64 {
        if let Some(f) = self.used_fraction {
            return f;
        }
        match (self.used, self.total) {
            (Some(used), Some(total)) if total > 0 => used as f64 / total as f64,
            _ => 0.0,
        }
    }
}

/// 快照列表项 (`GET …/snapshot`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// 创建时间（Unix 秒）
    #[serde(default)]
    pub snaptime: Option<i64>,

    #[serde(default)]
    pub parent: Option<String>,
}

/// 防火墙规则项 (`GET …/firewall/rules`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallRuleEntry {
    #[serde(default)]
    pub pos: Option<u32>,

    pub action: String,

    /// 方向 (in/out/group)
    #[serde(rename = "type")]
    pub rule_type: String,

    #[serde(default)]
    pub proto: Option<String>,

    #[serde(default)]
    pub dport: Option<String>,

    #[serde(default)]
    pub sport: Option<String>,

    #[serde(default, deserialize_with = "de_flag")]
    pub enable: bool,

    #[serde(default)]
    pub comment: Option<String>,
}

/// 存储内容项 (`GET /nodes/{node}/storage/{storage}/content`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageContentEntry {
    /// 卷 ID，例如 `local:iso/ubuntu.iso`
    pub volid: String,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    /// 创建时间（Unix 秒）
    #[serde(default)]
    pub ctime: Option<i64>,

    /// 备份所属资源
    #[serde(default, deserialize_with = "de_u32_opt_flexible")]
    pub vmid: Option<u32>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// 集群日志项 (`GET /cluster/log`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterLogEntry {
    /// 时间（Unix 秒）
    #[serde(default)]
    pub time: Option<i64>,

    #[serde(default)]
    pub node: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub tag: Option<String>,

    /// syslog 优先级
    #[serde(default)]
    pub pri: Option<i64>,

    #[serde(default)]
    pub msg: Option<String>,
}

/// 容器模板项 (`GET /nodes/{node}/aplinfo`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub template: String,

    #[serde(default)]
    pub headline: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub os: Option<String>,

    #[serde(default)]
    pub section: Option<String>,
}

// ============================================
// 反序列化辅助
// ============================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Flexible {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// 0/1、true/false、"1"/"0" 均可
fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Flexible>::deserialize(deserializer)?;
    Ok(match value {
        None => false,
        Some(Flexible::Bool(b)) => b,
        Some(Flexible::Int(i)) => i != 0,
        Some(Flexible::Float(f)) => f != 0.0,
        Some(Flexible::Text(s)) => matches!(s.trim(), "1" | "true" | "yes"),
    })
}

fn flexible_to_u32<E: serde::de::Error>(value: Flexible) -> Result<u32, E> {
    match value {
        Flexible::Int(i) => u32::try_from(i).map_err(|_| E::custom(format!("vmid 超出范围: {}", i))),
        Flexible::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("无效的 vmid: {}", s))),
        Flexible::Float(f) => Err(E::custom(format!("无效的 vmid: {}", f))),
        Flexible::Bool(b) => Err(E::custom(format!("无效的 vmid: {}", b))),
    }
}

fn de_u32_flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    flexible_to_u32(Flexible::deserialize(deserializer)?)
}

fn de_u32_opt_flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Option::<Flexible>::deserialize(deserializer)? {
        Some(v) => flexible_to_u32(v).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_guest_entry_string_vmid() {
        let entry: GuestEntry = serde_json::from_value(json!({
            "vmid": "200",
            "name": "cache-1",
            "status": "stopped",
        }))
        .unwrap();
        assert_eq!(entry.vmid, 200);
        assert!(!entry.template);
        assert_eq!(entry.uptime, None);
    }

    #[test]
    fn test_guest_entry_numeric_vmid() {
        let entry: GuestEntry = serde_json::from_value(json!({
            "vmid": 100,
            "name": "web-1",
            "status": "running",
            "uptime": 3600,
            "template": 1,
        }))
        .unwrap();
        assert_eq!(entry.vmid, 100);
        assert!(entry.template);
        assert_eq!(entry.uptime, Some(3600));
    }

    #[test]
    fn test_storage_entry_flags_and_content() {
        let entry: StorageEntry = serde_json::from_value(json!({
            "storage": "local",
            "type": "dir",
            "content": "iso,vztmpl,backup",
            "used": 100,
            "total": 1000,
            "avail": 900,
            "active": 1,
            "shared": 0,
        }))
        .unwrap();
        assert!(entry.active);
        assert!(!entry.shared);
        assert_eq!(entry.content_types(), vec!["iso", "vztmpl", "backup"]);
        assert!((entry.fraction() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_storage_entry_missing_numbers() {
        let entry: StorageEntry = serde_json::from_value(json!({
            "storage": "nfs-down",
            "content": "",
        }))
        .unwrap();
        assert!(!entry.active);
        assert!(entry.content_types().is_empty());
        assert_eq!(entry.fraction(), 0.0);
    }

    #[test]
    fn test_firewall_rule_entry() {
        let entry: FirewallRuleEntry = serde_json::from_value(json!({
            "pos": 0,
            "enable": 1,
            "action": "ACCEPT",
            "type": "in",
            "proto": "tcp",
            "dport": "80",
        }))
        .unwrap();
        assert_eq!(entry.pos, Some(0));
        assert!(entry.enable);
        assert_eq!(entry.rule_type, "in");
        assert_eq!(entry.sport, None);
    }

    #[test]
    fn test_node_status_entry_defaults() {
        let entry: NodeStatusEntry = serde_json::from_value(json!({
            "cpu": 0.25,
            "memory": { "used": 1024, "total": 4096 },
        }))
        .unwrap();
        assert_eq!(entry.memory.used, 1024);
        assert_eq!(entry.memory.free, 0);
    }
}
