//! 输出适配
//!
//! 把聚合结果转换为 REST 结构化记录或工具协议使用的可读文本。

use chrono::{TimeZone, Utc};
use fleet_common::{
    FirewallRule, ManagedResource, NodeOverview, ResourceHandle, Snapshot, StorageVolume,
    TaskReference,
};
use fleet_pve::{ClusterLogEntry, StorageContentEntry, TemplateEntry};
use serde::Serialize;

use crate::aggregator::NodeFailure;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// 字节数转为 `x.x GB`
pub fn format_gb(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / GIB)
}

/// 比例转为 `x.x%`
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

// ============================================
// REST 记录
// ============================================

/// 基础设施概览中的节点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub node: String,

    /// 节点状态；状态接口不可达时为 `unreachable`
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_usage: Option<String>,
}

impl From<&NodeOverview> for NodeRecord {
    fn from(overview: &NodeOverview) -> Self {
        let node = &overview.node;
        if !overview.reachable {
            return Self {
                node: node.name.clone(),
                status: "unreachable".to_string(),
                cpu_usage: None,
                ram_usage: None,
            };
        }
        Self {
            node: node.name.clone(),
            status: node.status.as_str().to_string(),
            cpu_usage: node.usage.map(|u| format_percent(u.cpu)),
            ram_usage: node
                .usage
                .map(|u| format!("{} / {}", format_gb(u.memory_used), format_gb(u.memory_total))),
        }
    }
}

/// 负载列表项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineRecord {
    pub vmid: u32,
    pub name: Option<String>,
    pub node: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub uptime: Option<u64>,
}

impl From<&ManagedResource> for MachineRecord {
    fn from(resource: &ManagedResource) -> Self {
        Self {
            vmid: resource.id,
            name: resource.name.clone(),
            node: resource.node.clone(),
            kind: resource.kind.as_str().to_string(),
            status: resource.status.as_str().to_string(),
            uptime: resource.uptime,
        }
    }
}

/// 存储列表项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageRecord {
    pub node: String,
    pub storage: String,
    /// 逗号分隔的内容类型
    pub content: String,
    pub used_fraction: String,
    pub total: String,
    pub active: bool,
    pub shared: bool,
}

impl From<&StorageVolume> for StorageRecord {
    fn from(volume: &StorageVolume) -> Self {
        Self {
            node: volume.node.clone(),
            storage: volume.storage.clone(),
            content: volume.content.iter().cloned().collect::<Vec<_>>().join(","),
            used_fraction: format_percent(volume.used_fraction),
            total: format_gb(volume.total),
            active: volume.active,
            shared: volume.shared,
        }
    }
}

// ============================================
// 文本摘要
// ============================================

/// 可输出为一行摘要的数据
pub trait SummaryLine {
    fn summary_line(&self) -> String;
}

impl SummaryLine for NodeOverview {
    fn summary_line(&self) -> String {
        let node = &self.node;
        match (self.reachable, node.usage) {
            (true, Some(usage)) => format!(
                "- 节点: {} | 状态: {} | CPU: {} | 内存: {} / {} ({})",
                node.name,
                node.status.as_str(),
                format_percent(usage.cpu),
                format_gb(usage.memory_used),
                format_gb(usage.memory_total),
                format_percent(usage.memory_fraction())
            ),
            _ => format!("- 节点: {} | 状态: 不可达", node.name),
        }
    }
}

impl SummaryLine for ManagedResource {
    fn summary_line(&self) -> String {
        format!(
            "[{}] ID: {} | 名称: {} | 状态: {} | 节点: {}",
            self.kind.label(),
            self.id,
            self.name.as_deref().unwrap_or("-"),
            self.status,
            self.node
        )
    }
}

impl SummaryLine for StorageVolume {
    fn summary_line(&self) -> String {
        format!(
            "- {}/{} ({}) : 已用 {} (可用 {}) [{}]{}",
            self.node,
            self.storage,
            self.storage_type.as_deref().unwrap_or("?"),
            format_percent(self.used_fraction),
            format_gb(self.available),
            self.content.iter().cloned().collect::<Vec<_>>().join(","),
            if self.active { "" } else { " 未激活" }
        )
    }
}

impl SummaryLine for Snapshot {
    fn summary_line(&self) -> String {
        let created = self
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "未知".to_string());
        format!(
            "- {} (时间: {}) | {}",
            self.name,
            created,
            self.description.as_deref().unwrap_or("无描述")
        )
    }
}

impl SummaryLine for FirewallRule {
    fn summary_line(&self) -> String {
        format!(
            "- #{} {} {} proto={} dport={} sport={}{}",
            self.pos.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            self.direction.as_str().to_uppercase(),
            self.action.as_str(),
            self.protocol.as_deref().unwrap_or("any"),
            self.dest_port.as_deref().unwrap_or("any"),
            self.source_port.as_deref().unwrap_or("any"),
            if self.enabled { "" } else { " (已禁用)" }
        )
    }
}

impl SummaryLine for StorageContentEntry {
    fn summary_line(&self) -> String {
        let mut line = format!(
            "- {} | {}",
            self.volid,
            self.size.map(format_gb).unwrap_or_else(|| "?".to_string())
        );
        if let Some(vmid) = self.vmid {
            line.push_str(&format!(" | ID: {}", vmid));
        }
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.is_empty()) {
            line.push_str(&format!(" | {}", notes));
        }
        line
    }
}

impl SummaryLine for ClusterLogEntry {
    fn summary_line(&self) -> String {
        let time = self
            .time
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "[{}] {} {}: {}",
            time,
            self.node.as_deref().unwrap_or("-"),
            self.tag.as_deref().unwrap_or("-"),
            self.msg.as_deref().unwrap_or("")
        )
    }
}

impl SummaryLine for TemplateEntry {
    fn summary_line(&self) -> String {
        format!(
            "- {} | {}",
            self.template,
            self.headline.as_deref().unwrap_or("")
        )
    }
}

/// 渲染带标题的列表，空列表时返回 `empty`
pub fn render_list<T: SummaryLine>(title: &str, items: &[T], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    let mut text = format!("{} ({}):\n", title, items.len());
    for item in items {
        text.push_str(&item.summary_line());
        text.push('\n');
    }
    text
}

/// 附加被跳过节点的说明
pub fn append_failures(mut text: String, failures: &[NodeFailure]) -> String {
    if failures.is_empty() {
        return text;
    }
    text.push_str("\n以下节点的数据未能获取:\n");
    for failure in failures {
        match failure.kind {
            Some(kind) => text.push_str(&format!("- {} ({}): {}\n", failure.node, kind, failure.error)),
            None => text.push_str(&format!("- {}: {}\n", failure.node, failure.error)),
        }
    }
    text
}

/// 资源配置
pub fn render_config(
    handle: &ResourceHandle,
    config: &serde_json::Map<String, serde_json::Value>,
) -> String {
    let mut text = format!("资源 {} 的配置:\n", handle);
    for (key, value) in config {
        match value {
            serde_json::Value::String(s) => text.push_str(&format!("  - {}: {}\n", key, s)),
            other => text.push_str(&format!("  - {}: {}\n", key, other)),
        }
    }
    text
}

/// 变更类操作的结果
pub fn render_task(description: &str, task: Option<&TaskReference>) -> String {
    match task {
        Some(task) => format!("{}，任务: {}", description, task),
        None => format!("{}，已完成", description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_common::{GuestKind, GuestStatus, Node, NodeStatus, NodeUsage};

    fn overview(reachable: bool) -> NodeOverview {
        NodeOverview {
            node: Node {
                name: "pve1".to_string(),
                status: NodeStatus::Online,
                usage: reachable.then_some(NodeUsage {
                    cpu: 0.125,
                    memory_used: 4 * 1024 * 1024 * 1024,
                    memory_total: 16 * 1024 * 1024 * 1024,
                }),
            },
            reachable,
        }
    }

    #[test]
    fn test_node_record() {
        let record = NodeRecord::from(&overview(true));
        assert_eq!(record.status, "online");
        assert_eq!(record.cpu_usage.as_deref(), Some("12.5%"));
        assert_eq!(record.ram_usage.as_deref(), Some("4.0 GB / 16.0 GB"));

        let record = NodeRecord::from(&overview(false));
        assert_eq!(record.status, "unreachable");
        assert!(record.cpu_usage.is_none());
    }

    #[test]
    fn test_machine_record_json() {
        let resource = ManagedResource {
            id: 200,
            node: "pve2".to_string(),
            kind: GuestKind::Container,
            name: Some("cache-1".to_string()),
            status: GuestStatus::Stopped,
            uptime: None,
        };
        let json = serde_json::to_value(MachineRecord::from(&resource)).unwrap();
        assert_eq!(json["type"], "container");
        assert_eq!(json["vmid"], 200);
        assert_eq!(json["status"], "stopped");
        assert!(resource.summary_line().starts_with("[CT] ID: 200"));
    }

    #[test]
    fn test_render_list_empty() {
        let items: Vec<ManagedResource> = Vec::new();
        assert_eq!(render_list("负载", &items, "没有负载"), "没有负载");
    }

    #[test]
    fn test_render_task() {
        let task = TaskReference::new("UPID:pve1:1");
        assert_eq!(render_task("已启动", Some(&task)), "已启动，任务: UPID:pve1:1");
        assert_eq!(render_task("已解锁", None), "已解锁，已完成");
    }

    #[test]
    fn test_append_failures() {
        let failures = vec![NodeFailure {
            node: "pve2".to_string(),
            kind: Some(GuestKind::Vm),
            error: "集群不可达: timeout".to_string(),
        }];
        let text = append_failures("负载 (0):\n".to_string(), &failures);
        assert!(text.contains("pve2 (vm)"));
    }
}
