//! 集群客户端操作
//!
//! 每个逻辑操作对应恰好一次远程调用（按节点列举时每个节点一次）。
//! 变更类操作只返回任务引用，不等待后端任务完成，也不重试。

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use fleet_common::{
    FirewallAction, FirewallDirection, FirewallRule, GuestKind, GuestStatus, ManagedResource,
    Node, NodeStatus, NodeUsage, ResourceHandle, Snapshot, StorageVolume, TaskReference,
};
use fleet_pve::{
    ClusterBackend, ClusterLogEntry, FirewallRuleEntry, GuestEntry, NodeEntry, NodeStatusEntry,
    RemoteCall, SnapshotEntry, StorageContentEntry, StorageEntry, TemplateEntry,
};
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::aggregator::{FleetAggregator, NodeFailure};
use crate::error::{FleetError, Result};
use crate::requests::{BackupMode, CloudInitConfig, PowerAction, ResizeRequest, RrdTimeframe};
use crate::strategy::{path_segment, strategy};

/// ISO 镜像文件后缀
pub const ISO_SUFFIX: &str = ".iso";

/// 后端在快照列表中附带的"当前状态"伪条目
const CURRENT_SNAPSHOT: &str = "current";

/// 单个节点的负载列表
#[derive(Debug, Clone)]
pub struct NodeResources {
    pub node: String,

    /// 成功获取的负载，先虚拟机后容器
    pub resources: Vec<ManagedResource>,

    /// 获取失败的类型
    pub failures: Vec<NodeFailure>,
}

/// 统一的集群操作入口
///
/// 持有只读共享的后端连接，可在任意数量的并发请求间共享。
pub struct FleetOps {
    backend: Arc<dyn ClusterBackend>,

    /// 管理端点（用于构造控制台链接）
    endpoint: String,
}

impl FleetOps {
    pub fn new(backend: Arc<dyn ClusterBackend>, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { backend, endpoint }
    }

    /// 获取集群聚合视图
    pub fn fleet(&self) -> FleetAggregator<'_> {
        FleetAggregator::new(self)
    }

    // ============================================
    // 调用辅助
    // ============================================

    async fn call(&self, call: RemoteCall) -> Result<serde_json::Value> {
        debug!("远程调用: {}", call);
        Ok(self.backend.execute(call).await?)
    }

    async fn call_task(&self, call: RemoteCall) -> Result<TaskReference> {
        let value = self.call(call).await?;
        task_from(value)
    }

    async fn call_optional_task(&self, call: RemoteCall) -> Result<Option<TaskReference>> {
        let value = self.call(call).await?;
        Ok(optional_task_from(value))
    }

    // ============================================
    // 节点与资源查询
    // ============================================

    /// 查询节点列表
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        info!("查询节点列表");
        let entries: Vec<NodeEntry> =
            decode_list(self.call(RemoteCall::get("/nodes")).await?, "节点列表")?;
        Ok(entries.into_iter().map(node_from_entry).collect())
    }

    /// 查询节点实时 CPU / 内存
    pub async fn node_status(&self, node: &str) -> Result<NodeUsage> {
        debug!("查询节点状态: {}", node);
        let entry: NodeStatusEntry = decode(
            self.call(RemoteCall::get(format!("/nodes/{}/status", path_segment(node)?)))
                .await?,
            "节点状态",
        )?;
        Ok(NodeUsage {
            cpu: entry.cpu,
            memory_used: entry.memory.used,
            memory_total: entry.memory.total,
        })
    }

    /// 查询节点上某一类型的负载
    pub async fn list_guests(&self, node: &str, kind: GuestKind) -> Result<Vec<ManagedResource>> {
        debug!("查询节点 {} 上的 {} 列表", node, kind);
        let entries: Vec<GuestEntry> = decode_list(
            self.call(RemoteCall::get(strategy(kind).list_path(node)?)).await?,
            "负载列表",
        )?;
        Ok(entries
            .into_iter()
            .map(|entry| resource_from_entry(node, kind, entry))
            .collect())
    }

    /// 查询节点上的全部负载
    ///
    /// 每种类型一次调用；某一类型失败时记录并跳过，返回其余部分。
    pub async fn list_resources_on_node(&self, node: &str) -> NodeResources {
        let fetches = GuestKind::ALL
            .into_iter()
            .map(|kind| async move { (kind, self.list_guests(node, kind).await) });

        let mut resources = Vec::new();
        let mut failures = Vec::new();
        for (kind, result) in join_all(fetches).await {
            match result {
                Ok(mut list) => resources.append(&mut list),
                Err(e) => {
                    warn!("获取节点 {} 上的 {} 列表失败: {}", node, kind, e);
                    failures.push(NodeFailure::new(node, Some(kind), e));
                }
            }
        }

        NodeResources {
            node: node.to_string(),
            resources,
            failures,
        }
    }

    /// 查询节点上的存储
    pub async fn list_storage_on_node(&self, node: &str) -> Result<Vec<StorageVolume>> {
        debug!("查询节点存储: {}", node);
        let entries: Vec<StorageEntry> = decode_list(
            self.call(RemoteCall::get(format!("/nodes/{}/storage", path_segment(node)?)))
                .await?,
            "存储列表",
        )?;
        Ok(entries
            .into_iter()
            .map(|entry| storage_from_entry(node, entry))
            .collect())
    }

    /// 查询资源详细配置
    pub async fn machine_config(
        &self,
        handle: &ResourceHandle,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        info!("查询资源配置: {}", handle);
        let path = strategy(handle.kind).resource_path(handle, "config")?;
        match self.call(RemoteCall::get(path)).await? {
            serde_json::Value::Object(map) => Ok(map),
            serde_json::Value::Null => Ok(serde_json::Map::new()),
            other => Err(FleetError::Backend(format!("无法解析资源配置: {}", other))),
        }
    }

    // ============================================
    // 生命周期
    // ============================================

    /// 变更电源状态
    pub async fn change_state(
        &self,
        handle: &ResourceHandle,
        action: PowerAction,
    ) -> Result<TaskReference> {
        info!("变更资源状态: {} -> {}", handle, action.as_str());
        let path = strategy(handle.kind).resource_path(handle, &format!("status/{}", action.as_str()))?;
        self.call_task(RemoteCall::post(path)).await
    }

    pub async fn start(&self, handle: &ResourceHandle) -> Result<TaskReference> {
        self.change_state(handle, PowerAction::Start).await
    }

    pub async fn stop(&self, handle: &ResourceHandle) -> Result<TaskReference> {
        self.change_state(handle, PowerAction::Stop).await
    }

    pub async fn shutdown(&self, handle: &ResourceHandle) -> Result<TaskReference> {
        self.change_state(handle, PowerAction::Shutdown).await
    }

    pub async fn reboot(&self, handle: &ResourceHandle) -> Result<TaskReference> {
        self.change_state(handle, PowerAction::Reboot).await
    }

    /// 克隆资源
    ///
    /// 不预先检查 `new_id` 是否冲突，由后端裁决。
    pub async fn clone_resource(
        &self,
        handle: &ResourceHandle,
        new_id: u32,
        name: &str,
        target_node: Option<&str>,
    ) -> Result<TaskReference> {
        info!("克隆资源: {} -> {} ({})", handle, new_id, name);
        let shape = strategy(handle.kind);
        let call = RemoteCall::post(shape.resource_path(handle, "clone")?)
            .param("newid", new_id)
            .param(shape.clone_name_param, name)
            .param_opt("target", target_node.filter(|t| !t.is_empty()));
        self.call_task(call).await
    }

    /// 调整 CPU / 内存
    ///
    /// 两项都未设置时直接拒绝，不发起远程调用。
    pub async fn resize(
        &self,
        handle: &ResourceHandle,
        request: &ResizeRequest,
    ) -> Result<Option<TaskReference>> {
        request.validate()?;
        info!(
            "调整资源: {} (cores={:?}, memory={:?}MB)",
            handle, request.cores, request.memory_mb
        );
        let call = strategy(handle.kind)
            .config_call(handle)?
            .param_opt("cores", request.cores)
            .param_opt("memory", request.memory_mb);
        self.call_optional_task(call).await
    }

    /// 迁移资源
    ///
    /// `online` 为 true 时同时请求在线迁移与本地磁盘迁移，两者从不单独设置。
    pub async fn migrate(
        &self,
        handle: &ResourceHandle,
        target_node: &str,
        online: bool,
    ) -> Result<TaskReference> {
        if target_node.trim().is_empty() {
            return Err(FleetError::invalid("目标节点不能为空"));
        }
        info!("迁移资源: {} -> {} (online={})", handle, target_node, online);

        let mut call = RemoteCall::post(strategy(handle.kind).resource_path(handle, "migrate")?)
            .param("target", target_node);
        if online {
            call = call.param("online", 1).param("with-local-disks", 1);
        }
        self.call_task(call).await
    }

    // ============================================
    // 快照
    // ============================================

    /// 查询快照列表
    pub async fn list_snapshots(&self, handle: &ResourceHandle) -> Result<Vec<Snapshot>> {
        info!("查询快照列表: {}", handle);
        let path = strategy(handle.kind).resource_path(handle, "snapshot")?;
        let entries: Vec<SnapshotEntry> =
            decode_list(self.call(RemoteCall::get(path)).await?, "快照列表")?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.name != CURRENT_SNAPSHOT)
            .map(|entry| Snapshot {
                resource: handle.clone(),
                name: entry.name,
                description: entry.description.filter(|d| !d.trim().is_empty()),
                created_at: entry
                    .snaptime
                    .and_then(|t| Utc.timestamp_opt(t, 0).single()),
                parent: entry.parent,
            })
            .collect())
    }

    /// 创建快照
    pub async fn create_snapshot(
        &self,
        handle: &ResourceHandle,
        name: &str,
        description: Option<&str>,
    ) -> Result<TaskReference> {
        ensure_snapshot_name(name)?;
        info!("创建快照: {} -> {}", handle, name);
        let call = RemoteCall::post(strategy(handle.kind).resource_path(handle, "snapshot")?)
            .param("snapname", name)
            .param_opt("description", description);
        self.call_task(call).await
    }

    /// 回滚到快照；快照集合本身不变
    pub async fn rollback_snapshot(
        &self,
        handle: &ResourceHandle,
        name: &str,
    ) -> Result<TaskReference> {
        ensure_snapshot_name(name)?;
        info!("回滚快照: {} -> {}", handle, name);
        let suffix = format!("snapshot/{}/rollback", path_segment(name)?);
        let path = strategy(handle.kind).resource_path(handle, &suffix)?;
        self.call_task(RemoteCall::post(path)).await
    }

    /// 删除快照
    pub async fn delete_snapshot(
        &self,
        handle: &ResourceHandle,
        name: &str,
    ) -> Result<Option<TaskReference>> {
        ensure_snapshot_name(name)?;
        info!("删除快照: {} -> {}", handle, name);
        let suffix = format!("snapshot/{}", path_segment(name)?);
        let path = strategy(handle.kind).resource_path(handle, &suffix)?;
        self.call_optional_task(RemoteCall::delete(path)).await
    }

    // ============================================
    // 防火墙
    // ============================================

    /// 查询防火墙规则
    pub async fn list_firewall_rules(&self, handle: &ResourceHandle) -> Result<Vec<FirewallRule>> {
        info!("查询防火墙规则: {}", handle);
        let path = strategy(handle.kind).resource_path(handle, "firewall/rules")?;
        let entries: Vec<FirewallRuleEntry> =
            decode_list(self.call(RemoteCall::get(path)).await?, "防火墙规则")?;

        Ok(entries.into_iter().filter_map(rule_from_entry).collect())
    }

    /// 添加防火墙规则
    ///
    /// 不与现有规则去重。
    pub async fn add_firewall_rule(
        &self,
        handle: &ResourceHandle,
        rule: &FirewallRule,
    ) -> Result<Option<TaskReference>> {
        info!(
            "添加防火墙规则: {} {} {} {:?}",
            handle,
            rule.action.as_str(),
            rule.direction.as_str(),
            rule.dest_port
        );
        let call = RemoteCall::post(strategy(handle.kind).resource_path(handle, "firewall/rules")?)
            .param("action", rule.action.as_str())
            .param("type", rule.direction.as_str())
            .param_opt("proto", rule.protocol.as_deref())
            .param_opt("dport", rule.dest_port.as_deref())
            .param_opt("sport", rule.source_port.as_deref())
            .param("enable", u8::from(rule.enabled))
            .param_opt("comment", rule.comment.as_deref());
        self.call_optional_task(call).await
    }

    // ============================================
    // 配置类操作
    // ============================================

    /// 设置 cloud-init 参数（仅虚拟机）
    pub async fn set_cloud_init(
        &self,
        handle: &ResourceHandle,
        config: &CloudInitConfig,
    ) -> Result<Option<TaskReference>> {
        if config.is_empty() {
            return Err(FleetError::invalid(
                "user、password、ssh_keys、ip_config 至少需要指定一项",
            ));
        }
        let shape = strategy(handle.kind);
        if !shape.cloud_init {
            return Err(FleetError::invalid(format!("{} 不支持 cloud-init", handle.kind)));
        }
        info!("设置 cloud-init: {}", handle);

        let [user, password, ssh_keys, ip_config] = config.present();
        let call = shape
            .config_call(handle)?
            .param_opt("ciuser", user)
            .param_opt("cipassword", password)
            .param_opt("sshkeys", ssh_keys)
            .param_opt("ipconfig0", ip_config);
        self.call_optional_task(call).await
    }

    /// 设置标签
    ///
    /// 接受逗号、分号或空白分隔的标签，规范化为逗号分隔。
    pub async fn set_tags(&self, handle: &ResourceHandle, tags: &str) -> Result<Option<TaskReference>> {
        let normalized = normalize_tags(tags);
        if normalized.is_empty() {
            return Err(FleetError::invalid("标签不能为空"));
        }
        info!("设置标签: {} -> {}", handle, normalized);
        let call = strategy(handle.kind).config_call(handle)?.param("tags", normalized);
        self.call_optional_task(call).await
    }

    /// 解除资源锁
    pub async fn unlock(&self, handle: &ResourceHandle) -> Result<Option<TaskReference>> {
        info!("解除资源锁: {}", handle);
        let call = strategy(handle.kind).config_call(handle)?.param("delete", "lock");
        self.call_optional_task(call).await
    }

    // ============================================
    // 备份与镜像
    // ============================================

    /// 查询存储中的备份
    pub async fn list_backups(&self, node: &str, storage: &str) -> Result<Vec<StorageContentEntry>> {
        info!("查询备份: {}/{}", node, storage);
        self.list_storage_content(node, storage, "backup").await
    }

    /// 创建备份
    ///
    /// 备份接口与负载类型无关，只需节点与 ID。
    pub async fn create_backup(
        &self,
        node: &str,
        id: u32,
        storage: &str,
        mode: BackupMode,
    ) -> Result<TaskReference> {
        if storage.trim().is_empty() {
            return Err(FleetError::invalid("存储名称不能为空"));
        }
        info!("创建备份: {}/{} -> {} ({})", node, id, storage, mode.as_str());
        let call = RemoteCall::post(format!("/nodes/{}/vzdump", path_segment(node)?))
            .param("vmid", id)
            .param("storage", storage)
            .param("mode", mode.as_str())
            .param("compress", "zstd");
        self.call_task(call).await
    }

    /// 查询存储中的 ISO 镜像
    pub async fn list_isos(&self, node: &str, storage: &str) -> Result<Vec<StorageContentEntry>> {
        info!("查询 ISO 镜像: {}/{}", node, storage);
        self.list_storage_content(node, storage, "iso").await
    }

    /// 从 URL 下载 ISO 镜像到存储
    ///
    /// 文件名必须以 `.iso` 结尾，在远程调用之前校验。
    pub async fn download_iso(
        &self,
        node: &str,
        storage: &str,
        url: &str,
        filename: &str,
    ) -> Result<TaskReference> {
        if !filename.to_ascii_lowercase().ends_with(ISO_SUFFIX) {
            return Err(FleetError::invalid(format!(
                "文件名必须以 {} 结尾: {}",
                ISO_SUFFIX, filename
            )));
        }
        if url.trim().is_empty() {
            return Err(FleetError::invalid("下载地址不能为空"));
        }
        info!("下载 ISO 镜像: {} -> {}/{}", url, node, storage);
        let path = format!(
            "/nodes/{}/storage/{}/download-url",
            path_segment(node)?,
            path_segment(storage)?
        );
        let call = RemoteCall::post(path)
            .param("content", "iso")
            .param("filename", filename)
            .param("url", url);
        self.call_task(call).await
    }

    async fn list_storage_content(
        &self,
        node: &str,
        storage: &str,
        content: &str,
    ) -> Result<Vec<StorageContentEntry>> {
        let path = format!(
            "/nodes/{}/storage/{}/content",
            path_segment(node)?,
            path_segment(storage)?
        );
        let call = RemoteCall::get(path)
            .param("content", content);
        decode_list(self.call(call).await?, "存储内容")
    }

    // ============================================
    // 容器模板
    // ============================================

    /// 查询可用的容器模板
    pub async fn list_lxc_templates(&self, node: &str) -> Result<Vec<TemplateEntry>> {
        info!("查询容器模板: {}", node);
        decode_list(
            self.call(RemoteCall::get(format!("/nodes/{}/aplinfo", path_segment(node)?)))
                .await?,
            "容器模板",
        )
    }

    /// 下载容器模板到存储
    pub async fn download_lxc_template(
        &self,
        node: &str,
        storage: &str,
        template: &str,
    ) -> Result<TaskReference> {
        if template.trim().is_empty() {
            return Err(FleetError::invalid("模板名称不能为空"));
        }
        info!("下载容器模板: {} -> {}/{}", template, node, storage);
        let call = RemoteCall::post(format!("/nodes/{}/aplinfo", path_segment(node)?))
            .param("storage", storage)
            .param("template", template);
        self.call_task(call).await
    }

    // ============================================
    // 诊断
    // ============================================

    /// 集群事件日志
    pub async fn cluster_log(&self, max_lines: usize) -> Result<Vec<ClusterLogEntry>> {
        if max_lines == 0 {
            return Err(FleetError::invalid("max_lines 必须大于 0"));
        }
        info!("查询集群日志: 最近 {} 条", max_lines);
        let call = RemoteCall::get("/cluster/log").param("limit", max_lines);
        decode_list(self.call(call).await?, "集群日志")
    }

    /// 历史指标
    pub async fn rrd_data(
        &self,
        handle: &ResourceHandle,
        timeframe: RrdTimeframe,
    ) -> Result<Vec<serde_json::Value>> {
        info!("查询历史指标: {} ({})", handle, timeframe.as_str());
        let call = RemoteCall::get(strategy(handle.kind).resource_path(handle, "rrddata")?)
            .param("timeframe", timeframe.as_str());
        decode_list(self.call(call).await?, "历史指标")
    }

    /// 通过 guest agent 查询网卡（仅虚拟机）
    pub async fn agent_network(&self, handle: &ResourceHandle) -> Result<serde_json::Value> {
        let shape = strategy(handle.kind);
        if !shape.guest_agent {
            return Err(FleetError::invalid(format!("{} 不支持 guest agent", handle.kind)));
        }
        info!("查询 guest agent 网卡: {}", handle);
        let path = shape.resource_path(handle, "agent/network-get-interfaces")?;
        self.call(RemoteCall::get(path)).await
    }

    /// 通过 guest agent 执行命令（仅虚拟机），返回后端给出的 pid 等信息
    pub async fn agent_exec(
        &self,
        handle: &ResourceHandle,
        command: &str,
    ) -> Result<serde_json::Value> {
        let shape = strategy(handle.kind);
        if !shape.guest_agent {
            return Err(FleetError::invalid(format!("{} 不支持 guest agent", handle.kind)));
        }
        if command.trim().is_empty() {
            return Err(FleetError::invalid("命令不能为空"));
        }
        info!("guest agent 执行命令: {}", handle);
        let call = RemoteCall::post(shape.resource_path(handle, "agent/exec")?).param("command", command);
        self.call(call).await
    }

    /// 控制台链接，本地构造，不发起远程调用
    pub fn console_url(&self, handle: &ResourceHandle) -> String {
        format!(
            "{}/#v1:0:18:4:::::::{}:{}:novnc",
            self.endpoint, handle.node, handle.id
        )
    }
}

// ============================================
// 转换辅助
// ============================================

fn decode<T: DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| FleetError::Backend(format!("无法解析{}: {}", what, e)))
}

/// 后端对空列表可能返回 null
fn decode_list<T: DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    decode(value, what)
}

/// 任务令牌原样返回
fn task_from(value: serde_json::Value) -> Result<TaskReference> {
    match value {
        serde_json::Value::String(token) => Ok(TaskReference::new(token)),
        other => Err(FleetError::Backend(format!("后端未返回任务引用: {}", other))),
    }
}

/// 同步完成的操作没有任务令牌
fn optional_task_from(value: serde_json::Value) -> Option<TaskReference> {
    match value {
        serde_json::Value::String(token) => Some(TaskReference::new(token)),
        _ => None,
    }
}

fn node_from_entry(entry: NodeEntry) -> Node {
    let usage = match (entry.cpu, entry.maxmem) {
        (Some(cpu), Some(total)) => Some(NodeUsage {
            cpu,
            memory_used: entry.mem.unwrap_or(0),
            memory_total: total,
        }),
        _ => None,
    };
    Node {
        name: entry.node,
        status: entry
            .status
            .as_deref()
            .map(NodeStatus::from_name)
            .unwrap_or(NodeStatus::Unknown),
        usage,
    }
}

fn resource_from_entry(node: &str, kind: GuestKind, entry: GuestEntry) -> ManagedResource {
    ManagedResource {
        id: entry.vmid,
        node: node.to_string(),
        kind,
        name: entry.name,
        status: GuestStatus::from_name(entry.status.as_deref().unwrap_or("unknown")),
        uptime: entry.uptime,
    }
}

fn storage_from_entry(node: &str, entry: StorageEntry) -> StorageVolume {
    StorageVolume {
        node: node.to_string(),
        content: entry.content_types().into_iter().collect(),
        used_fraction: entry.fraction(),
        total: entry.total.unwrap_or(0),
        used: entry.used.unwrap_or(0),
        available: entry.avail.unwrap_or(0),
        active: entry.active,
        shared: entry.shared,
        storage_type: entry.storage_type,
        storage: entry.storage,
    }
}

/// 安全组引用等无法映射的规则被跳过
fn rule_from_entry(entry: FirewallRuleEntry) -> Option<FirewallRule> {
    let action = FirewallAction::from_name(&entry.action);
    let direction = FirewallDirection::from_name(&entry.rule_type);
    match (action, direction) {
        (Some(action), Some(direction)) => Some(FirewallRule {
            pos: entry.pos,
            action,
            direction,
            protocol: entry.proto,
            dest_port: entry.dport,
            source_port: entry.sport,
            enabled: entry.enable,
            comment: entry.comment,
        }),
        _ => {
            debug!("跳过无法识别的防火墙规则: {} {}", entry.rule_type, entry.action);
            None
        }
    }
}

fn ensure_snapshot_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FleetError::invalid("快照名称不能为空"));
    }
    Ok(())
}

fn normalize_tags(tags: &str) -> String {
    tags.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
