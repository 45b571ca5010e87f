//! 工具注册表
//!
//! 每个工具对应一个 `FleetOps` 操作，结果渲染成面向人的文本摘要。
//! 业务错误以 `isError=true` 的文本返回，只有未知工具才是协议错误。

use fleet_common::{
    is_valid_guest_id, FirewallAction, FirewallDirection, FirewallRule, ResourceHandle,
    MIN_GUEST_ID,
};
use fleet_ops::presentation::{append_failures, render_config, render_list, render_task};
use fleet_ops::{
    locate, BackupMode, CloudInitConfig, FleetError, FleetHandle, FleetOps, MachineFilter,
    PowerAction, ResizeRequest, RrdTimeframe,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::protocol::{RpcError, ToolDefinition, ToolResult, INVALID_PARAMS};

type ToolOutcome = Result<String, FleetError>;

const DEFAULT_LOG_LINES: usize = 50;

// ============================================
// 工具定义
// ============================================

/// 生成 `inputSchema`
fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// 定位单个负载的参数，再合并额外字段
fn target_schema(extra: Value, extra_required: &[&str]) -> Value {
    let mut properties = json!({
        "vmid": {"type": "integer", "minimum": MIN_GUEST_ID, "description": "负载 ID"},
        "node": {"type": "string", "description": "所在节点"},
        "type": {"type": "string", "description": "负载类型: vm (qemu) 或 container (lxc)"},
    });
    if let (Some(base), Value::Object(extra)) = (properties.as_object_mut(), extra) {
        base.extend(extra);
    }

    let mut required = vec!["vmid", "node", "type"];
    required.extend_from_slice(extra_required);
    schema(properties, &required)
}

fn storage_schema() -> Value {
    schema(
        json!({
            "node": {"type": "string"},
            "storage": {"type": "string", "description": "存储名称，例如 local"},
        }),
        &["node", "storage"],
    )
}

/// 已注册的工具
///
/// 名称、描述、参数结构与执行逻辑都以此为键。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    // 集群
    ListInfrastructure,
    ListMachines,
    ListStorage,
    GetClusterLog,
    // 生命周期
    StartMachine,
    StopMachine,
    RebootMachine,
    CloneMachine,
    ResizeMachine,
    MigrateMachine,
    // 配置
    GetMachineConfig,
    SetTags,
    UnlockMachine,
    SetCloudInit,
    // 快照
    ListSnapshots,
    CreateSnapshot,
    RollbackSnapshot,
    DeleteSnapshot,
    // 防火墙
    ListFirewallRules,
    AddFirewallRule,
    // 备份与镜像
    ListBackups,
    CreateBackup,
    ListIsos,
    DownloadIso,
    ListLxcTemplates,
    DownloadLxcTemplate,
    // 诊断
    GetRrdData,
    GetAgentNetwork,
    AgentExec,
    GetConsoleUrl,
}

impl Tool {
    pub const ALL: [Tool; 30] = [
        Tool::ListInfrastructure,
        Tool::ListMachines,
        Tool::ListStorage,
        Tool::GetClusterLog,
        Tool::StartMachine,
        Tool::StopMachine,
        Tool::RebootMachine,
        Tool::CloneMachine,
        Tool::ResizeMachine,
        Tool::MigrateMachine,
        Tool::GetMachineConfig,
        Tool::SetTags,
        Tool::UnlockMachine,
        Tool::SetCloudInit,
        Tool::ListSnapshots,
        Tool::CreateSnapshot,
        Tool::RollbackSnapshot,
        Tool::DeleteSnapshot,
        Tool::ListFirewallRules,
        Tool::AddFirewallRule,
        Tool::ListBackups,
        Tool::CreateBackup,
        Tool::ListIsos,
        Tool::DownloadIso,
        Tool::ListLxcTemplates,
        Tool::DownloadLxcTemplate,
        Tool::GetRrdData,
        Tool::GetAgentNetwork,
        Tool::AgentExec,
        Tool::GetConsoleUrl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ListInfrastructure => "list_infrastructure",
            Tool::ListMachines => "list_machines",
            Tool::ListStorage => "list_storage",
            Tool::GetClusterLog => "get_cluster_log",
            Tool::StartMachine => "start_machine",
            Tool::StopMachine => "stop_machine",
            Tool::RebootMachine => "reboot_machine",
            Tool::CloneMachine => "clone_machine",
            Tool::ResizeMachine => "resize_machine",
            Tool::MigrateMachine => "migrate_machine",
            Tool::GetMachineConfig => "get_machine_config",
            Tool::SetTags => "set_tags",
            Tool::UnlockMachine => "unlock_machine",
            Tool::SetCloudInit => "set_cloud_init",
            Tool::ListSnapshots => "list_snapshots",
            Tool::CreateSnapshot => "create_snapshot",
            Tool::RollbackSnapshot => "rollback_snapshot",
            Tool::DeleteSnapshot => "delete_snapshot",
            Tool::ListFirewallRules => "list_firewall_rules",
            Tool::AddFirewallRule => "add_firewall_rule",
            Tool::ListBackups => "list_backups",
            Tool::CreateBackup => "create_backup",
            Tool::ListIsos => "list_isos",
            Tool::DownloadIso => "download_iso",
            Tool::ListLxcTemplates => "list_lxc_templates",
            Tool::DownloadLxcTemplate => "download_lxc_template",
            Tool::GetRrdData => "get_rrd_data",
            Tool::GetAgentNetwork => "get_agent_network",
            Tool::AgentExec => "agent_exec",
            Tool::GetConsoleUrl => "get_console_url",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// `tools/list` 中的描述
    pub fn definition(self) -> ToolDefinition {
        let (description, input_schema) = match self {
            Tool::ListInfrastructure => ("列出集群节点及其 CPU / 内存使用情况", schema(json!({}), &[])),
            Tool::ListMachines => (
                "列出全集群的虚拟机和容器，可按名称、状态、类型过滤",
                schema(
                    json!({
                        "name_filter": {"type": "string", "description": "名称包含的子串"},
                        "status_filter": {"type": "string", "description": "状态，例如 running"},
                        "type_filter": {"type": "string", "description": "vm 或 container"},
                    }),
                    &[],
                ),
            ),
            Tool::ListStorage => (
                "列出全集群的存储，可按内容类型过滤",
                schema(
                    json!({"content_filter": {"type": "string", "description": "例如 iso、backup、images"}}),
                    &[],
                ),
            ),
            Tool::GetClusterLog => (
                "读取集群事件日志",
                schema(
                    json!({"max_lines": {"type": "integer", "minimum": 1, "default": DEFAULT_LOG_LINES}}),
                    &[],
                ),
            ),
            Tool::StartMachine => ("启动虚拟机或容器", target_schema(json!({}), &[])),
            Tool::StopMachine => (
                "停止虚拟机或容器；force=false 时正常关机",
                target_schema(
                    json!({"force": {"type": "boolean", "default": false}}),
                    &[],
                ),
            ),
            Tool::RebootMachine => ("重启虚拟机或容器", target_schema(json!({}), &[])),
            Tool::CloneMachine => (
                "克隆虚拟机或容器",
                target_schema(
                    json!({
                        "newid": {"type": "integer", "minimum": MIN_GUEST_ID},
                        "name": {"type": "string"},
                        "target_node": {"type": "string"},
                    }),
                    &["newid", "name"],
                ),
            ),
            Tool::ResizeMachine => (
                "调整 CPU 核数和内存大小",
                target_schema(
                    json!({
                        "cores": {"type": "integer", "minimum": 1},
                        "memory_mb": {"type": "integer", "minimum": 1},
                    }),
                    &[],
                ),
            ),
            Tool::MigrateMachine => (
                "迁移到其他节点",
                target_schema(
                    json!({
                        "target_node": {"type": "string"},
                        "online": {"type": "boolean", "default": false},
                    }),
                    &["target_node"],
                ),
            ),
            Tool::GetMachineConfig => ("读取负载的详细配置", target_schema(json!({}), &[])),
            Tool::SetTags => (
                "设置标签（逗号或分号分隔）",
                target_schema(json!({"tags": {"type": "string"}}), &["tags"]),
            ),
            Tool::UnlockMachine => ("解除负载的配置锁", target_schema(json!({}), &[])),
            Tool::SetCloudInit => (
                "设置虚拟机的 cloud-init 参数",
                target_schema(
                    json!({
                        "user": {"type": "string"},
                        "password": {"type": "string"},
                        "ssh_keys": {"type": "string"},
                        "ip_config": {"type": "string", "description": "例如 ip=dhcp"},
                    }),
                    &[],
                ),
            ),
            Tool::ListSnapshots => ("列出负载的快照", target_schema(json!({}), &[])),
            Tool::CreateSnapshot => (
                "创建快照",
                target_schema(
                    json!({
                        "snapname": {"type": "string"},
                        "description": {"type": "string"},
                    }),
                    &["snapname"],
                ),
            ),
            Tool::RollbackSnapshot => (
                "回滚到快照",
                target_schema(json!({"snapname": {"type": "string"}}), &["snapname"]),
            ),
            Tool::DeleteSnapshot => (
                "删除快照",
                target_schema(json!({"snapname": {"type": "string"}}), &["snapname"]),
            ),
            Tool::ListFirewallRules => ("列出负载的防火墙规则", target_schema(json!({}), &[])),
            Tool::AddFirewallRule => (
                "添加防火墙规则（不与现有规则去重）",
                target_schema(
                    json!({
                        "action": {"type": "string", "enum": ["ACCEPT", "DROP", "REJECT"]},
                        "direction": {"type": "string", "enum": ["in", "out"]},
                        "proto": {"type": "string"},
                        "port": {"type": "string", "description": "目的端口"},
                        "source_port": {"type": "string"},
                        "comment": {"type": "string"},
                        "enabled": {"type": "boolean", "default": true},
                    }),
                    &["action", "direction"],
                ),
            ),
            Tool::ListBackups => ("列出存储中的备份", storage_schema()),
            Tool::CreateBackup => (
                "创建备份 (vzdump, zstd 压缩)",
                schema(
                    json!({
                        "node": {"type": "string"},
                        "vmid": {"type": "integer", "minimum": MIN_GUEST_ID},
                        "storage": {"type": "string"},
                        "mode": {"type": "string", "enum": ["snapshot", "suspend", "stop"]},
                    }),
                    &["node", "vmid", "storage"],
                ),
            ),
            Tool::ListIsos => ("列出存储中的 ISO 镜像", storage_schema()),
            Tool::DownloadIso => (
                "从 URL 下载 ISO 镜像到存储",
                schema(
                    json!({
                        "node": {"type": "string"},
                        "storage": {"type": "string"},
                        "url": {"type": "string"},
                        "filename": {"type": "string", "description": "必须以 .iso 结尾"},
                    }),
                    &["node", "storage", "url", "filename"],
                ),
            ),
            Tool::ListLxcTemplates => (
                "列出节点可下载的容器模板",
                schema(json!({"node": {"type": "string"}}), &["node"]),
            ),
            Tool::DownloadLxcTemplate => (
                "下载容器模板到存储",
                schema(
                    json!({
                        "node": {"type": "string"},
                        "storage": {"type": "string"},
                        "template": {"type": "string"},
                    }),
                    &["node", "storage", "template"],
                ),
            ),
            Tool::GetRrdData => (
                "读取历史性能指标",
                target_schema(
                    json!({"timeframe": {"type": "string", "enum": ["hour", "day", "week", "month", "year"]}}),
                    &[],
                ),
            ),
            Tool::GetAgentNetwork => ("通过 guest agent 读取虚拟机网卡信息", target_schema(json!({}), &[])),
            Tool::AgentExec => (
                "通过 guest agent 在虚拟机内执行命令",
                target_schema(json!({"command": {"type": "string"}}), &["command"]),
            ),
            Tool::GetConsoleUrl => ("生成 noVNC 控制台链接", target_schema(json!({}), &[])),
        };
        ToolDefinition {
            name: self.name(),
            description,
            input_schema,
        }
    }
}

/// 所有已注册工具
pub fn definitions() -> Vec<ToolDefinition> {
    Tool::ALL.into_iter().map(Tool::definition).collect()
}

pub fn is_registered(name: &str) -> bool {
    Tool::from_name(name).is_some()
}

// ============================================
// 参数
// ============================================

fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, FleetError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(arguments)
        .map_err(|e| FleetError::InvalidArgument(format!("参数错误: {}", e)))
}

#[derive(Debug, Deserialize)]
struct Target {
    vmid: u32,
    node: String,
    #[serde(rename = "type")]
    kind: String,
}

impl Target {
    fn resolve(&self) -> Result<ResourceHandle, FleetError> {
        ensure_guest_id("vmid", self.vmid)?;
        locate(&self.node, self.vmid, &self.kind)
    }
}

fn ensure_guest_id(field: &str, id: u32) -> Result<(), FleetError> {
    if is_valid_guest_id(id) {
        Ok(())
    } else {
        Err(FleetError::InvalidArgument(format!(
            "{} 必须大于等于 {}: {}",
            field, MIN_GUEST_ID, id
        )))
    }
}

#[derive(Debug, Deserialize)]
struct MachinesArgs {
    name_filter: Option<String>,
    status_filter: Option<String>,
    type_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageArgs {
    content_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogArgs {
    max_lines: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct StopArgs {
    #[serde(flatten)]
    target: Target,
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct CloneArgs {
    #[serde(flatten)]
    target: Target,
    newid: u32,
    name: String,
    target_node: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResizeArgs {
    #[serde(flatten)]
    target: Target,
    cores: Option<u32>,
    memory_mb: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MigrateArgs {
    #[serde(flatten)]
    target: Target,
    target_node: String,
    #[serde(default)]
    online: bool,
}

#[derive(Debug, Deserialize)]
struct TagsArgs {
    #[serde(flatten)]
    target: Target,
    tags: String,
}

#[derive(Debug, Deserialize)]
struct CloudInitArgs {
    #[serde(flatten)]
    target: Target,
    user: Option<String>,
    password: Option<String>,
    ssh_keys: Option<String>,
    ip_config: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotArgs {
    #[serde(flatten)]
    target: Target,
    snapname: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirewallArgs {
    #[serde(flatten)]
    target: Target,
    action: String,
    direction: String,
    proto: Option<String>,
    port: Option<String>,
    source_port: Option<String>,
    comment: Option<String>,
    enabled: Option<bool>,
}

impl FirewallArgs {
    fn rule(&self) -> Result<FirewallRule, FleetError> {
        let action = FirewallAction::from_name(&self.action).ok_or_else(|| {
            FleetError::InvalidArgument(format!("未知的防火墙动作: {}", self.action))
        })?;
        let direction = FirewallDirection::from_name(&self.direction).ok_or_else(|| {
            FleetError::InvalidArgument(format!("未知的防火墙方向: {}", self.direction))
        })?;

        let mut rule = FirewallRule::new(action, direction);
        rule.protocol = self.proto.clone();
        rule.dest_port = self.port.clone();
        rule.source_port = self.source_port.clone();
        rule.comment = self.comment.clone();
        rule.enabled = self.enabled.unwrap_or(true);
        Ok(rule)
    }
}

#[derive(Debug, Deserialize)]
struct LocationArgs {
    node: String,
    storage: String,
}

#[derive(Debug, Deserialize)]
struct BackupArgs {
    node: String,
    vmid: u32,
    storage: String,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadIsoArgs {
    node: String,
    storage: String,
    url: String,
    filename: String,
}

#[derive(Debug, Deserialize)]
struct NodeArgs {
    node: String,
}

#[derive(Debug, Deserialize)]
struct TemplateArgs {
    node: String,
    storage: String,
    template: String,
}

#[derive(Debug, Deserialize)]
struct RrdArgs {
    #[serde(flatten)]
    target: Target,
    timeframe: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecArgs {
    #[serde(flatten)]
    target: Target,
    command: String,
}

// ============================================
// 调用
// ============================================

/// 执行工具调用
///
/// 未知工具返回协议错误；集群未配置时任何工具都返回 `isError=true` 的说明文本。
pub async fn call_tool(
    handle: &FleetHandle,
    name: &str,
    arguments: &Value,
) -> Result<ToolResult, RpcError> {
    let Some(tool) = Tool::from_name(name) else {
        return Err(RpcError::new(INVALID_PARAMS, format!("未知工具: {}", name)));
    };
    debug!("调用工具: {} {}", name, arguments);

    let ops = match handle.ops() {
        Ok(ops) => ops,
        Err(e) => return Ok(ToolResult::error(e.to_string())),
    };

    match dispatch(ops, tool, arguments).await {
        Ok(text) => Ok(ToolResult::text(text)),
        Err(e) => {
            warn!("工具 {} 执行失败: {}", name, e);
            Ok(ToolResult::error(e.to_string()))
        }
    }
}

async fn dispatch(ops: &FleetOps, tool: Tool, arguments: &Value) -> ToolOutcome {
    match tool {
        Tool::ListInfrastructure => {
            let view = ops.fleet().overview().await?;
            let text = render_list("集群节点", &view.items, "未找到任何节点。");
            Ok(append_failures(text, &view.failures))
        }
        Tool::ListMachines => {
            let args: MachinesArgs = parse_args(arguments)?;
            // 先校验过滤条件
            let filter = MachineFilter::from_parts(
                args.name_filter.as_deref(),
                args.status_filter.as_deref(),
                args.type_filter.as_deref(),
            )?;
            let view = ops.fleet().machines().await?;
            let machines = filter.apply(view.items);
            let text = render_list("负载", &machines, "没有符合条件的虚拟机或容器。");
            Ok(append_failures(text, &view.failures))
        }
        Tool::ListStorage => {
            let args: StorageArgs = parse_args(arguments)?;
            let view = ops.fleet().storages(args.content_filter.as_deref()).await?;
            let text = render_list("存储", &view.items, "没有符合条件的存储。");
            Ok(append_failures(text, &view.failures))
        }
        Tool::GetClusterLog => {
            let args: LogArgs = parse_args(arguments)?;
            let entries = ops
                .cluster_log(args.max_lines.unwrap_or(DEFAULT_LOG_LINES))
                .await?;
            Ok(render_list("集群日志", &entries, "集群日志为空。"))
        }
        Tool::StartMachine => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let task = ops.start(&handle).await?;
            Ok(render_task(&format!("已提交启动 {}", handle), Some(&task)))
        }
        Tool::StopMachine => {
            let args: StopArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let task = ops.change_state(&handle, PowerAction::halt(args.force)).await?;
            let verb = if args.force { "强制停止" } else { "关机" };
            Ok(render_task(&format!("已提交{} {}", verb, handle), Some(&task)))
        }
        Tool::RebootMachine => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let task = ops.reboot(&handle).await?;
            Ok(render_task(&format!("已提交重启 {}", handle), Some(&task)))
        }
        Tool::CloneMachine => {
            let args: CloneArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            ensure_guest_id("newid", args.newid)?;
            let task = ops
                .clone_resource(&handle, args.newid, &args.name, args.target_node.as_deref())
                .await?;
            Ok(render_task(
                &format!("已提交克隆 {} -> {} ({})", handle, args.newid, args.name),
                Some(&task),
            ))
        }
        Tool::ResizeMachine => {
            let args: ResizeArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let request = ResizeRequest {
                cores: args.cores,
                memory_mb: args.memory_mb,
            };
            let task = ops.resize(&handle, &request).await?;
            Ok(render_task(&format!("已调整 {} 的资源", handle), task.as_ref()))
        }
        Tool::MigrateMachine => {
            let args: MigrateArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let task = ops.migrate(&handle, &args.target_node, args.online).await?;
            Ok(render_task(
                &format!("已提交迁移 {} -> {}", handle, args.target_node),
                Some(&task),
            ))
        }
        Tool::GetMachineConfig => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let config = ops.machine_config(&handle).await?;
            Ok(render_config(&handle, &config))
        }
        Tool::SetTags => {
            let args: TagsArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let task = ops.set_tags(&handle, &args.tags).await?;
            Ok(render_task(&format!("已更新 {} 的标签", handle), task.as_ref()))
        }
        Tool::UnlockMachine => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let task = ops.unlock(&handle).await?;
            Ok(render_task(&format!("已解锁 {}", handle), task.as_ref()))
        }
        Tool::SetCloudInit => {
            let args: CloudInitArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let config = CloudInitConfig {
                user: args.user,
                password: args.password,
                ssh_keys: args.ssh_keys,
                ip_config: args.ip_config,
            };
            let task = ops.set_cloud_init(&handle, &config).await?;
            Ok(render_task(&format!("已更新 {} 的 cloud-init", handle), task.as_ref()))
        }
        Tool::ListSnapshots => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let snapshots = ops.list_snapshots(&handle).await?;
            Ok(render_list(
                &format!("{} 的快照", handle),
                &snapshots,
                &format!("{} 没有快照。", handle),
            ))
        }
        Tool::CreateSnapshot => {
            let args: SnapshotArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let task = ops
                .create_snapshot(&handle, &args.snapname, args.description.as_deref())
                .await?;
            Ok(render_task(
                &format!("已提交创建快照 '{}' ({})", args.snapname, handle),
                Some(&task),
            ))
        }
        Tool::RollbackSnapshot => {
            let args: SnapshotArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let task = ops.rollback_snapshot(&handle, &args.snapname).await?;
            Ok(render_task(
                &format!("已提交回滚到快照 '{}' ({})", args.snapname, handle),
                Some(&task),
            ))
        }
        Tool::DeleteSnapshot => {
            let args: SnapshotArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let task = ops.delete_snapshot(&handle, &args.snapname).await?;
            Ok(render_task(
                &format!("已删除快照 '{}' ({})", args.snapname, handle),
                task.as_ref(),
            ))
        }
        Tool::ListFirewallRules => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let rules = ops.list_firewall_rules(&handle).await?;
            Ok(render_list(
                &format!("{} 的防火墙规则", handle),
                &rules,
                &format!("{} 没有防火墙规则。", handle),
            ))
        }
        Tool::AddFirewallRule => {
            let args: FirewallArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let rule = args.rule()?;
            let task = ops.add_firewall_rule(&handle, &rule).await?;
            Ok(render_task(&format!("已为 {} 添加防火墙规则", handle), task.as_ref()))
        }
        Tool::ListBackups => {
            let args: LocationArgs = parse_args(arguments)?;
            let backups = ops.list_backups(&args.node, &args.storage).await?;
            Ok(render_list(
                &format!("{}/{} 中的备份", args.node, args.storage),
                &backups,
                "没有找到备份。",
            ))
        }
        Tool::CreateBackup => {
            let args: BackupArgs = parse_args(arguments)?;
            ensure_guest_id("vmid", args.vmid)?;
            let mode = match args.mode.as_deref() {
                Some(name) => BackupMode::from_name(name)?,
                None => BackupMode::default(),
            };
            let task = ops
                .create_backup(&args.node, args.vmid, &args.storage, mode)
                .await?;
            Ok(render_task(
                &format!("已提交备份 {} -> {} ({})", args.vmid, args.storage, mode.as_str()),
                Some(&task),
            ))
        }
        Tool::ListIsos => {
            let args: LocationArgs = parse_args(arguments)?;
            let isos = ops.list_isos(&args.node, &args.storage).await?;
            Ok(render_list(
                &format!("{}/{} 中的 ISO 镜像", args.node, args.storage),
                &isos,
                "没有找到 ISO 镜像。",
            ))
        }
        Tool::DownloadIso => {
            let args: DownloadIsoArgs = parse_args(arguments)?;
            let task = ops
                .download_iso(&args.node, &args.storage, &args.url, &args.filename)
                .await?;
            Ok(render_task(
                &format!("已提交下载 {} 到 {}/{}", args.filename, args.node, args.storage),
                Some(&task),
            ))
        }
        Tool::ListLxcTemplates => {
            let args: NodeArgs = parse_args(arguments)?;
            let templates = ops.list_lxc_templates(&args.node).await?;
            Ok(render_list("可用容器模板", &templates, "没有可用的容器模板。"))
        }
        Tool::DownloadLxcTemplate => {
            let args: TemplateArgs = parse_args(arguments)?;
            let task = ops
                .download_lxc_template(&args.node, &args.storage, &args.template)
                .await?;
            Ok(render_task(
                &format!("已提交下载模板 {} 到 {}", args.template, args.storage),
                Some(&task),
            ))
        }
        Tool::GetRrdData => {
            let args: RrdArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let timeframe = match args.timeframe.as_deref() {
                Some(name) => RrdTimeframe::from_name(name)?,
                None => RrdTimeframe::default(),
            };
            let points = ops.rrd_data(&handle, timeframe).await?;
            Ok(format!(
                "{} 的性能指标 ({}, {} 个采样点):\n{}",
                handle,
                timeframe.as_str(),
                points.len(),
                pretty(&Value::Array(points))
            ))
        }
        Tool::GetAgentNetwork => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            let interfaces = ops.agent_network(&handle).await?;
            Ok(format!("{} 的网卡信息:\n{}", handle, pretty(&interfaces)))
        }
        Tool::AgentExec => {
            let args: ExecArgs = parse_args(arguments)?;
            let handle = args.target.resolve()?;
            let output = ops.agent_exec(&handle, &args.command).await?;
            Ok(format!("已在 {} 中执行命令:\n{}", handle, pretty(&output)))
        }
        Tool::GetConsoleUrl => {
            let handle = parse_args::<Target>(arguments)?.resolve()?;
            Ok(format!("{} 的控制台: {}", handle, ops.console_url(&handle)))
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_unique() {
        let tools = definitions();
        let mut names: Vec<_> = tools.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_lookup_by_name() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
            assert_eq!(tool.definition().name, tool.name());
        }
        assert_eq!(Tool::from_name("format_disk"), None);
        assert!(is_registered("agent_exec"));
        assert!(!is_registered("Agent_Exec"));
    }

    #[test]
    fn test_target_schema_requires_locator() {
        let schema = target_schema(json!({"snapname": {"type": "string"}}), &["snapname"]);
        let required: Vec<_> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["vmid", "node", "type", "snapname"]);
        assert!(schema["properties"]["snapname"].is_object());
        assert_eq!(schema["properties"]["vmid"]["minimum"], MIN_GUEST_ID);
    }

    #[test]
    fn test_parse_args_null_is_empty_object() {
        let args: MachinesArgs = parse_args(&Value::Null).unwrap();
        assert!(args.name_filter.is_none());

        let err = parse_args::<Target>(&json!({"node": "pve1"})).unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn test_target_rejects_low_id() {
        let target: Target =
            parse_args(&json!({"vmid": 42, "node": "pve1", "type": "vm"})).unwrap();
        assert!(matches!(target.resolve(), Err(FleetError::InvalidArgument(_))));

        let target: Target =
            parse_args(&json!({"vmid": 142, "node": "pve1", "type": "docker"})).unwrap();
        assert!(matches!(target.resolve(), Err(FleetError::InvalidKind(_))));
    }
}
