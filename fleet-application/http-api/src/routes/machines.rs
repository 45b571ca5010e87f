//! 负载接口

use axum::{
    extract::{Path, Query, State},
    Json,
};
use fleet_ops::{
    presentation::MachineRecord, CloudInitConfig, MachineFilter, PowerAction, ResizeRequest,
    RrdTimeframe,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{KindQuery, MachineTarget, TaskResponse};
use crate::error::ApiResult;
use crate::state::{ensure_guest_id, resolve, AppState};

#[derive(Debug, Deserialize)]
pub struct MachineQuery {
    pub name_filter: Option<String>,
    pub status_filter: Option<String>,
    pub type_filter: Option<String>,
}

/// 全集群负载列表
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<MachineQuery>,
) -> ApiResult<Json<Vec<MachineRecord>>> {
    // 先校验过滤条件，非法类型不触发远程调用
    let filter = MachineFilter::from_parts(
        query.name_filter.as_deref(),
        query.status_filter.as_deref(),
        query.type_filter.as_deref(),
    )?;

    let view = state.ops()?.fleet().machines().await?;
    let machines = filter.apply(view.items);
    Ok(Json(machines.iter().map(MachineRecord::from).collect()))
}

pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<MachineTarget>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.resolve()?;
    let task = state.ops()?.start(&handle).await?;
    Ok(Json(TaskResponse::accepted(task)))
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    #[serde(default)]
    pub force: bool,
}

/// 停止；`force=false` 时为正常关机
pub async fn stop(
    State(state): State<AppState>,
    Json(req): Json<StopRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let task = state
        .ops()?
        .change_state(&handle, PowerAction::halt(req.force))
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}

pub async fn reboot(
    State(state): State<AppState>,
    Json(req): Json<MachineTarget>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.resolve()?;
    let task = state.ops()?.reboot(&handle).await?;
    Ok(Json(TaskResponse::accepted(task)))
}

#[derive(Debug, Deserialize)]
pub struct CloneRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub newid: u32,
    pub name: String,
    pub target_node: Option<String>,
}

pub async fn clone(
    State(state): State<AppState>,
    Json(req): Json<CloneRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    ensure_guest_id("newid", req.newid)?;
    let task = state
        .ops()?
        .clone_resource(&handle, req.newid, &req.name, req.target_node.as_deref())
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}

#[derive(Debug, Deserialize)]
pub struct ResizeBody {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub cores: Option<u32>,
    pub memory_mb: Option<u64>,
}

pub async fn resize(
    State(state): State<AppState>,
    Json(req): Json<ResizeBody>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let request = ResizeRequest {
        cores: req.cores,
        memory_mb: req.memory_mb,
    };
    let task = state.ops()?.resize(&handle, &request).await?;
    Ok(Json(TaskResponse::maybe(task)))
}

#[derive(Debug, Deserialize)]
pub struct MigrateRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub target_node: String,
    #[serde(default)]
    pub online: bool,
}

pub async fn migrate(
    State(state): State<AppState>,
    Json(req): Json<MigrateRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let task = state
        .ops()?
        .migrate(&handle, &req.target_node, req.online)
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub tags: String,
}

pub async fn tags(
    State(state): State<AppState>,
    Json(req): Json<TagsRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let task = state.ops()?.set_tags(&handle, &req.tags).await?;
    Ok(Json(TaskResponse::maybe(task)))
}

pub async fn unlock(
    State(state): State<AppState>,
    Json(req): Json<MachineTarget>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.resolve()?;
    let task = state.ops()?.unlock(&handle).await?;
    Ok(Json(TaskResponse::maybe(task)))
}

#[derive(Debug, Deserialize)]
pub struct CloudInitRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ssh_keys: Option<String>,
    pub ip_config: Option<String>,
}

pub async fn cloud_init(
    State(state): State<AppState>,
    Json(req): Json<CloudInitRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let config = CloudInitConfig {
        user: req.user,
        password: req.password,
        ssh_keys: req.ssh_keys,
        ip_config: req.ip_config,
    };
    let task = state.ops()?.set_cloud_init(&handle, &config).await?;
    Ok(Json(TaskResponse::maybe(task)))
}

/// 资源详细配置
pub async fn config(
    State(state): State<AppState>,
    Path((node, vmid)): Path<(String, u32)>,
    Query(query): Query<KindQuery>,
) -> ApiResult<Json<serde_json::Map<String, Value>>> {
    let handle = resolve(&node, vmid, &query.kind)?;
    Ok(Json(state.ops()?.machine_config(&handle).await?))
}

/// noVNC 控制台链接
pub async fn console(
    State(state): State<AppState>,
    Path((node, vmid)): Path<(String, u32)>,
    Query(query): Query<KindQuery>,
) -> ApiResult<Json<Value>> {
    let handle = resolve(&node, vmid, &query.kind)?;
    let url = state.ops()?.console_url(&handle);
    Ok(Json(json!({ "url": url })))
}

#[derive(Debug, Deserialize)]
pub struct RrdQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub timeframe: Option<String>,
}

/// 历史指标
pub async fn rrd(
    State(state): State<AppState>,
    Path((node, vmid)): Path<(String, u32)>,
    Query(query): Query<RrdQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let handle = resolve(&node, vmid, &query.kind)?;
    let timeframe = match query.timeframe.as_deref() {
        Some(name) => RrdTimeframe::from_name(name)?,
        None => RrdTimeframe::default(),
    };
    Ok(Json(state.ops()?.rrd_data(&handle, timeframe).await?))
}

/// guest agent 网卡信息
pub async fn agent_network(
    State(state): State<AppState>,
    Path((node, vmid)): Path<(String, u32)>,
    Query(query): Query<KindQuery>,
) -> ApiResult<Json<Value>> {
    let handle = resolve(&node, vmid, &query.kind)?;
    Ok(Json(state.ops()?.agent_network(&handle).await?))
}

#[derive(Debug, Deserialize)]
pub struct AgentExecRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub command: String,
}

/// guest agent 执行命令
pub async fn agent_exec(
    State(state): State<AppState>,
    Json(req): Json<AgentExecRequest>,
) -> ApiResult<Json<Value>> {
    let handle = req.target.resolve()?;
    Ok(Json(state.ops()?.agent_exec(&handle, &req.command).await?))
}
