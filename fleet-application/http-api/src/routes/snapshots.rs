//! 快照接口

use axum::{
    extract::{Query, State},
    Json,
};
use fleet_common::Snapshot;
use serde::Deserialize;

use super::{MachineTarget, TaskResponse};
use crate::error::ApiResult;
use crate::state::{resolve, AppState};

pub async fn list(
    State(state): State<AppState>,
    Query(target): Query<MachineTarget>,
) -> ApiResult<Json<Vec<Snapshot>>> {
    let handle = target.resolve()?;
    Ok(Json(state.ops()?.list_snapshots(&handle).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateSnapshotRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub snapname: String,
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSnapshotRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let task = state
        .ops()?
        .create_snapshot(&handle, &req.snapname, req.description.as_deref())
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}

#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub snapname: String,
}

pub async fn rollback(
    State(state): State<AppState>,
    Json(req): Json<RollbackRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let task = state.ops()?.rollback_snapshot(&handle, &req.snapname).await?;
    Ok(Json(TaskResponse::accepted(task)))
}

/// 删除参数从查询串读取
#[derive(Debug, Deserialize)]
pub struct DeleteSnapshotQuery {
    pub node: String,
    pub vmid: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub snapname: String,
}

pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<DeleteSnapshotQuery>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = resolve(&query.node, query.vmid, &query.kind)?;
    let task = state.ops()?.delete_snapshot(&handle, &query.snapname).await?;
    Ok(Json(TaskResponse::maybe(task)))
}
