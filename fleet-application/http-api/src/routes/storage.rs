//! 存储、备份、ISO 镜像与容器模板接口

use axum::{
    extract::{Query, State},
    Json,
};
use fleet_ops::{
    presentation::StorageRecord, BackupMode, StorageContentEntry, TemplateEntry,
};
use serde::Deserialize;

use super::TaskResponse;
use crate::error::ApiResult;
use crate::state::{ensure_guest_id, AppState};

#[derive(Debug, Deserialize)]
pub struct StorageQuery {
    pub content_filter: Option<String>,
}

/// 全集群存储
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<StorageQuery>,
) -> ApiResult<Json<Vec<StorageRecord>>> {
    let view = state
        .ops()?
        .fleet()
        .storages(query.content_filter.as_deref())
        .await?;
    Ok(Json(view.items.iter().map(StorageRecord::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct StorageLocation {
    pub node: String,
    pub storage: String,
}

pub async fn list_backups(
    State(state): State<AppState>,
    Query(location): Query<StorageLocation>,
) -> ApiResult<Json<Vec<StorageContentEntry>>> {
    Ok(Json(
        state
            .ops()?
            .list_backups(&location.node, &location.storage)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateBackupRequest {
    pub node: String,
    pub vmid: u32,
    pub storage: String,
    pub mode: Option<String>,
}

pub async fn create_backup(
    State(state): State<AppState>,
    Json(req): Json<CreateBackupRequest>,
) -> ApiResult<Json<TaskResponse>> {
    ensure_guest_id("vmid", req.vmid)?;
    let mode = match req.mode.as_deref() {
        Some(name) => BackupMode::from_name(name)?,
        None => BackupMode::default(),
    };
    let task = state
        .ops()?
        .create_backup(&req.node, req.vmid, &req.storage, mode)
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}

pub async fn list_isos(
    State(state): State<AppState>,
    Query(location): Query<StorageLocation>,
) -> ApiResult<Json<Vec<StorageContentEntry>>> {
    Ok(Json(
        state
            .ops()?
            .list_isos(&location.node, &location.storage)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct DownloadIsoRequest {
    pub node: String,
    pub storage: String,
    pub url: String,
    pub filename: String,
}

pub async fn download_iso(
    State(state): State<AppState>,
    Json(req): Json<DownloadIsoRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .ops()?
        .download_iso(&req.node, &req.storage, &req.url, &req.filename)
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}

#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    pub node: String,
}

pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> ApiResult<Json<Vec<TemplateEntry>>> {
    Ok(Json(state.ops()?.list_lxc_templates(&query.node).await?))
}

#[derive(Debug, Deserialize)]
pub struct DownloadTemplateRequest {
    pub node: String,
    pub storage: String,
    pub template: String,
}

pub async fn download_template(
    State(state): State<AppState>,
    Json(req): Json<DownloadTemplateRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .ops()?
        .download_lxc_template(&req.node, &req.storage, &req.template)
        .await?;
    Ok(Json(TaskResponse::accepted(task)))
}
