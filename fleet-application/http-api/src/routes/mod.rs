//! 路由定义

use axum::{
    routing::{get, post},
    Router,
};
use fleet_common::{ResourceHandle, TaskReference};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiResult;
use crate::state::{resolve, AppState};

mod cluster;
mod firewall;
mod machines;
mod snapshots;
mod storage;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // 集群
        .route("/health", get(cluster::health))
        .route("/infrastructure", get(cluster::infrastructure))
        .route("/cluster/log", get(cluster::cluster_log))
        // 负载
        .route("/machines", get(machines::list))
        .route("/machines/start", post(machines::start))
        .route("/machines/stop", post(machines::stop))
        .route("/machines/reboot", post(machines::reboot))
        .route("/machines/clone", post(machines::clone))
        .route("/machines/resize", post(machines::resize))
        .route("/machines/migrate", post(machines::migrate))
        .route("/machines/tags", post(machines::tags))
        .route("/machines/unlock", post(machines::unlock))
        .route("/machines/cloudinit", post(machines::cloud_init))
        .route("/machines/agent/exec", post(machines::agent_exec))
        .route("/machines/:node/:vmid/config", get(machines::config))
        .route("/machines/:node/:vmid/console", get(machines::console))
        .route("/machines/:node/:vmid/rrd", get(machines::rrd))
        .route("/machines/:node/:vmid/agent/network", get(machines::agent_network))
        // 快照
        .route(
            "/snapshots",
            get(snapshots::list)
                .post(snapshots::create)
                .delete(snapshots::delete),
        )
        .route("/snapshots/rollback", post(snapshots::rollback))
        // 存储 / 备份 / 镜像 / 模板
        .route("/storage", get(storage::list))
        .route("/backups", get(storage::list_backups).post(storage::create_backup))
        .route("/isos", get(storage::list_isos))
        .route("/isos/download", post(storage::download_iso))
        .route("/templates", get(storage::list_templates))
        .route("/templates/download", post(storage::download_template))
        // 防火墙
        .route("/firewall/rules", get(firewall::list).post(firewall::add))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 变更类操作的响应；同步完成的操作 `task_id` 为 null
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: Option<TaskReference>,
}

impl TaskResponse {
    pub fn accepted(task: TaskReference) -> Self {
        Self {
            task_id: Some(task),
        }
    }

    pub fn maybe(task: Option<TaskReference>) -> Self {
        Self { task_id: task }
    }
}

/// 单个资源的定位参数（请求体或查询串）
#[derive(Debug, Deserialize)]
pub struct MachineTarget {
    pub node: String,
    pub vmid: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MachineTarget {
    pub fn resolve(&self) -> ApiResult<ResourceHandle> {
        resolve(&self.node, self.vmid, &self.kind)
    }
}

/// 路径中已有节点与 ID 时的类型参数
#[derive(Debug, Deserialize)]
pub struct KindQuery {
    #[serde(rename = "type")]
    pub kind: String,
}
