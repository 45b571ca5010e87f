//! 集群级接口

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fleet_ops::{presentation::NodeRecord, ClusterLogEntry};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_LOG_LINES: usize = 50;

/// 健康检查；集群连接未建立时返回 503
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let configured = state.handle.is_ready();
    let status = if configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if configured { "ok" } else { "not_configured" },
            "cluster_configured": configured,
        })),
    )
}

/// 节点概览
pub async fn infrastructure(State(state): State<AppState>) -> ApiResult<Json<Vec<NodeRecord>>> {
    let view = state.ops()?.fleet().overview().await?;
    Ok(Json(view.items.iter().map(NodeRecord::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub max_lines: Option<usize>,
}

/// 集群事件日志
pub async fn cluster_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<Vec<ClusterLogEntry>>> {
    let lines = query.max_lines.unwrap_or(DEFAULT_LOG_LINES);
    Ok(Json(state.ops()?.cluster_log(lines).await?))
}
