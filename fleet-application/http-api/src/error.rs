//! HTTP 错误响应

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleet_ops::FleetError;
use serde_json::json;
use tracing::warn;

/// 处理器错误，统一转换为 `{"error": 类别, "detail": 消息}`
#[derive(Debug)]
pub struct ApiError(pub FleetError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            FleetError::InvalidKind(_) | FleetError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            FleetError::Backend(_) => StatusCode::BAD_GATEWAY,
            FleetError::BackendUnavailable(_) | FleetError::NotConfigured(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            FleetError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 后端错误原样透传
        let detail = match &self.0 {
            FleetError::Backend(msg) => msg.clone(),
            other => other.to_string(),
        };
        warn!("请求失败 [{}]: {}", status.as_u16(), detail);

        let body = json!({
            "error": self.0.kind(),
            "detail": detail,
        });
        (status, Json(body)).into_response()
    }
}
