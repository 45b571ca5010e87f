//! Fleet HTTP API
//!
//! 集群管理的 REST 前端。所有业务逻辑在 `fleet-ops` 中，这里只负责
//! 请求解析、ID 下限校验与结果渲染。

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_app;
pub use state::AppState;
