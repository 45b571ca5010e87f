//! 集群后端抽象

use async_trait::async_trait;

use crate::call::RemoteCall;
use crate::error::Result;

/// 集群后端客户端能力
///
/// 实现方负责认证与传输；每次调用返回响应中的 `data` 字段。
/// 变更类接口返回不透明的任务令牌（字符串），而不是最终结果。
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// 执行一次远程调用
    async fn execute(&self, call: RemoteCall) -> Result<serde_json::Value>;
}
