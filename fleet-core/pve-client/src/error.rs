//! 集群后端错误定义

use thiserror::Error;

/// 集群后端错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PveError {
    /// 客户端构建失败（URL 无法解析、TLS 配置错误等）
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 无法建立连接或传输中断
    #[error("后端不可达: {0}")]
    Unavailable(String),

    /// 后端可达但拒绝了请求，消息为后端原文
    #[error("API 错误 [{status}]: {message}")]
    ApiError { status: u16, message: String },

    #[error("解析错误: {0}")]
    ParseError(String),
}

impl PveError {
    /// 是否为连接层面的失败
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// 集群后端结果类型
pub type Result<T> = std::result::Result<T, PveError>;
