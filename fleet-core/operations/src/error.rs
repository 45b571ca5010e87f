//! Fleet 错误定义

use fleet_pve::PveError;
use thiserror::Error;

/// Fleet 操作错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FleetError {
    /// 启动时无法构建集群连接
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 负载类型不是 vm / container
    #[error("不支持的负载类型: {0}")]
    InvalidKind(String),

    /// 参数缺失或组合无效，在任何远程调用之前拒绝
    #[error("参数无效: {0}")]
    InvalidArgument(String),

    /// 集群连接本身不可达
    #[error("集群不可达: {0}")]
    BackendUnavailable(String),

    /// 后端拒绝了请求，消息为后端原文
    #[error("后端错误: {0}")]
    Backend(String),

    /// 集群客户端从未成功建立
    #[error("集群客户端未配置: {0}")]
    NotConfigured(String),
}

impl FleetError {
    /// 错误类别名称，供前端输出
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InvalidKind(_) => "invalid_kind",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Backend(_) => "backend_error",
            Self::NotConfigured(_) => "not_configured",
        }
    }

    /// 不含类别前缀的原始消息
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(msg)
            | Self::InvalidKind(msg)
            | Self::InvalidArgument(msg)
            | Self::BackendUnavailable(msg)
            | Self::Backend(msg)
            | Self::NotConfigured(msg) => msg,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<PveError> for FleetError {
    fn from(err: PveError) -> Self {
        match err {
            PveError::ConfigError(msg) => Self::Configuration(msg),
            PveError::Unavailable(msg) => Self::BackendUnavailable(msg),
            PveError::ApiError { message, .. } => Self::Backend(message),
            PveError::ParseError(msg) => Self::Backend(format!("无法解析后端响应: {}", msg)),
        }
    }
}

/// Fleet 结果类型
pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_verbatim() {
        let err: FleetError = PveError::ApiError {
            status: 500,
            message: "VM 100 is locked (backup)".to_string(),
        }
        .into();
        assert_eq!(err, FleetError::Backend("VM 100 is locked (backup)".to_string()));
        assert_eq!(err.kind(), "backend_error");
        assert_eq!(err.message(), "VM 100 is locked (backup)");
    }

    #[test]
    fn test_unavailable_mapping() {
        let err: FleetError = PveError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, FleetError::BackendUnavailable(_)));
    }
}
