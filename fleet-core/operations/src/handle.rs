//! 进程级集群连接句柄
//!
//! 启动时构造一次，之后只读共享。构造失败时进入 `Unconfigured` 状态，
//! 每个入口都会得到一致的 "未配置" 错误，而不是空引用。

use std::sync::Arc;

use fleet_pve::ClusterBackend;
use tracing::{error, info};

use crate::config::ClusterConfig;
use crate::error::{FleetError, Result};
use crate::ops::FleetOps;

/// 集群连接句柄
pub enum FleetHandle {
    /// 连接已建立
    Ready(FleetOps),

    /// 启动时构造失败，保存原因
    Unconfigured(String),
}

impl FleetHandle {
    /// 按配置建立连接；失败时返回 `Unconfigured`，不会 panic
    pub fn connect(config: &ClusterConfig) -> Self {
        match config.build_client() {
            Ok(client) => {
                let endpoint = client.endpoint().to_string();
                info!("集群连接已就绪: {}", endpoint);
                Self::Ready(FleetOps::new(Arc::new(client), endpoint))
            }
            Err(e) => {
                error!("集群客户端初始化失败: {}", e);
                Self::Unconfigured(e.to_string())
            }
        }
    }

    /// 使用现成的后端（测试或自定义传输）
    pub fn ready(backend: Arc<dyn ClusterBackend>, endpoint: impl Into<String>) -> Self {
        Self::Ready(FleetOps::new(backend, endpoint))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// 获取操作入口
    pub fn ops(&self) -> Result<&FleetOps> {
        match self {
            Self::Ready(ops) => Ok(ops),
            Self::Unconfigured(reason) => Err(FleetError::NotConfigured(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_missing_config() {
        let handle = FleetHandle::connect(&ClusterConfig::default());
        assert!(!handle.is_ready());
        assert!(matches!(handle.ops(), Err(FleetError::NotConfigured(_))));
    }

    #[test]
    fn test_connect_complete_config() {
        let config = ClusterConfig {
            url: Some("https://pve.example.com".to_string()),
            user: Some("root@pam".to_string()),
            token_id: Some("fleet".to_string()),
            token_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let handle = FleetHandle::connect(&config);
        assert!(handle.is_ready());
        let ops = handle.ops().unwrap();
        assert!(ops
            .console_url(&fleet_common::ResourceHandle::new(
                "pve1",
                100,
                fleet_common::GuestKind::Vm
            ))
            .starts_with("https://pve.example.com:8006/#v1"));
    }
}
