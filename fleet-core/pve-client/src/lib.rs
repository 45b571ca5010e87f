//! 集群后端客户端
//!
//! 提供与 Proxmox VE 风格管理 API 交互的客户端实现。
//!
//! # 功能
//!
//! - **远程调用描述** (`RemoteCall`): 方法 + 路径 + 参数，纯数据
//! - **后端抽象** (`ClusterBackend`): 执行一次调用并返回 `data` 字段
//! - **HTTP 实现** (`PveClient`): API Token 认证，构造后不可变
//! - **数据模型** (`models`): 节点、负载、存储、快照、防火墙等接口的返回结构
//!
//! # 示例
//!
//! ```ignore
//! use fleet_pve::{ClusterBackend, PveClient, PveConfig, PveCredentials, RemoteCall};
//!
//! let credentials = PveCredentials {
//!     user: "root@pam".into(),
//!     token_id: "fleet".into(),
//!     token_secret: "xxxx".into(),
//! };
//! let client = PveClient::new("https://pve.local:8006", &credentials, PveConfig::default())?;
//!
//! // 查询节点
//! let nodes = client.execute(RemoteCall::get("/nodes")).await?;
//!
//! // 启动虚拟机，返回任务令牌
//! let upid = client
//!     .execute(RemoteCall::post("/nodes/pve1/qemu/100/status/start"))
//!     .await?;
//! ```

pub mod backend;
pub mod call;
pub mod client;
pub mod error;
pub mod models;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use backend::ClusterBackend;
pub use call::{Method, RemoteCall};
pub use client::{parse_endpoint, PveClient, PveConfig, PveCredentials, DEFAULT_PORT};
pub use error::{PveError, Result};

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockBackend;

// 导出数据模型
pub use models::{
    ClusterLogEntry, FirewallRuleEntry, GuestEntry, MemoryEntry, NodeEntry, NodeStatusEntry,
    SnapshotEntry, StorageContentEntry, StorageEntry, TemplateEntry,
};
