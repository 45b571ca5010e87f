//! 统一集群操作层
//!
//! 把虚拟机与容器两类负载归一为同一套寻址与操作模型，
//! 在数量未知的节点上聚合状态，并容忍部分节点不可用。
//!
//! # 功能
//!
//! - **资源定位** (`locate`): 校验负载类型并构造 `ResourceHandle`
//! - **集群操作** (`FleetOps`): 生命周期、克隆、调整、快照、迁移、防火墙、备份、镜像等
//! - **聚合视图** (`FleetAggregator`): 跨节点合并负载 / 存储 / 节点概览，单节点失败不影响整体
//! - **过滤** (`MachineFilter`): 名称子串、状态、类型，按 AND 组合
//! - **输出适配** (`presentation`): REST 记录与可读文本
//! - **连接句柄** (`FleetHandle`): 启动时构造一次，未配置时给出一致的错误
//!
//! # 示例
//!
//! ```ignore
//! use fleet_ops::{locate, FleetConfig, FleetHandle, MachineFilter};
//!
//! let config = FleetConfig::load()?;
//! let handle = FleetHandle::connect(&config.cluster);
//! let ops = handle.ops()?;
//!
//! // 全集群负载，过滤出运行中的 web 机器
//! let view = ops.fleet().machines().await?;
//! let filter = MachineFilter::new().with_name("web").with_status("running");
//! let machines = filter.apply(view.items);
//!
//! // 启动一台容器
//! let task = ops.start(&locate("pve1", 200, "container")?).await?;
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod filter;
pub mod handle;
pub mod locator;
pub mod ops;
pub mod presentation;
pub mod requests;
pub mod strategy;

pub use aggregator::{FleetAggregator, FleetView, NodeFailure};
pub use config::{ClusterConfig, FleetConfig, HttpConfig};
pub use error::{FleetError, Result};
pub use filter::MachineFilter;
pub use handle::FleetHandle;
pub use locator::{locate, parse_kind};
pub use ops::{FleetOps, NodeResources, ISO_SUFFIX};
pub use requests::{BackupMode, CloudInitConfig, PowerAction, ResizeRequest, RrdTimeframe};
pub use strategy::{path_segment, strategy, ConfigWrite, KindStrategy};

// 直接透传的后端数据模型
pub use fleet_pve::{ClusterLogEntry, StorageContentEntry, TemplateEntry};
