//! 集群聚合视图
//!
//! 先枚举节点，再对每个节点独立发起查询。节点枚举失败时整体失败；
//! 单个节点失败只影响该节点的贡献，失败信息保留在 [`FleetView::failures`] 中。
//!
//! 各节点的查询并发执行，全部结束后按节点枚举顺序合并。

use fleet_common::{GuestKind, ManagedResource, Node, NodeOverview, StorageVolume};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{FleetError, Result};
use crate::ops::FleetOps;

/// 单个节点（或节点上某一类型）的查询失败
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFailure {
    pub node: String,

    /// 失败的负载类型；节点级查询失败时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<GuestKind>,

    pub error: String,
}

impl NodeFailure {
    pub fn new(node: &str, kind: Option<GuestKind>, err: FleetError) -> Self {
        Self {
            node: node.to_string(),
            kind,
            error: err.to_string(),
        }
    }
}

/// 尽力而为的聚合结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetView<T> {
    pub items: Vec<T>,

    /// 被跳过的节点
    pub failures: Vec<NodeFailure>,
}

impl<T> FleetView<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// 所有节点都成功返回
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// 集群聚合器
pub struct FleetAggregator<'a> {
    ops: &'a FleetOps,
}

impl<'a> FleetAggregator<'a> {
    pub(crate) fn new(ops: &'a FleetOps) -> Self {
        Self { ops }
    }

    /// 枚举节点；任何失败都视为集群不可达
    async fn enumerate_nodes(&self) -> Result<Vec<Node>> {
        self.ops.list_nodes().await.map_err(|e| {
            error!("节点枚举失败，放弃聚合: {}", e);
            match e {
                FleetError::BackendUnavailable(_) => e,
                other => FleetError::BackendUnavailable(other.to_string()),
            }
        })
    }

    /// 全部节点上的虚拟机与容器
    pub async fn machines(&self) -> Result<FleetView<ManagedResource>> {
        let nodes = self.enumerate_nodes().await?;

        let per_node = join_all(
            nodes
                .iter()
                .map(|node| self.ops.list_resources_on_node(&node.name)),
        )
        .await;

        let mut view = FleetView::empty();
        for result in per_node {
            view.items.extend(result.resources);
            view.failures.extend(result.failures);
        }

        info!(
            "聚合负载完成: {} 个节点, {} 个负载, {} 处失败",
            nodes.len(),
            view.items.len(),
            view.failures.len()
        );
        Ok(view)
    }

    /// 全部节点上的存储，可按内容类型过滤
    pub async fn storages(&self, content_filter: Option<&str>) -> Result<FleetView<StorageVolume>> {
        let nodes = self.enumerate_nodes().await?;
        let content_filter = content_filter.map(str::trim).filter(|c| !c.is_empty());

        let per_node = join_all(nodes.iter().map(|node| async move {
            (node.name.as_str(), self.ops.list_storage_on_node(&node.name).await)
        }))
        .await;

        let mut view = FleetView::empty();
        for (node, result) in per_node {
            match result {
                Ok(volumes) => view.items.extend(
                    volumes
                        .into_iter()
                        .filter(|v| content_filter.map_or(true, |c| v.accepts(c))),
                ),
                Err(e) => {
                    warn!("获取节点 {} 的存储失败，跳过: {}", node, e);
                    view.failures.push(NodeFailure::new(node, None, e));
                }
            }
        }

        info!(
            "聚合存储完成: {} 个节点, {} 个存储, {} 处失败",
            nodes.len(),
            view.items.len(),
            view.failures.len()
        );
        Ok(view)
    }

    /// 节点概览
    ///
    /// 状态查询失败的节点仍然保留，标记为不可达且没有资源使用数据。
    pub async fn overview(&self) -> Result<FleetView<NodeOverview>> {
        let nodes = self.enumerate_nodes().await?;

        let statuses = join_all(nodes.iter().map(|node| self.ops.node_status(&node.name))).await;

        let mut view = FleetView::empty();
        for (mut node, status) in nodes.into_iter().zip(statuses) {
            match status {
                Ok(usage) => {
                    node.usage = Some(usage);
                    view.items.push(NodeOverview {
                        node,
                        reachable: true,
                    });
                }
                Err(e) => {
                    warn!("节点 {} 状态查询失败: {}", node.name, e);
                    view.failures.push(NodeFailure::new(&node.name, None, e));
                    node.usage = None;
                    view.items.push(NodeOverview {
                        node,
                        reachable: false,
                    });
                }
            }
        }
        Ok(view)
    }
}
