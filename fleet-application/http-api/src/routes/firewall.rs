//! 防火墙接口

use axum::{
    extract::{Query, State},
    Json,
};
use fleet_common::{FirewallAction, FirewallDirection, FirewallRule};
use fleet_ops::FleetError;
use serde::Deserialize;

use super::{MachineTarget, TaskResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(target): Query<MachineTarget>,
) -> ApiResult<Json<Vec<FirewallRule>>> {
    let handle = target.resolve()?;
    Ok(Json(state.ops()?.list_firewall_rules(&handle).await?))
}

#[derive(Debug, Deserialize)]
pub struct FirewallRuleRequest {
    #[serde(flatten)]
    pub target: MachineTarget,
    pub action: String,
    pub direction: String,
    pub proto: Option<String>,
    /// 目的端口
    pub port: Option<String>,
    pub source_port: Option<String>,
    pub comment: Option<String>,
    pub enabled: Option<bool>,
}

impl FirewallRuleRequest {
    fn rule(&self) -> ApiResult<FirewallRule> {
        let action = FirewallAction::from_name(&self.action).ok_or_else(|| {
            FleetError::InvalidArgument(format!("未知的防火墙动作: {}", self.action))
        })?;
        let direction = FirewallDirection::from_name(&self.direction).ok_or_else(|| {
            FleetError::InvalidArgument(format!("未知的防火墙方向: {}", self.direction))
        })?;

        let mut rule = FirewallRule::new(action, direction);
        rule.protocol = self.proto.clone();
        rule.dest_port = self.port.clone();
        rule.source_port = self.source_port.clone();
        rule.comment = self.comment.clone();
        rule.enabled = self.enabled.unwrap_or(true);
        Ok(rule)
    }
}

/// 添加规则，不与现有规则去重
pub async fn add(
    State(state): State<AppState>,
    Json(req): Json<FirewallRuleRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let handle = req.target.resolve()?;
    let rule = req.rule()?;
    let task = state.ops()?.add_firewall_rule(&handle, &rule).await?;
    Ok(Json(TaskResponse::maybe(task)))
}
