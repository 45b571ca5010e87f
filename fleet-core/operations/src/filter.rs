//! 负载过滤
//!
//! 只作用于已经聚合好的数据，不发起远程调用。各条件按 AND 组合，
//! 未设置的条件不参与过滤。

use fleet_common::{GuestKind, ManagedResource};

use crate::error::Result;
use crate::locator::parse_kind;

/// 负载过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineFilter {
    /// 名称子串（小写）
    name: Option<String>,

    /// 生命周期状态（小写）
    status: Option<String>,

    kind: Option<GuestKind>,
}

impl MachineFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由前端原始参数构造，空字符串视为未设置
    pub fn from_parts(name: Option<&str>, status: Option<&str>, kind: Option<&str>) -> Result<Self> {
        let mut filter = Self::new();
        if let Some(name) = name {
            filter = filter.with_name(name);
        }
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        if let Some(kind) = kind.map(str::trim).filter(|k| !k.is_empty()) {
            filter = filter.with_kind(parse_kind(kind)?);
        }
        Ok(filter)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = normalize(name);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = normalize(status);
        self
    }

    pub fn with_kind(mut self, kind: GuestKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.kind.is_none()
    }

    pub fn matches(&self, resource: &ManagedResource) -> bool {
        if let Some(needle) = &self.name {
            // 没有名称的负载不匹配任何名称条件
            let matched = resource
                .name
                .as_deref()
                .map(|n| n.to_lowercase().contains(needle.as_str()))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if resource.status.as_str() != status.as_str() {
                return false;
            }
        }

        if let Some(kind) = self.kind {
            if resource.kind != kind {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, resources: Vec<ManagedResource>) -> Vec<ManagedResource> {
        if self.is_empty() {
            return resources;
        }
        resources.into_iter().filter(|r| self.matches(r)).collect()
    }
}

fn normalize(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;
    use fleet_common::GuestStatus;

    fn resource(id: u32, name: Option<&str>, kind: GuestKind, status: &str) -> ManagedResource {
        ManagedResource {
            id,
            node: "pve1".to_string(),
            kind,
            name: name.map(str::to_string),
            status: GuestStatus::from_name(status),
            uptime: None,
        }
    }

    fn sample() -> Vec<ManagedResource> {
        vec![
            resource(100, Some("web-1"), GuestKind::Vm, "running"),
            resource(101, Some("web-2"), GuestKind::Vm, "running"),
            resource(102, Some("db-1"), GuestKind::Vm, "running"),
            resource(200, Some("cache-1"), GuestKind::Container, "stopped"),
            resource(201, Some("cache-2"), GuestKind::Container, "stopped"),
        ]
    }

    fn names(resources: &[ManagedResource]) -> Vec<&str> {
        resources.iter().filter_map(|r| r.name.as_deref()).collect()
    }

    #[test]
    fn test_name_filter() {
        let result = MachineFilter::new().with_name("web").apply(sample());
        assert_eq!(names(&result), vec!["web-1", "web-2"]);
    }

    #[test]
    fn test_name_filter_case_insensitive() {
        let result = MachineFilter::new().with_name("WEB").apply(sample());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_status_filter() {
        let result = MachineFilter::new().with_status("stopped").apply(sample());
        assert_eq!(names(&result), vec!["cache-1", "cache-2"]);

        let result = MachineFilter::new().with_status("Stopped").apply(sample());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_combined_filters_conjunctive() {
        let result = MachineFilter::new()
            .with_name("web")
            .with_status("stopped")
            .apply(sample());
        assert!(result.is_empty());
    }

    #[test]
    fn test_kind_filter() {
        let result = MachineFilter::new()
            .with_kind(GuestKind::Container)
            .apply(sample());
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| r.kind == GuestKind::Container));
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let filter = MachineFilter::from_parts(Some(""), Some("  "), None).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(sample()), sample());
    }

    #[test]
    fn test_unnamed_never_matches_name_filter() {
        let items = vec![
            resource(300, None, GuestKind::Vm, "running"),
            resource(301, Some(""), GuestKind::Vm, "running"),
        ];
        assert!(MachineFilter::new().with_name("web").apply(items).is_empty());
    }

    #[test]
    fn test_from_parts_kind_aliases() {
        let filter = MachineFilter::from_parts(None, None, Some("lxc")).unwrap();
        assert_eq!(filter, MachineFilter::new().with_kind(GuestKind::Container));

        assert_eq!(
            MachineFilter::from_parts(None, None, Some("docker")),
            Err(FleetError::InvalidKind("docker".to_string()))
        );
    }
}
