//! 聚合视图测试

use std::sync::Arc;

use fleet_common::{GuestKind, GuestStatus, NodeStatus};
use fleet_ops::*;
use fleet_pve::{MockBackend, PveError};
use serde_json::json;

fn ops_with(mock: MockBackend) -> (Arc<MockBackend>, FleetOps) {
    let mock = Arc::new(mock);
    let ops = FleetOps::new(mock.clone(), "https://pve.example.com:8006");
    (mock, ops)
}

fn two_nodes() -> MockBackend {
    MockBackend::new().on_get(
        "/nodes",
        json!([
            {"node": "nodeA", "status": "online", "cpu": 0.1, "mem": 1024, "maxmem": 4096},
            {"node": "nodeB", "status": "online", "cpu": 0.2, "mem": 2048, "maxmem": 4096},
        ]),
    )
}

#[tokio::test]
async fn test_machines_isolates_failed_node() {
    let mock = two_nodes()
        .on_get(
            "/nodes/nodeA/qemu",
            json!([
                {"vmid": 100, "name": "web-1", "status": "running", "uptime": 3600},
                {"vmid": 101, "name": "web-2", "status": "stopped"},
            ]),
        )
        .on_get(
            "/nodes/nodeA/lxc",
            json!([{"vmid": "200", "name": "cache-1", "status": "running"}]),
        )
        .fail("/nodes/nodeB/qemu", PveError::Unavailable("connection reset".to_string()))
        .fail(
            "/nodes/nodeB/lxc",
            PveError::ApiError {
                status: 500,
                message: "node nodeB offline".to_string(),
            },
        );
    let (_, ops) = ops_with(mock);

    let view = ops.fleet().machines().await.unwrap();

    assert_eq!(view.items.len(), 3);
    assert!(view.items.iter().all(|r| r.node == "nodeA"));

    let kinds: Vec<(u32, GuestKind)> = view.items.iter().map(|r| (r.id, r.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (100, GuestKind::Vm),
            (101, GuestKind::Vm),
            (200, GuestKind::Container)
        ]
    );
    assert_eq!(view.items[0].status, GuestStatus::Running);
    assert_eq!(view.items[0].uptime, Some(3600));

    // 失败节点的身份被保留
    assert_eq!(view.failures.len(), 2);
    assert!(view.failures.iter().all(|f| f.node == "nodeB"));
    assert!(!view.is_complete());
}

#[tokio::test]
async fn test_machines_node_enumeration_failure() {
    let mock = MockBackend::new().fail("/nodes", PveError::Unavailable("connection refused".to_string()));
    let (mock, ops) = ops_with(mock);

    let result = ops.fleet().machines().await;

    assert!(matches!(result, Err(FleetError::BackendUnavailable(_))));
    // 只有节点枚举这一次调用
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_enumeration_api_error_is_unavailable() {
    let mock = MockBackend::new().fail(
        "/nodes",
        PveError::ApiError {
            status: 401,
            message: "authentication failure".to_string(),
        },
    );
    let (_, ops) = ops_with(mock);

    let result = ops.fleet().storages(None).await;
    assert!(matches!(result, Err(FleetError::BackendUnavailable(_))));
}

#[tokio::test]
async fn test_all_nodes_failing_yields_empty_view() {
    let down = || PveError::Unavailable("timeout".to_string());
    let mock = two_nodes()
        .fail("/nodes/nodeA/qemu", down())
        .fail("/nodes/nodeA/lxc", down())
        .fail("/nodes/nodeB/qemu", down())
        .fail("/nodes/nodeB/lxc", down());
    let (_, ops) = ops_with(mock);

    let view = ops.fleet().machines().await.unwrap();
    assert!(view.items.is_empty());
    assert_eq!(view.failures.len(), 4);
}

#[tokio::test]
async fn test_machines_node_order_stable() {
    let mock = two_nodes()
        .on_get("/nodes/nodeA/qemu", json!([{"vmid": 100, "name": "a-vm"}]))
        .on_get("/nodes/nodeB/qemu", json!([{"vmid": 100, "name": "b-vm"}]))
        .on_get("/nodes/nodeB/lxc", json!(null));
    let (_, ops) = ops_with(mock);

    let view = ops.fleet().machines().await.unwrap();
    let nodes: Vec<&str> = view.items.iter().map(|r| r.node.as_str()).collect();
    assert_eq!(nodes, vec!["nodeA", "nodeB"]);
    assert!(view.is_complete());
}

#[tokio::test]
async fn test_storages_content_filter() {
    let mock = two_nodes()
        .on_get(
            "/nodes/nodeA/storage",
            json!([
                {"storage": "local", "type": "dir", "content": "iso,vztmpl,backup",
                 "used": 50, "total": 100, "avail": 50, "active": 1},
                {"storage": "local-lvm", "type": "lvmthin", "content": "images,rootdir",
                 "used": 10, "total": 100, "avail": 90, "active": 1},
            ]),
        )
        .fail("/nodes/nodeB/storage", PveError::Unavailable("no route".to_string()));
    let (_, ops) = ops_with(mock);

    let all = ops.fleet().storages(None).await.unwrap();
    assert_eq!(all.items.len(), 2);
    assert_eq!(all.failures.len(), 1);
    assert_eq!(all.failures[0].node, "nodeB");
    assert_eq!(all.failures[0].kind, None);

    let isos = ops.fleet().storages(Some("iso")).await.unwrap();
    assert_eq!(isos.items.len(), 1);
    assert_eq!(isos.items[0].storage, "local");
    assert!((isos.items[0].used_fraction - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_overview_marks_unreachable() {
    let mock = two_nodes()
        .on_get(
            "/nodes/nodeA/status",
            json!({"cpu": 0.5, "memory": {"used": 8, "total": 16, "free": 8}}),
        )
        .fail("/nodes/nodeB/status", PveError::Unavailable("timeout".to_string()));
    let (_, ops) = ops_with(mock);

    let view = ops.fleet().overview().await.unwrap();
    assert_eq!(view.items.len(), 2);

    let a = &view.items[0];
    assert!(a.reachable);
    assert_eq!(a.node.status, NodeStatus::Online);
    assert_eq!(a.node.usage.map(|u| u.memory_total), Some(16));

    let b = &view.items[1];
    assert_eq!(b.node.name, "nodeB");
    assert!(!b.reachable);
    assert!(b.node.usage.is_none());
}

#[tokio::test]
async fn test_filter_over_aggregate() {
    let mock = two_nodes()
        .on_get(
            "/nodes/nodeA/qemu",
            json!([
                {"vmid": 100, "name": "web-1", "status": "running"},
                {"vmid": 101, "name": "web-2", "status": "running"},
                {"vmid": 102, "name": "db-1", "status": "running"},
            ]),
        )
        .on_get(
            "/nodes/nodeB/lxc",
            json!([
                {"vmid": 200, "name": "cache-1", "status": "stopped"},
                {"vmid": 201, "name": "cache-2", "status": "stopped"},
            ]),
        );
    let (mock, ops) = ops_with(mock);

    let view = ops.fleet().machines().await.unwrap();
    let calls_after_fetch = mock.call_count();

    let web = MachineFilter::from_parts(Some("web"), None, None)
        .unwrap()
        .apply(view.items.clone());
    assert_eq!(web.len(), 2);

    let stopped = MachineFilter::from_parts(None, Some("stopped"), None)
        .unwrap()
        .apply(view.items.clone());
    let names: Vec<_> = stopped.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, vec!["cache-1", "cache-2"]);

    let none = MachineFilter::from_parts(Some("web"), Some("stopped"), None)
        .unwrap()
        .apply(view.items);
    assert!(none.is_empty());

    // 过滤不发起远程调用
    assert_eq!(mock.call_count(), calls_after_fetch);
}
