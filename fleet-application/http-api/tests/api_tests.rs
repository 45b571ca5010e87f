//! REST 接口测试

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fleet_http_api::{create_app, AppState};
use fleet_ops::FleetHandle;
use fleet_pve::{Method, MockBackend, PveError};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(mock: MockBackend) -> (Arc<MockBackend>, Router) {
    let mock = Arc::new(mock);
    let handle = FleetHandle::ready(mock.clone(), "https://pve.example.com:8006");
    (mock, create_app(AppState::new(handle)))
}

fn unconfigured_app() -> Router {
    create_app(AppState::new(FleetHandle::Unconfigured(
        "缺少集群连接参数: url".to_string(),
    )))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn cluster() -> MockBackend {
    MockBackend::new()
        .on_get(
            "/nodes",
            json!([
                {"node": "pve1", "status": "online"},
                {"node": "pve2", "status": "online"},
            ]),
        )
        .on_get(
            "/nodes/pve1/qemu",
            json!([
                {"vmid": 100, "name": "web-1", "status": "running", "uptime": 60},
                {"vmid": 101, "name": "web-2", "status": "running"},
                {"vmid": 102, "name": "db-1", "status": "running"},
            ]),
        )
        .on_get(
            "/nodes/pve1/lxc",
            json!([
                {"vmid": 200, "name": "cache-1", "status": "stopped"},
                {"vmid": 201, "name": "cache-2", "status": "stopped"},
            ]),
        )
        .fail("/nodes/pve2/qemu", PveError::Unavailable("timeout".to_string()))
        .fail("/nodes/pve2/lxc", PveError::Unavailable("timeout".to_string()))
}

#[tokio::test]
async fn test_health() {
    let (_, app) = app_with(MockBackend::new());
    let (status, json) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cluster_configured"], true);

    let (status, json) = send(unconfigured_app(), get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "not_configured");
}

#[tokio::test]
async fn test_unconfigured_returns_503() {
    let (status, json) = send(unconfigured_app(), get("/machines")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "not_configured");
}

#[tokio::test]
async fn test_list_machines_with_filters() {
    let (_, app) = app_with(cluster());

    let (status, json) = send(app.clone(), get("/machines")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 5);

    let (_, json) = send(app.clone(), get("/machines?name_filter=web")).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = send(app.clone(), get("/machines?status_filter=stopped&type_filter=lxc")).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["type"], "container");
    assert_eq!(items[0]["node"], "pve1");

    let (_, json) = send(app, get("/machines?name_filter=web&status_filter=stopped")).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_machines_invalid_type_filter() {
    let (mock, app) = app_with(cluster());
    let (status, json) = send(app, get("/machines?type_filter=docker")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_kind");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_node_enumeration_failure_is_503() {
    let mock = MockBackend::new().fail("/nodes", PveError::Unavailable("refused".to_string()));
    let (_, app) = app_with(mock);
    let (status, json) = send(app, get("/storage")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "backend_unavailable");
}

#[tokio::test]
async fn test_start_returns_task_id() {
    let token = "UPID:pve1:0000C0DE:00A1B2C3:6717A1B0:vzstart:200:root@pam:";
    let mock = MockBackend::new().respond(Method::POST, "/nodes/pve1/lxc/200/status/start", json!(token));
    let (_, app) = app_with(mock);

    let (status, json) = send(
        app,
        post_json("/machines/start", json!({"node": "pve1", "vmid": 200, "type": "lxc"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["task_id"], token);
}

#[tokio::test]
async fn test_stop_without_force_is_shutdown() {
    let (mock, app) = app_with(MockBackend::new().respond(
        Method::POST,
        "/nodes/pve1/qemu/100/status/shutdown",
        json!("UPID:shutdown"),
    ));

    let (status, json) = send(
        app,
        post_json("/machines/stop", json!({"node": "pve1", "vmid": 100, "type": "qemu"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["task_id"], "UPID:shutdown");
    assert_eq!(
        mock.last_call().unwrap().path,
        "/nodes/pve1/qemu/100/status/shutdown"
    );
}

#[tokio::test]
async fn test_vmid_floor_rejected() {
    let (mock, app) = app_with(MockBackend::new());
    let (status, json) = send(
        app,
        post_json("/machines/start", json!({"node": "pve1", "vmid": 99, "type": "vm"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_argument");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_backend_error_is_502_verbatim() {
    let mock = MockBackend::new().fail(
        "/nodes/pve1/qemu/100/status/reboot",
        PveError::ApiError {
            status: 500,
            message: "VM 100 not running".to_string(),
        },
    );
    let (_, app) = app_with(mock);

    let (status, json) = send(
        app,
        post_json("/machines/reboot", json!({"node": "pve1", "vmid": 100, "type": "vm"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["detail"], "VM 100 not running");
}

#[tokio::test]
async fn test_resize_without_fields_is_400() {
    let (mock, app) = app_with(MockBackend::new());
    let (status, _) = send(
        app,
        post_json("/machines/resize", json!({"node": "pve1", "vmid": 100, "type": "vm"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_container_resize_task_id_null() {
    let (mock, app) = app_with(MockBackend::new());
    let (status, json) = send(
        app,
        post_json(
            "/machines/resize",
            json!({"node": "pve1", "vmid": 200, "type": "container", "memory_mb": 1024}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["task_id"].is_null());
    assert_eq!(mock.last_call().unwrap().method, Method::PUT);
}

#[tokio::test]
async fn test_download_iso_bad_suffix() {
    let (mock, app) = app_with(MockBackend::new());
    let (status, _) = send(
        app,
        post_json(
            "/isos/download",
            json!({"node": "pve1", "storage": "local", "url": "https://x/y.img", "filename": "y.img"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_delete_snapshot_query() {
    let (mock, app) = app_with(MockBackend::new().respond(
        Method::DELETE,
        "/nodes/pve1/qemu/100/snapshot/nightly",
        json!("UPID:delsnapshot"),
    ));

    let request = Request::builder()
        .method("DELETE")
        .uri("/snapshots?node=pve1&vmid=100&type=vm&snapname=nightly")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["task_id"], "UPID:delsnapshot");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_snapshot_name_cannot_escape_resource() {
    let (mock, app) = app_with(MockBackend::new());

    let request = Request::builder()
        .method("DELETE")
        .uri("/snapshots?node=pve1&vmid=100&type=vm&snapname=..%2F..%2F101")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);

    let call = mock.last_call().unwrap();
    assert_eq!(call.method, Method::DELETE);
    assert_eq!(call.path, "/nodes/pve1/qemu/100/snapshot/..%2F..%2F101");
}

#[tokio::test]
async fn test_encoded_node_path_param_stays_one_segment() {
    let (mock, app) = app_with(MockBackend::new());

    let (status, _) = send(
        app.clone(),
        get("/machines/pve1%2F..%2Fpve2/100/config?type=vm"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        mock.last_call().unwrap().path,
        "/nodes/pve1%2F..%2Fpve2/qemu/100/config"
    );

    let (status, json) = send(app, get("/machines/%2E%2E/100/config?type=vm")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_argument");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_console_url() {
    let (_, app) = app_with(MockBackend::new());
    let (status, json) = send(app, get("/machines/pve1/100/console?type=vm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "https://pve.example.com:8006/#v1:0:18:4:::::::pve1:100:novnc");
}

#[tokio::test]
async fn test_infrastructure_unreachable_node() {
    let mock = MockBackend::new()
        .on_get("/nodes", json!([{"node": "pve1", "status": "online"}, {"node": "pve2"}]))
        .on_get(
            "/nodes/pve1/status",
            json!({"cpu": 0.5, "memory": {"used": 1073741824, "total": 4294967296u64}}),
        )
        .fail("/nodes/pve2/status", PveError::Unavailable("no route".to_string()));
    let (_, app) = app_with(mock);

    let (status, json) = send(app, get("/infrastructure")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["cpu_usage"], "50.0%");
    assert_eq!(json[0]["ram_usage"], "1.0 GB / 4.0 GB");
    assert_eq!(json[1]["status"], "unreachable");
}

#[tokio::test]
async fn test_firewall_rule_add() {
    let (mock, app) = app_with(MockBackend::new());
    let (status, _) = send(
        app,
        post_json(
            "/firewall/rules",
            json!({"node": "pve1", "vmid": 100, "type": "vm",
                   "action": "accept", "direction": "in", "proto": "tcp", "port": "22"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let call = mock.last_call().unwrap();
    assert_eq!(call.get_param("action"), Some("ACCEPT"));
    assert_eq!(call.get_param("dport"), Some("22"));
}

#[tokio::test]
async fn test_cluster_log_default_limit() {
    let (mock, app) = app_with(MockBackend::new().on_get("/cluster/log", json!([])));
    let (status, _) = send(app, get("/cluster/log")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mock.last_call().unwrap().get_param("limit"), Some("50"));
}
