//! 脚本化的内存后端
//!
//! 按 (方法, 路径) 返回预设的 `data`，或对指定路径返回错误；记录每一次调用。
//! 未预设的路径返回 `null`。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::ClusterBackend;
use crate::call::{Method, RemoteCall};
use crate::error::{PveError, Result};

#[derive(Default)]
pub struct MockBackend {
    responses: HashMap<(Method, String), serde_json::Value>,
    failures: HashMap<String, PveError>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预设某个调用的返回数据
    pub fn respond(mut self, method: Method, path: &str, data: serde_json::Value) -> Self {
        self.responses.insert((method, path.to_string()), data);
        self
    }

    /// 预设 GET 的返回数据
    pub fn on_get(self, path: &str, data: serde_json::Value) -> Self {
        self.respond(Method::GET, path, data)
    }

    /// 对该路径的任何调用都返回错误
    pub fn fail(mut self, path: &str, error: PveError) -> Self {
        self.failures.insert(path.to_string(), error);
        self
    }

    /// 已执行的调用
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// 最后一次调用
    pub fn last_call(&self) -> Option<RemoteCall> {
        self.calls().pop()
    }
}

#[async_trait]
impl ClusterBackend for MockBackend {
    async fn execute(&self, call: RemoteCall) -> Result<serde_json::Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }

        if let Some(error) = self.failures.get(&call.path) {
            return Err(error.clone());
        }

        Ok(self
            .responses
            .get(&(call.method.clone(), call.path.clone()))
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_records_and_answers() {
        let mock = MockBackend::new()
            .on_get("/nodes", json!([{"node": "pve1"}]))
            .fail("/nodes/pve2/qemu", PveError::Unavailable("down".to_string()));

        let data = mock.execute(RemoteCall::get("/nodes")).await.unwrap();
        assert_eq!(data, json!([{"node": "pve1"}]));

        let err = mock.execute(RemoteCall::get("/nodes/pve2/qemu")).await.unwrap_err();
        assert!(err.is_unavailable());

        let data = mock.execute(RemoteCall::post("/nodes/pve1/qemu/100/status/start")).await.unwrap();
        assert!(data.is_null());

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.last_call().unwrap().method, Method::POST);
    }
}
