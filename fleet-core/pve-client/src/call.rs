//! 远程调用描述
//!
//! 每个逻辑操作都被翻译为一个 `RemoteCall`，由 [`ClusterBackend`](crate::ClusterBackend)
//! 执行。调用本身只是数据，便于记录与断言。

use std::fmt;

pub use reqwest::Method;

/// 一次远程 API 调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    /// HTTP 方法
    pub method: Method,

    /// `/api2/json` 之后的路径，例如 `/nodes/pve1/qemu/100/status/start`
    pub path: String,

    /// 参数：GET/DELETE 放入查询串，POST/PUT 作为表单提交
    pub params: Vec<(String, String)>,
}

impl RemoteCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// 添加参数
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// 添加可选参数，None 时不添加
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// 查询参数值
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 参数是否通过请求体提交
    pub fn has_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_builders() {
        let call = RemoteCall::post("/nodes/pve1/qemu/100/clone")
            .param("newid", 101)
            .param("name", "web-2")
            .param_opt("target", None::<&str>);

        assert_eq!(call.method, Method::POST);
        assert_eq!(call.get_param("newid"), Some("101"));
        assert_eq!(call.get_param("name"), Some("web-2"));
        assert_eq!(call.get_param("target"), None);
        assert_eq!(call.params.len(), 2);
        assert!(call.has_body());
    }

    #[test]
    fn test_display() {
        let call = RemoteCall::get("/nodes");
        assert_eq!(call.to_string(), "GET /nodes");
        assert!(!call.has_body());
    }
}
