//! 集群后端客户端核心实现

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::backend::ClusterBackend;
use crate::call::RemoteCall;
use crate::error::{PveError, Result};

/// 管理接口默认端口
pub const DEFAULT_PORT: u16 = 8006;

/// API 路径前缀
const API_PREFIX: &str = "/api2/json";

/// 客户端传输配置
#[derive(Debug, Clone)]
pub struct PveConfig {
    /// 连接超时（秒）
    pub connect_timeout: u64,

    /// 请求超时（秒）
    pub request_timeout: u64,

    /// 是否验证 SSL 证书
    pub verify_ssl: bool,
}

impl Default for PveConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            request_timeout: 30,
            verify_ssl: false,
        }
    }
}

/// API Token 凭据
#[derive(Debug, Clone)]
pub struct PveCredentials {
    /// 用户标识，例如 `root@pam`
    pub user: String,

    /// Token ID
    pub token_id: String,

    /// Token 密钥
    pub token_secret: String,
}

impl PveCredentials {
    /// 构造 Authorization 头
    fn authorization(&self) -> String {
        format!(
            "PVEAPIToken={}!{}={}",
            self.user, self.token_id, self.token_secret
        )
    }
}

/// 集群后端 HTTP 客户端
///
/// 构造后不可变，可在任意数量的并发操作间共享。
pub struct PveClient {
    /// 管理端点，例如 `https://pve.local:8006`
    endpoint: String,

    /// HTTP 客户端
    http_client: Client,

    /// 认证头
    authorization: String,
}

impl PveClient {
    /// 创建新的客户端
    ///
    /// URL 必须能解析出主机名；未指定端口时使用 8006。
    pub fn new(url: &str, credentials: &PveCredentials, config: PveConfig) -> Result<Self> {
        let endpoint = parse_endpoint(url)?;

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| PveError::ConfigError(e.to_string()))?;

        info!("集群客户端已创建: {} ({})", endpoint, credentials.user);

        Ok(Self {
            endpoint,
            http_client,
            authorization: credentials.authorization(),
        })
    }

    /// 管理端点
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 发送 HTTP 请求并取出 `data` 字段
    async fn send(&self, call: RemoteCall) -> Result<serde_json::Value> {
        let url = format!("{}{}{}", self.endpoint, API_PREFIX, call.path);
        debug!("集群 API 请求: {} {}", call.method, url);

        let mut request = self
            .http_client
            .request(call.method.clone(), &url)
            .header("Authorization", &self.authorization);

        request = if call.has_body() {
            request.form(&call.params)
        } else {
            request.query(&call.params)
        };

        let response = request
            .send()
            .await
            .map_err(|e| PveError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("未知错误").to_string();
            let error_text = response.text().await.unwrap_or_default();
            let message = if error_text.trim().is_empty() {
                reason
            } else {
                error_text
            };
            warn!("API 请求失败: {} {} - {} {}", call.method, call.path, status, message);
            return Err(PveError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PveError::ParseError(e.to_string()))?;

        Ok(unwrap_data(body))
    }
}

#[async_trait]
impl ClusterBackend for PveClient {
    async fn execute(&self, call: RemoteCall) -> Result<serde_json::Value> {
        self.send(call).await
    }
}

/// 解析管理端点 URL，只保留 scheme://host:port
pub fn parse_endpoint(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| PveError::ConfigError(format!("无法解析 URL {}: {}", url, e)))?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| PveError::ConfigError(format!("URL 缺少主机名: {}", url)))?;

    let port = parsed.port().unwrap_or(DEFAULT_PORT);

    Ok(format!("{}://{}:{}", parsed.scheme(), host, port))
}

/// 响应统一为 `{"data": ...}`
fn unwrap_data(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) => map.remove("data").unwrap_or(serde_json::Value::Null),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> PveCredentials {
        PveCredentials {
            user: "root@pam".to_string(),
            token_id: "fleet".to_string(),
            token_secret: "secret".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = PveClient::new(
            "https://pve.example.com:8006",
            &credentials(),
            PveConfig::default(),
        );
        assert!(client.is_ok());
        assert_eq!(client.unwrap().endpoint(), "https://pve.example.com:8006");
    }

    #[test]
    fn test_default_port() {
        assert_eq!(
            parse_endpoint("https://pve.example.com").unwrap(),
            "https://pve.example.com:8006"
        );
        assert_eq!(
            parse_endpoint("https://10.0.0.5:9000/").unwrap(),
            "https://10.0.0.5:9000"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(PveError::ConfigError(_))
        ));
        assert!(matches!(
            parse_endpoint("unix:/var/run/pve.sock"),
            Err(PveError::ConfigError(_))
        ));
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(
            credentials().authorization(),
            "PVEAPIToken=root@pam!fleet=secret"
        );
    }

    #[test]
    fn test_unwrap_data() {
        let body = serde_json::json!({ "data": "UPID:pve1:00001234:start" });
        assert_eq!(unwrap_data(body), serde_json::json!("UPID:pve1:00001234:start"));

        let body = serde_json::json!({ "data": null });
        assert!(unwrap_data(body).is_null());
    }
}
