//! 配置管理
//!
//! 支持从多个源加载配置:
//! - 环境变量 (优先级最高，启动时先读取 `.env`)
//! - 配置文件 (TOML)
//! - 默认值 (优先级最低)
//!
//! 配置文件搜索路径 (按优先级):
//! 1. `FLEET_CONFIG` 环境变量指定的路径
//! 2. `./fleet.toml` (当前目录)
//! 3. `~/.config/fleet/fleet.toml` (用户配置目录)
//! 4. `/etc/fleet/fleet.toml` (系统配置目录)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fleet_pve::{parse_endpoint, PveClient, PveConfig, PveCredentials};
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};

// ============================================
// 核心配置结构
// ============================================

/// 顶层配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// 集群连接
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// REST 前端
    #[serde(default)]
    pub http: HttpConfig,
}

/// 集群连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// 管理端点，例如 `https://pve.local:8006`
    #[serde(default)]
    pub url: Option<String>,

    /// 用户，例如 `root@pam`
    #[serde(default)]
    pub user: Option<String>,

    /// API Token 名称
    #[serde(default)]
    pub token_id: Option<String>,

    /// API Token 密钥
    #[serde(default, skip_serializing)]
    pub token_secret: Option<String>,

    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// 连接超时 (秒)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// 请求超时 (秒)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// REST 前端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// 监听地址
    #[serde(default = "default_bind")]
    pub bind: String,
}

// ============================================
// 默认值函数
// ============================================

fn default_verify_ssl() -> bool {
    false
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    30
}
fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            token_id: None,
            token_secret: None,
            verify_ssl: default_verify_ssl(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

// ============================================
// 配置加载实现
// ============================================

impl FleetConfig {
    /// 从多个源加载配置 (优先级: 环境变量 > 配置文件 > 默认值)
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("已加载环境文件: {:?}", path);
        }

        let mut config = match Self::find_config_file() {
            Some(path) => {
                tracing::debug!("从配置文件加载: {:?}", path);
                Self::load_from_file(&path)?
            }
            None => {
                tracing::debug!("未找到配置文件，使用默认值");
                Self::default()
            }
        };

        config.apply_env_with(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FleetError::Configuration(format!("无法读取配置文件 {:?}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| FleetError::Configuration(format!("无法解析配置文件 {:?}: {}", path, e)))
    }

    /// 查找配置文件 (按优先级搜索)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("FLEET_CONFIG") {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }

        let mut candidates = vec![PathBuf::from("./fleet.toml")];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".config/fleet/fleet.toml"));
        }
        #[cfg(target_os = "linux")]
        candidates.push(PathBuf::from("/etc/fleet/fleet.toml"));

        candidates.into_iter().find(|p| p.exists())
    }

    /// 用给定的变量查询函数覆盖配置
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PROXMOX_URL") {
            self.cluster.url = Some(url);
        }
        if let Some(user) = lookup("PROXMOX_USER") {
            self.cluster.user = Some(user);
        }
        if let Some(token_id) = lookup("PROXMOX_TOKEN_ID") {
            self.cluster.token_id = Some(token_id);
        }
        if let Some(secret) = lookup("PROXMOX_TOKEN_SECRET") {
            self.cluster.token_secret = Some(secret);
        }
        if let Some(verify) = lookup("PROXMOX_VERIFY_SSL") {
            self.cluster.verify_ssl = parse_bool(&verify).ok_or_else(|| {
                FleetError::Configuration(format!("PROXMOX_VERIFY_SSL 取值无效: {}", verify))
            })?;
        }
        if let Some(bind) = lookup("FLEET_HTTP_BIND") {
            self.http.bind = bind;
        }
        Ok(())
    }
}

impl ClusterConfig {
    /// 验证必填字段与端点 URL
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("url", &self.url),
            ("user", &self.user),
            ("token_id", &self.token_id),
            ("token_secret", &self.token_secret),
        ]
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(FleetError::Configuration(format!(
                "缺少集群连接参数: {}",
                missing.join(", ")
            )));
        }

        parse_endpoint(self.url.as_deref().unwrap_or_default())?;
        Ok(())
    }

    /// 构建集群客户端
    pub fn build_client(&self) -> Result<PveClient> {
        self.validate()?;

        let credentials = PveCredentials {
            user: self.user.clone().unwrap_or_default(),
            token_id: self.token_id.clone().unwrap_or_default(),
            token_secret: self.token_secret.clone().unwrap_or_default(),
        };
        let config = PveConfig {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            verify_ssl: self.verify_ssl,
        };

        Ok(PveClient::new(
            self.url.as_deref().unwrap_or_default(),
            &credentials,
            config,
        )?)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
