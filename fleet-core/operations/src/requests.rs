//! 操作参数类型

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};

/// 电源动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Start,
    /// 强制停止
    Stop,
    /// 正常关机
    Shutdown,
    Reboot,
}

impl PowerAction {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "shutdown" => Ok(Self::Shutdown),
            "reboot" => Ok(Self::Reboot),
            other => Err(FleetError::invalid(format!("未知的电源动作: {}", other))),
        }
    }

    /// 后端路径中的动作名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
        }
    }

    /// 停止请求：强制时为 stop，否则为 shutdown
    pub fn halt(force: bool) -> Self {
        if force {
            Self::Stop
        } else {
            Self::Shutdown
        }
    }
}

/// 调整 CPU / 内存
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    /// CPU 核心数
    pub cores: Option<u32>,

    /// 内存大小 (MB)
    pub memory_mb: Option<u64>,
}

impl ResizeRequest {
    /// 至少设置一项，且不能为 0
    pub(crate) fn validate(&self) -> Result<()> {
        if self.cores.is_none() && self.memory_mb.is_none() {
            return Err(FleetError::invalid("cores 与 memory 至少需要指定一项"));
        }
        if self.cores == Some(0) {
            return Err(FleetError::invalid("cores 必须大于 0"));
        }
        if self.memory_mb == Some(0) {
            return Err(FleetError::invalid("memory 必须大于 0"));
        }
        Ok(())
    }
}

/// cloud-init 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudInitConfig {
    /// 默认用户
    pub user: Option<String>,

    /// 默认用户密码
    pub password: Option<String>,

    /// SSH 公钥（每行一个）
    pub ssh_keys: Option<String>,

    /// 第一块网卡的 IP 配置，例如 `ip=192.168.1.50/24,gw=192.168.1.1`
    pub ip_config: Option<String>,
}

impl CloudInitConfig {
    /// 空白字符串与未设置等同
    pub fn is_empty(&self) -> bool {
        self.present().iter().all(Option::is_none)
    }

    /// 按 (user, password, ssh_keys, ip_config) 顺序返回非空白的项
    pub fn present(&self) -> [Option<&str>; 4] {
        [&self.user, &self.password, &self.ssh_keys, &self.ip_config]
            .map(|value| value.as_deref().filter(|v| !v.trim().is_empty()))
    }
}

/// 备份模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    #[default]
    Snapshot,
    Suspend,
    Stop,
}

impl BackupMode {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "suspend" => Ok(Self::Suspend),
            "stop" => Ok(Self::Stop),
            other => Err(FleetError::invalid(format!("未知的备份模式: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Suspend => "suspend",
            Self::Stop => "stop",
        }
    }
}

/// 历史指标时间范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RrdTimeframe {
    #[default]
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl RrdTimeframe {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(FleetError::invalid(format!("未知的时间范围: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}
