//! Fleet REST 服务

use anyhow::{Context, Result};
use clap::Parser;
use fleet_http_api::{create_app, AppState};
use fleet_ops::{FleetConfig, FleetHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet-api")]
#[command(about = "PVE Fleet - 集群管理 REST 服务", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别 (RUST_LOG 优先)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// 监听地址，覆盖配置中的 http.bind
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Fleet API 启动");

    let config = FleetConfig::load().context("加载配置失败")?;
    let handle = FleetHandle::connect(&config.cluster);
    if !handle.is_ready() {
        warn!("集群连接未建立，除 /health 外的接口将返回 503");
    }

    let bind = cli.bind.unwrap_or(config.http.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("无法监听 {}", bind))?;
    info!("监听地址: {}", bind);

    axum::serve(listener, create_app(AppState::new(handle)))
        .await
        .context("HTTP 服务异常退出")?;

    Ok(())
}
