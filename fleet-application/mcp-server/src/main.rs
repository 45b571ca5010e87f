//! Fleet MCP 服务

use anyhow::Result;
use clap::Parser;
use fleet_mcp::McpServer;
use fleet_ops::{FleetConfig, FleetHandle};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet-mcp")]
#[command(about = "PVE Fleet - MCP 工具服务 (stdio)", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别 (RUST_LOG 优先)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout 只用于协议帧，日志写到 stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("Fleet MCP 启动");

    // 配置有误时仍然启动，所有工具返回未配置说明
    let handle = match FleetConfig::load() {
        Ok(config) => FleetHandle::connect(&config.cluster),
        Err(e) => FleetHandle::Unconfigured(e.to_string()),
    };
    if !handle.is_ready() {
        warn!("集群连接未建立，工具调用将返回未配置说明");
    }

    McpServer::new(handle)
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
