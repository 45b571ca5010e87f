//! stdio 服务循环

use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_ops::FleetHandle;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::protocol::{
    RpcError, RpcRequest, RpcResponse, ToolCallParams, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools;

pub const SERVER_NAME: &str = "fleet-mcp";

/// 工具调用服务
pub struct McpServer {
    handle: Arc<FleetHandle>,
}

impl McpServer {
    pub fn new(handle: FleetHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// 逐行读取请求并写回响应，直到输入结束
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP 服务启动，等待请求");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("读取请求失败")? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };

            let frame = serde_json::to_string(&response).context("序列化响应失败")?;
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("输入已关闭，MCP 服务退出");
        Ok(())
    }

    /// 处理一行输入；通知和空行没有响应
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("无法解析请求: {}", e);
                return Some(RpcResponse::failure(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("JSON 解析失败: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(RpcResponse::failure(
                id,
                RpcError::new(INVALID_REQUEST, format!("无效的请求: {}", e)),
            )),
        }
    }

    pub async fn handle_request(&self, request: RpcRequest) -> Option<RpcResponse> {
        debug!("收到请求: {}", request.method);

        if request.is_notification() {
            debug!("通知: {}", request.method);
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return Some(RpcResponse::failure(
                id,
                RpcError::new(INVALID_REQUEST, "jsonrpc 必须为 \"2.0\""),
            ));
        }

        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&json!({ "tools": tools::definitions() })),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("未知方法: {}", other),
            )),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("tools/call 参数无效: {}", e)))?;

        let arguments = params.arguments.unwrap_or(Value::Null);
        let result = tools::call_tool(&self.handle, &params.name, &arguments).await?;
        to_result(&result)
    }
}

/// 回应客户端请求的协议版本，未提供时使用默认版本
fn initialize_result(params: Option<&Value>) -> Value {
    let version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": version,
        "capabilities": {
            "tools": {"listChanged": false},
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))
}
