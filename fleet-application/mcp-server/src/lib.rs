//! Fleet MCP Server
//!
//! 以 JSON-RPC 2.0 (MCP 方言) 在 stdin/stdout 上提供集群管理工具。
//! 工具只做参数解析与文本渲染，操作本身由 `fleet-ops` 完成。

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{RpcError, RpcRequest, RpcResponse, ToolDefinition, ToolResult};
pub use tools::Tool;
pub use server::McpServer;
