//! MCP (Model Context Protocol) implementation.

pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{Tool, ToolHandler, ToolRegistry};
