//! Tool-calling protocol surface (MCP over JSON-RPC 2.0).

pub mod protocol;
mod server;

pub use protocol::PROTOCOL_VERSION;
pub use server::McpServer;
