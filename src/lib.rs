//! Market data tools for AI agents.
//!
//! A registry of independent, stateless tools, each wrapping one external
//! market-data API call (stock quotes and history, Solana token prices and
//! metadata), exposed to an orchestrator over the Model Context Protocol.
//! Tool dispatch validates arguments against each tool's JSON Schema and
//! recovers from transient upstream failures with bounded exponential
//! backoff.

pub mod config;
pub mod mcp;
pub mod retry;
pub mod tools;

pub use config::Settings;
pub use mcp::McpServer;
pub use retry::RetryPolicy;
pub use tools::{Tool, ToolError, ToolOutput, ToolRegistry, ToolSchema};
