//! Tool trait and types.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool execution.
///
/// Every failure an orchestrator can observe is one of these kinds; raw
/// transport or parse errors never escape unclassified.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Malformed or unknown input identifier. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Arguments did not match the tool's parameter schema.
    #[error("invalid arguments: field '{field}': {message}")]
    Schema { field: String, message: String },

    /// No tool registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with this name is already registered.
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    /// Network-level failure expected to be recoverable (timeout,
    /// connection reset). Retried up to the configured ceiling.
    #[error("transient network failure: {0}")]
    Transient(String),

    /// The upstream provider returned an error payload.
    #[error("provider error: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// All retry attempts failed; carries the last transient error.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<ToolError>,
    },
}

impl ToolError {
    /// Whether the retry wrapper may recover from this failure.
    ///
    /// Provider errors count as transient only when the status code says
    /// so (429 or 5xx); everything else propagates immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ToolError::Transient(_) => true,
            ToolError::Provider {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Stable machine-readable kind string for the orchestrator to branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidInput(_) => "invalid_input",
            ToolError::Schema { .. } => "schema_validation",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::DuplicateTool(_) => "duplicate_tool",
            ToolError::Transient(_) => "transient_network",
            ToolError::Provider { .. } => "provider",
            ToolError::RetryExhausted { .. } => "retry_exhausted",
        }
    }
}

/// Output from a successful tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The normalized result data.
    pub result: serde_json::Value,
    /// Time taken, including any retries.
    pub duration: Duration,
}

impl ToolOutput {
    /// Create an output with a JSON result.
    pub fn success(result: serde_json::Value, duration: Duration) -> Self {
        Self { result, duration }
    }

    /// Create a plain-text output.
    pub fn text(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
            duration,
        }
    }
}

/// Definition of a tool's parameters using JSON Schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    /// Create a new tool schema with an empty parameter object.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Set the parameters schema.
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Trait for tools exposed to an orchestrator.
///
/// Implementations are stateless with respect to invocations: each call to
/// [`execute`](Tool::execute) wraps exactly one external operation and
/// shares nothing with other calls.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get a description of what the tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    ///
    /// Parameters have already been validated against
    /// [`parameters_schema`](Tool::parameters_schema) by the registry.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;

    /// Get the full schema for tool listing.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::EchoTool;
    use super::*;

    #[tokio::test]
    async fn test_echo_tool() {
        let tool = EchoTool;

        let result = tool
            .execute(serde_json::json!({"message": "hello"}))
            .await
            .unwrap();

        assert_eq!(result.result, serde_json::json!("hello"));
    }

    #[test]
    fn test_tool_schema() {
        let tool = EchoTool;
        let schema = tool.schema();

        assert_eq!(schema.name, "echo");
        assert!(!schema.description.is_empty());
    }

    #[test]
    fn test_transient_classification() {
        assert!(ToolError::Transient("timed out".into()).is_transient());
        assert!(
            ToolError::Provider {
                status: Some(503),
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(
            ToolError::Provider {
                status: Some(429),
                message: "slow down".into()
            }
            .is_transient()
        );
        assert!(
            !ToolError::Provider {
                status: Some(404),
                message: "no such symbol".into()
            }
            .is_transient()
        );
        assert!(!ToolError::InvalidInput("bad".into()).is_transient());
        assert!(!ToolError::UnknownTool("nope".into()).is_transient());
    }

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(ToolError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(
            ToolError::Schema {
                field: "symbol".into(),
                message: "missing".into()
            }
            .kind(),
            "schema_validation"
        );
        assert_eq!(
            ToolError::RetryExhausted {
                attempts: 3,
                source: Box::new(ToolError::Transient("reset".into())),
            }
            .kind(),
            "retry_exhausted"
        );
    }
}
