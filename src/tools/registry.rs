//! Tool registry and dispatch.
//!
//! The registry maps tool names to implementations and their schemas. It is
//! built once at startup with `&mut self` registration, then shared behind
//! an `Arc` for unlimited concurrent readers; nothing mutates it afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::retry::{self, RetryPolicy};
use crate::tools::schema::validate_arguments;
use crate::tools::tool::{Tool, ToolError, ToolOutput, ToolSchema};

/// Registry of named tools with validated, retry-wrapped dispatch.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    retry_policy: RetryPolicy,
}

impl ToolRegistry {
    /// Create an empty registry with the given retry policy.
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            tools: HashMap::new(),
            retry_policy,
        }
    }

    /// Register a tool.
    ///
    /// Fails with [`ToolError::DuplicateTool`] if the name is taken; the
    /// first registration stays active.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        tracing::debug!(tool = %name, "registered tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Schemas of all registered tools, sorted by name for stable listings.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name with structured arguments.
    ///
    /// Arguments are validated against the tool's schema before any network
    /// call; validation and unknown-tool failures surface immediately,
    /// without retry. The execution itself runs under the registry's retry
    /// policy.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let invocation = Uuid::new_v4();
        tracing::debug!(%invocation, tool = %name, "invocation received");

        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        if let Err(err) = validate_arguments(&tool.parameters_schema(), &arguments) {
            tracing::warn!(%invocation, tool = %name, error = %err, "argument validation failed");
            return Err(err);
        }

        tracing::debug!(%invocation, tool = %name, "dispatching");
        let tool = Arc::clone(tool);
        let result = retry::retry(&self.retry_policy, move || {
            let tool = Arc::clone(&tool);
            let arguments = arguments.clone();
            async move { tool.execute(arguments).await }
        })
        .await;

        match &result {
            Ok(output) => {
                tracing::debug!(
                    %invocation,
                    tool = %name,
                    duration_ms = output.duration.as_millis() as u64,
                    "invocation succeeded"
                );
            }
            Err(err) => {
                tracing::error!(%invocation, tool = %name, kind = err.kind(), error = %err, "invocation failed");
            }
        }

        result
    }
}
