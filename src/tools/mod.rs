//! Tool system.
//!
//! Tools are the crate's unit of capability: named, schema-described
//! callables that each wrap one external data-provider operation. The
//! registry validates arguments, dispatches through the retry wrapper, and
//! hands back normalized results or typed failures.

pub mod builtin;

mod registry;
mod schema;
mod tool;

pub use registry::ToolRegistry;
pub use schema::validate_arguments;
pub use tool::{Tool, ToolError, ToolOutput, ToolSchema};

#[cfg(test)]
pub(crate) use tool::test_support;
