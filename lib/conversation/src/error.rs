//! Error types for the conversation crate.
//!
//! `ToolError` covers both sides of the tool boundary:
//! - lookup and registration failures (`UnknownTool`, `DuplicateTool`),
//!   which the dispatcher surfaces to its caller
//! - failures raised inside a tool (`InvalidInput`, `ExecutionFailed`),
//!   which the dispatcher absorbs and renders as `"Error: ..."` text

use std::fmt;

/// Errors from tool registration, lookup and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool is registered under this name.
    UnknownTool { name: String },
    /// A tool with this name is already registered.
    DuplicateTool { name: String },
    /// The tool rejected its input without running.
    InvalidInput { name: String, reason: String },
    /// The tool ran and failed.
    ExecutionFailed { name: String, reason: String },
}

impl ToolError {
    /// Creates an invalid-input error for the named tool.
    #[must_use]
    pub fn invalid_input(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an execution failure for the named tool.
    #[must_use]
    pub fn execution_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error came from inside a tool rather than from
    /// looking one up.
    #[must_use]
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::ExecutionFailed { .. })
    }

    /// Renders the error the way it is reported back into a conversation.
    #[must_use]
    pub fn to_report_text(&self) -> String {
        match self {
            Self::UnknownTool { name } => format!("Error: Unknown tool '{name}'"),
            Self::DuplicateTool { name } => format!("Error: Duplicate tool '{name}'"),
            Self::InvalidInput { reason, .. } | Self::ExecutionFailed { reason, .. } => {
                format!("Error: {reason}")
            }
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "unknown tool: {name}"),
            Self::DuplicateTool { name } => write!(f, "tool '{name}' is already registered"),
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
            Self::ExecutionFailed { name, reason } => {
                write!(f, "tool '{name}' execution failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}
