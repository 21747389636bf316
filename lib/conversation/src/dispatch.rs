//! Tool dispatch over free-form model output.
//!
//! Models are prompted to request a tool by replying with
//!
//! ```text
//! TOOL: <tool_name>
//! INPUT: <tool_input>
//! ```
//!
//! [`ToolDispatcher::parse_dispatch`] is the only place that knows this
//! convention. Text that does not name a registered tool passes through
//! unchanged.

use crate::error::ToolError;
use crate::tool::ToolRegistry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const TOOL_MARKER: &str = "TOOL:";
const INPUT_MARKER: &str = "INPUT:";

/// How repeated `TOOL:`/`INPUT:` markers are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// The last occurrence of each marker wins.
    #[default]
    LastWins,
    /// The first occurrence of each marker wins.
    FirstPair,
}

/// A tool call extracted from model text, not yet executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Registered tool name.
    pub name: String,
    /// Raw input for the tool's single field.
    pub input: String,
}

/// Outcome of inspecting model text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No usable tool request; the original text, unchanged.
    Direct(String),
    /// A request for a registered tool.
    Tool(ToolRequest),
}

/// Outcome of inspecting model text and running any requested tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchResult {
    /// No tool call was detected.
    Direct { text: String },
    /// A tool ran (possibly reporting an `"Error: ..."` output).
    ToolInvoked {
        tool_name: String,
        tool_input: String,
        tool_output: String,
    },
}

/// Detects tool requests in model text and runs them against a registry.
#[derive(Debug)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
    policy: MarkerPolicy,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new(ToolRegistry::builtin())
    }
}

impl ToolDispatcher {
    /// Creates a dispatcher over `registry` with last-wins markers.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            policy: MarkerPolicy::default(),
        }
    }

    /// Sets the marker policy.
    #[must_use]
    pub fn with_policy(mut self, policy: MarkerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the marker policy.
    #[must_use]
    pub fn policy(&self) -> MarkerPolicy {
        self.policy
    }

    /// Renders `- {name}: {description}` per tool, one per line, for
    /// embedding into a prompt.
    #[must_use]
    pub fn describe_tools(&self) -> String {
        self.registry.describe()
    }

    /// Decides whether `model_text` requests a registered tool.
    ///
    /// Lines starting with `TOOL:` and `INPUT:` set the tool name and input
    /// (trimmed). Both markers must be present and the name must match a
    /// registered tool exactly; otherwise the text comes back as
    /// [`Dispatch::Direct`], byte-for-byte.
    #[must_use]
    pub fn parse_dispatch(&self, model_text: &str) -> Dispatch {
        let mut tool_name: Option<&str> = None;
        let mut tool_input: Option<&str> = None;

        for line in model_text.split('\n') {
            if let Some(rest) = line.strip_prefix(TOOL_MARKER) {
                self.mark(&mut tool_name, rest);
            } else if let Some(rest) = line.strip_prefix(INPUT_MARKER) {
                self.mark(&mut tool_input, rest);
            }
        }

        match (tool_name, tool_input) {
            (Some(name), Some(input)) if self.registry.contains(name) => {
                Dispatch::Tool(ToolRequest {
                    name: name.to_string(),
                    input: input.to_string(),
                })
            }
            (Some(name), Some(_)) => {
                debug!(tool = name, "model named an unregistered tool, answering directly");
                Dispatch::Direct(model_text.to_string())
            }
            _ => Dispatch::Direct(model_text.to_string()),
        }
    }

    fn mark<'a>(&self, slot: &mut Option<&'a str>, rest: &'a str) {
        if slot.is_none() || self.policy == MarkerPolicy::LastWins {
            *slot = Some(rest.trim());
        }
    }

    /// Runs the named tool once.
    ///
    /// Failures inside the tool are absorbed and returned as an
    /// `"Error: ..."` string.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if no tool has this exact name.
    pub fn invoke(&self, tool_name: &str, tool_input: &str) -> Result<String, ToolError> {
        match self.registry.call(tool_name, tool_input) {
            Ok(output) => {
                debug!(tool = tool_name, "tool invoked");
                Ok(output)
            }
            Err(err) if err.is_tool_failure() => {
                warn!(tool = tool_name, error = %err, "tool failed");
                Ok(err.to_report_text())
            }
            Err(err) => Err(err),
        }
    }

    /// Runs the named tool, reporting every failure (including an unknown
    /// name) as `"Error: ..."` text.
    #[must_use]
    pub fn invoke_or_report(&self, tool_name: &str, tool_input: &str) -> String {
        self.invoke(tool_name, tool_input)
            .unwrap_or_else(|err| err.to_report_text())
    }

    /// Parses `model_text` and runs the requested tool, if any.
    #[must_use]
    pub fn dispatch(&self, model_text: &str) -> DispatchResult {
        match self.parse_dispatch(model_text) {
            Dispatch::Direct(text) => DispatchResult::Direct { text },
            Dispatch::Tool(request) => {
                let tool_output = self.invoke_or_report(&request.name, &request.input);
                DispatchResult::ToolInvoked {
                    tool_name: request.name,
                    tool_input: request.input,
                    tool_output,
                }
            }
        }
    }
}
