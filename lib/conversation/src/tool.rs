//! Tool registry for conversation mode.
//!
//! Tools are named, synchronous functions with exactly one declared input
//! field. The registry is built once, keeps registration order, and is
//! read-only afterwards.

use crate::error::ToolError;
use crate::tools::{Calculator, CurrentTime, WordCounter};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Static description of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Name of the single input field.
    pub input_field: String,
}

impl ToolSpec {
    /// Creates a new tool spec.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_field: input_field.into(),
        }
    }

    /// The `- name: description` line used in prompts.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }
}

/// A tool callable from a conversation.
pub trait Tool: Send + Sync {
    /// Returns the tool's spec.
    fn spec(&self) -> ToolSpec;

    /// Runs the tool with its single input.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidInput`] or [`ToolError::ExecutionFailed`]
    /// when the tool cannot produce a result.
    fn call(&self, input: &str) -> Result<String, ToolError>;
}

struct Entry {
    spec: ToolSpec,
    tool: Box<dyn Tool>,
}

/// Registry of available tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Entry>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Creates a registry holding the built-in tools:
    /// `calculator`, `get_current_time` and `word_counter`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for tool in [
            Box::new(Calculator) as Box<dyn Tool>,
            Box::new(CurrentTime),
            Box::new(WordCounter),
        ] {
            registry.insert(tool);
        }
        registry
    }

    /// Builds a registry from an ordered list of tools.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if two tools share a name.
    pub fn from_tools(tools: impl IntoIterator<Item = Box<dyn Tool>>) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already taken.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.spec().name;
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.insert(tool);
        Ok(())
    }

    fn insert(&mut self, tool: Box<dyn Tool>) {
        let spec = tool.spec();
        self.tools.insert(spec.name.clone(), Entry { spec, tool });
    }

    /// Gets a tool spec by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name).map(|e| &e.spec)
    }

    /// Returns whether a tool is registered under exactly this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Runs the named tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] if nothing is registered under
    /// `name`, or whatever the tool itself returns.
    pub fn call(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let entry = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;
        entry.tool.call(input)
    }

    /// Returns all tool specs in registration order.
    pub fn all(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values().map(|e| &e.spec)
    }

    /// Returns the registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Renders `- {name}: {description}` per tool, one per line.
    #[must_use]
    pub fn describe(&self) -> String {
        self.all()
            .map(ToolSpec::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Converts specs to the function-calling format expected by LLM APIs.
    #[must_use]
    pub fn to_llm_format(&self) -> Vec<JsonValue> {
        self.all()
            .map(|spec| {
                serde_json::json!({
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": {
                        "type": "object",
                        "properties": {
                            (spec.input_field.clone()): { "type": "string" }
                        },
                        "required": [spec.input_field]
                    }
                })
            })
            .collect()
    }
}
