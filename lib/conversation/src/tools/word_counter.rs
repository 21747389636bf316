//! Word and character counting tool.

use crate::error::ToolError;
use crate::tool::{Tool, ToolSpec};

/// The `word_counter` tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl Tool for WordCounter {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "word_counter",
            "Count the number of words and characters in a text.",
            "text",
        )
    }

    fn call(&self, input: &str) -> Result<String, ToolError> {
        let words = input.split_whitespace().count();
        let chars = input.chars().count();
        Ok(format!("Words: {words}, Characters: {chars}"))
    }
}
