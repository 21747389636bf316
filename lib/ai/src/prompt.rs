//! Prompt templates and the task prompt registry.
//!
//! Templates use `{name}` placeholders. `{{` and `}}` render as literal
//! braces. Substituted values are inserted verbatim and never re-scanned.

use crate::error::PromptError;
use chainlab_core::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named values available to a template.
pub type Variables = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

fn parse_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if closed && !name.is_empty() {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Var(name));
                } else {
                    // Unterminated or empty placeholder: keep it as text.
                    text.push('{');
                    text.push_str(&name);
                    if closed {
                        text.push('}');
                    }
                }
            }
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// A prompt template with `{placeholder}` variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TemplateSource", into = "TemplateSource")]
pub struct PromptTemplate {
    name: String,
    template: String,
    description: Option<String>,
    segments: Vec<Segment>,
}

#[derive(Serialize, Deserialize)]
struct TemplateSource {
    name: String,
    template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<TemplateSource> for PromptTemplate {
    fn from(source: TemplateSource) -> Self {
        let mut template = Self::new(source.name, source.template);
        template.description = source.description;
        template
    }
}

impl From<PromptTemplate> for TemplateSource {
    fn from(template: PromptTemplate) -> Self {
        Self {
            name: template.name,
            template: template.template,
            description: template.description,
        }
    }
}

impl PromptTemplate {
    /// Creates a new prompt template.
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            name: name.into(),
            segments: parse_segments(&template),
            template,
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Template name (used for lookup).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Variables referenced by the template, in first-appearance order.
    #[must_use]
    pub fn input_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in &self.segments {
            if let Segment::Var(name) = segment
                && !names.contains(name)
            {
                names.push(name.clone());
            }
        }
        names
    }

    /// Renders the template.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingVariable` for the first referenced
    /// variable absent from `vars`.
    pub fn format(&self, vars: &Variables) -> Result<String, PromptError> {
        let mut rendered = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Var(name) => {
                    let value = vars.get(name).ok_or_else(|| PromptError::MissingVariable {
                        template: self.name.clone(),
                        variable: name.clone(),
                    })?;
                    rendered.push_str(value);
                }
            }
        }
        Ok(rendered)
    }

    /// Renders the template from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// See [`PromptTemplate::format`].
    pub fn format_pairs(&self, pairs: &[(&str, &str)]) -> Result<String, PromptError> {
        let vars: Variables = pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        self.format(&vars)
    }
}

/// Multilingual assistant prompt.
#[must_use]
pub fn assistant_prompt() -> PromptTemplate {
    PromptTemplate::new(
        "assistant",
        "You are a helpful and friendly chatbot. You are communicating in {language}.\n\n{freeform_text}",
    )
    .with_description("General assistant answering in the requested language")
}

/// Summarizer prompt; `length` is `brief` or `detailed`.
#[must_use]
pub fn summarizer_prompt() -> PromptTemplate {
    PromptTemplate::new(
        "summarizer",
        "You are a text summarizer. Provide a {length} summary of the following text.\n\n\
         If length is \"brief\": Provide 1-2 sentences capturing the main point.\n\
         If length is \"detailed\": Provide a comprehensive summary with key points and details.\n\n\
         Text to summarize:\n{text}\n\nSummary:",
    )
    .with_description("Summarizes text at the requested length")
}

/// Registry of prompt templates, keyed by task name.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    templates: IndexMap<String, PromptTemplate>,
}

impl PromptRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: IndexMap::new(),
        }
    }

    /// The built-in task prompts: `assistant`, `summarizer`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(assistant_prompt());
        registry.register(summarizer_prompt());
        registry
    }

    /// Registers a template, replacing any template with the same name.
    pub fn register(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Gets a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.get(name)
    }

    /// Selects the prompt for a task.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::UnknownTask` naming the registered tasks.
    pub fn get_prompt(&self, task: &str) -> Result<&PromptTemplate, PromptError> {
        self.templates.get(task).ok_or_else(|| {
            PromptError::UnknownTask {
                task: task.to_string(),
                available: self.names(),
            }
            .into()
        })
    }

    /// Registered task names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    /// Returns all registered templates.
    pub fn all(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.templates.values()
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Selects a built-in task prompt by name.
///
/// # Errors
///
/// Returns `PromptError::UnknownTask` for anything but `assistant` or
/// `summarizer`.
pub fn get_prompt(task: &str) -> Result<PromptTemplate, PromptError> {
    PromptRegistry::builtin().get_prompt(task).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_rendering() {
        let template = PromptTemplate::new(
            "classify",
            "Classify the following message into one of: {categories}\n\nMessage: {message}",
        );

        let rendered = template
            .format_pairs(&[
                ("categories", "spam, important, other"),
                ("message", "Hello, this is a test."),
            ])
            .unwrap();
        assert_eq!(
            rendered,
            "Classify the following message into one of: spam, important, other\n\nMessage: Hello, this is a test."
        );
    }

    #[test]
    fn input_variables_in_first_appearance_order() {
        let template = PromptTemplate::new("t", "{b} then {a} then {b} again");
        assert_eq!(template.input_variables(), vec!["b", "a"]);
    }

    #[test]
    fn doubled_braces_are_literal() {
        let template = PromptTemplate::new("json", "Reply as {{\"answer\": {answer}}}");
        assert_eq!(template.input_variables(), vec!["answer"]);
        assert_eq!(
            template.format_pairs(&[("answer", "42")]).unwrap(),
            "Reply as {\"answer\": 42}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_text() {
        let template = PromptTemplate::new("t", "open { brace");
        assert!(template.input_variables().is_empty());
        assert_eq!(template.format(&Variables::new()).unwrap(), "open { brace");
    }

    #[test]
    fn values_are_not_rescanned() {
        let template = PromptTemplate::new("t", "Echo: {text}");
        assert_eq!(
            template.format_pairs(&[("text", "{language}")]).unwrap(),
            "Echo: {language}"
        );
    }

    #[test]
    fn missing_variable_is_an_error() {
        let template = summarizer_prompt();
        let err = template.format_pairs(&[("text", "Some text")]).unwrap_err();
        assert!(err.to_string().contains("length"));
        assert!(err.to_string().contains("summarizer"));
    }

    #[test]
    fn builtin_prompts_declare_their_variables() {
        let registry = PromptRegistry::builtin();
        assert_eq!(registry.names(), vec!["assistant", "summarizer"]);

        let assistant = registry.get_prompt("assistant").unwrap();
        assert_eq!(assistant.input_variables(), vec!["language", "freeform_text"]);

        let summarizer = registry.get_prompt("summarizer").unwrap();
        assert_eq!(summarizer.input_variables(), vec!["length", "text"]);
    }

    #[test]
    fn assistant_prompt_renders_language_and_text() {
        let rendered = get_prompt("assistant")
            .unwrap()
            .format_pairs(&[("language", "Spanish"), ("freeform_text", "Hola")])
            .unwrap();
        assert!(rendered.contains("communicating in Spanish"));
        assert!(rendered.ends_with("\n\nHola"));
    }

    #[test]
    fn unknown_task_lists_available_tasks() {
        let err = get_prompt("unknown_task").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unknown task: unknown_task"));
        assert!(message.contains("assistant"));
        assert!(message.contains("summarizer"));
    }

    #[test]
    fn registry_operations() {
        let mut registry = PromptRegistry::new();
        assert!(registry.is_empty());

        registry.register(PromptTemplate::new("template1", "Content 1"));
        registry.register(PromptTemplate::new("template2", "Content 2"));
        registry.register(PromptTemplate::new("template1", "Content 1b"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("template1").unwrap().template(), "Content 1b");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn serde_reparses_placeholders() {
        let json = r#"{"name":"greet","template":"Hi {name}"}"#;
        let template: PromptTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.input_variables(), vec!["name"]);
        assert_eq!(serde_json::to_string(&template).unwrap(), json);
    }
}
