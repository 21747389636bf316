//! Sequential prompt chains.
//!
//! A chain is an ordered list of steps sharing one named state. Each step
//! renders its template against the state, makes one model call and stores
//! the reply under its output key. Earlier values stay visible to later
//! steps.

use crate::backend::LlmBackend;
use crate::config::ModelConfig;
use crate::error::{ChainError, PromptError};
use crate::llm_call::LlmCall;
use crate::prompt::{PromptRegistry, PromptTemplate, Variables};
use chainlab_core::Result;
use serde::Serialize;
use tracing::{debug, instrument};

/// Chain types known to [`get_chain`].
pub const CHAIN_TYPES: [&str; 2] = ["simple", "research"];

/// One prompt → model step.
#[derive(Debug, Clone)]
pub struct ChainStep {
    output_key: String,
    template: PromptTemplate,
}

impl ChainStep {
    /// Creates a step whose reply is stored under `output_key`.
    #[must_use]
    pub fn new(output_key: impl Into<String>, template: impl Into<String>) -> Self {
        let output_key = output_key.into();
        Self {
            template: PromptTemplate::new(output_key.clone(), template),
            output_key,
        }
    }

    /// Creates a step from an existing template.
    #[must_use]
    pub fn from_template(output_key: impl Into<String>, template: PromptTemplate) -> Self {
        Self {
            output_key: output_key.into(),
            template,
        }
    }

    #[must_use]
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    #[must_use]
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }
}

/// Named values produced by a chain run, in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct ChainOutput {
    values: Variables,
    final_key: Option<String>,
}

impl ChainOutput {
    /// Looks up any input or step output by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The last step's output, or an empty string for a chain with no steps.
    #[must_use]
    pub fn final_output(&self) -> &str {
        self.final_key
            .as_deref()
            .and_then(|key| self.get(key))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn values(&self) -> &Variables {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Variables {
        self.values
    }
}

/// An ordered sequence of steps.
#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    steps: Vec<ChainStep>,
    model: Option<ModelConfig>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            model: None,
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, output_key: impl Into<String>, template: impl Into<String>) -> Self {
        self.steps.push(ChainStep::new(output_key, template));
        self
    }

    /// Appends a pre-built step.
    #[must_use]
    pub fn then_step(mut self, step: ChainStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Applies model sampling settings to every step.
    #[must_use]
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    /// Generates three app ideas for `topic`, then evaluates them.
    #[must_use]
    pub fn simple() -> Self {
        Self::new("simple")
            .then(
                "ideas",
                "Generate 3 creative app ideas for: {topic}. List them numbered 1-3.",
            )
            .then(
                "evaluation",
                "Evaluate these app ideas and pick the best one. Explain why in 2-3 sentences:\n\n{ideas}",
            )
    }

    /// Researches `topic`, outlines an article, then summarizes it.
    #[must_use]
    pub fn research() -> Self {
        Self::new("research")
            .then(
                "research_data",
                "Research {topic} and provide 3 key facts. Be concise.",
            )
            .then(
                "outline",
                "Create a 3-point outline for an article about {topic} using this research:\n\n{research_data}",
            )
            .then(
                "summary",
                "Write a 2-paragraph summary about {topic} following this outline:\n\n{outline}",
            )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Variables the caller must supply: referenced by some step and not
    /// produced by an earlier one.
    #[must_use]
    pub fn input_variables(&self) -> Vec<String> {
        let mut produced: Vec<&str> = Vec::new();
        let mut inputs: Vec<String> = Vec::new();
        for step in &self.steps {
            for var in step.template.input_variables() {
                if !produced.contains(&var.as_str()) && !inputs.contains(&var) {
                    inputs.push(var);
                }
            }
            produced.push(&step.output_key);
        }
        inputs
    }

    /// Runs every step in order.
    ///
    /// # Errors
    ///
    /// Stops at the first step whose prompt cannot be rendered or whose
    /// model call fails. No partial output is returned.
    #[instrument(skip(self, backend, inputs), fields(chain = %self.name))]
    pub async fn run(
        &self,
        backend: &dyn LlmBackend,
        inputs: Variables,
    ) -> Result<ChainOutput, ChainError> {
        let mut state = inputs;

        for step in &self.steps {
            let prompt = step
                .template
                .format(&state)
                .map_err(|e| ChainError::StepPrompt {
                    chain: self.name.clone(),
                    step: step.output_key.clone(),
                    reason: e.to_string(),
                })?;

            let mut call = LlmCall::new(prompt);
            if let Some(model) = &self.model {
                call = call.with_model(model);
            }
            let result = call
                .execute(backend)
                .await
                .map_err(|e| ChainError::StepModelCall {
                    chain: self.name.clone(),
                    step: step.output_key.clone(),
                    reason: e.to_string(),
                })?;

            debug!(
                step = %step.output_key,
                latency_ms = result.latency_ms,
                "Chain step completed"
            );
            state.insert(step.output_key.clone(), result.content);
        }

        Ok(ChainOutput {
            values: state,
            final_key: self.steps.last().map(|s| s.output_key.clone()),
        })
    }

    /// Runs the chain from `(name, value)` pairs.
    ///
    /// # Errors
    ///
    /// See [`Chain::run`].
    pub async fn run_pairs(
        &self,
        backend: &dyn LlmBackend,
        pairs: &[(&str, &str)],
    ) -> Result<ChainOutput, ChainError> {
        let inputs: Variables = pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        self.run(backend, inputs).await
    }
}

/// Selects a chain by type.
///
/// # Errors
///
/// Returns `ChainError::UnknownChain` naming the available types.
pub fn get_chain(kind: &str) -> Result<Chain, ChainError> {
    match kind {
        "simple" => Ok(Chain::simple()),
        "research" => Ok(Chain::research()),
        other => Err(ChainError::UnknownChain {
            kind: other.to_string(),
            available: CHAIN_TYPES.iter().map(ToString::to_string).collect(),
        }
        .into()),
    }
}

/// A one-step chain over a registered task prompt. The reply is stored
/// under `response`.
///
/// # Errors
///
/// Returns `PromptError::UnknownTask` if the task is not registered.
pub fn task_chain(registry: &PromptRegistry, task: &str) -> Result<Chain, PromptError> {
    let template = registry.get_prompt(task)?.clone();
    Ok(Chain::new(task).then_step(ChainStep::from_template("response", template)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::testing::ScriptedBackend;

    #[test]
    fn builtin_chain_inputs() {
        assert_eq!(Chain::simple().input_variables(), vec!["topic"]);
        assert_eq!(Chain::research().input_variables(), vec!["topic"]);
    }

    #[test]
    fn get_chain_selects_by_type() {
        assert_eq!(get_chain("simple").unwrap().steps().len(), 2);
        let research = get_chain("research").unwrap();
        let keys: Vec<&str> = research.steps().iter().map(ChainStep::output_key).collect();
        assert_eq!(keys, vec!["research_data", "outline", "summary"]);
    }

    #[test]
    fn get_chain_unknown_type() {
        let err = get_chain("unknown").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unknown chain type: unknown"));
        assert!(message.contains("simple"));
        assert!(message.contains("research"));
    }

    #[tokio::test]
    async fn simple_chain_feeds_ideas_into_evaluation() {
        let backend = ScriptedBackend::new(["1. A\n2. B\n3. C", "B is best."]);
        let output = Chain::simple()
            .run_pairs(&backend, &[("topic", "fitness")])
            .await
            .unwrap();

        assert_eq!(output.final_output(), "B is best.");
        assert_eq!(output.get("ideas"), Some("1. A\n2. B\n3. C"));

        let requests = backend.requests();
        assert_eq!(
            requests[0].prompt,
            "Generate 3 creative app ideas for: fitness. List them numbered 1-3."
        );
        assert!(requests[1].prompt.ends_with("\n\n1. A\n2. B\n3. C"));
    }

    #[tokio::test]
    async fn research_chain_threads_named_state() {
        let backend = ScriptedBackend::new(["facts", "outline text", "two paragraphs"]);
        let output = Chain::research()
            .run_pairs(&backend, &[("topic", "AI")])
            .await
            .unwrap();

        let keys: Vec<&str> = output.values().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["topic", "research_data", "outline", "summary"]);
        assert_eq!(output.get("topic"), Some("AI"));
        assert_eq!(output.final_output(), "two paragraphs");

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].prompt.contains("about AI using this research:\n\nfacts"));
        assert!(requests[2].prompt.contains("about AI following this outline:\n\noutline text"));
    }

    #[tokio::test]
    async fn missing_input_fails_before_any_model_call() {
        let backend = ScriptedBackend::new(["unused"]);
        let err = Chain::research().run(&backend, Variables::new()).await.unwrap_err();

        assert!(err.to_string().contains("research_data"));
        assert!(err.to_string().contains("topic"));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn model_failure_names_the_step() {
        let backend =
            ScriptedBackend::with_results([Ok("facts".to_string()), Err(LlmError::Timeout)]);
        let err = Chain::research()
            .run_pairs(&backend, &[("topic", "AI")])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("'outline'"));
        assert!(err.to_string().contains("timed out"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn model_settings_apply_to_every_step() {
        let backend = ScriptedBackend::new(["ideas", "verdict"]);
        Chain::simple()
            .with_model(ModelConfig::default())
            .run_pairs(&backend, &[("topic", "travel")])
            .await
            .unwrap();

        for request in backend.requests() {
            assert_eq!(request.temperature, Some(0.7));
            assert_eq!(request.max_tokens, Some(2000));
        }
    }

    #[tokio::test]
    async fn task_chain_renders_registered_prompt() {
        let registry = PromptRegistry::builtin();
        let chain = task_chain(&registry, "summarizer").unwrap();
        assert_eq!(chain.input_variables(), vec!["length", "text"]);

        let backend = ScriptedBackend::new(["Short summary."]);
        let output = chain
            .run_pairs(&backend, &[("length", "brief"), ("text", "Long text.")])
            .await
            .unwrap();

        assert_eq!(output.final_output(), "Short summary.");
        assert!(backend.requests()[0].prompt.contains("Provide a brief summary"));
    }

    #[test]
    fn task_chain_unknown_task() {
        let err = task_chain(&PromptRegistry::builtin(), "translator").unwrap_err();
        assert!(err.to_string().contains("Unknown task: translator"));
    }

    #[test]
    fn empty_chain_output_is_empty() {
        let output = ChainOutput {
            values: Variables::new(),
            final_key: None,
        };
        assert_eq!(output.final_output(), "");
    }
}
