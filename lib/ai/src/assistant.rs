//! Memory-aware, tool-augmented assistant.
//!
//! One user message produces at most two model calls: the first reply, and
//! when that reply requests a registered tool, one follow-up carrying the
//! tool's output. Both exchanges are recorded in the session transcript.

use crate::backend::LlmBackend;
use crate::config::{AssistantConfig, ModelConfig};
use crate::error::{AssistantError, LlmError};
use crate::llm_call::LlmCall;
use crate::prompt::PromptTemplate;
use chainlab_conversation::{Dispatch, DispatchResult, Role, Session, SessionStore, ToolDispatcher};
use chainlab_core::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Tool invocations allowed per user message.
pub const MAX_TOOL_HOPS: usize = 1;

const MEMORY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. You remember everything the user tells you.";

fn tool_system_prompt() -> PromptTemplate {
    PromptTemplate::new(
        "tool_assistant",
        "You are a helpful assistant with memory and tools.\n\n\
         Available tools:\n{tools}\n\n\
         To use a tool, respond with:\nTOOL: [tool_name]\nINPUT: [input]\n\n\
         Otherwise, answer naturally. Remember what the user tells you.",
    )
}

fn tool_question_prompt() -> PromptTemplate {
    PromptTemplate::new(
        "tool_question",
        "You have access to these tools:\n{tools}\n\n\
         If you need to use a tool, respond ONLY with:\nTOOL: [tool_name]\nINPUT: [input_for_tool]\n\n\
         If you don't need to use a tool, answer directly.\n\n\
         Question: {question}",
    )
}

/// A tool run during an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub input: String,
    /// Tool output, or its `"Error: ..."` report.
    pub output: String,
}

/// The outcome of one user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Text returned to the user.
    pub reply: String,
    /// The tool that ran, if any.
    pub tool: Option<ToolInvocation>,
}

/// A chat assistant over a session store and an optional tool dispatcher.
///
/// Without a dispatcher, model replies are returned as-is.
pub struct Assistant {
    backend: Arc<dyn LlmBackend>,
    store: SessionStore,
    dispatcher: Option<ToolDispatcher>,
    model: ModelConfig,
    default_session: String,
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("backend", &self.backend.model())
            .field("store", &self.store)
            .field("dispatcher", &self.dispatcher)
            .field("model", &self.model)
            .field("default_session", &self.default_session)
            .finish()
    }
}

impl Assistant {
    /// Creates a memory-only assistant.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>, store: SessionStore) -> Self {
        Self {
            backend,
            store,
            dispatcher: None,
            model: ModelConfig::default(),
            default_session: AssistantConfig::default().default_session,
        }
    }

    /// Creates an assistant from configuration, offering the built-in tools
    /// unless they are disabled.
    #[must_use]
    pub fn from_config(
        backend: Arc<dyn LlmBackend>,
        store: SessionStore,
        config: &AssistantConfig,
    ) -> Self {
        let mut assistant = Self::new(backend, store)
            .with_model(config.model.clone())
            .with_default_session(config.default_session.clone());
        if config.tools_enabled {
            assistant = assistant
                .with_tools(ToolDispatcher::default().with_policy(config.marker_policy));
        }
        assistant
    }

    /// Offers the dispatcher's tools to the model.
    #[must_use]
    pub fn with_tools(mut self, dispatcher: ToolDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn with_default_session(mut self, session: impl Into<String>) -> Self {
        self.default_session = session.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn dispatcher(&self) -> Option<&ToolDispatcher> {
        self.dispatcher.as_ref()
    }

    #[must_use]
    pub fn default_session(&self) -> &str {
        &self.default_session
    }

    /// The system prompt sent with every chat request.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool prompt cannot be rendered.
    pub fn system_prompt(&self) -> Result<String, AssistantError> {
        match &self.dispatcher {
            None => Ok(MEMORY_SYSTEM_PROMPT.to_string()),
            Some(dispatcher) => tool_system_prompt()
                .format_pairs(&[("tools", dispatcher.describe_tools().as_str())])
                .map_err(|e| {
                    AssistantError::Prompt {
                        reason: e.to_string(),
                    }
                    .into()
                }),
        }
    }

    /// Sends `message` in `session_id`, running at most one requested tool.
    ///
    /// # Errors
    ///
    /// Returns an error if either model call fails. Exchanges completed
    /// before the failure stay recorded.
    #[instrument(skip(self, message), fields(session = %session_id))]
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<Exchange, AssistantError> {
        let session = self.store.get_or_create(session_id);
        let system = self.system_prompt()?;

        let mut reply = self
            .converse(&session, &system, message)
            .await
            .map_err(|e| AssistantError::ModelCall {
                session: session_id.to_string(),
                reason: e.to_string(),
            })?;

        let Some(dispatcher) = &self.dispatcher else {
            return Ok(Exchange { reply, tool: None });
        };

        let mut tool = None;
        let mut hops = 0;
        while let Dispatch::Tool(request) = dispatcher.parse_dispatch(&reply) {
            if hops == MAX_TOOL_HOPS {
                debug!(tool = %request.name, "tool hop budget spent, returning reply as-is");
                break;
            }
            hops += 1;

            let output = dispatcher.invoke_or_report(&request.name, &request.input);
            info!(tool = %request.name, "tool ran, sending follow-up");

            let follow_up = format!(
                "The {} returned: {}. Please give me a natural response.",
                request.name, output
            );
            reply = self
                .converse(&session, &system, &follow_up)
                .await
                .map_err(|e| AssistantError::FollowUp {
                    session: session_id.to_string(),
                    tool: request.name.clone(),
                    reason: e.to_string(),
                })?;

            tool = Some(ToolInvocation {
                name: request.name,
                input: request.input,
                output,
            });
        }

        Ok(Exchange { reply, tool })
    }

    /// [`Assistant::chat`] in the configured default session.
    ///
    /// # Errors
    ///
    /// See [`Assistant::chat`].
    pub async fn chat_default(&self, message: &str) -> Result<Exchange, AssistantError> {
        let session = self.default_session.clone();
        self.chat(&session, message).await
    }

    /// Answers a single question without memory.
    ///
    /// A tool request is answered with `"Used {tool}: {output}"` and no
    /// follow-up call.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails.
    #[instrument(skip_all)]
    pub async fn answer(&self, question: &str) -> Result<String, AssistantError> {
        let Some(dispatcher) = &self.dispatcher else {
            return self.ask(LlmCall::new(question)).await;
        };

        let tools = dispatcher.describe_tools();
        let prompt = tool_question_prompt()
            .format_pairs(&[("tools", tools.as_str()), ("question", question)])
            .map_err(|e| AssistantError::Prompt {
                reason: e.to_string(),
            })?;
        let text = self.ask(LlmCall::new(prompt)).await?;

        Ok(match dispatcher.dispatch(&text) {
            DispatchResult::Direct { text } => text,
            DispatchResult::ToolInvoked {
                tool_name,
                tool_output,
                ..
            } => format!("Used {tool_name}: {tool_output}"),
        })
    }

    async fn ask(&self, call: LlmCall) -> Result<String, AssistantError> {
        let result = call
            .with_model(&self.model)
            .execute(self.backend.as_ref())
            .await
            .map_err(|e| AssistantError::Answer {
                reason: e.to_string(),
            })?;
        Ok(result.content)
    }

    /// One memory-aware model call. The user and assistant turns are
    /// appended only after the model replies.
    async fn converse(
        &self,
        session: &Session,
        system: &str,
        message: &str,
    ) -> std::result::Result<String, LlmError> {
        let result = LlmCall::new(message)
            .with_system(system)
            .with_history(&session.history())
            .with_model(&self.model)
            .execute(self.backend.as_ref())
            .await?;

        session.append(Role::User, message);
        session.append(Role::Assistant, result.content.as_str());
        Ok(result.content)
    }
}
