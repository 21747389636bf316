//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LlmError`: Low-level model backend failures (never handled here)
//! - `PromptError`: Prompt template and prompt selection failures
//! - `ChainError`: Chain selection and chain step failures
//! - `AssistantError`: Conversation-level failures

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider is unavailable.
    ProviderUnavailable { provider: String, reason: String },
    /// Request failed.
    RequestFailed { reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "LLM request failed: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from prompt operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// No prompt is registered for the requested task.
    UnknownTask { task: String, available: Vec<String> },
    /// Missing required variable.
    MissingVariable { template: String, variable: String },
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTask { task, available } => {
                write!(f, "Unknown task: {task}. Available tasks: {available:?}")
            }
            Self::MissingVariable { template, variable } => {
                write!(
                    f,
                    "missing required variable '{variable}' in template '{template}'"
                )
            }
        }
    }
}

impl std::error::Error for PromptError {}

/// Errors from chain operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No chain is defined for the requested type.
    UnknownChain { kind: String, available: Vec<String> },
    /// A step's prompt could not be rendered.
    StepPrompt {
        chain: String,
        step: String,
        reason: String,
    },
    /// A step's model call failed.
    StepModelCall {
        chain: String,
        step: String,
        reason: String,
    },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChain { kind, available } => {
                write!(f, "Unknown chain type: {kind}. Available: {available:?}")
            }
            Self::StepPrompt {
                chain,
                step,
                reason,
            } => {
                write!(f, "chain '{chain}' step '{step}' prompt failed: {reason}")
            }
            Self::StepModelCall {
                chain,
                step,
                reason,
            } => {
                write!(f, "chain '{chain}' step '{step}' model call failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ChainError {}

/// Conversation-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantError {
    /// The model call for a session failed.
    ModelCall { session: String, reason: String },
    /// The follow-up call after a tool ran failed.
    FollowUp {
        session: String,
        tool: String,
        reason: String,
    },
    /// The model call for a stateless answer failed.
    Answer { reason: String },
    /// A prompt could not be rendered.
    Prompt { reason: String },
}

impl fmt::Display for AssistantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelCall { session, reason } => {
                write!(f, "model call failed for session '{session}': {reason}")
            }
            Self::FollowUp {
                session,
                tool,
                reason,
            } => {
                write!(
                    f,
                    "follow-up after tool '{tool}' failed for session '{session}': {reason}"
                )
            }
            Self::Answer { reason } => write!(f, "model call failed for answer: {reason}"),
            Self::Prompt { reason } => write!(f, "prompt rendering failed: {reason}"),
        }
    }
}

impl std::error::Error for AssistantError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_display() {
        let err = LlmError::ProviderUnavailable {
            provider: "bedrock".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("bedrock"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn unknown_task_names_value_and_options() {
        let err = PromptError::UnknownTask {
            task: "unknown_task".to_string(),
            available: vec!["assistant".to_string(), "summarizer".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("Unknown task"));
        assert!(message.contains("unknown_task"));
        assert!(message.contains("\"assistant\""));
        assert!(message.contains("\"summarizer\""));
    }

    #[test]
    fn unknown_chain_names_value_and_options() {
        let err = ChainError::UnknownChain {
            kind: "poem".to_string(),
            available: vec!["simple".to_string(), "research".to_string()],
        };
        let message = err.to_string();
        assert!(message.starts_with("Unknown chain type: poem."));
        assert!(message.contains("research"));
    }

    #[test]
    fn prompt_error_display() {
        let err = PromptError::MissingVariable {
            template: "summarizer".to_string(),
            variable: "length".to_string(),
        };
        assert!(err.to_string().contains("length"));
        assert!(err.to_string().contains("summarizer"));
    }

    #[test]
    fn assistant_error_display() {
        let err = AssistantError::FollowUp {
            session: "alice".to_string(),
            tool: "calculator".to_string(),
            reason: "LLM request timed out".to_string(),
        };
        assert!(err.to_string().contains("calculator"));
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn answer_error_names_no_session() {
        let err = AssistantError::Answer {
            reason: "LLM request timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "model call failed for answer: LLM request timed out"
        );
    }
}
