//! Model-facing primitives for chainlab.
//!
//! This crate provides:
//!
//! - **Backend**: the `LlmBackend` boundary (text and prior turns in, text out)
//! - **LLM Call**: a single request/response against a backend
//! - **Prompts**: `{placeholder}` templates and the task prompt registry
//! - **Chains**: sequential prompt pipelines with named intermediate outputs
//! - **Assistant**: memory-aware chat with a single tool hop per message

pub mod assistant;
pub mod backend;
pub mod chain;
pub mod config;
pub mod error;
pub mod llm_call;
pub mod prompt;

#[cfg(test)]
pub(crate) mod testing;

pub use assistant::{Assistant, Exchange, MAX_TOOL_HOPS, ToolInvocation};
pub use backend::{LlmBackend, LlmMessage, LlmRequest, LlmResponse, TokenUsage};
pub use chain::{CHAIN_TYPES, Chain, ChainOutput, ChainStep, get_chain, task_chain};
pub use config::{AssistantConfig, ModelConfig};
pub use error::{AssistantError, ChainError, LlmError, PromptError};
pub use llm_call::{LlmCall, LlmCallResult};
pub use prompt::{PromptRegistry, PromptTemplate, Variables, get_prompt};
