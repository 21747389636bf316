//! Conversation memory and tool dispatch for chainlab.
//!
//! This crate provides:
//!
//! - **Session Store**: per-session, append-only turn transcripts
//! - **Tool Registry**: fixed set of single-input tools
//! - **Tool Dispatcher**: detects `TOOL:`/`INPUT:` requests in model text
//!   and runs the named tool

pub mod dispatch;
pub mod error;
pub mod session;
pub mod tool;
pub mod tools;
pub mod turn;

pub use dispatch::{Dispatch, DispatchResult, MarkerPolicy, ToolDispatcher, ToolRequest};
pub use error::ToolError;
pub use session::{Session, SessionStore};
pub use tool::{Tool, ToolRegistry, ToolSpec};
pub use turn::{Role, Turn};
