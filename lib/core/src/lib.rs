//! Core types and utilities for chainlab.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by the conversation and AI crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SessionKey, TurnId};
