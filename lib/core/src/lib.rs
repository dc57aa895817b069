//! Core domain types and utilities for persona-desk.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by the gateway, conversation, and front-end crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{SessionId, TurnId};
