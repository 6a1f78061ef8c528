//! Domain layer for Parley.
//!
//! Holds the types every other crate agrees on: conversation turns and the
//! bounded per-user window, the Q&A cache model with its normalization and
//! similarity rules, the service traits the application layer composes, and
//! the shared error and configuration types.

pub mod cache;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;

pub use error::{ParleyError, Result};

/// Identifier of a conversation partner as delivered by the transport layer.
pub type UserId = i64;
