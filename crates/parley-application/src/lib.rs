//! Conversation Orchestrator and the outbound reply path.
//!
//! The orchestrator is the only entry point a transport talks to: it takes
//! `(user id, text)` and returns a [`Reply`] already split into deliverable
//! chunks.

pub mod commands;
pub mod orchestrator;
pub mod reply;

pub use commands::BotCommand;
pub use orchestrator::{ConversationOrchestrator, ConversationState, OrchestratorSettings, APOLOGY_REPLY};
pub use reply::{Reply, ReplySink, SinkError, deliver, split_reply};
