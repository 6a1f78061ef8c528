//! Conversation state: turns and the bounded per-user context window.

mod persona;
mod turn;
mod window;

pub use persona::SYSTEM_INSTRUCTION;
pub use turn::{ConversationTurn, TurnRole};
pub use window::ContextWindow;
