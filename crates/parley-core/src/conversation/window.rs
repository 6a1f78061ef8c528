//! Bounded conversation history for a single user.

use super::persona::SYSTEM_INSTRUCTION;
use super::turn::ConversationTurn;
use std::collections::VecDeque;

/// Ordered, length-capped history of turns for one user.
///
/// Appending past `max_turns` drops turns from the front, so the window
/// always holds the most recent `max_turns` turns in insertion order.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl ContextWindow {
    /// Default cap on retained turns (15 user/assistant exchanges).
    pub const DEFAULT_MAX_TURNS: usize = 30;

    /// Creates an empty window. A cap of zero is raised to one so the latest
    /// turn is always kept.
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns.min(64) + 1),
            max_turns,
        }
    }

    /// Appends a turn, evicting the oldest turns beyond the cap.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Returns the system instruction followed by the retained turns.
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        turns.push(ConversationTurn::system(SYSTEM_INSTRUCTION));
        turns.extend(self.turns.iter().cloned());
        turns
    }

    /// Retained turns, oldest first, without the system instruction.
    pub fn turns(&self) -> impl ExactSizeIterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_TURNS)
    }
}
