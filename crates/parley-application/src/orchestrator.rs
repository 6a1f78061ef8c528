//! Per-message conversation flow.
//!
//! For every inbound message the orchestrator appends a user turn to the
//! sender's window, asks the completion service for a reply, records the
//! reply in the window and offers the exchange to the cache. Windows are
//! created lazily and live for the life of the orchestrator.

use crate::commands::{BotCommand, CLEARED_TEXT, HELP_TEXT, STATS_UNAVAILABLE_TEXT, WELCOME_TEXT};
use crate::reply::Reply;
use parley_core::UserId;
use parley_core::cache::ResponseCache;
use parley_core::completion::CompletionService;
use parley_core::config::AssistantConfig;
use parley_core::conversation::{ContextWindow, ConversationTurn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Sent whenever the completion service could not produce a reply.
pub const APOLOGY_REPLY: &str =
    "أعتذر، لم أتمكن من الاستجابة بشكل مناسب. يرجى المحاولة مرة أخرى.\nSorry, I couldn't put a reply together just now. Please try again.";

/// Lifecycle of a user's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// No window exists yet (or it was cleared).
    Idle,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub max_context_turns: usize,
    pub reply_chunk_size: usize,
    pub chunk_pause: Duration,
    /// Replies must be longer than this to be cached.
    pub min_cached_reply_chars: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&AssistantConfig::default())
    }
}

impl From<&AssistantConfig> for OrchestratorSettings {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            max_context_turns: config.max_context_turns,
            reply_chunk_size: config.reply_chunk_size,
            chunk_pause: config.chunk_pause(),
            min_cached_reply_chars: config.min_cached_reply_chars,
        }
    }
}

pub struct ConversationOrchestrator {
    windows: RwLock<HashMap<UserId, Arc<Mutex<ContextWindow>>>>,
    completion: Arc<dyn CompletionService>,
    cache: Arc<dyn ResponseCache>,
    settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        cache: Arc<dyn ResponseCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            completion,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Routes `/commands` to their handlers and everything else to [`handle`](Self::handle).
    pub async fn dispatch(&self, user_id: UserId, input: &str) -> Option<Reply> {
        match BotCommand::parse(input) {
            Some(command) => Some(self.run_command(user_id, command).await),
            None => self.handle(user_id, input).await,
        }
    }

    /// Processes one chat message and returns the reply to send.
    ///
    /// Blank input is ignored: no reply, no state change. A failed
    /// completion yields [`APOLOGY_REPLY`] and leaves the user turn in the
    /// window so the next message still has it as context.
    pub async fn handle(&self, user_id: UserId, text: &str) -> Option<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let preview: String = text.chars().take(50).collect();
        tracing::info!(user_id, message = %preview, "Received message");

        let window = self.window_for(user_id).await;
        let snapshot = {
            let mut window = window.lock().await;
            window.append(ConversationTurn::user(text));
            window.snapshot()
        };

        let answer = match self.completion.complete(&snapshot).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(user_id, error = %err, "Completion failed, sending apology");
                return Some(self.reply(APOLOGY_REPLY));
            }
        };

        window
            .lock()
            .await
            .append(ConversationTurn::assistant(answer.clone()));

        self.remember(text, &answer).await;

        tracing::info!(user_id, chars = answer.chars().count(), "Sending reply");
        Some(self.reply(answer))
    }

    /// Forgets the user's window. Returns whether one existed.
    pub async fn clear(&self, user_id: UserId) -> bool {
        let removed = self.windows.write().await.remove(&user_id).is_some();
        if removed {
            tracing::info!(user_id, "Cleared context");
        }
        removed
    }

    pub async fn state(&self, user_id: UserId) -> ConversationState {
        if self.windows.read().await.contains_key(&user_id) {
            ConversationState::Active
        } else {
            ConversationState::Idle
        }
    }

    /// Number of turns held for the user, `None` while idle.
    pub async fn window_len(&self, user_id: UserId) -> Option<usize> {
        let window = self.windows.read().await.get(&user_id).cloned()?;
        let len = window.lock().await.len();
        Some(len)
    }

    /// Turns held for the user (without the system instruction).
    pub async fn history(&self, user_id: UserId) -> Vec<ConversationTurn> {
        let Some(window) = self.windows.read().await.get(&user_id).cloned() else {
            return Vec::new();
        };
        let window = window.lock().await;
        window.turns().cloned().collect()
    }

    pub async fn active_users(&self) -> usize {
        self.windows.read().await.len()
    }

    async fn run_command(&self, user_id: UserId, command: BotCommand) -> Reply {
        tracing::info!(user_id, command = command.name(), "Handling command");
        match command {
            BotCommand::Start => self.reply(WELCOME_TEXT),
            BotCommand::Help => self.reply(HELP_TEXT),
            BotCommand::Clear => {
                self.clear(user_id).await;
                self.reply(CLEARED_TEXT)
            }
            BotCommand::Stats => match self.cache.stats().await {
                Ok(stats) => self.reply(stats.to_string()),
                Err(err) => {
                    tracing::error!(error = %err, "Error getting stats");
                    self.reply(STATS_UNAVAILABLE_TEXT)
                }
            },
        }
    }

    async fn window_for(&self, user_id: UserId) -> Arc<Mutex<ContextWindow>> {
        if let Some(window) = self.windows.read().await.get(&user_id) {
            return Arc::clone(window);
        }

        let mut windows = self.windows.write().await;
        Arc::clone(windows.entry(user_id).or_insert_with(|| {
            Arc::new(Mutex::new(ContextWindow::new(self.settings.max_context_turns)))
        }))
    }

    /// Best-effort cache write; failures are logged and dropped.
    async fn remember(&self, question: &str, answer: &str) {
        if answer.chars().count() <= self.settings.min_cached_reply_chars {
            return;
        }
        if let Err(err) = self.cache.save(question, answer).await {
            tracing::warn!(error = %err, "Error saving Q&A pair, continuing");
        }
    }

    fn reply(&self, text: impl Into<String>) -> Reply {
        Reply::new(text, self.settings.reply_chunk_size, self.settings.chunk_pause)
    }
}
