//! Slash commands understood by the orchestrator.

/// A recognized `/command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Greets the user and explains what the assistant does.
    Start,
    Help,
    /// Forgets the user's conversation context.
    Clear,
    /// Reports Q&A cache statistics.
    Stats,
}

impl BotCommand {
    /// Parses `/name` or `/name@bot args`. Unknown names return `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let token = input.trim().split_whitespace().next()?;
        let name = token.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "clear" => Some(Self::Clear),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "/start",
            Self::Help => "/help",
            Self::Clear => "/clear",
            Self::Stats => "/stats",
        }
    }

    pub fn all() -> [BotCommand; 4] {
        [Self::Start, Self::Help, Self::Clear, Self::Stats]
    }
}

pub(crate) const WELCOME_TEXT: &str = "\
مرحباً بك! 👋 Welcome!

I'm your new assistant and I love chatting and getting to know people.
• I talk with you naturally, like a friend
• I remember our conversation and build on it
• I answer in Arabic or English, whichever you prefer

Commands:
/start - introduce ourselves again
/help - learn more about me
/clear - start a new topic

Tell me about yourself or ask me anything! 😊";

pub(crate) const HELP_TEXT: &str = "\
🤖 Help

Commands:
/start - start a new conversation
/help - show this help
/clear - clear the current conversation context
/stats - show saved answer statistics

Just type your message and I'll reply right away.
اكتب رسالتك وسأجيب عليك فوراً!";

pub(crate) const CLEARED_TEXT: &str =
    "تم مسح سياق المحادثة! Conversation cleared, we can start fresh now. ✨";

pub(crate) const STATS_UNAVAILABLE_TEXT: &str =
    "Statistics are not available right now, please try again later.";
