//! Completion Gateway: the OpenAI client and the retry policy around it.

pub mod openai_completion;
pub mod retry;

pub use openai_completion::OpenAiCompletionClient;
pub use retry::RetryingCompletion;
