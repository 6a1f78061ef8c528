use super::error::StoreError;
use super::model::CacheStats;
use async_trait::async_trait;

/// Durable question/answer cache.
///
/// Implementations serialize all access to the backing store. Lookups are
/// fuzzy: see [`best_match`](super::best_match).
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Upserts the answer for `question`'s normalized form.
    async fn save(&self, question: &str, answer: &str) -> Result<(), StoreError>;

    /// Returns the answer of the most similar stored question, if similar enough.
    async fn lookup(&self, question: &str) -> Result<Option<String>, StoreError>;

    async fn stats(&self) -> Result<CacheStats, StoreError>;

    /// Resets the store to an empty, well-formed state.
    async fn clear(&self) -> Result<(), StoreError>;
}
