//! Question/answer cache domain.
//!
//! The on-disk store itself lives in `parley-infrastructure`; this module
//! defines its schema, the key normalization, the fuzzy lookup rule and the
//! [`ResponseCache`] trait the application layer talks to.

mod error;
mod model;
mod normalize;
mod repository;
mod similarity;

pub use error::StoreError;
pub use model::{CacheStats, LoadOutcome, QaRecord, QaStore, StoreMetadata, STORE_VERSION};
pub use normalize::normalize_question;
pub use repository::ResponseCache;
pub use similarity::{SIMILARITY_THRESHOLD, best_match, similarity_ratio};
