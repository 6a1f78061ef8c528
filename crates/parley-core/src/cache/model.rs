//! Schema of the durable Q&A store.

use super::normalize::normalize_question;
use super::similarity::best_match;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Format version written into new stores.
pub const STORE_VERSION: &str = "1.0";

/// A cached answer, keyed in [`QaStore::records`] by its normalized question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    /// The literal question as last asked.
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub usage_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
    pub version: String,
    pub total_pairs: usize,
}

/// The whole store as held in memory between a load and a write.
///
/// Both top-level fields are required; a document missing either fails to
/// deserialize and is treated as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaStore {
    pub metadata: StoreMetadata,
    pub records: BTreeMap<String, QaRecord>,
}

impl QaStore {
    /// An empty, well-formed store.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            metadata: StoreMetadata {
                created_at: now,
                last_updated_at: None,
                version: STORE_VERSION.to_string(),
                total_pairs: 0,
            },
            records: BTreeMap::new(),
        }
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.metadata.version.trim().is_empty() {
            return Err("metadata.version is empty".to_string());
        }
        if let Some((key, _)) = self.records.iter().find(|(_, r)| r.usage_count == 0) {
            return Err(format!("record '{key}' has usage_count 0"));
        }
        Ok(())
    }

    /// Inserts or replaces the record for `question`'s normalized form.
    ///
    /// Re-saving a question resets its usage count and creation time.
    /// Returns the normalized key.
    pub fn upsert(&mut self, question: &str, answer: &str, now: DateTime<Utc>) -> String {
        let key = normalize_question(question);
        self.records.insert(
            key.clone(),
            QaRecord {
                question: question.to_string(),
                answer: answer.to_string(),
                created_at: now,
                usage_count: 1,
            },
        );
        self.metadata.total_pairs = self.records.len();
        self.metadata.last_updated_at = Some(now);
        key
    }

    /// Best fuzzy match for `question` among stored normalized questions.
    pub fn lookup(&self, question: &str) -> Option<&QaRecord> {
        let query = normalize_question(question);
        let key = best_match(&query, self.records.keys().map(String::as_str))?;
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of reading the store from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file parsed and validated.
    Loaded(QaStore),
    /// The file was missing or corrupt and an empty store took its place.
    Reinitialized(QaStore),
}

impl LoadOutcome {
    pub fn store(&self) -> &QaStore {
        match self {
            LoadOutcome::Loaded(store) | LoadOutcome::Reinitialized(store) => store,
        }
    }

    pub fn into_store(self) -> QaStore {
        match self {
            LoadOutcome::Loaded(store) | LoadOutcome::Reinitialized(store) => store,
        }
    }

    pub fn is_reinitialized(&self) -> bool {
        matches!(self, LoadOutcome::Reinitialized(_))
    }
}

/// Read-only summary of the store for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_pairs: usize,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Q&A pairs: {}", self.total_pairs)?;
        writeln!(f, "File size: {} bytes", self.file_size)?;
        writeln!(f, "Created: {}", self.created_at.to_rfc3339())?;
        match self.last_updated_at {
            Some(ts) => write!(f, "Last updated: {}", ts.to_rfc3339()),
            None => write!(f, "Last updated: never"),
        }
    }
}
