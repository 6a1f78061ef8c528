pub mod cache;
pub mod chat;

use anyhow::{Context, Result};
use parley_core::config::AssistantConfig;
use parley_infrastructure::{ConfigService, JsonQaCache};

/// Loads tunables and opens the Q&A store they point at.
async fn open_cache(config_service: &ConfigService) -> Result<(AssistantConfig, JsonQaCache)> {
    let config = config_service
        .load_config()
        .context("Failed to load configuration")?;
    let store_path = config_service.store_path(&config)?;
    let cache = JsonQaCache::open(store_path.clone())
        .await
        .with_context(|| format!("Failed to open Q&A store at {}", store_path.display()))?;
    Ok((config, cache))
}
