use anyhow::Result;
use colored::Colorize;
use parley_core::cache::ResponseCache;
use parley_infrastructure::ConfigService;

use super::open_cache;

pub async fn stats() -> Result<()> {
    let (_, cache) = open_cache(&ConfigService::new()).await?;
    let stats = cache.stats().await?;

    println!("{}", format!("Store: {}", cache.path().display()).bright_black());
    println!("{stats}");
    Ok(())
}

pub async fn lookup(question: &str) -> Result<()> {
    let (_, cache) = open_cache(&ConfigService::new()).await?;

    match cache.lookup(question).await? {
        Some(answer) => {
            for line in answer.lines() {
                println!("{}", line.bright_blue());
            }
        }
        None => println!("{}", "No similar question found.".yellow()),
    }
    Ok(())
}

pub async fn clear() -> Result<()> {
    let (_, cache) = open_cache(&ConfigService::new()).await?;
    cache.clear().await?;

    println!("{}", "Q&A cache cleared.".bright_green());
    Ok(())
}
