//! Reply cache maintenance command handler.

use anyhow::Result;

use shopchat::cache::create_cache;
use shopchat::config::{CacheBackend, Config};

use super::CacheAction;

/// Handle `shopchat cache` subcommands.
pub(crate) fn cmd_cache(config: &Config, action: CacheAction) -> Result<()> {
    if !config.cache.enabled {
        println!("Reply cache is disabled (cache.enabled = false).");
        return Ok(());
    }
    let mut cache = create_cache(&config.cache);

    match action {
        CacheAction::Stats => {
            let medium = match config.cache.backend {
                CacheBackend::File => config.cache.resolved_path().display().to_string(),
                CacheBackend::Memory => "memory (not persisted)".to_string(),
            };
            println!("Medium:  {}", medium);
            println!("Entries: {}", cache.len());
            println!("TTL:     {}s", cache.ttl().as_secs());
        }
        CacheAction::Clear => {
            let removed = cache.clear();
            println!("Removed {} cached repl{}.", removed, plural(removed));
        }
        CacheAction::Purge => {
            let removed = cache.purge_expired();
            println!("Purged {} stale entr{}.", removed, plural(removed));
        }
    }
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
