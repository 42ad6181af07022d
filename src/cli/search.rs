//! Catalog search command handler.

use anyhow::{Context, Result};

use shopchat::catalog::{Catalog, EmptyQueryPolicy, ProductMatcher};
use shopchat::config::Config;

use super::chat::format_product;

/// Run the product matcher alone and print the hits.
pub(crate) fn cmd_search(config: &Config, query: &str) -> Result<()> {
    let catalog = Catalog::load_or_builtin(config.catalog.path.as_deref())
        .with_context(|| "Failed to load catalog")?;
    let matcher = ProductMatcher::new(catalog, config.catalog.empty_query);

    if query.trim().is_empty() && matcher.empty_query_policy() == EmptyQueryPolicy::MatchNone {
        println!("Empty query matches nothing (catalog.empty_query = \"match_none\").");
        return Ok(());
    }

    let found = matcher.find_matches(query);
    if found.is_empty() {
        println!("No products match '{}'.", query);
        return Ok(());
    }
    println!("{} of {} product(s):", found.len(), matcher.catalog().len());
    for item in &found {
        println!("{}", format_product(item));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_blank_query_under_each_policy() {
        let mut config = Config::default();
        assert!(cmd_search(&config, "   ").is_ok());
        config.catalog.empty_query = EmptyQueryPolicy::MatchAll;
        assert!(cmd_search(&config, "").is_ok());
    }

    #[test]
    fn test_search_missing_catalog_file_fails() {
        let mut config = Config::default();
        config.catalog.path = Some("/nonexistent/shopchat/catalog.toml".into());
        assert!(cmd_search(&config, "laptop").is_err());
    }
}
