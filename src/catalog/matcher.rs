//! Case-insensitive substring matching over product name and description.

use serde::{Deserialize, Serialize};

use crate::utils::text::fold;

use super::{Catalog, CatalogItem};

/// What an empty or whitespace-only query matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQueryPolicy {
    /// Short-circuit to no matches (default).
    #[default]
    MatchNone,
    /// The empty substring is contained in every field, so every item matches.
    MatchAll,
}

/// Pure lookup over a [`Catalog`]. Results always follow catalog order.
#[derive(Debug, Clone)]
pub struct ProductMatcher {
    catalog: Catalog,
    /// Pre-folded `(name, description)` per item, same order as the catalog.
    folded: Vec<(String, String)>,
    empty_query: EmptyQueryPolicy,
}

impl ProductMatcher {
    pub fn new(catalog: Catalog, empty_query: EmptyQueryPolicy) -> Self {
        let folded = catalog
            .items()
            .iter()
            .map(|item| (fold(&item.name), fold(&item.description)))
            .collect();
        Self {
            catalog,
            folded,
            empty_query,
        }
    }

    /// Every item whose name or description contains `query`, case-insensitively.
    ///
    /// The query is not trimmed: `" xyz"` only matches text with a space before
    /// `xyz`. Under [`EmptyQueryPolicy::MatchNone`] empty and whitespace-only
    /// queries return nothing; under `MatchAll` the literal substring test runs.
    pub fn find_matches(&self, query: &str) -> Vec<CatalogItem> {
        if query.trim().is_empty() && self.empty_query == EmptyQueryPolicy::MatchNone {
            return Vec::new();
        }
        let needle = fold(query);
        self.catalog
            .items()
            .iter()
            .zip(&self.folded)
            .filter(|(_, (name, description))| {
                name.contains(&needle) || description.contains(&needle)
            })
            .map(|(item, _)| item.clone())
            .collect()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn empty_query_policy(&self) -> EmptyQueryPolicy {
        self.empty_query
    }
}
