//! Static product catalog and substring matching.
//!
//! The catalog is loaded once at startup, either from the built-in item list
//! or from a `.toml` / `.json` file, and is read-only afterwards.

pub mod matcher;

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ShopError};

pub use matcher::{EmptyQueryPolicy, ProductMatcher};

/// An immutable product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Unit price, never negative.
    pub price: f64,
    /// Image URI.
    pub image: String,
    /// Detail-page reference.
    pub url: String,
}

impl CatalogItem {
    /// Price formatted for display, e.g. `$699.99`.
    pub fn display_price(&self) -> String {
        format!("${:.2}", self.price)
    }
}

const UNSPLASH_PARAMS: &str = "ixlib=rb-4.0.3&ixid=M3wxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8fA%3D%3D&auto=format&fit=crop&w=800&q=80";

fn unsplash(photo: &str) -> String {
    format!("https://images.unsplash.com/{photo}?{UNSPLASH_PARAMS}")
}

static BUILTIN_ITEMS: Lazy<Vec<CatalogItem>> = Lazy::new(|| {
    vec![
        CatalogItem {
            id: "1".into(),
            name: "Smartphone XYZ".into(),
            description: "Último modelo de smartphone con cámara de alta resolución y batería de larga duración.".into(),
            price: 699.99,
            image: unsplash("photo-1511707171634-5f897ff02aa9"),
            url: "/productos/smartphone-xyz".into(),
        },
        CatalogItem {
            id: "2".into(),
            name: "Laptop UltraBook".into(),
            description: "Laptop ligera y potente, perfecta para trabajo y entretenimiento.".into(),
            price: 1299.99,
            image: unsplash("photo-1496181133206-80ce9b88a853"),
            url: "/productos/laptop-ultrabook".into(),
        },
        CatalogItem {
            id: "3".into(),
            name: "Auriculares Inalámbricos".into(),
            description: "Auriculares con cancelación de ruido y sonido de alta calidad.".into(),
            price: 199.99,
            image: unsplash("photo-1505740420928-5e560c06d30e"),
            url: "/productos/auriculares-inalambricos".into(),
        },
    ]
});

/// On-disk TOML layout: a list of `[[items]]` tables.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

/// Ordered, validated, read-only list of catalog items.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or duplicate ids and negative prices.
    pub fn new(items: Vec<CatalogItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        for item in &items {
            if item.id.trim().is_empty() {
                return Err(ShopError::Catalog(format!(
                    "item '{}' has an empty id",
                    item.name
                )));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(ShopError::Catalog(format!("duplicate id '{}'", item.id)));
            }
            if !item.price.is_finite() || item.price < 0.0 {
                return Err(ShopError::Catalog(format!(
                    "item '{}' has invalid price {}",
                    item.id, item.price
                )));
            }
        }
        Ok(Self { items })
    }

    /// The three-item demo catalog shipped with the widget.
    pub fn builtin() -> Self {
        Self {
            items: BUILTIN_ITEMS.clone(),
        }
    }

    /// Load from a `.json` array or a `.toml` file with `[[items]]`.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let items = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Vec<CatalogItem>>(&raw)?,
            Some("toml") => toml::from_str::<CatalogFile>(&raw)?.items,
            other => {
                return Err(ShopError::Catalog(format!(
                    "unsupported catalog format {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };
        let catalog = Self::new(items)?;
        info!(path = %path.display(), items = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Load from `path` when set, otherwise fall back to the built-in items.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Ok(Self::builtin()),
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(id: &str, price: f64) -> CatalogItem {
        CatalogItem {
            id: id.into(),
            name: format!("Item {id}"),
            description: "desc".into(),
            price,
            image: "https://example.com/i.png".into(),
            url: format!("/productos/{id}"),
        }
    }

    #[test]
    fn test_builtin_has_three_items_in_order() {
        let catalog = Catalog::builtin();
        let ids: Vec<&str> = catalog.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(catalog.get("2").unwrap().name, "Laptop UltraBook");
    }

    #[test]
    fn test_builtin_image_uris() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.get("1").unwrap().image,
            "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?ixlib=rb-4.0.3&ixid=M3wxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8fA%3D%3D&auto=format&fit=crop&w=800&q=80"
        );
        assert!(catalog.items().iter().all(|i| i.image.contains("ixlib=rb-4.0.3&ixid=")));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = Catalog::new(vec![item("a", 1.0), item("a", 2.0)]).unwrap_err();
        assert!(err.to_string().contains("duplicate id 'a'"));
    }

    #[test]
    fn test_rejects_negative_price() {
        assert!(Catalog::new(vec![item("a", -0.01)]).is_err());
        assert!(Catalog::new(vec![item("a", f64::NAN)]).is_err());
    }

    #[test]
    fn test_rejects_empty_id() {
        assert!(Catalog::new(vec![item("  ", 1.0)]).is_err());
    }

    #[test]
    fn test_zero_price_is_allowed() {
        assert!(Catalog::new(vec![item("free", 0.0)]).is_ok());
    }

    #[test]
    fn test_display_price_two_decimals() {
        assert_eq!(item("a", 199.9).display_price(), "$199.90");
    }

    #[test]
    fn test_load_toml_catalog() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[[items]]
id = "k1"
name = "Teclado"
description = "Mecánico"
price = 49.5
image = "https://example.com/k.png"
url = "/productos/teclado"
"#,
        )
        .unwrap();
        let catalog = Catalog::load_from_path(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.items()[0].name, "Teclado");
    }

    #[test]
    fn test_load_json_catalog() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");
        let json = serde_json::to_string(&vec![item("j1", 3.0), item("j2", 4.0)]).unwrap();
        std::fs::write(&path, json).unwrap();
        let catalog = Catalog::load_from_path(&path).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_unknown_extension_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.csv");
        std::fs::write(&path, "id,name").unwrap();
        assert!(matches!(
            Catalog::load_from_path(&path),
            Err(ShopError::Catalog(_))
        ));
    }

    #[test]
    fn test_load_or_builtin_without_path() {
        let catalog = Catalog::load_or_builtin(None).unwrap();
        assert_eq!(catalog, Catalog::builtin());
    }
}
