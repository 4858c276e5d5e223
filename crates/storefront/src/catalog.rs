//! Read-only game catalog loaded from a JSON data file at startup.
//!
//! The file has the shape `{"games": [ {...}, ... ]}`. Game entries are kept
//! as opaque JSON objects so `/api/game/{id}` returns them unchanged; the
//! accessors below pick out the fields the HTML pages render:
//!
//! ```json
//! {
//!   "name": "Genshin Impact",
//!   "image": "/static/img/genshin.png",
//!   "description": "...",
//!   "items": [ { "name": "60 Genesis Crystals", "price": 30 } ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use musmus_core::Price;

/// Errors that can occur while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One game entry of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Game(Map<String, Value>);

/// A purchasable item listed under a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub name: String,
    pub price: Price,
}

impl Game {
    /// Display name (`name`, falling back to `title`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.str_field(&["name", "title"]).unwrap_or("")
    }

    /// Cover image URL, if any (`image` or `img`).
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.str_field(&["image", "img"])
    }

    /// Short description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.str_field(&["description"])
    }

    /// Items with a name and a valid non-negative integer price.
    ///
    /// Malformed entries are skipped rather than failing the page.
    #[must_use]
    pub fn items(&self) -> Vec<CatalogItem> {
        let Some(Value::Array(items)) = self.0.get("items") else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| {
                let name = item.get("name")?.as_str()?.trim();
                let price = Price::new(item.get("price")?.as_i64()?).ok()?;
                (!name.is_empty()).then(|| CatalogItem {
                    name: name.to_owned(),
                    price,
                })
            })
            .collect()
    }

    /// The raw JSON object.
    #[must_use]
    pub const fn as_json(&self) -> &Map<String, Value> {
        &self.0
    }

    fn str_field(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    games: Vec<Game>,
}

/// The loaded catalog. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    games: Arc<Vec<Game>>,
}

impl Catalog {
    /// Load the catalog from `path`.
    ///
    /// A missing file yields an empty catalog; a leading UTF-8 byte order
    /// mark is ignored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            tracing::warn!("Catalog file does not exist: {:?}", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        tracing::info!(games = catalog.len(), "Loaded catalog from {:?}", path);
        Ok(catalog)
    }

    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the document is not a catalog.
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let file: CatalogFile = serde_json::from_str(content)?;
        Ok(Self {
            games: Arc::new(file.games),
        })
    }

    /// All games in file order.
    #[must_use]
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Game at a zero-based index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Game> {
        self.games.get(index)
    }

    /// Number of games.
    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the catalog has no games.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
