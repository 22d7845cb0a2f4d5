//! Dish records, the catalog capability and the orchestrator's snapshot of it.

use crate::error::{VoiceError, VoiceResult};
use crate::signal::{Category, VoiceFilters};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::info;

/// One orderable dish as seen by the voice core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishRecord {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
}

impl DishRecord {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Name, description and tags joined into one searchable string.
    pub fn haystack(&self) -> String {
        format!("{} {} {}", self.name, self.description, self.tags.join(" "))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// The backend serializes a single tag as a bare string.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(tag)) => vec![tag],
        Some(OneOrMany::Many(tags)) => tags,
        None => Vec::new(),
    })
}

/// Filter parameters understood by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DishQuery {
    pub category: Option<Category>,
    pub max_price: Option<u32>,
    /// "-rating", "price" or "-price".
    pub ordering: Option<String>,
    pub tags: Vec<String>,
}

impl DishQuery {
    /// No filters: the whole catalog.
    pub fn all() -> Self {
        Self::default()
    }
}

impl From<&VoiceFilters> for DishQuery {
    fn from(filters: &VoiceFilters) -> Self {
        Self {
            category: filters.category,
            max_price: filters.max_price,
            ordering: filters.sort.map(|s| s.as_ordering().to_string()),
            tags: filters.tags.iter().map(|t| t.as_str().to_string()).collect(),
        }
    }
}

/// Catalog query capability.
#[async_trait]
pub trait DishCatalog: Send + Sync {
    async fn list_dishes(&self, query: &DishQuery) -> VoiceResult<Vec<DishRecord>>;
}

/// Ordered, read-only copy of the catalog used for name resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    dishes: Vec<DishRecord>,
}

impl CatalogSnapshot {
    pub fn new(dishes: Vec<DishRecord>) -> Self {
        Self { dishes }
    }

    /// Fetch the unfiltered catalog once.
    pub async fn load(catalog: &dyn DishCatalog) -> VoiceResult<Self> {
        let dishes = catalog.list_dishes(&DishQuery::all()).await?;
        info!(dishes = dishes.len(), "📋 Catalog snapshot loaded");
        Ok(Self::new(dishes))
    }

    pub fn dishes(&self) -> &[DishRecord] {
        &self.dishes
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}

/// In-memory catalog. Only the tag filter narrows the list: records carry no
/// category or price, so `category`, `max_price` and `ordering` are ignored
/// and dishes come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    dishes: Vec<DishRecord>,
}

impl StaticCatalog {
    pub fn new(dishes: Vec<DishRecord>) -> Self {
        Self { dishes }
    }

    pub fn from_json(raw: &str) -> VoiceResult<Self> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn from_path(path: &Path) -> VoiceResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| {
            VoiceError::Catalog(format!("invalid catalog {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl DishCatalog for StaticCatalog {
    async fn list_dishes(&self, query: &DishQuery) -> VoiceResult<Vec<DishRecord>> {
        Ok(self
            .dishes
            .iter()
            .filter(|d| query.tags.iter().all(|t| d.tags.contains(t)))
            .cloned()
            .collect())
    }
}
