use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::dedup::distinct_by_key;
use crate::models::catalog::{CatalogEvent, RawCatalogResponse};

/// Event as returned to clients, flagged relative to the requesting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    pub id: String,
    pub name: String,
    pub url: String,
    pub distance: f64,
    pub image_url: String,
    pub address: String,
    pub categories: BTreeSet<String>,
    pub favorite: bool,
}

impl NormalizedEvent {
    pub fn from_catalog(event: &CatalogEvent, favorite: bool) -> Self {
        Self {
            id: event.id.clone(),
            name: event.name.clone(),
            url: event.url.clone(),
            distance: event.distance,
            image_url: event.image_url().to_string(),
            address: event.address(),
            categories: event.categories(),
            favorite,
        }
    }
}

/// Converts a catalog page into client events, one per id, in catalog order.
pub fn normalize_response(
    response: &RawCatalogResponse,
    favorite_ids: &HashSet<String>,
) -> Vec<NormalizedEvent> {
    response
        .events()
        .iter()
        .filter(distinct_by_key(|event: &&CatalogEvent| event.id.clone()))
        .map(|event| NormalizedEvent::from_catalog(event, favorite_ids.contains(&event.id)))
        .collect()
}

/// Persisted category row; identity is the case-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

/// One event write: the event plus its already-resolved categories.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: NormalizedEvent,
    pub categories: Vec<CategoryRef>,
}
