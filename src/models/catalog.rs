//! Wire shape of the Ticketmaster Discovery `events.json` response.
//!
//! Only the fields the service reads are modelled; everything else is ignored.
//! Missing or `null` fields decode to their defaults so a sparse event never
//! poisons the whole page. The same types are what gets written to the cache.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::ids::normalize_id;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCatalogResponse {
    #[serde(rename = "_embedded", default, deserialize_with = "null_as_default")]
    pub embedded: CatalogPage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<CatalogEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub distance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<CatalogImage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub classifications: Vec<Classification>,
    #[serde(rename = "_embedded", default, deserialize_with = "null_as_default")]
    pub venues: EmbeddedVenues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogImage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre: Named,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Named {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedVenues {
    #[serde(default, deserialize_with = "null_as_default")]
    pub venues: Vec<Venue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: VenueAddress,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: Named,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: Named,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueAddress {
    #[serde(default, deserialize_with = "null_as_default")]
    pub line1: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line2: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line3: String,
}

impl RawCatalogResponse {
    pub fn events(&self) -> &[CatalogEvent] {
        &self.embedded.events
    }

    /// Rewrites every event id into its canonical form.
    pub fn normalize_ids(mut self) -> Self {
        for event in &mut self.embedded.events {
            event.id = normalize_id(&event.id);
        }
        self
    }
}

impl CatalogEvent {
    /// First non-blank image URL, or an empty string.
    pub fn image_url(&self) -> &str {
        self.images
            .iter()
            .map(|image| image.url.trim())
            .find(|url| !url.is_empty())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> BTreeSet<String> {
        self.classifications
            .iter()
            .map(|classification| classification.genre.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `"<line1> <line2> <line3>, <city>, <state>"` for the first venue, blank parts skipped.
    pub fn address(&self) -> String {
        let Some(venue) = self.venues.venues.first() else {
            return String::new();
        };

        let lines = [&venue.address.line1, &venue.address.line2, &venue.address.line3]
            .into_iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        [lines.as_str(), venue.city.name.trim(), venue.state.name.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
