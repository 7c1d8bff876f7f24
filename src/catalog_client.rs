//! Ticketmaster Discovery client.
//!
//! The adapter owns transport details only. Callers never see a transport
//! error: any failure is logged here and surfaces as `None`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::geo::effective_keyword;
use crate::models::RawCatalogResponse;

/// Remote catalog of events near a geohash bucket.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events around `bucket` matching `keyword`, or `None` if the catalog could not be reached.
    async fn search(&self, bucket: &str, keyword: Option<&str>) -> Option<RawCatalogResponse>;
}

#[derive(Debug, thiserror::Error)]
enum CatalogError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog responded with status {0}")]
    Status(StatusCode),
}

#[derive(Clone)]
pub struct TicketmasterClient {
    http: Client,
    base_url: String,
    api_key: String,
    default_keyword: String,
    radius: u32,
}

impl TicketmasterClient {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            default_keyword: config.default_keyword.clone(),
            radius: config.default_radius,
        })
    }

    async fn fetch(&self, bucket: &str, keyword: &str) -> Result<RawCatalogResponse, CatalogError> {
        let radius = self.radius.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("geoPoint", bucket),
                ("keyword", keyword),
                ("radius", radius.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        Ok(response.json::<RawCatalogResponse>().await?)
    }
}

#[async_trait]
impl EventSource for TicketmasterClient {
    async fn search(&self, bucket: &str, keyword: Option<&str>) -> Option<RawCatalogResponse> {
        let keyword = effective_keyword(keyword, &self.default_keyword);
        match self.fetch(bucket, keyword).await {
            Ok(response) => {
                let response = response.normalize_ids();
                debug!(bucket, keyword, events = response.events().len(), "catalog search done");
                Some(response)
            }
            Err(e) => {
                warn!(bucket, keyword, error = %e, "catalog search failed");
                None
            }
        }
    }
}
