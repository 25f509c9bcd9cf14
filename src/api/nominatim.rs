//! Legacy geocoder: Nominatim free-text search

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{info, instrument};

use super::send_json;
use crate::Result;

pub const PROVIDER: &str = "nominatim";

/// One Nominatim search candidate
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NominatimPlace {
    /// Relevance ranking, higher is more relevant
    #[serde(default)]
    pub importance: f64,
    /// Latitude as a decimal string
    pub lat: String,
    /// Longitude as a decimal string
    pub lon: String,
    /// `[min_lat, max_lat, min_lon, max_lon]` as strings
    #[serde(default)]
    pub boundingbox: Vec<String>,
}

/// Free-text place search, candidates in provider order
#[async_trait]
pub trait LegacyGeocodingApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<NominatimPlace>>;
}

pub struct NominatimClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl NominatimClient {
    pub fn new(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&format=json",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl LegacyGeocodingApi for NominatimClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<NominatimPlace>> {
        let places: Vec<NominatimPlace> =
            send_json(self.client.get(self.search_url(query)), PROVIDER).await?;
        info!("Nominatim returned {} candidates for '{}'", places.len(), query);
        Ok(places)
    }
}
