//! OpenStreetMap API 0.6 map queries

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{info, instrument};

use super::send_json;
use crate::Result;
use crate::models::BoundingBox;

pub const PROVIDER: &str = "openstreetmap";

#[derive(Debug, Deserialize)]
pub struct MapResponse {
    #[serde(default)]
    pub elements: Vec<OsmElement>,
}

/// A node, way or relation; only its tags matter here
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OsmElement {
    #[serde(default)]
    pub tags: Option<OsmTags>,
}

/// The subset of OSM tags the restaurant predicate looks at
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct OsmTags {
    #[serde(default)]
    pub amenity: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "addr:street", default)]
    pub street: Option<String>,
    #[serde(rename = "addr:housenumber", default)]
    pub housenumber: Option<String>,
}

/// Every element intersecting a bounding box
#[async_trait]
pub trait MapDataApi: Send + Sync {
    async fn map(&self, bbox: BoundingBox) -> Result<MapResponse>;
}

pub struct OsmClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OsmClient {
    pub fn new(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn map_url(&self, bbox: BoundingBox) -> String {
        format!("{}/map.json?bbox={}", self.base_url, bbox.to_query_param())
    }
}

#[async_trait]
impl MapDataApi for OsmClient {
    #[instrument(skip(self))]
    async fn map(&self, bbox: BoundingBox) -> Result<MapResponse> {
        let response: MapResponse = send_json(self.client.get(self.map_url(bbox)), PROVIDER).await?;
        info!("OSM map returned {} elements", response.elements.len());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    #[test]
    fn test_map_url() {
        let http = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        let osm = OsmClient::new(http, "https://osm.example/api/0.6".to_string());
        let bbox = BoundingBox::around(Coordinate::new(2.0, 1.0));
        let url = osm.map_url(bbox);
        assert!(url.starts_with("https://osm.example/api/0.6/map.json?bbox=1,2,1.0"));
        assert_eq!(url.split(',').count(), 4);
    }

    #[test]
    fn test_parse_map_response() {
        let body = r#"{
            "version": "0.6",
            "elements": [
                {"type": "node", "id": 1, "lat": 40.41, "lon": -3.70,
                 "tags": {"amenity": "restaurant", "name": "Botín", "addr:street": "Calle de Cuchilleros", "addr:housenumber": "17", "cuisine": "spanish"}},
                {"type": "node", "id": 2, "lat": 40.42, "lon": -3.71},
                {"type": "way", "id": 3, "nodes": [1, 2], "tags": {"highway": "residential"}}
            ]
        }"#;
        let response: MapResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.elements.len(), 3);
        let tags = response.elements[0].tags.as_ref().unwrap();
        assert_eq!(tags.street.as_deref(), Some("Calle de Cuchilleros"));
        assert_eq!(tags.housenumber.as_deref(), Some("17"));
        assert!(response.elements[1].tags.is_none());
        assert_eq!(response.elements[2].tags.as_ref().unwrap().amenity, None);
    }
}
