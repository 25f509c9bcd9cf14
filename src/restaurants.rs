//! Restaurant search around a coordinate

use std::sync::Arc;

use tracing::{info, instrument};

use crate::Result;
use crate::api::{MapDataApi, OsmElement, OsmTags};
use crate::error::GatewayError;
use crate::models::{BoundingBox, Coordinate, RestaurantRecord, Restaurants};

/// Finds restaurants with a full street address near a coordinate
pub struct RestaurantFinder {
    api: Arc<dyn MapDataApi>,
    limit: usize,
}

impl RestaurantFinder {
    pub fn new(api: Arc<dyn MapDataApi>, limit: usize) -> Self {
        Self { api, limit }
    }

    /// Query the box around `coordinate` and keep the first `limit` matches
    #[instrument(skip(self), fields(lat = coordinate.latitude, lon = coordinate.longitude))]
    pub async fn find_near(&self, coordinate: Coordinate) -> Result<Restaurants> {
        let bbox = BoundingBox::around(coordinate);
        let response = self.api.map(bbox).await?;
        let scanned = response.elements.len();

        let restaurants = select(&response.elements, self.limit);
        if restaurants.is_empty() {
            return Err(GatewayError::NoResultsInArea {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            });
        }

        info!(
            "Selected {} restaurants out of {} map elements",
            restaurants.len(),
            scanned
        );
        Ok(restaurants)
    }
}

/// Project qualifying elements in provider order, up to `limit`
fn select(elements: &[OsmElement], limit: usize) -> Restaurants {
    Restaurants(
        elements
            .iter()
            .filter_map(|element| element.tags.as_ref())
            .filter_map(as_restaurant)
            .take(limit)
            .collect(),
    )
}

/// A restaurant needs a name, a street and a house number
fn as_restaurant(tags: &OsmTags) -> Option<RestaurantRecord> {
    if tags.amenity.as_deref() != Some("restaurant") {
        return None;
    }

    match (&tags.name, &tags.street, &tags.housenumber) {
        (Some(name), Some(street), Some(number)) => {
            Some(RestaurantRecord::new(name.as_str(), street, number))
        }
        _ => None,
    }
}
