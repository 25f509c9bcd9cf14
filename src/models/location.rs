//! Coordinate and search-box models

use serde::{Deserialize, Serialize};

/// Offset in degrees added to a coordinate to form the POI search box
pub const BOUNDING_BOX_OFFSET: f64 = 0.02;

/// Resolved coordinates of a place
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Lon/lat rectangle used for map-data queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Box whose lower corner is `coordinate`, extended by [`BOUNDING_BOX_OFFSET`]
    #[must_use]
    pub fn around(coordinate: Coordinate) -> Self {
        Self {
            min_lon: coordinate.longitude,
            min_lat: coordinate.latitude,
            max_lon: coordinate.longitude + BOUNDING_BOX_OFFSET,
            max_lat: coordinate.latitude + BOUNDING_BOX_OFFSET,
        }
    }

    /// `min_lon,min_lat,max_lon,max_lat`, the order the OSM API expects
    #[must_use]
    pub fn to_query_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_bounding_box_around_madrid() {
        let bbox = BoundingBox::around(Coordinate::new(40.41, -3.70));

        assert!(close(bbox.min_lon, -3.70));
        assert!(close(bbox.min_lat, 40.41));
        assert!(close(bbox.max_lon, -3.68));
        assert!(close(bbox.max_lat, 40.43));
        assert!(bbox.max_lon > bbox.min_lon);
        assert!(bbox.max_lat > bbox.min_lat);
    }

    #[test]
    fn test_query_param_order() {
        let bbox = BoundingBox {
            min_lon: 1.0,
            min_lat: 2.0,
            max_lon: 3.0,
            max_lat: 4.0,
        };
        assert_eq!(bbox.to_query_param(), "1,2,3,4");
    }

    #[test]
    fn test_format_coordinates() {
        let coordinate = Coordinate::new(46.818_234, 8.227_456);
        assert_eq!(coordinate.format_coordinates(), "46.8182, 8.2275");
    }
}
