//! Normalized restaurant records

use serde::{Deserialize, Serialize};

/// A restaurant with a complete street address
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RestaurantRecord {
    #[serde(rename = "nombre")]
    pub name: String,
    /// `"<street> <housenumber>"`
    #[serde(rename = "direccion")]
    pub address: String,
}

impl RestaurantRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, street: &str, housenumber: &str) -> Self {
        Self {
            name: name.into(),
            address: format!("{street} {housenumber}"),
        }
    }
}

/// Ordered restaurant list as served to clients
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Restaurants(pub Vec<RestaurantRecord>);

impl Restaurants {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RestaurantRecord> {
        self.0.iter()
    }
}
