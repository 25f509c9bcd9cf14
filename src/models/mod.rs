//! Data models for the geodata gateway
//!
//! Request-scoped value objects, organized by concern:
//! - Location: coordinates and the POI search box
//! - Restaurant: normalized restaurant records
//! - Forecast: date ranges and daily temperature series

pub mod forecast;
pub mod location;
pub mod restaurant;

// Re-export all public types for convenient access
pub use forecast::{DateRange, ForecastBundle, ForecastRecord, WeatherSummary};
pub use location::{BoundingBox, Coordinate};
pub use restaurant::{RestaurantRecord, Restaurants};
