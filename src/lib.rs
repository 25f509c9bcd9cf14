//! Geodata gateway
//!
//! Resolves a city name into coordinates and serves either nearby restaurants
//! or a daily temperature forecast for it, rendered as JSON or XML.

pub mod api;
pub mod config;
pub mod error;
pub mod flags;
pub mod format;
pub mod location_resolver;
pub mod models;
pub mod pipeline;
pub mod restaurants;
pub mod telemetry;
pub mod timespan;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::GatewayConfig;
pub use error::{ErrorCode, GatewayError};
pub use format::{NegotiatedFormat, Rendered};
pub use models::{
    BoundingBox, Coordinate, DateRange, ForecastBundle, ForecastRecord, RestaurantRecord,
    Restaurants, WeatherSummary,
};
pub use pipeline::{Failure, Gateway, Providers, RequestContext, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, GatewayError>;
