//! Daily temperature forecast models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive calendar range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Number of days covered, both ends included
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Min/max temperature for one day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastRecord {
    #[serde(rename = "time")]
    pub date: String,
    #[serde(rename = "minTemp")]
    pub temperature_min: f64,
    #[serde(rename = "maxTemp")]
    pub temperature_max: f64,
}

/// Forecast series with the metadata shared by every day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastBundle {
    #[serde(rename = "minTempUnit")]
    pub min_temp_unit: String,
    #[serde(rename = "maxTempUnit")]
    pub max_temp_unit: String,
    /// Grid point latitude reported by the forecast provider
    pub latitude: f64,
    /// Grid point longitude reported by the forecast provider
    pub longitude: f64,
    pub data: Vec<ForecastRecord>,
}

/// One-day view of a forecast, keyed by city
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSummary {
    pub city: String,
    pub date: String,
    #[serde(rename = "temperatureMin")]
    pub temperature_min: f64,
    #[serde(rename = "temperatureMax")]
    pub temperature_max: f64,
    pub lat: f64,
    pub lon: f64,
}

impl ForecastBundle {
    /// Summary of the first forecast day, `None` for an empty series
    #[must_use]
    pub fn summary(&self, city: &str) -> Option<WeatherSummary> {
        self.data.first().map(|day| WeatherSummary {
            city: city.to_string(),
            date: day.date.clone(),
            temperature_min: day.temperature_min,
            temperature_max: day.temperature_max,
            lat: self.latitude,
            lon: self.longitude,
        })
    }
}
