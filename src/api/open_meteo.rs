//! Open-Meteo geocoding and daily forecast clients

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{info, instrument};

use super::send_json;
use crate::Result;
use crate::models::{Coordinate, DateRange};

pub const GEOCODING_PROVIDER: &str = "open-meteo-geocoding";
pub const FORECAST_PROVIDER: &str = "open-meteo-forecast";

/// Geocoding response from OpenMeteo, `results` is omitted when nothing matched
#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<GeocodingResult>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeocodingResult {
    pub latitude: f64,
    pub longitude: f64,
}

/// Daily forecast response from OpenMeteo
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub daily_units: DailyUnits,
    pub daily: DailyData,
}

#[derive(Debug, Deserialize)]
pub struct DailyUnits {
    #[serde(rename = "temperature_2m_min")]
    pub temperature_min: String,
    #[serde(rename = "temperature_2m_max")]
    pub temperature_max: String,
}

/// Parallel per-day arrays, aligned by index
#[derive(Debug, Deserialize)]
pub struct DailyData {
    pub time: Vec<String>,
    #[serde(rename = "temperature_2m_min")]
    pub temperature_min: Vec<Option<f64>>,
    #[serde(rename = "temperature_2m_max")]
    pub temperature_max: Vec<Option<f64>>,
}

/// Name search for the new geocoding backend
#[async_trait]
pub trait GeocodingApi: Send + Sync {
    async fn search(&self, name: &str) -> Result<GeocodingResponse>;
}

/// Daily min/max temperatures over a date range
#[async_trait]
pub trait ForecastApi: Send + Sync {
    async fn daily_temperatures(
        &self,
        coordinate: Coordinate,
        range: DateRange,
    ) -> Result<ForecastResponse>;
}

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    geocoding_url: String,
    forecast_url: String,
    timezone: String,
}

impl OpenMeteoClient {
    pub fn new(
        client: ClientWithMiddleware,
        geocoding_url: String,
        forecast_url: String,
        timezone: String,
    ) -> Self {
        Self {
            client,
            geocoding_url,
            forecast_url,
            timezone,
        }
    }

    fn geocoding_url(&self, name: &str) -> String {
        format!(
            "{}/search?name={}&count=1&format=json",
            self.geocoding_url,
            urlencoding::encode(name)
        )
    }

    fn forecast_url(&self, coordinate: Coordinate, range: DateRange) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&daily=temperature_2m_min,temperature_2m_max&timezone={}&start_date={}&end_date={}",
            self.forecast_url,
            coordinate.latitude,
            coordinate.longitude,
            urlencoding::encode(&self.timezone),
            range.start,
            range.end
        )
    }
}

#[async_trait]
impl GeocodingApi for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn search(&self, name: &str) -> Result<GeocodingResponse> {
        let response: GeocodingResponse =
            send_json(self.client.get(self.geocoding_url(name)), GEOCODING_PROVIDER).await?;
        info!(
            "Open-Meteo geocoding returned {} results for '{}'",
            response.results.len(),
            name
        );
        Ok(response)
    }
}

#[async_trait]
impl ForecastApi for OpenMeteoClient {
    #[instrument(skip(self), fields(lat = coordinate.latitude, lon = coordinate.longitude))]
    async fn daily_temperatures(
        &self,
        coordinate: Coordinate,
        range: DateRange,
    ) -> Result<ForecastResponse> {
        let response: ForecastResponse = send_json(
            self.client.get(self.forecast_url(coordinate, range)),
            FORECAST_PROVIDER,
        )
        .await?;
        info!(
            "Open-Meteo forecast returned {} days ({} to {})",
            response.daily.time.len(),
            range.start,
            range.end
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> OpenMeteoClient {
        let http = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
        OpenMeteoClient::new(
            http,
            "https://geo.example/v1".to_string(),
            "https://api.example/v1".to_string(),
            "Europe/Madrid".to_string(),
        )
    }

    #[test]
    fn test_forecast_url() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DateRange {
            start: day,
            end: day + chrono::Days::new(6),
        };
        let url = client().forecast_url(Coordinate::new(40.41, -3.7), range);

        assert_eq!(
            url,
            "https://api.example/v1/forecast?latitude=40.41&longitude=-3.7&daily=temperature_2m_min,temperature_2m_max&timezone=Europe%2FMadrid&start_date=2024-01-01&end_date=2024-01-07"
        );
    }

    #[test]
    fn test_geocoding_url() {
        assert_eq!(
            client().geocoding_url("San Sebastián"),
            "https://geo.example/v1/search?name=San%20Sebasti%C3%A1n&count=1&format=json"
        );
    }

    #[test]
    fn test_parse_geocoding_without_results() {
        let response: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_parse_forecast_response() {
        let body = r#"{
            "latitude": 40.4, "longitude": -3.7, "timezone": "Europe/Madrid",
            "daily_units": {"time": "iso8601", "temperature_2m_min": "°C", "temperature_2m_max": "°C"},
            "daily": {"time": ["2024-01-01"], "temperature_2m_min": [3.2], "temperature_2m_max": [null]}
        }"#;
        let response: ForecastResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.daily_units.temperature_min, "°C");
        assert_eq!(response.daily.time, vec!["2024-01-01"]);
        assert_eq!(response.daily.temperature_min, vec![Some(3.2)]);
        assert_eq!(response.daily.temperature_max, vec![None]);
    }
}
