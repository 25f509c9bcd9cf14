//! Outbound provider clients
//!
//! One shared `reqwest` client carries the timeout and the retry policy. Each
//! provider module exposes a trait describing its request/response contract
//! plus the HTTP implementation of that trait.

pub mod nominatim;
pub mod open_meteo;
pub mod osm;

use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::Result;
use crate::config::UpstreamConfig;
use crate::error::GatewayError;

pub use nominatim::{LegacyGeocodingApi, NominatimClient, NominatimPlace};
pub use open_meteo::{
    ForecastApi, ForecastResponse, GeocodingApi, GeocodingResponse, GeocodingResult,
    OpenMeteoClient,
};
pub use osm::{MapDataApi, MapResponse, OsmClient, OsmElement, OsmTags};

/// Responses slower than this are logged as warnings
const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// Build the shared HTTP client with timeout and transient-failure retries
pub fn build_client(config: &UpstreamConfig) -> anyhow::Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(config.user_agent.as_str())
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let mut builder = ClientBuilder::new(client);
    if config.max_retries > 0 {
        let policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        builder = builder.with(RetryTransientMiddleware::new_with_policy(policy));
    }

    Ok(builder.build())
}

/// Send `request` and decode a JSON body.
///
/// Transport failures, expired timeouts and non-success statuses become
/// `UpstreamUnavailable`; a body that does not match `T` becomes
/// `UpstreamContractViolation`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &'static str,
) -> Result<T> {
    let start_time = Instant::now();

    let response = request.send().await.map_err(|e| {
        warn!(
            "{} request failed after {:.3}s: {}",
            provider,
            start_time.elapsed().as_secs_f64(),
            e
        );
        GatewayError::unavailable(provider, e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!("{} answered with HTTP {}", provider, status);
        return Err(GatewayError::unavailable(
            provider,
            format!(
                "HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            ),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| GatewayError::unavailable(provider, format!("Failed to read body: {e}")))?;

    let total_duration = start_time.elapsed();
    debug!(
        "{} responded {} bytes in {:.3}s",
        provider,
        body.len(),
        total_duration.as_secs_f64()
    );
    if total_duration > SLOW_RESPONSE {
        warn!(
            "Slow {} response: {:.3}s",
            provider,
            total_duration.as_secs_f64()
        );
    }

    serde_json::from_slice(&body)
        .map_err(|e| GatewayError::contract(provider, format!("Failed to parse response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_with_and_without_retries() {
        let mut config = UpstreamConfig::default();
        assert!(build_client(&config).is_ok());

        config.max_retries = 0;
        assert!(build_client(&config).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let mut config = UpstreamConfig::default();
        config.max_retries = 0;
        config.timeout_seconds = 2;
        let client = build_client(&config).unwrap();

        // port 9 (discard) on loopback is closed on test machines
        let request = client.get("http://127.0.0.1:9/never");
        let err = send_json::<serde_json::Value>(request, "test")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::UpstreamUnavailable {
                provider: "test",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_silent_upstream_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let mut config = UpstreamConfig::default();
        config.max_retries = 1;
        config.timeout_seconds = 1;
        let client = build_client(&config).unwrap();

        let started = Instant::now();
        let err = send_json::<serde_json::Value>(client.get(format!("http://{addr}/slow")), "test")
            .await
            .unwrap_err();
        silent.abort();

        assert!(matches!(
            err,
            GatewayError::UpstreamUnavailable {
                provider: "test",
                ..
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
