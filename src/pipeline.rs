//! Request orchestration
//!
//! Each request walks a fixed sequence of stages:
//! `Negotiating → ResolvingCoordinate → {AggregatingPoi | ResolvingTimespan →
//! AggregatingWeather} → Formatting`. The first failure aborts the request and
//! is reported together with the stage it happened in.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::api::{
    self, ForecastApi, GeocodingApi, LegacyGeocodingApi, MapDataApi, NominatimClient,
    OpenMeteoClient, OsmClient,
};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::flags::{self, FeatureFlags};
use crate::format::{NegotiatedFormat, Renderable, Rendered, render};
use crate::location_resolver::LocationResolver;
use crate::models::{ForecastBundle, Restaurants, WeatherSummary};
use crate::restaurants::RestaurantFinder;
use crate::timespan::{self, Clock, SystemClock};
use crate::weather::WeatherAggregator;

/// Pipeline stage a request is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Negotiating,
    ResolvingCoordinate,
    AggregatingPoi,
    ResolvingTimespan,
    AggregatingWeather,
    Formatting,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Negotiating => "negotiating",
            Stage::ResolvingCoordinate => "resolving_coordinate",
            Stage::AggregatingPoi => "aggregating_poi",
            Stage::ResolvingTimespan => "resolving_timespan",
            Stage::AggregatingWeather => "aggregating_weather",
            Stage::Formatting => "formatting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller preferences attached to a request
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext<'a> {
    /// Raw `Accept` header value
    pub accept: Option<&'a str>,
    /// Identity used for flag evaluation
    pub identity: Option<&'a str>,
}

/// A failed request, with the format its error body must be rendered in
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct Failure {
    pub stage: Stage,
    pub format: NegotiatedFormat,
    #[source]
    pub error: GatewayError,
}

pub type Outcome = std::result::Result<Rendered, Failure>;

/// Tracks the current stage of one request
struct Run {
    stage: Stage,
    format: NegotiatedFormat,
    started: Instant,
}

impl Run {
    fn negotiate(accept: Option<&str>) -> std::result::Result<Self, Failure> {
        let started = Instant::now();
        match NegotiatedFormat::negotiate(accept) {
            Ok(format) => {
                debug!("Negotiated {:?} response", format);
                Ok(Self {
                    stage: Stage::Negotiating,
                    format,
                    started,
                })
            }
            Err(error) => {
                warn!("Request rejected during {}: {}", Stage::Negotiating, error);
                Err(Failure {
                    stage: Stage::Negotiating,
                    format: NegotiatedFormat::Json,
                    error,
                })
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(&self, error: GatewayError) -> Failure {
        warn!(
            "Request failed during {} after {:.3}s: {}",
            self.stage,
            self.started.elapsed().as_secs_f64(),
            error
        );
        Failure {
            stage: self.stage,
            format: self.format,
            error,
        }
    }

    fn finish<T: Renderable>(mut self, value: &T) -> Outcome {
        self.enter(Stage::Formatting);
        let rendered = render(value, self.format).map_err(|e| self.fail(e))?;
        info!(
            "Request completed in {:.3}s ({} bytes)",
            self.started.elapsed().as_secs_f64(),
            rendered.body.len()
        );
        Ok(rendered)
    }
}

/// External collaborators the gateway talks to
pub struct Providers {
    pub flags: Arc<dyn FeatureFlags>,
    pub legacy_geocoder: Arc<dyn LegacyGeocodingApi>,
    pub geocoder: Arc<dyn GeocodingApi>,
    pub map_data: Arc<dyn MapDataApi>,
    pub forecast: Arc<dyn ForecastApi>,
    pub clock: Arc<dyn Clock>,
}

/// Orchestrates restaurant and weather lookups for a city
pub struct Gateway {
    geocoder: LocationResolver,
    restaurants: RestaurantFinder,
    weather: WeatherAggregator,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    pub fn new(providers: Providers, geocoding_flag: &str, max_restaurants: usize) -> Self {
        Self {
            geocoder: LocationResolver::new(
                providers.flags,
                geocoding_flag,
                providers.legacy_geocoder,
                providers.geocoder,
            ),
            restaurants: RestaurantFinder::new(providers.map_data, max_restaurants),
            weather: WeatherAggregator::new(providers.forecast),
            clock: providers.clock,
        }
    }

    /// Wire the HTTP-backed providers described by `config`
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let client = api::build_client(&config.upstream)?;
        let timezone = config.timezone()?;
        let upstream = &config.upstream;

        let open_meteo = Arc::new(OpenMeteoClient::new(
            client.clone(),
            upstream.geocoding_url.clone(),
            upstream.forecast_url.clone(),
            config.defaults.timezone.clone(),
        ));

        let providers = Providers {
            flags: flags::from_config(&config.flags, client.clone()),
            legacy_geocoder: Arc::new(NominatimClient::new(
                client.clone(),
                upstream.nominatim_url.clone(),
            )),
            geocoder: open_meteo.clone(),
            map_data: Arc::new(OsmClient::new(client, upstream.osm_url.clone())),
            forecast: open_meteo,
            clock: Arc::new(SystemClock::new(timezone)),
        };

        Ok(Self::new(
            providers,
            &config.flags.geocoding_flag,
            config.defaults.max_restaurants,
        ))
    }

    /// Restaurants near `city`
    #[instrument(skip(self, ctx))]
    pub async fn get_restaurants(&self, city: &str, ctx: RequestContext<'_>) -> Outcome {
        let mut run = Run::negotiate(ctx.accept)?;

        run.enter(Stage::ResolvingCoordinate);
        let coordinate = self
            .geocoder
            .resolve_location(city, ctx.identity)
            .await
            .map_err(|e| run.fail(e))?;

        run.enter(Stage::AggregatingPoi);
        let restaurants: Restaurants = self
            .restaurants
            .find_near(coordinate)
            .await
            .map_err(|e| run.fail(e))?;

        run.finish(&restaurants)
    }

    /// Daily forecast for `city` over the range named by `timespan`
    #[instrument(skip(self, ctx))]
    pub async fn get_weather(&self, city: &str, timespan: &str, ctx: RequestContext<'_>) -> Outcome {
        let mut run = Run::negotiate(ctx.accept)?;
        let bundle = self
            .forecast(&mut run, city, timespan, ctx.identity)
            .await
            .map_err(|e| run.fail(e))?;

        run.finish(&bundle)
    }

    /// First forecast day for `city`, keyed by city name
    #[instrument(skip(self, ctx))]
    pub async fn get_weather_summary(
        &self,
        city: &str,
        timespan: &str,
        ctx: RequestContext<'_>,
    ) -> Outcome {
        let mut run = Run::negotiate(ctx.accept)?;
        let bundle = self
            .forecast(&mut run, city, timespan, ctx.identity)
            .await
            .map_err(|e| run.fail(e))?;

        let summary: WeatherSummary = bundle.summary(city).ok_or_else(|| {
            run.fail(GatewayError::contract(
                api::open_meteo::FORECAST_PROVIDER,
                "Forecast contained no days",
            ))
        })?;

        run.finish(&summary)
    }

    async fn forecast(
        &self,
        run: &mut Run,
        city: &str,
        timespan: &str,
        identity: Option<&str>,
    ) -> Result<ForecastBundle> {
        run.enter(Stage::ResolvingCoordinate);
        let coordinate = self.geocoder.resolve_location(city, identity).await?;

        run.enter(Stage::ResolvingTimespan);
        let range = timespan::resolve(timespan, self.clock.today())?;

        run.enter(Stage::AggregatingWeather);
        self.weather.forecast(coordinate, range).await
    }
}
