//! Daily temperature forecasts
//!
//! The forecast provider answers with parallel arrays (`time`, min, max). This
//! module zips them into per-day records and attaches the shared metadata.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::Result;
use crate::api::open_meteo::FORECAST_PROVIDER;
use crate::api::{ForecastApi, ForecastResponse};
use crate::error::GatewayError;
use crate::models::{Coordinate, DateRange, ForecastBundle, ForecastRecord};

pub struct WeatherAggregator {
    api: Arc<dyn ForecastApi>,
}

impl WeatherAggregator {
    pub fn new(api: Arc<dyn ForecastApi>) -> Self {
        Self { api }
    }

    /// Daily min/max temperatures at `coordinate` over `range`
    #[instrument(skip(self), fields(lat = coordinate.latitude, lon = coordinate.longitude))]
    pub async fn forecast(&self, coordinate: Coordinate, range: DateRange) -> Result<ForecastBundle> {
        let response = self.api.daily_temperatures(coordinate, range).await?;
        let bundle = into_bundle(response)?;
        debug!("Built forecast with {} days", bundle.data.len());
        Ok(bundle)
    }
}

fn into_bundle(response: ForecastResponse) -> Result<ForecastBundle> {
    let daily = response.daily;
    let (days, mins, maxs) = (
        daily.time.len(),
        daily.temperature_min.len(),
        daily.temperature_max.len(),
    );
    if days != mins || days != maxs {
        return Err(GatewayError::contract(
            FORECAST_PROVIDER,
            format!("Daily arrays differ in length: time={days}, min={mins}, max={maxs}"),
        ));
    }

    let data = daily
        .time
        .into_iter()
        .zip(daily.temperature_min)
        .zip(daily.temperature_max)
        .map(|((date, min), max)| match (min, max) {
            (Some(temperature_min), Some(temperature_max)) => Ok(ForecastRecord {
                date,
                temperature_min,
                temperature_max,
            }),
            _ => Err(GatewayError::contract(
                FORECAST_PROVIDER,
                format!("Missing temperature for {date}"),
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ForecastBundle {
        min_temp_unit: response.daily_units.temperature_min,
        max_temp_unit: response.daily_units.temperature_max,
        latitude: response.latitude,
        longitude: response.longitude,
        data,
    })
}
