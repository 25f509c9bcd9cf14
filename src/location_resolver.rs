//! Location Resolution Module
//!
//! Resolves a free-text place name into a [`Coordinate`]. A feature flag picks
//! the backend: the new Open-Meteo geocoder when enabled, the legacy Nominatim
//! search otherwise. Callers cannot tell which backend answered.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::api::{GeocodingApi, LegacyGeocodingApi, NominatimPlace, nominatim};
use crate::error::GatewayError;
use crate::flags::FeatureFlags;
use crate::models::Coordinate;

/// Which geocoding backend served a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Legacy,
    New,
}

/// Service for resolving place names
pub struct LocationResolver {
    flags: Arc<dyn FeatureFlags>,
    flag_name: String,
    legacy: Arc<dyn LegacyGeocodingApi>,
    modern: Arc<dyn GeocodingApi>,
}

impl LocationResolver {
    pub fn new(
        flags: Arc<dyn FeatureFlags>,
        flag_name: impl Into<String>,
        legacy: Arc<dyn LegacyGeocodingApi>,
        modern: Arc<dyn GeocodingApi>,
    ) -> Self {
        Self {
            flags,
            flag_name: flag_name.into(),
            legacy,
            modern,
        }
    }

    /// Resolve a place name into coordinates
    #[instrument(skip(self))]
    pub async fn resolve_location(&self, name: &str, identity: Option<&str>) -> Result<Coordinate> {
        let backend = self.select_backend(identity).await;
        debug!("Geocoding '{}' with the {:?} backend", name, backend);

        let coordinate = match backend {
            Backend::New => self.resolve_new(name).await?,
            Backend::Legacy => self.resolve_legacy(name).await?,
        };

        info!(
            "Resolved '{}' to ({}) via {:?} backend",
            name,
            coordinate.format_coordinates(),
            backend
        );
        Ok(coordinate)
    }

    /// Flag evaluation failures fall back to the legacy backend
    async fn select_backend(&self, identity: Option<&str>) -> Backend {
        match self.flags.is_enabled(&self.flag_name, identity).await {
            Ok(true) => Backend::New,
            Ok(false) => Backend::Legacy,
            Err(e) => {
                warn!(
                    "Could not evaluate flag '{}', using legacy geocoder: {}",
                    self.flag_name, e
                );
                Backend::Legacy
            }
        }
    }

    async fn resolve_new(&self, name: &str) -> Result<Coordinate> {
        let response = self.modern.search(name).await?;
        let best = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| not_found(name))?;

        Ok(Coordinate::new(best.latitude, best.longitude))
    }

    async fn resolve_legacy(&self, name: &str) -> Result<Coordinate> {
        let places = self.legacy.search(name).await?;
        let best = most_important(places).ok_or_else(|| not_found(name))?;
        parse_place(&best)
    }
}

/// Sort ascending by importance and take the last candidate
fn most_important(mut places: Vec<NominatimPlace>) -> Option<NominatimPlace> {
    places.sort_by(|a, b| a.importance.total_cmp(&b.importance));
    places.pop()
}

/// Nominatim reports coordinates as decimal strings
fn parse_place(place: &NominatimPlace) -> Result<Coordinate> {
    let latitude = place.lat.trim().parse::<f64>().map_err(|_| {
        GatewayError::contract(nominatim::PROVIDER, format!("Invalid latitude: {}", place.lat))
    })?;
    let longitude = place.lon.trim().parse::<f64>().map_err(|_| {
        GatewayError::contract(nominatim::PROVIDER, format!("Invalid longitude: {}", place.lon))
    })?;

    Ok(Coordinate::new(latitude, longitude))
}

fn not_found(name: &str) -> GatewayError {
    GatewayError::LocationNotFound {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GeocodingResponse, GeocodingResult};
    use crate::flags::StaticFlags;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FLAG: &str = "new-geocoder";

    fn place(importance: f64, lat: &str, lon: &str) -> NominatimPlace {
        NominatimPlace {
            importance,
            lat: lat.to_string(),
            lon: lon.to_string(),
            boundingbox: Vec::new(),
        }
    }

    #[derive(Default)]
    struct Legacy {
        places: Vec<NominatimPlace>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LegacyGeocodingApi for Legacy {
        async fn search(&self, _query: &str) -> Result<Vec<NominatimPlace>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.places.clone())
        }
    }

    #[derive(Default)]
    struct Modern {
        results: Vec<GeocodingResult>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeocodingApi for Modern {
        async fn search(&self, _name: &str) -> Result<GeocodingResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeocodingResponse {
                results: self.results.clone(),
            })
        }
    }

    struct BrokenFlags;

    #[async_trait]
    impl FeatureFlags for BrokenFlags {
        async fn is_enabled(&self, _flag: &str, _identity: Option<&str>) -> Result<bool> {
            Err(GatewayError::unavailable("unleash", "connection refused"))
        }
    }

    fn resolver(
        flags: Arc<dyn FeatureFlags>,
        legacy: Arc<Legacy>,
        modern: Arc<Modern>,
    ) -> LocationResolver {
        LocationResolver::new(flags, FLAG, legacy, modern)
    }

    #[tokio::test]
    async fn test_legacy_takes_highest_importance() {
        let legacy = Arc::new(Legacy {
            places: vec![place(0.2, "1.0", "2.0"), place(0.8, "40.41", "-3.70")],
            ..Default::default()
        });
        let modern = Arc::new(Modern::default());
        let resolver = resolver(Arc::new(StaticFlags::default()), legacy.clone(), modern.clone());

        let coordinate = resolver.resolve_location("Madrid", None).await.unwrap();

        assert_eq!(coordinate, Coordinate::new(40.41, -3.70));
        assert_eq!(legacy.calls.load(Ordering::SeqCst), 1);
        assert_eq!(modern.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_most_important_is_last_after_sort() {
        let best = most_important(vec![
            place(0.5, "5", "5"),
            place(0.9, "9", "9"),
            place(0.1, "1", "1"),
        ])
        .unwrap();
        assert_eq!(best.lat, "9");
        assert!(most_important(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_new_backend_when_flag_enabled() {
        let legacy = Arc::new(Legacy::default());
        let modern = Arc::new(Modern {
            results: vec![
                GeocodingResult {
                    latitude: 40.4165,
                    longitude: -3.70256,
                },
                GeocodingResult {
                    latitude: 0.0,
                    longitude: 0.0,
                },
            ],
            ..Default::default()
        });
        let flags = Arc::new(StaticFlags::enabled_for_all(FLAG));
        let resolver = resolver(flags, legacy.clone(), modern.clone());

        let coordinate = resolver.resolve_location("Madrid", Some("ana")).await.unwrap();

        assert_eq!(coordinate, Coordinate::new(40.4165, -3.70256));
        assert_eq!(legacy.calls.load(Ordering::SeqCst), 0);
        assert_eq!(modern.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_flag_failure_falls_back_to_legacy() {
        let legacy = Arc::new(Legacy {
            places: vec![place(0.5, "43.26", "-2.93")],
            ..Default::default()
        });
        let resolver = resolver(Arc::new(BrokenFlags), legacy.clone(), Arc::new(Modern::default()));

        let coordinate = resolver.resolve_location("Bilbao", None).await.unwrap();
        assert_eq!(coordinate, Coordinate::new(43.26, -2.93));
    }

    #[tokio::test]
    async fn test_empty_results_are_location_not_found() {
        let legacy = resolver(
            Arc::new(StaticFlags::default()),
            Arc::new(Legacy::default()),
            Arc::new(Modern::default()),
        );
        let err = legacy.resolve_location("Atlantis", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::LocationNotFound { ref name } if name == "Atlantis"));

        let modern = resolver(
            Arc::new(StaticFlags::enabled_for_all(FLAG)),
            Arc::new(Legacy::default()),
            Arc::new(Modern::default()),
        );
        let err = modern.resolve_location("Atlantis", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::LocationNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_coordinates_violate_contract() {
        let legacy = Arc::new(Legacy {
            places: vec![place(0.5, "north", "-2.93")],
            ..Default::default()
        });
        let resolver = resolver(
            Arc::new(StaticFlags::default()),
            legacy,
            Arc::new(Modern::default()),
        );

        let err = resolver.resolve_location("Bilbao", None).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UpstreamContractViolation {
                provider: "nominatim",
                ..
            }
        ));
    }
}
