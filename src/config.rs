//! Configuration management for the geodata gateway
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable pointing at the TOML config file
pub const CONFIG_PATH_ENV: &str = "GEOGATEWAY_CONFIG";

/// Root configuration structure for the gateway
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Outbound provider settings
    pub upstream: UpstreamConfig,
    /// Feature flag settings
    pub flags: FlagsConfig,
    /// Default application settings
    pub defaults: DefaultsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Base URLs and transport settings for the external providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Legacy geocoder (Nominatim)
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    /// New geocoder (Open-Meteo geocoding)
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// OpenStreetMap API 0.6
    #[serde(default = "default_osm_url")]
    pub osm_url: String,
    /// Open-Meteo forecast API
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient failures, 0 disables retrying
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Nominatim rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// One statically configured flag
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FlagRule {
    #[serde(default)]
    pub enabled: bool,
    /// When non-empty, only these identities see the flag enabled
    #[serde(default)]
    pub identities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagsConfig {
    /// Flag that selects the new geocoding backend
    #[serde(default = "default_geocoding_flag")]
    pub geocoding_flag: String,
    /// Static rules, used when no Unleash endpoint is configured
    #[serde(default)]
    pub rules: HashMap<String, FlagRule>,
    /// Unleash frontend API base URL
    pub unleash_url: Option<String>,
    /// Unleash frontend API token
    pub unleash_token: Option<String>,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Timezone for "today" and for the forecast provider
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Maximum number of restaurants to return
    #[serde(default = "default_max_restaurants")]
    pub max_restaurants: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint, spans are only exported when set
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_osm_url() -> String {
    "https://api.openstreetmap.org/api/0.6".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    format!("geodata-gateway/{}", crate::VERSION)
}

fn default_geocoding_flag() -> String {
    "new-geocoder".to_string()
}

fn default_timezone() -> String {
    "Europe/Madrid".to_string()
}

fn default_max_restaurants() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            nominatim_url: default_nominatim_url(),
            geocoding_url: default_geocoding_url(),
            osm_url: default_osm_url(),
            forecast_url: default_forecast_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            geocoding_flag: default_geocoding_flag(),
            rules: HashMap::new(),
            unleash_url: None,
            unleash_token: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            max_restaurants: default_max_restaurants(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // GEOGATEWAY_UPSTREAM__TIMEOUT_SECONDS=5 overrides upstream.timeout_seconds
        builder = builder.add_source(
            Environment::with_prefix("GEOGATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: GatewayConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_host();
        }
        if self.upstream.nominatim_url.is_empty() {
            self.upstream.nominatim_url = default_nominatim_url();
        }
        if self.upstream.geocoding_url.is_empty() {
            self.upstream.geocoding_url = default_geocoding_url();
        }
        if self.upstream.osm_url.is_empty() {
            self.upstream.osm_url = default_osm_url();
        }
        if self.upstream.forecast_url.is_empty() {
            self.upstream.forecast_url = default_forecast_url();
        }
        if self.upstream.timeout_seconds == 0 {
            self.upstream.timeout_seconds = default_timeout();
        }
        if self.upstream.user_agent.is_empty() {
            self.upstream.user_agent = default_user_agent();
        }
        if self.flags.geocoding_flag.is_empty() {
            self.flags.geocoding_flag = default_geocoding_flag();
        }
        if self.defaults.timezone.is_empty() {
            self.defaults.timezone = default_timezone();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }

        // Trailing slashes would double up when joining paths
        for url in [
            &mut self.upstream.nominatim_url,
            &mut self.upstream.geocoding_url,
            &mut self.upstream.osm_url,
            &mut self.upstream.forecast_url,
        ] {
            while url.ends_with('/') {
                url.pop();
            }
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_urls()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Parsed timezone, only valid after [`GatewayConfig::validate`]
    pub fn timezone(&self) -> Result<Tz> {
        self.defaults
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{}': {e}", self.defaults.timezone))
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.upstream.timeout_seconds > 120 {
            return Err(config_error("Upstream timeout cannot exceed 120 seconds"));
        }

        if self.upstream.max_retries > 10 {
            return Err(config_error("Upstream max retries cannot exceed 10"));
        }

        if self.defaults.max_restaurants == 0 || self.defaults.max_restaurants > 50 {
            return Err(config_error("max_restaurants must be between 1 and 50"));
        }

        Ok(())
    }

    fn validate_urls(&self) -> Result<()> {
        let urls = [
            ("upstream.nominatim_url", Some(&self.upstream.nominatim_url)),
            ("upstream.geocoding_url", Some(&self.upstream.geocoding_url)),
            ("upstream.osm_url", Some(&self.upstream.osm_url)),
            ("upstream.forecast_url", Some(&self.upstream.forecast_url)),
            ("flags.unleash_url", self.flags.unleash_url.as_ref()),
            ("logging.otlp_endpoint", self.logging.otlp_endpoint.as_ref()),
        ];

        for (name, url) in urls.iter().filter_map(|(name, url)| url.map(|u| (name, u))) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(config_error(format!(
                    "{name} must be a valid HTTP or HTTPS URL, got '{url}'"
                )));
            }
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(config_error(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(config_error(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        self.timezone()?;

        Ok(())
    }
}

fn config_error<S: Into<String>>(message: S) -> anyhow::Error {
    anyhow!("Configuration error: {}", message.into())
}
