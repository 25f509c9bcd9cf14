//! Content negotiation and response rendering
//!
//! Every payload has a JSON and an XML rendition carrying the same fields.
//! The format is picked once per request from the `Accept` header.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::GatewayError;
use crate::models::{ForecastBundle, ForecastRecord, RestaurantRecord, Restaurants, WeatherSummary};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Representation chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiatedFormat {
    #[default]
    Json,
    Xml,
}

impl NegotiatedFormat {
    /// Pick JSON or XML from an `Accept` header value.
    ///
    /// A missing or blank header means JSON. Higher q-values win, JSON wins
    /// ties, and a range with `q=0` excludes the type.
    pub fn negotiate(accept: Option<&str>) -> Result<Self> {
        let Some(header) = accept.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(NegotiatedFormat::Json);
        };

        let ranges: Vec<MediaRange> = header.split(',').filter_map(MediaRange::parse).collect();
        let json = quality(&ranges, &[("application", "json")]);
        let xml = quality(&ranges, &[("application", "xml"), ("text", "xml")]);

        if json > 0.0 && json >= xml {
            Ok(NegotiatedFormat::Json)
        } else if xml > 0.0 {
            Ok(NegotiatedFormat::Xml)
        } else {
            Err(GatewayError::NotAcceptable {
                accept: header.to_string(),
            })
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            NegotiatedFormat::Json => JSON_CONTENT_TYPE,
            NegotiatedFormat::Xml => XML_CONTENT_TYPE,
        }
    }
}

/// One `type/subtype;q=...` entry of an `Accept` header
#[derive(Debug)]
struct MediaRange {
    kind: String,
    subtype: String,
    q: f32,
}

impl MediaRange {
    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';').map(str::trim);
        let essence = parts.next()?.to_ascii_lowercase();
        let (kind, subtype) = match essence.split_once('/') {
            Some((kind, subtype)) => (kind.trim().to_string(), subtype.trim().to_string()),
            None if essence == "*" => ("*".to_string(), "*".to_string()),
            None => return None,
        };

        let q = parts
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .map_or(1.0, |q| q.clamp(0.0, 1.0));

        Some(Self { kind, subtype, q })
    }

    /// 2 for an exact match, 1 for `type/*`, 0 for `*/*`
    fn specificity(&self, kind: &str, subtype: &str) -> Option<u8> {
        match (self.kind.as_str(), self.subtype.as_str()) {
            ("*", "*") => Some(0),
            (k, "*") if k == kind => Some(1),
            (k, s) if k == kind && s == subtype => Some(2),
            _ => None,
        }
    }
}

/// Quality of the best candidate, judged by its most specific matching range
fn quality(ranges: &[MediaRange], candidates: &[(&str, &str)]) -> f32 {
    candidates
        .iter()
        .filter_map(|(kind, subtype)| {
            ranges
                .iter()
                .filter_map(|range| range.specificity(kind, subtype).map(|s| (s, range.q)))
                .max_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)))
                .map(|(_, q)| q)
        })
        .fold(0.0, f32::max)
}

/// A rendered body with its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: String,
}

/// Payloads that can be sent in either format
pub trait Renderable: Serialize {
    /// Serialize as an XML document, declaration included
    fn to_xml(&self) -> Result<String>;
}

/// Render `value` in the negotiated format
pub fn render<T: Renderable>(value: &T, format: NegotiatedFormat) -> Result<Rendered> {
    let body = match format {
        NegotiatedFormat::Json => {
            serde_json::to_string(value).map_err(|e| GatewayError::render(e.to_string()))?
        }
        NegotiatedFormat::Xml => value.to_xml()?,
    };

    Ok(Rendered {
        content_type: format.content_type(),
        body,
    })
}

fn xml_document<T: Serialize>(root: &str, value: &T) -> Result<String> {
    let body = quick_xml::se::to_string_with_root(root, value)
        .map_err(|e| GatewayError::render(format!("XML serialization failed: {e}")))?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

#[derive(Serialize)]
struct RestaurantsXml<'a> {
    #[serde(rename = "Restaurante")]
    items: &'a [RestaurantRecord],
}

impl Renderable for Restaurants {
    fn to_xml(&self) -> Result<String> {
        xml_document("Restaurantes", &RestaurantsXml { items: &self.0 })
    }
}

#[derive(Serialize)]
struct ForecastXml<'a> {
    #[serde(rename = "minTempUnit")]
    min_temp_unit: &'a str,
    #[serde(rename = "maxTempUnit")]
    max_temp_unit: &'a str,
    latitude: f64,
    longitude: f64,
    #[serde(rename = "Forecast")]
    data: &'a [ForecastRecord],
}

impl Renderable for ForecastBundle {
    fn to_xml(&self) -> Result<String> {
        xml_document(
            "WeatherForecast",
            &ForecastXml {
                min_temp_unit: &self.min_temp_unit,
                max_temp_unit: &self.max_temp_unit,
                latitude: self.latitude,
                longitude: self.longitude,
                data: &self.data,
            },
        )
    }
}

impl Renderable for WeatherSummary {
    fn to_xml(&self) -> Result<String> {
        xml_document("Weather", self)
    }
}

/// Client-facing error payload
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(
        rename = "validTimespans",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub valid_timespans: Option<Vec<String>>,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: err.code().as_str().to_string(),
            message: err.user_message(),
            valid_timespans: err
                .valid_timespans()
                .map(|valid| valid.iter().map(|t| t.to_string()).collect()),
        }
    }
}

impl Renderable for ErrorBody {
    fn to_xml(&self) -> Result<String> {
        xml_document("Error", self)
    }
}

/// Render an error body, falling back to JSON if XML cannot be produced
pub fn render_error(err: &GatewayError, format: NegotiatedFormat) -> Rendered {
    let body = ErrorBody::from(err);
    render(&body, format)
        .or_else(|_| render(&body, NegotiatedFormat::Json))
        .unwrap_or_else(|_| Rendered {
            content_type: JSON_CONTENT_TYPE,
            body: format!(r#"{{"error":"{}"}}"#, err.code().as_str()),
        })
}
