//! Timespan resolution
//!
//! Turns a timespan token (`hoy`, `manhana`, `7dias` or a literal
//! `YYYY-MM-DD`) into a concrete inclusive date range. The current day is
//! always supplied by the caller through a [`Clock`].

use std::str::FromStr;

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::Result;
use crate::error::GatewayError;
use crate::models::DateRange;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today" for timespan resolution
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock evaluated in a fixed timezone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// Clock pinned to one day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Named relative timespans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Today,
    Tomorrow,
    Week,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Today, Preset::Tomorrow, Preset::Week];

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Preset::Today => "hoy",
            Preset::Tomorrow => "manhana",
            Preset::Week => "7dias",
        }
    }

    /// `(offset_days, duration_days)` relative to today
    #[must_use]
    pub fn window(self) -> (u64, u64) {
        match self {
            Preset::Today => (0, 1),
            Preset::Tomorrow => (1, 1),
            Preset::Week => (0, 7),
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.token() == token)
    }

    /// Tokens of every preset, in declaration order
    #[must_use]
    pub fn tokens() -> Vec<&'static str> {
        Self::ALL.iter().map(|preset| preset.token()).collect()
    }
}

/// A parsed timespan token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timespan {
    Preset(Preset),
    Date(NaiveDate),
}

impl FromStr for Timespan {
    type Err = GatewayError;

    fn from_str(token: &str) -> Result<Self> {
        if let Some(preset) = Preset::from_token(token) {
            return Ok(Timespan::Preset(preset));
        }

        // chrono tolerates unpadded, space or sign padded fields
        let date = is_iso_shape(token)
            .then(|| NaiveDate::parse_from_str(token, DATE_FORMAT).ok())
            .flatten();
        if let Some(date) = date {
            return Ok(Timespan::Date(date));
        }

        Err(GatewayError::InvalidTimespan {
            token: token.to_string(),
            valid: Preset::tokens(),
        })
    }
}

/// `dddd-dd-dd` with ASCII digits only
fn is_iso_shape(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

impl Timespan {
    /// Concrete range for this timespan given the current day
    #[must_use]
    pub fn resolve(self, today: NaiveDate) -> DateRange {
        match self {
            Timespan::Date(day) => DateRange::single(day),
            Timespan::Preset(preset) => {
                let (offset, duration) = preset.window();
                let start = today + Days::new(offset);
                DateRange {
                    start,
                    end: start + Days::new(duration - 1),
                }
            }
        }
    }
}

/// Parse `token` and resolve it against `today`
pub fn resolve(token: &str, today: NaiveDate) -> Result<DateRange> {
    Ok(token.parse::<Timespan>()?.resolve(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("hoy", 0, 1)]
    #[case("manhana", 1, 1)]
    #[case("7dias", 0, 7)]
    fn test_presets_cover_their_duration(
        #[case] token: &str,
        #[case] offset: i64,
        #[case] duration: i64,
    ) {
        let today = day(2024, 12, 28);
        let range = resolve(token, today).unwrap();

        assert_eq!(range.days(), duration);
        assert!(range.start >= today);
        assert_eq!((range.start - today).num_days(), offset);
    }

    #[test]
    fn test_week_crosses_year_boundary() {
        let range = resolve("7dias", day(2024, 12, 28)).unwrap();
        assert_eq!(range.start.to_string(), "2024-12-28");
        assert_eq!(range.end.to_string(), "2025-01-03");
    }

    #[test]
    fn test_literal_date_is_single_day() {
        let range = resolve("2024-03-01", day(2030, 1, 1)).unwrap();
        assert_eq!(range.start.to_string(), "2024-03-01");
        assert_eq!(range.end.to_string(), "2024-03-01");
    }

    #[rstest]
    #[case("invalido")]
    #[case("2024-3-1")]
    #[case("2024-02-30")]
    #[case("")]
    #[case("HOY")]
    #[case("2024- 1- 1")]
    #[case("2024-01- 1")]
    #[case(" 2024-1-01")]
    #[case("+2024-1-01")]
    #[case("2024-1-01 ")]
    fn test_invalid_tokens(#[case] token: &str) {
        let err = resolve(token, day(2024, 1, 1)).unwrap_err();
        match err {
            GatewayError::InvalidTimespan { token: t, valid } => {
                assert_eq!(t, token);
                assert_eq!(valid, vec!["hoy", "manhana", "7dias"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(day(2024, 5, 5));
        assert_eq!(clock.today(), day(2024, 5, 5));
    }
}
