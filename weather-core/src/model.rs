use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Upstream record as returned by `GET {base}/WeatherForecast`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForecastRecord {
    #[serde(default)]
    pub date: Option<String>,
    /// A missing value reads as 0.
    #[serde(default)]
    pub temperature_c: i32,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A single day's forecast with a validated date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub temperature_f: i32,
    pub summary: Option<String>,
}

impl Forecast {
    pub fn new(date: NaiveDate, temperature_c: i32, summary: Option<String>) -> Self {
        Self {
            date,
            temperature_c,
            temperature_f: celsius_to_fahrenheit(temperature_c),
            summary,
        }
    }
}

impl TryFrom<RawForecastRecord> for Forecast {
    type Error = RawForecastRecord;

    /// Hands the record back when its date is missing or unparseable.
    fn try_from(raw: RawForecastRecord) -> Result<Self, Self::Error> {
        match raw.date.as_deref().and_then(parse_date) {
            Some(date) => Ok(Forecast::new(date, raw.temperature_c, raw.summary)),
            None => Err(raw),
        }
    }
}

/// `32 + C * 9 / 5`, truncating toward zero.
pub fn celsius_to_fahrenheit(celsius: i32) -> i32 {
    32 + celsius * 9 / 5
}

/// Accepts a plain calendar date or a timestamp, keeping only the date part.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|dt| dt.date())
}

/// Keeps the records with a usable date and converts them, preserving order.
pub fn forecasts_from_records(records: Vec<RawForecastRecord>) -> Vec<Forecast> {
    records
        .into_iter()
        .filter_map(|raw| match Forecast::try_from(raw) {
            Ok(forecast) => Some(forecast),
            Err(dropped) => {
                tracing::debug!(
                    date = ?dropped.date,
                    "dropping forecast record without a valid date"
                );
                None
            }
        })
        .collect()
}
