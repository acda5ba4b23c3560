//! Open-Meteo forecast client
//!
//! This module fetches hourly forecast data from the Open-Meteo API and turns
//! the aligned time, temperature, precipitation and weather code arrays into
//! the six display-ready [`ForecastPoint`]s that follow the current hour.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::codes::{code_key, CodeTable};
use super::{ForecastPoint, Location, FORECAST_POINTS};

/// Base URL for the Open-Meteo API
const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Format of the `start_hour`/`end_hour` query parameters
const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Hours covered by one request
const WINDOW_HOURS: i64 = 24;

/// Spacing assumed when the provider returns a single timestamp
const DEFAULT_INTERVAL_SECS: i64 = 3600;

/// Errors that can occur when fetching or transforming forecast data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Forecast provider returned status {0}")]
    Status(StatusCode),

    /// Response did not have the expected shape
    #[error("Malformed forecast response: {0}")]
    MalformedResponse(String),

    /// Fewer hourly entries than the forecast window needs
    #[error("Not enough hourly data: expected at least {expected} entries, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Weather code missing from the lookup table
    #[error("Unknown weather code: {0}")]
    UnknownWeatherCode(String),

    /// Weather code table could not be loaded
    #[error("Invalid weather code table: {0}")]
    CodeTable(String),
}

/// Hourly variables requested from the provider
///
/// The discriminant is the position of the variable in the request, which is
/// also its position in the parsed [`HourlyBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HourlyVariable {
    Temperature2m = 0,
    PrecipitationProbability = 1,
    WeatherCode = 2,
}

impl HourlyVariable {
    /// Variables in request order
    pub const REQUESTED: [HourlyVariable; 3] = [
        HourlyVariable::Temperature2m,
        HourlyVariable::PrecipitationProbability,
        HourlyVariable::WeatherCode,
    ];

    /// Provider name of the variable
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature2m => "temperature_2m",
            Self::PrecipitationProbability => "precipitation_probability",
            Self::WeatherCode => "weather_code",
        }
    }

    /// Position of the variable in the request and in the hourly block
    pub fn index(self) -> usize {
        self as usize
    }

    /// Value of the `hourly` query parameter
    pub fn query() -> String {
        Self::REQUESTED
            .iter()
            .map(|v| v.name())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The hour range requested from the provider, in the location's local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ForecastWindow {
    /// A 24 hour window beginning at the hour containing `start`
    pub fn starting_at(start: NaiveDateTime) -> Self {
        let start = NaiveDateTime::new(start.date(), NaiveTime::MIN)
            + Duration::hours(i64::from(start.hour()));
        Self {
            start,
            end: start + Duration::hours(WINDOW_HOURS),
        }
    }

    /// The next 24 hours from now, on the wall clock of `tz`
    pub fn next_day(tz: Tz) -> Self {
        Self::starting_at(Utc::now().with_timezone(&tz).naive_local())
    }

    /// `start_hour` query value, e.g. "2024-07-15T08:00"
    pub fn start_hour(&self) -> String {
        self.start.format(WINDOW_FORMAT).to_string()
    }

    /// `end_hour` query value
    pub fn end_hour(&self) -> String {
        self.end.format(WINDOW_FORMAT).to_string()
    }
}

/// One requested variable's values, aligned with the block's timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSeries {
    pub variable: HourlyVariable,
    pub values: Vec<Option<f64>>,
}

/// Hourly time series for one location
///
/// Timestamps are kept in compact form: `time` is the first epoch second,
/// `time_end` is exclusive and `interval` is the spacing in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBlock {
    pub time: i64,
    pub time_end: i64,
    pub interval: i64,
    pub variables: Vec<VariableSeries>,
}

impl HourlyBlock {
    /// Number of hourly slots described by the compact time range
    pub fn len(&self) -> Result<usize, WeatherError> {
        if self.interval <= 0 {
            return Err(WeatherError::MalformedResponse(format!(
                "non-positive hourly interval {}",
                self.interval
            )));
        }
        if self.time_end < self.time {
            return Err(WeatherError::MalformedResponse(format!(
                "hourly range ends ({}) before it starts ({})",
                self.time_end, self.time
            )));
        }
        let span = self.time_end.checked_sub(self.time).ok_or_else(|| {
            WeatherError::MalformedResponse("hourly range is too long".to_string())
        })?;
        Ok((span / self.interval) as usize)
    }

    /// Expands the compact time range into local wall-clock times
    pub fn timestamps(&self, utc_offset_seconds: i64) -> Result<Vec<NaiveDateTime>, WeatherError> {
        let count = self.len()?;
        (0..count as i64)
            .map(|i| {
                let t = i
                    .checked_mul(self.interval)
                    .and_then(|step| step.checked_add(self.time))
                    .and_then(|t| t.checked_add(utc_offset_seconds))
                    .ok_or_else(|| {
                        WeatherError::MalformedResponse(format!(
                            "hourly time at index {} with offset {} is out of range",
                            i, utc_offset_seconds
                        ))
                    })?;
                DateTime::from_timestamp(t, 0)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| {
                        WeatherError::MalformedResponse(format!("timestamp {} out of range", t))
                    })
            })
            .collect()
    }

    /// Values of a requested variable, checked against its expected position
    pub fn variable(&self, variable: HourlyVariable) -> Result<&[Option<f64>], WeatherError> {
        let series = self.variables.get(variable.index()).ok_or_else(|| {
            WeatherError::MalformedResponse(format!(
                "no hourly variable at index {} (expected {})",
                variable.index(),
                variable.name()
            ))
        })?;

        if series.variable != variable {
            return Err(WeatherError::MalformedResponse(format!(
                "expected {} at index {}, found {}",
                variable.name(),
                variable.index(),
                series.variable.name()
            )));
        }

        Ok(&series.values)
    }
}

/// Parsed and validated provider response
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyResponse {
    /// Seconds to add to epoch times to get local wall-clock times
    pub utc_offset_seconds: i64,
    pub hourly: HourlyBlock,
}

impl HourlyResponse {
    /// Parses a JSON body returned with `timeformat=unixtime`
    ///
    /// Variables are placed in request order and every array must cover the
    /// full time range.
    pub fn from_json(body: &str) -> Result<Self, WeatherError> {
        let raw: OpenMeteoResponse = serde_json::from_str(body)
            .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;
        let hourly = raw
            .hourly
            .ok_or_else(|| WeatherError::MalformedResponse("missing hourly block".to_string()))?;

        let block = parse_hourly_block(hourly)?;
        Ok(Self {
            utc_offset_seconds: raw.utc_offset_seconds,
            hourly: block,
        })
    }
}

/// Builds the compact block from the provider's per-variable arrays
fn parse_hourly_block(mut hourly: HourlyWeather) -> Result<HourlyBlock, WeatherError> {
    let first = hourly.time.first().copied().unwrap_or_default();
    let interval = match hourly.time.get(1) {
        Some(second) => second.checked_sub(first).ok_or_else(|| {
            WeatherError::MalformedResponse(format!(
                "hourly times {} and {} are too far apart",
                first, second
            ))
        })?,
        None => DEFAULT_INTERVAL_SECS,
    };
    if interval <= 0 {
        return Err(WeatherError::MalformedResponse(format!(
            "hourly times are not increasing (interval {})",
            interval
        )));
    }

    // The compact form only holds if every step is the same
    for (i, t) in hourly.time.iter().enumerate() {
        let expected = (i as i64)
            .checked_mul(interval)
            .and_then(|step| step.checked_add(first));
        if expected != Some(*t) {
            return Err(WeatherError::MalformedResponse(format!(
                "hourly time at index {} is not evenly spaced",
                i
            )));
        }
    }

    let count = hourly.time.len();
    let mut variables = Vec::with_capacity(HourlyVariable::REQUESTED.len());
    for variable in HourlyVariable::REQUESTED {
        let values = hourly.values.remove(variable.name()).ok_or_else(|| {
            WeatherError::MalformedResponse(format!(
                "missing hourly variable {}",
                variable.name()
            ))
        })?;
        if values.len() != count {
            return Err(WeatherError::MalformedResponse(format!(
                "{} has {} values but there are {} hourly times",
                variable.name(),
                values.len(),
                count
            )));
        }
        variables.push(VariableSeries { variable, values });
    }

    let time_end = (count as i64)
        .checked_mul(interval)
        .and_then(|span| span.checked_add(first))
        .ok_or_else(|| {
            WeatherError::MalformedResponse("hourly time range is out of range".to_string())
        })?;

    Ok(HourlyBlock {
        time: first,
        time_end,
        interval,
        variables,
    })
}

/// Converts a parsed response into the forecast for the next six hours
///
/// Index 0 is the current, partial hour and is skipped; indices 1 through 6
/// become the returned points, oldest first. This is a pure function of its
/// inputs.
pub fn build_forecast(
    response: &HourlyResponse,
    codes: &CodeTable,
) -> Result<Vec<ForecastPoint>, WeatherError> {
    let hourly = &response.hourly;
    let times = hourly.timestamps(response.utc_offset_seconds)?;
    let temperatures = hourly.variable(HourlyVariable::Temperature2m)?;
    let precipitation = hourly.variable(HourlyVariable::PrecipitationProbability)?;
    let weather_codes = hourly.variable(HourlyVariable::WeatherCode)?;

    for (variable, values) in [
        (HourlyVariable::Temperature2m, temperatures),
        (HourlyVariable::PrecipitationProbability, precipitation),
        (HourlyVariable::WeatherCode, weather_codes),
    ] {
        if values.len() != times.len() {
            return Err(WeatherError::MalformedResponse(format!(
                "{} has {} values but there are {} hourly times",
                variable.name(),
                values.len(),
                times.len()
            )));
        }
    }

    let needed = FORECAST_POINTS + 1;
    if times.len() < needed {
        return Err(WeatherError::InsufficientData {
            expected: needed,
            actual: times.len(),
        });
    }

    (1..=FORECAST_POINTS)
        .map(|i| {
            let time = times[i];
            let temperature = value_at(temperatures, HourlyVariable::Temperature2m, i)?;
            let precipitation_probability =
                value_at(precipitation, HourlyVariable::PrecipitationProbability, i)?;
            let code = value_at(weather_codes, HourlyVariable::WeatherCode, i)?;

            Ok(ForecastPoint {
                time,
                temperature: format_temperature(temperature),
                precipitation_probability,
                weather_code: codes.resolve(&code_key(code), time.hour())?,
            })
        })
        .collect()
}

fn value_at(values: &[Option<f64>], variable: HourlyVariable, i: usize) -> Result<f64, WeatherError> {
    values.get(i).copied().flatten().ok_or_else(|| {
        WeatherError::MalformedResponse(format!("{} has no value at index {}", variable.name(), i))
    })
}

/// Rounds to whole degrees, e.g. 15.6 -> "16°C"
pub fn format_temperature(celsius: f64) -> String {
    format!("{}°C", celsius.round() as i64)
}

/// Client for fetching forecasts from the Open-Meteo API
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: String,
    codes: Arc<CodeTable>,
}

impl Default for ForecastClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastClient {
    /// Create a new ForecastClient with the built-in code table
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: OPEN_METEO_BASE_URL.to_string(),
            codes: CodeTable::builtin(),
        }
    }

    /// Create a new ForecastClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            ..Self::new()
        }
    }

    /// Point the client at a different provider endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a custom weather code table
    pub fn with_codes(mut self, codes: Arc<CodeTable>) -> Self {
        self.codes = codes;
        self
    }

    /// Fetch the next six hourly forecast points for a location
    ///
    /// # Arguments
    /// * `location` - Where to forecast
    /// * `window` - The 24 hour range to request
    ///
    /// # Returns
    /// * `Ok(Vec<ForecastPoint>)` - Six points, oldest first
    /// * `Err(WeatherError)` - If the request, parsing or code lookup fails
    pub async fn fetch(
        &self,
        location: &Location,
        window: &ForecastWindow,
    ) -> Result<Vec<ForecastPoint>, WeatherError> {
        let response = self.fetch_hourly(location, window).await?;
        build_forecast(&response, &self.codes)
    }

    /// Fetch and validate the raw hourly block without transforming it
    pub async fn fetch_hourly(
        &self,
        location: &Location,
        window: &ForecastWindow,
    ) -> Result<HourlyResponse, WeatherError> {
        let query = [
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("hourly", HourlyVariable::query()),
            ("timezone", location.timezone.name().to_string()),
            ("timeformat", "unixtime".to_string()),
            ("start_hour", window.start_hour()),
            ("end_hour", window.end_hour()),
        ];

        tracing::debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            start = %window.start_hour(),
            end = %window.end_hour(),
            "Requesting hourly forecast"
        );

        let response = self.client.get(&self.base_url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status(status));
        }

        let text = response.text().await?;
        HourlyResponse::from_json(&text)
    }
}

/// Open-Meteo API response structure
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    utc_offset_seconds: i64,
    hourly: Option<HourlyWeather>,
}

/// Hourly weather data from Open-Meteo, one array per requested variable
#[derive(Debug, Deserialize)]
struct HourlyWeather {
    time: Vec<i64>,
    #[serde(flatten)]
    values: HashMap<String, Vec<Option<f64>>>,
}
