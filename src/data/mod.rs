//! Core data models for hourcast
//!
//! This module contains the types shared between the forecast client, the
//! refresh task and the display: the fixed location, the resolved weather
//! description and the display-ready forecast point.

pub mod codes;
pub mod weather;

pub use codes::CodeTable;
pub use weather::{
    build_forecast, ForecastClient, ForecastWindow, HourlyResponse, HourlyVariable, WeatherError,
};

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Number of forecast points handed to the display
pub const FORECAST_POINTS: usize = 6;

/// The location the forecast is shown for
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Human-readable name shown in the widget header
    pub name: String,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
    /// IANA timezone the provider reports local hours in
    pub timezone: Tz,
}

impl Default for Location {
    /// Midtown Manhattan
    fn default() -> Self {
        Self {
            name: "New York City".to_string(),
            latitude: 40.756491,
            longitude: -73.985275,
            timezone: chrono_tz::America::New_York,
        }
    }
}

/// Human description and icon for a weather code at a given time of day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherDescription {
    /// Short description, e.g. "Partly Cloudy"
    pub description: String,
    /// Icon URL
    pub image: String,
}

/// One hour of forecast, ready for display
///
/// Every field is derived from the same index of the provider's hourly arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Local wall-clock time at the location
    pub time: NaiveDateTime,
    /// Rounded temperature with unit, e.g. "16°C"
    pub temperature: String,
    /// Precipitation probability in percent (0-100)
    pub precipitation_probability: f64,
    /// Description chosen for the hour of day
    pub weather_code: WeatherDescription,
}

impl ForecastPoint {
    /// Hour label in 12-hour format without leading zero, e.g. "3 PM"
    pub fn hour_label(&self) -> String {
        self.time.format("%-I %p").to_string()
    }

    /// Whether rain is likely enough to show a rain icon instead of sun
    pub fn is_rainy(&self) -> bool {
        self.precipitation_probability > 30.0
    }
}
