//! Command-line interface parsing for hourcast
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into the validated settings the application starts with.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use clap::Parser;
use thiserror::Error;

use crate::data::{CodeTable, Location, WeatherError};
use crate::refresh::{RefreshConfig, MAX_INTERVAL};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The timezone is not an IANA name
    #[error("Invalid timezone: '{0}'. Use an IANA name such as America/New_York")]
    InvalidTimezone(String),

    /// Coordinates outside the valid range
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Refresh interval outside one second to one year
    #[error("Invalid interval: must be between one second and one year")]
    InvalidInterval,

    /// Custom code table could not be loaded
    #[error(transparent)]
    Codes(#[from] WeatherError),
}

/// hourcast - The next six hours of weather for one place
#[derive(Parser, Debug)]
#[command(name = "hourcast")]
#[command(about = "Hourly weather forecast widget for the terminal")]
#[command(version)]
pub struct Cli {
    /// Latitude of the location
    #[arg(long, default_value_t = 40.756491, allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude of the location
    #[arg(long, default_value_t = -73.985275, allow_negative_numbers = true)]
    pub longitude: f64,

    /// IANA timezone of the location
    #[arg(long, default_value = "America/New_York")]
    pub timezone: String,

    /// Name shown in the widget header
    #[arg(long, default_value = "New York City")]
    pub name: String,

    /// Seconds between refreshes
    #[arg(long, value_name = "SECONDS", default_value_t = 1000)]
    pub interval: u64,

    /// JSON file mapping weather codes to day/night descriptions
    #[arg(long, value_name = "PATH")]
    pub codes: Option<PathBuf>,

    /// Forecast API endpoint
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Fetch once, print the forecast and exit
    #[arg(long)]
    pub once: bool,

    /// With --once, print the forecast points as JSON
    #[arg(long, requires = "once")]
    pub json: bool,

    /// Write logs to this file (the TUI does not log otherwise)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Where to forecast
    pub location: Location,
    /// Refresh timer settings
    pub refresh: RefreshConfig,
    /// Weather code table
    pub codes: Arc<CodeTable>,
    /// Provider endpoint override
    pub base_url: Option<String>,
    /// Print once instead of running the TUI
    pub once: bool,
    /// Print `--once` output as JSON
    pub json: bool,
    /// Log destination
    pub log_file: Option<PathBuf>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            location: Location::default(),
            refresh: RefreshConfig::default(),
            codes: CodeTable::builtin(),
            base_url: None,
            once: false,
            json: false,
            log_file: None,
        }
    }
}

/// Parses an IANA timezone name
///
/// # Returns
/// * `Ok(Tz)` if the name is known
/// * `Err(CliError::InvalidTimezone)` otherwise
pub fn parse_timezone_arg(s: &str) -> Result<Tz, CliError> {
    s.parse::<Tz>()
        .map_err(|_| CliError::InvalidTimezone(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if a value is out of range or the code table is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let timezone = parse_timezone_arg(&cli.timezone)?;

        if !(-90.0..=90.0).contains(&cli.latitude) || !(-180.0..=180.0).contains(&cli.longitude) {
            return Err(CliError::InvalidCoordinates {
                latitude: cli.latitude,
                longitude: cli.longitude,
            });
        }

        let interval = Duration::from_secs(cli.interval);
        if cli.interval == 0 || interval > MAX_INTERVAL {
            return Err(CliError::InvalidInterval);
        }

        let codes = match &cli.codes {
            Some(path) => Arc::new(CodeTable::from_path(path)?),
            None => CodeTable::builtin(),
        };

        Ok(StartupConfig {
            location: Location {
                name: cli.name.clone(),
                latitude: cli.latitude,
                longitude: cli.longitude,
                timezone,
            },
            refresh: RefreshConfig { interval },
            codes,
            base_url: cli.base_url.clone(),
            once: cli.once,
            json: cli.json,
            log_file: cli.log_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_timezone_arg_valid() {
        assert_eq!(
            parse_timezone_arg("America/New_York").unwrap(),
            chrono_tz::America::New_York
        );
        assert_eq!(parse_timezone_arg("Europe/Berlin").unwrap(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_parse_timezone_arg_invalid() {
        let result = parse_timezone_arg("Mars/Olympus");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Invalid timezone"));
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn test_cli_parse_no_args_uses_defaults() {
        let cli = Cli::parse_from(["hourcast"]);
        assert_eq!(cli.timezone, "America/New_York");
        assert_eq!(cli.name, "New York City");
        assert_eq!(cli.interval, 1000);
        assert!(!cli.once);
        assert!(cli.codes.is_none());
    }

    #[test]
    fn test_cli_parse_negative_coordinates() {
        let cli = Cli::parse_from([
            "hourcast",
            "--latitude",
            "-33.87",
            "--longitude",
            "151.21",
            "--timezone",
            "Australia/Sydney",
        ]);
        assert!((cli.latitude - (-33.87)).abs() < 0.0001);
        assert!((cli.longitude - 151.21).abs() < 0.0001);
    }

    #[test]
    fn test_startup_config_from_cli_defaults() {
        let cli = Cli::parse_from(["hourcast"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.location, Location::default());
        assert_eq!(config.refresh.interval, Duration::from_secs(1000));
        assert!(Arc::ptr_eq(&config.codes, &CodeTable::builtin()));
        assert!(!config.once);
    }

    #[test]
    fn test_startup_config_from_cli_custom_location() {
        let cli = Cli::parse_from([
            "hourcast",
            "--name",
            "Berlin",
            "--latitude",
            "52.52",
            "--longitude",
            "13.405",
            "--timezone",
            "Europe/Berlin",
            "--interval",
            "60",
            "--once",
        ]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.location.name, "Berlin");
        assert_eq!(config.location.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.refresh.interval, Duration::from_secs(60));
        assert!(config.once);
    }

    #[test]
    fn test_json_requires_once() {
        assert!(Cli::try_parse_from(["hourcast", "--json"]).is_err());

        let cli = Cli::parse_from(["hourcast", "--once", "--json"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(config.once);
        assert!(config.json);
    }

    #[test]
    fn test_startup_config_from_cli_invalid_timezone() {
        let cli = Cli::parse_from(["hourcast", "--timezone", "Nowhere"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_startup_config_from_cli_invalid_coordinates() {
        let cli = Cli::parse_from(["hourcast", "--latitude", "95"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_startup_config_from_cli_zero_interval() {
        let cli = Cli::parse_from(["hourcast", "--interval", "0"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidInterval)
        ));
    }

    #[test]
    fn test_startup_config_from_cli_interval_too_long() {
        let cli = Cli::parse_from(["hourcast", "--interval", "18446744073709551615"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidInterval)
        ));

        let year = MAX_INTERVAL.as_secs().to_string();
        let cli = Cli::parse_from(["hourcast", "--interval", &year]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.refresh.interval, MAX_INTERVAL);

        let past_year = (MAX_INTERVAL.as_secs() + 1).to_string();
        let cli = Cli::parse_from(["hourcast", "--interval", &past_year]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::InvalidInterval)
        ));
    }

    #[test]
    fn test_startup_config_from_cli_custom_codes() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(
            br#"{"0": {"day": {"description": "Bright", "image": "a.png"},
                       "night": {"description": "Dark", "image": "b.png"}}}"#,
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from(["hourcast", "--codes", &path]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.codes.len(), 1);
        assert_eq!(config.codes.resolve("0", 20).unwrap().description, "Dark");
    }

    #[test]
    fn test_startup_config_from_cli_missing_codes_file() {
        let cli = Cli::parse_from(["hourcast", "--codes", "/nonexistent/codes.json"]);
        assert!(matches!(
            StartupConfig::from_cli(&cli),
            Err(CliError::Codes(_))
        ));
    }
}
