//! Weather code lookup table
//!
//! Maps WMO weather codes (as stringified integers) to a day and a night
//! description. The built-in table is embedded in the binary and parsed once;
//! a custom table with the same JSON shape can be loaded from disk.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use super::weather::WeatherError;
use super::WeatherDescription;

/// Embedded default table
const BUILTIN_CODES: &str = include_str!("codes.json");

/// Last local hour that still counts as day. Later hours use the night variant.
const LAST_DAY_HOUR: u32 = 18;

static BUILTIN: OnceLock<Arc<CodeTable>> = OnceLock::new();

/// Day and night variants for one weather code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeEntry {
    pub day: WeatherDescription,
    pub night: WeatherDescription,
}

/// Immutable lookup from weather code key to descriptions
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CodeTable {
    entries: HashMap<String, CodeEntry>,
}

impl CodeTable {
    /// Returns the process-wide built-in table, parsing it on first use
    ///
    /// # Panics
    /// If the embedded `codes.json` is not a valid table. It is compiled into
    /// the binary and checked by the unit tests.
    pub fn builtin() -> Arc<CodeTable> {
        BUILTIN
            .get_or_init(|| {
                let table = Self::from_json(BUILTIN_CODES)
                    .expect("embedded codes.json must be a valid weather code table");
                Arc::new(table)
            })
            .clone()
    }

    /// Parses a table from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, WeatherError> {
        serde_json::from_str(json).map_err(|e| WeatherError::CodeTable(e.to_string()))
    }

    /// Loads a table from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, WeatherError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| WeatherError::CodeTable(format!("{}: {}", path.display(), e)))?;
        let table = Self::from_json(&contents)?;
        tracing::debug!(
            "Loaded {} weather codes from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Number of codes in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no codes at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a code key for a local hour of day (0-23)
    ///
    /// Hours after 18:00 get the night description. Unknown codes are an
    /// error; there is no fallback description.
    pub fn resolve(&self, code: &str, hour: u32) -> Result<WeatherDescription, WeatherError> {
        let entry = self
            .entries
            .get(code)
            .ok_or_else(|| WeatherError::UnknownWeatherCode(code.to_string()))?;

        if hour > LAST_DAY_HOUR {
            Ok(entry.night.clone())
        } else {
            Ok(entry.day.clone())
        }
    }
}

/// Renders a raw provider value as a table key: rounded, no decimal places
pub fn code_key(raw: f64) -> String {
    format!("{}", raw.round() as i64)
}
