//! Application state management for hourcast
//!
//! This module holds the forecast currently on screen, applies messages from
//! the refresh task and handles keyboard input.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};

use crate::data::{ForecastPoint, Location};
use crate::refresh::RefreshMessage;

/// Application state enum representing the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the first forecast
    Loading,
    /// A forecast is on screen
    Forecast,
}

/// Main application struct managing state and data
#[derive(Debug)]
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// The location being forecast
    pub location: Location,
    /// Latest published forecast, replaced wholesale on each update
    pub forecast: Vec<ForecastPoint>,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Timestamp of last successful refresh
    pub last_refresh: Option<DateTime<Local>>,
    /// Message from the last failed refresh, cleared on success
    pub last_error: Option<String>,
    /// A fetch is in flight
    pub refreshing: bool,
    /// Flag indicating a refresh has been requested
    pub refresh_requested: bool,
    /// Flag to show help overlay
    pub show_help: bool,
}

impl App {
    /// Creates a new App for the given location, waiting for data
    pub fn new(location: Location) -> Self {
        Self {
            state: AppState::Loading,
            location,
            forecast: Vec::new(),
            should_quit: false,
            last_refresh: None,
            last_error: None,
            refreshing: false,
            refresh_requested: false,
            show_help: false,
        }
    }

    /// The point shown large in the header
    pub fn current(&self) -> Option<&ForecastPoint> {
        self.forecast.first()
    }

    /// Applies a message from the refresh task
    ///
    /// A failed refresh keeps whatever forecast was shown before.
    pub fn apply_message(&mut self, message: RefreshMessage) {
        match message {
            RefreshMessage::RefreshStarted => {
                self.refreshing = true;
            }
            RefreshMessage::ForecastUpdated(points) => {
                self.forecast = points;
                self.last_refresh = Some(Local::now());
                self.last_error = None;
                self.refreshing = false;
                self.state = AppState::Forecast;
            }
            RefreshMessage::RefreshFailed(error) => {
                self.last_error = Some(error);
                self.refreshing = false;
            }
        }
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Key Bindings
    /// - `q` or `Esc`: Quit the application
    /// - `r`: Refresh now
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Handle help overlay - intercepts all keys when shown
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                self.refresh_requested = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            _ => {}
        }
    }
}
