//! hourcast library
//!
//! This module exposes the forecast client, refresh task, CLI parsing and UI
//! for use by the binary and in integration tests.

pub mod app;
pub mod cli;
pub mod data;
pub mod refresh;
pub mod ui;
