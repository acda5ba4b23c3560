//! Forecast widget rendering
//!
//! Renders the location header with the current temperature and conditions,
//! a row of hourly columns, and a status line. Also provides the plain-text
//! version printed by `--once`.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::{ForecastPoint, Location};

const SUN_ICON: &str = "\u{2600}\u{FE0F}"; // ☀️
const RAIN_ICON: &str = "\u{1F327}\u{FE0F}"; // 🌧️

/// Icon for a forecast hour: sun unless rain is more likely than 30%
pub fn precipitation_icon(point: &ForecastPoint) -> &'static str {
    if point.is_rainy() {
        RAIN_ICON
    } else {
        SUN_ICON
    }
}

/// Renders the full forecast view
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", app.location.name),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // current conditions
            Constraint::Length(1),
            Constraint::Length(3), // hourly columns
            Constraint::Min(0),
            Constraint::Length(1), // status
        ])
        .split(inner);

    render_current(frame, app, chunks[0]);
    render_hours(frame, &app.forecast, chunks[2]);
    render_status(frame, app, chunks[4]);
}

fn render_current(frame: &mut Frame, app: &App, area: Rect) {
    let Some(current) = app.current() else {
        return;
    };

    let lines = vec![
        Line::from(Span::styled(
            current.temperature.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(current.weather_code.description.clone()),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_hours(frame: &mut Frame, forecast: &[ForecastPoint], area: Rect) {
    if forecast.is_empty() {
        return;
    }

    let constraints: Vec<Constraint> = forecast
        .iter()
        .map(|_| Constraint::Ratio(1, forecast.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (point, column) in forecast.iter().zip(columns.iter()) {
        let lines = vec![
            Line::from(Span::styled(
                point.hour_label(),
                Style::default().fg(Color::Gray),
            )),
            Line::from(precipitation_icon(point)),
            Line::from(point.temperature.clone()),
        ];
        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center),
            *column,
        );
    }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(error) = &app.last_error {
        Line::from(Span::styled(
            format!("Refresh failed: {}", error),
            Style::default().fg(Color::Red),
        ))
    } else if app.refreshing {
        Line::from(Span::styled(
            "Refreshing...",
            Style::default().fg(Color::Cyan),
        ))
    } else if let Some(at) = app.last_refresh {
        Line::from(Span::styled(
            format!("Updated {}  ·  r refresh  ? help  q quit", at.format("%-I:%M %p")),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from("")
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Plain-text forecast, one header line and one line per hour
pub fn plain_lines(location: &Location, forecast: &[ForecastPoint]) -> Vec<String> {
    let mut lines = Vec::with_capacity(forecast.len() + 1);

    match forecast.first() {
        Some(current) => lines.push(format!(
            "{}: {}, {}",
            location.name, current.temperature, current.weather_code.description
        )),
        None => lines.push(format!("{}: no forecast", location.name)),
    }

    for point in forecast {
        lines.push(format!(
            "{:>5}  {}  {:>5}  {:>3}%",
            point.hour_label(),
            precipitation_icon(point),
            point.temperature,
            point.precipitation_probability.round() as i64
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::data::WeatherDescription;
    use crate::refresh::RefreshMessage;
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};

    fn point(hour: u32, temperature: &str, precipitation: f64) -> ForecastPoint {
        ForecastPoint {
            time: NaiveDate::from_ymd_opt(2024, 7, 15)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            temperature: temperature.to_string(),
            precipitation_probability: precipitation,
            weather_code: WeatherDescription {
                description: "Partly Cloudy".to_string(),
                image: "02d.png".to_string(),
            },
        }
    }

    fn sample_forecast() -> Vec<ForecastPoint> {
        vec![
            point(9, "16°C", 10.0),
            point(10, "18°C", 20.0),
            point(11, "19°C", 30.0),
            point(12, "21°C", 45.0),
            point(13, "22°C", 60.0),
            point(14, "22°C", 5.0),
        ]
    }

    fn render_to_string(app: &App) -> String {
        let backend = TestBackend::new(80, 16);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_precipitation_icon_threshold() {
        assert_eq!(precipitation_icon(&point(9, "1°C", 30.0)), SUN_ICON);
        assert_eq!(precipitation_icon(&point(9, "1°C", 30.5)), RAIN_ICON);
    }

    #[test]
    fn test_render_shows_location_and_current_conditions() {
        let mut app = App::new(Location::default());
        app.apply_message(RefreshMessage::ForecastUpdated(sample_forecast()));
        assert_eq!(app.state, AppState::Forecast);

        let content = render_to_string(&app);
        assert!(content.contains("New York City"));
        assert!(content.contains("16°C"));
        assert!(content.contains("Partly Cloudy"));
    }

    #[test]
    fn test_render_shows_hour_columns() {
        let mut app = App::new(Location::default());
        app.apply_message(RefreshMessage::ForecastUpdated(sample_forecast()));

        let content = render_to_string(&app);
        for label in ["9 AM", "10 AM", "11 AM", "12 PM", "1 PM", "2 PM"] {
            assert!(content.contains(label), "missing column {}", label);
        }
    }

    #[test]
    fn test_render_shows_refresh_error() {
        let mut app = App::new(Location::default());
        app.apply_message(RefreshMessage::ForecastUpdated(sample_forecast()));
        app.apply_message(RefreshMessage::RefreshFailed("offline".to_string()));

        let content = render_to_string(&app);
        assert!(content.contains("Refresh failed: offline"));
        assert!(content.contains("16°C"), "previous forecast stays visible");
    }

    #[test]
    fn test_plain_lines() {
        let lines = plain_lines(&Location::default(), &sample_forecast());
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "New York City: 16°C, Partly Cloudy");
        assert!(lines[1].contains("9 AM"));
        assert!(lines[1].contains("16°C"));
        assert!(lines[1].contains("10%"));
        assert!(lines[4].contains(RAIN_ICON));
    }

    #[test]
    fn test_plain_lines_empty_forecast() {
        let lines = plain_lines(&Location::default(), &[]);
        assert_eq!(lines, vec!["New York City: no forecast".to_string()]);
    }
}
