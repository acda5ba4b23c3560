//! hourcast - The next six hours of weather in the terminal
//!
//! A terminal UI that shows the hourly forecast for one location and keeps it
//! up to date in the background. `--once` prints the forecast and exits.

use std::fs::File;
use std::io;
use std::panic;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use hourcast::app::{App, AppState};
use hourcast::cli::{Cli, StartupConfig};
use hourcast::data::{ForecastClient, ForecastWindow};
use hourcast::refresh::{try_recv, LiveForecast, RefreshHandle};
use hourcast::ui;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Installs the tracing subscriber
///
/// The TUI owns the terminal, so it only logs when a log file is given.
fn init_logging(config: &StartupConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hourcast=info"));

    match &config.log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if config.once => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }

    Ok(())
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    match &app.state {
        AppState::Loading => {
            render_loading(frame, app);
        }
        AppState::Forecast => {
            ui::render_forecast(frame, app);
        }
    }

    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

/// Renders a loading message while the first forecast is being fetched
fn render_loading(frame: &mut ratatui::Frame, app: &App) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        text::Line,
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let mut lines = vec![Line::styled(
        format!("Loading forecast for {}...", app.location.name),
        Style::default().fg(Color::Cyan),
    )];
    if let Some(error) = &app.last_error {
        lines.push(Line::styled(
            format!("Last attempt failed: {}", error),
            Style::default().fg(Color::Red),
        ));
    }

    let loading_text = Paragraph::new(lines).alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

/// Fetches once and prints the forecast to stdout, as text or JSON
async fn run_once(client: ForecastClient, config: &StartupConfig) -> Result<(), Box<dyn std::error::Error>> {
    let location = &config.location;
    let window = ForecastWindow::next_day(location.timezone);
    let forecast = client.fetch(location, &window).await?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&forecast)?);
        return Ok(());
    }

    for line in ui::plain_lines(location, &forecast) {
        println!("{}", line);
    }

    Ok(())
}

/// Runs the terminal UI until the user quits
async fn run_tui(client: ForecastClient, config: StartupConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.location.clone());
    let mut refresh = RefreshHandle::spawn(
        LiveForecast::new(client, config.location.clone()),
        config.refresh.clone(),
    );

    // Main event loop
    let result: Result<(), Box<dyn std::error::Error>> = loop {
        while let Some(message) = try_recv(&mut refresh) {
            app.apply_message(message);
        }

        if app.refresh_requested {
            refresh.request_refresh();
            app.refresh_requested = false;
        }

        if let Err(e) = terminal.draw(|f| render_ui(f, &app)) {
            break Err(e.into());
        }

        // Poll for keyboard events with 100ms timeout
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }

        // Check if we should quit
        if app.should_quit {
            break Ok(());
        }
    };

    refresh.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Error: cannot open log file: {}", e);
        return ExitCode::from(2);
    }

    let mut client = ForecastClient::new().with_codes(config.codes.clone());
    if let Some(base_url) = &config.base_url {
        client = client.with_base_url(base_url.clone());
    }

    let result = if config.once {
        run_once(client, &config).await
    } else {
        run_tui(client, config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
