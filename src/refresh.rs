//! Background forecast refresh
//!
//! Fetches the forecast once on start and then on a fixed interval, sending
//! each result over a tokio channel to the main application. The task is owned
//! by a [`RefreshHandle`] and stops when the handle is shut down or dropped.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::data::{ForecastClient, ForecastPoint, ForecastWindow, Location, WeatherError};

/// Messages sent from background refresh to main app
#[derive(Debug, Clone)]
pub enum RefreshMessage {
    /// A fetch is starting
    RefreshStarted,
    /// A new forecast replaces the displayed one
    ForecastUpdated(Vec<ForecastPoint>),
    /// The fetch failed; the displayed forecast stays as it is
    RefreshFailed(String),
}

/// Shortest period the timer accepts
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Longest period the timer accepts; longer periods overflow the clock
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for the refresh timer
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between scheduled fetches
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1_000_000), // ~16.7 minutes
        }
    }
}

/// Anything that can produce a fresh forecast
pub trait ForecastSource: Send + Sync + 'static {
    fn fetch_forecast(&self) -> BoxFuture<'_, Result<Vec<ForecastPoint>, WeatherError>>;
}

/// Forecasts for a fixed location from the Open-Meteo client
#[derive(Debug, Clone)]
pub struct LiveForecast {
    client: ForecastClient,
    location: Location,
}

impl LiveForecast {
    pub fn new(client: ForecastClient, location: Location) -> Self {
        Self { client, location }
    }
}

impl ForecastSource for LiveForecast {
    fn fetch_forecast(&self) -> BoxFuture<'_, Result<Vec<ForecastPoint>, WeatherError>> {
        async move {
            let window = ForecastWindow::next_day(self.location.timezone);
            self.client.fetch(&self.location, &window).await
        }
        .boxed()
    }
}

/// Handle for controlling the background refresh task
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    cancel: CancellationToken,
    refresh_now: Arc<Notify>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Spawns the refresh task
    ///
    /// The first fetch happens immediately; later fetches follow
    /// `config.interval`, clamped to `MIN_INTERVAL..=MAX_INTERVAL`. Must be
    /// called from within a tokio runtime.
    ///
    /// # Arguments
    /// * `source` - Where forecasts come from
    /// * `config` - Configuration for the refresh interval
    ///
    /// # Returns
    /// A RefreshHandle that receives updates via the `receiver` channel
    pub fn spawn<S: ForecastSource>(source: S, config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let refresh_now = Arc::new(Notify::new());

        let task = tokio::spawn(run(
            source,
            config.interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
            msg_tx,
            cancel.clone(),
            Arc::clone(&refresh_now),
        ));

        Self {
            receiver: msg_rx,
            cancel,
            refresh_now,
            task,
        }
    }

    /// Requests a fetch now instead of waiting for the next tick
    pub fn request_refresh(&self) {
        self.refresh_now.notify_one();
    }

    /// Stops the timer. Safe to call more than once.
    ///
    /// No fetch starts after this returns and a fetch that is in flight is
    /// abandoned. A send that was already completing on another worker may
    /// still land in `receiver`; [`try_recv`] yields nothing once shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the refresh task is still running
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<S: ForecastSource>(
    source: S,
    interval: Duration,
    tx: mpsc::Sender<RefreshMessage>,
    cancel: CancellationToken,
    refresh_now: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = refresh_now.notified() => ticker.reset(),
        }

        if !publish(&tx, &cancel, RefreshMessage::RefreshStarted).await {
            break;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.fetch_forecast() => result,
        };

        let message = match result {
            Ok(points) => {
                tracing::info!(points = points.len(), "Forecast refreshed");
                RefreshMessage::ForecastUpdated(points)
            }
            Err(e) => {
                tracing::warn!("Forecast refresh failed: {}", e);
                RefreshMessage::RefreshFailed(e.to_string())
            }
        };

        if !publish(&tx, &cancel, message).await {
            break;
        }
    }

    tracing::debug!("Refresh task stopped");
}

/// Sends a message unless the handle was shut down. Returns false when the
/// task should stop.
async fn publish(
    tx: &mpsc::Sender<RefreshMessage>,
    cancel: &CancellationToken,
    message: RefreshMessage,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(message) => sent.is_ok(),
    }
}

/// Checks for pending refresh messages without blocking
///
/// # Arguments
/// * `handle` - The RefreshHandle to check
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending or the handle was shut down
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    if handle.cancel.is_cancelled() {
        return None;
    }
    handle.receiver.try_recv().ok()
}
