mod run;
mod scheduler;

#[cfg(test)]
mod fakes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use skipline_core::{AppConfig, FilterConfig, FilterWarning, GeoPoint, APPOINTMENT_TYPES};
use skipline_notify::{Dispatcher, Notifier, WebhookNotifier};
use skipline_scraper::{Geocoder, HttpStepExecutor, JourneyNavigator, NominatimGeocoder};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::run::{RunMode, Watcher};
use crate::scheduler::{Delivery, PollTiming};

#[derive(Debug, Parser)]
#[command(name = "skipline")]
#[command(about = "Watch the DMV appointment journey for open slots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll forever with jittered sleeps (the default)
    Watch,
    /// Probe once, print the report, deliver it, and exit
    Once,
    /// List the known appointment types
    Types,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Types => print_types(),
        Commands::Once => {
            let mut app = App::start().await?;
            let report = scheduler::run_isolated(&app.watcher, app.mode).await;
            app.delivery.deliver(&report);
            app.delivery.drain().await;
        }
        Commands::Watch => {
            let mut app = App::start().await?;
            let (tx, rx) = watch::channel(false);
            tokio::spawn(async move {
                shutdown_signal().await;
                let _ = tx.send(true);
            });

            scheduler::watch_loop(app.watcher, &mut app.delivery, app.timing, app.mode, rx).await;
            app.delivery.drain().await;
        }
    }

    Ok(())
}

/// Everything resolved at startup. Failing to build it is a fatal error.
struct App {
    watcher: Arc<Watcher<HttpStepExecutor>>,
    delivery: Delivery,
    mode: RunMode,
    timing: PollTiming,
}

impl App {
    async fn start() -> anyhow::Result<Self> {
        let config = skipline_core::load_app_config().context("failed to load configuration")?;
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        tracing::info!(config = ?config, "configuration loaded");

        let watcher = Arc::new(build_watcher(&config).await?);
        let delivery = build_delivery(&config)?;
        let mode = if config.early_alert {
            RunMode::EarlyAlert
        } else {
            RunMode::Exhaustive
        };
        let timing = PollTiming::new(
            config.base_interval_secs,
            config.offset_min_secs,
            config.offset_max_secs,
        );

        Ok(Self {
            watcher,
            delivery,
            mode,
            timing,
        })
    }
}

fn print_types() {
    for t in &APPOINTMENT_TYPES {
        println!("{:>2}  {:<28}  {}", t.id, t.label, t.journey_key());
    }
}

/// Load reference data, resolve filters, and wire the journey client.
///
/// # Errors
///
/// Any error here is fatal: the reference data is unreadable or the HTTP
/// client cannot be built.
async fn build_watcher(config: &AppConfig) -> anyhow::Result<Watcher<HttpStepExecutor>> {
    let book = skipline_core::load_locations(&config.locations_path)?;
    tracing::info!(
        path = %config.locations_path.display(),
        locations = book.len(),
        "reference data loaded"
    );

    let filters = resolve_filters(config).await;
    if filters.has_active_filters() {
        tracing::info!(filters = %filters.summary(), "filters active");
    } else {
        tracing::info!("no filters active");
    }

    let executor = HttpStepExecutor::new(
        config.request_timeout_secs,
        &config.user_agent,
        config.step_max_retries,
        config.step_backoff_ms,
    )?;
    let navigator = JourneyNavigator::checked(executor, &config.base_url)?;

    let watcher = Watcher::new(navigator, book, config.appointment_type, filters);
    tracing::info!(
        appointment_type = %watcher.appointment_type(),
        early_alert = config.early_alert,
        "watcher ready"
    );
    Ok(watcher)
}

/// Resolve filter settings against today's date, geocoding the distance
/// origin once. A failed geocode turns distance filtering off.
async fn resolve_filters(config: &AppConfig) -> FilterConfig {
    let today = chrono::Local::now().date_naive();
    let resolved = config.filters.resolve(today);

    let origin = match &resolved.distance {
        Some(request) => geocode_origin(config, &request.address).await,
        None => None,
    };
    resolved.with_origin(origin)
}

async fn geocode_origin(config: &AppConfig, address: &str) -> Option<GeoPoint> {
    let geocoder = match NominatimGeocoder::new(
        &config.geocoder_url,
        &config.user_agent,
        config.request_timeout_secs,
    ) {
        Ok(g) => g,
        Err(e) => {
            tracing::warn!(error = %e, "geocoder unavailable; distance filter disabled");
            return None;
        }
    };

    match geocoder.geocode(address).await {
        Ok(point) => {
            tracing::info!(%address, origin = %point, "distance origin geocoded");
            Some(point)
        }
        Err(e) => {
            let warning = FilterWarning::GeocodeFailed {
                address: address.to_owned(),
            };
            tracing::warn!(error = %e, "{warning}; distance filter disabled");
            None
        }
    }
}

/// # Errors
///
/// Returns an error when the notifier settings are inconsistent (for example
/// Signal delivery without a sender number).
fn build_delivery(config: &AppConfig) -> anyhow::Result<Delivery> {
    let dispatcher = match WebhookNotifier::from_config(config)? {
        Some(notifier) => {
            tracing::info!(
                transport = ?notifier.transport(),
                heartbeat = config.heartbeat,
                "notifications enabled"
            );
            let notifier: Arc<dyn Notifier> = Arc::new(notifier);
            Some(Dispatcher::new(
                notifier,
                Duration::from_millis(config.notify_chunk_delay_ms),
                Duration::from_secs(config.notify_timeout_secs),
            ))
        }
        None => {
            tracing::warn!("SKIPLINE_NOTIFY_URL not set; reports will only be logged");
            None
        }
    };
    Ok(Delivery::new(
        dispatcher,
        config.intro_message.clone(),
        config.base_url.clone(),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal; stopping after the current run");
}
