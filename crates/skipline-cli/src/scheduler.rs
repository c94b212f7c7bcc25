//! Poll loop: run, hand the report off, sleep with jitter, repeat.
//!
//! Runs are isolated on their own task so nothing inside one can end the
//! loop. Only the shutdown channel does, and it is only checked between runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rand::Rng;
use skipline_notify::Dispatcher;
use skipline_scraper::StepExecutor;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::run::{format_slot, RunMode, RunReport, Watcher};

/// Base interval and jitter bounds, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollTiming {
    pub base_interval_secs: u64,
    pub offset_min_secs: i64,
    pub offset_max_secs: i64,
}

impl PollTiming {
    /// Inverted jitter bounds collapse to the minimum as a fixed offset.
    pub(crate) fn new(
        base_interval_secs: u64,
        offset_min_secs: i64,
        offset_max_secs: i64,
    ) -> Self {
        let offset_max_secs = if offset_min_secs > offset_max_secs {
            tracing::warn!(
                offset_min_secs,
                offset_max_secs,
                "jitter minimum exceeds maximum; using the minimum as a fixed offset"
            );
            offset_min_secs
        } else {
            offset_max_secs
        };
        Self {
            base_interval_secs,
            offset_min_secs,
            offset_max_secs,
        }
    }
}

/// `base + uniform(offset_min, offset_max)`, never below one second.
pub(crate) fn sleep_duration<R: Rng>(timing: PollTiming, rng: &mut R) -> Duration {
    #[allow(clippy::cast_precision_loss)]
    let (base, lo, hi) = (
        timing.base_interval_secs as f64,
        timing.offset_min_secs as f64,
        timing.offset_max_secs as f64,
    );
    let offset = if lo < hi { rng.random_range(lo..=hi) } else { lo };
    Duration::try_from_secs_f64((base + offset).max(1.0)).unwrap_or(Duration::MAX)
}

/// Observability only; scheduling never reads these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunStats {
    pub runs: u32,
    pub total: Duration,
}

impl RunStats {
    pub(crate) fn record(&mut self, elapsed: Duration) {
        self.runs = self.runs.saturating_add(1);
        self.total = self.total.saturating_add(elapsed);
    }

    pub(crate) fn average(&self) -> Option<Duration> {
        (self.runs > 0).then(|| self.total / self.runs)
    }
}

/// Turns run reports into outbound messages.
pub(crate) struct Delivery {
    dispatcher: Option<Dispatcher>,
    intro: String,
    alert_link: String,
}

impl Delivery {
    /// `dispatcher = None` logs reports without sending anything.
    pub(crate) fn new(dispatcher: Option<Dispatcher>, intro: String, alert_link: String) -> Self {
        Self {
            dispatcher,
            intro,
            alert_link,
        }
    }

    /// Hand `report` off. A truncated report is sent as an urgent alert for
    /// its first match instead of a full listing.
    pub(crate) fn deliver(&mut self, report: &RunReport) {
        let message = match report.first_match() {
            Some((location, slot)) if report.is_truncated() => {
                Some(alert_message(&self.alert_link, location, slot))
            }
            _ => report.message(&self.intro),
        };

        match &message {
            Some(text) => println!("{text}"),
            None => tracing::info!("no matching appointments this run"),
        }

        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.dispatch(message);
        }
    }

    /// Wait for in-flight notifications before exit.
    pub(crate) async fn drain(&mut self) {
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            dispatcher.drain().await;
        }
    }
}

fn alert_message(link: &str, location: &str, slot: NaiveDateTime) -> String {
    format!(
        "NEW APPOINTMENTS ARRIVING\n\n{link}\n**Location: {location}**\n*  {},",
        format_slot(slot)
    )
}

/// One run on its own task. A panic inside becomes an empty report.
pub(crate) async fn run_isolated<E>(watcher: &Arc<Watcher<E>>, mode: RunMode) -> RunReport
where
    E: StepExecutor + 'static,
{
    let watcher = Arc::clone(watcher);
    match tokio::spawn(async move { watcher.run(mode).await }).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "run failed; treating as no matches");
            RunReport::default()
        }
    }
}

/// Poll until `shutdown` flips to `true` (or its sender goes away).
pub(crate) async fn watch_loop<E>(
    watcher: Arc<Watcher<E>>,
    delivery: &mut Delivery,
    timing: PollTiming,
    mode: RunMode,
    mut shutdown: watch::Receiver<bool>,
) -> RunStats
where
    E: StepExecutor + 'static,
{
    let mut stats = RunStats::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let started = Instant::now();
        tracing::info!(run = stats.runs + 1, "run starting");
        let report = run_isolated(&watcher, mode).await;
        let elapsed = started.elapsed();
        stats.record(elapsed);
        delivery.deliver(&report);

        let nap = sleep_duration(timing, &mut rand::rng());
        tracing::info!(
            runs = stats.runs,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            average_ms = stats
                .average()
                .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            next_check_secs = nap.as_secs(),
            "run complete; sleeping"
        );

        let sender_gone = tokio::select! {
            () = tokio::time::sleep(nap) => false,
            changed = shutdown.changed() => changed.is_err(),
        };
        if sender_gone {
            break;
        }
    }

    if let Some(average) = stats.average() {
        tracing::info!(
            runs = stats.runs,
            average_ms = u64::try_from(average.as_millis()).unwrap_or(u64::MAX),
            "poll loop stopped"
        );
    }
    stats
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
