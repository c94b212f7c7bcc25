//! Report delivery: chunking, pacing, and background dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::chunk::chunk_message;
use crate::error::NotifyError;
use crate::notifier::Notifier;

/// Split `report` to the notifier's limit. `None` stays a single "no
/// matches" signal.
#[must_use]
pub fn plan_messages(notifier: &dyn Notifier, report: Option<&str>) -> Vec<Option<String>> {
    match report {
        None => vec![None],
        Some(text) => match notifier.max_message_len() {
            Some(max) => chunk_message(text, max).into_iter().map(Some).collect(),
            None => vec![Some(text.to_owned())],
        },
    }
}

/// Deliver every planned message, pausing `chunk_delay` between them.
///
/// A failed chunk does not stop the rest.
///
/// # Errors
///
/// Returns [`NotifyError::Partial`] when at least one chunk failed. Each
/// failure is logged as it happens.
pub async fn deliver_report(
    notifier: &dyn Notifier,
    report: Option<&str>,
    chunk_delay: Duration,
) -> Result<usize, NotifyError> {
    let messages = plan_messages(notifier, report);
    let total = messages.len();
    let mut failed = 0usize;

    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(chunk_delay).await;
        }
        match notifier.notify(message.as_deref()).await {
            Ok(()) => tracing::debug!(chunk = i + 1, total, "notification chunk sent"),
            Err(e) => {
                failed += 1;
                tracing::warn!(chunk = i + 1, total, error = %e, "notification chunk failed");
            }
        }
    }

    if failed > 0 {
        return Err(NotifyError::Partial { failed, total });
    }
    Ok(total)
}

/// Fire-and-forget delivery on background tasks.
///
/// Each dispatch gets its own deadline so a stuck transport never holds up
/// the poll loop; [`Dispatcher::drain`] waits for whatever is still running
/// at shutdown.
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    chunk_delay: Duration,
    message_timeout: Duration,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    /// `message_timeout` bounds a single message; a dispatch of `n` chunks
    /// is allowed `n` of those plus the pauses between them.
    pub fn new(
        notifier: Arc<dyn Notifier>,
        chunk_delay: Duration,
        message_timeout: Duration,
    ) -> Self {
        Self {
            notifier,
            chunk_delay,
            message_timeout,
            tasks: JoinSet::new(),
        }
    }

    pub fn dispatch(&mut self, report: Option<String>) {
        self.reap();

        let chunks = plan_messages(self.notifier.as_ref(), report.as_deref()).len();
        let chunks_u32 = u32::try_from(chunks).unwrap_or(u32::MAX);
        let deadline = self
            .message_timeout
            .saturating_mul(chunks_u32)
            .saturating_add(self.chunk_delay.saturating_mul(chunks_u32.saturating_sub(1)));

        let notifier = Arc::clone(&self.notifier);
        let chunk_delay = self.chunk_delay;
        self.tasks.spawn(async move {
            let delivery = deliver_report(notifier.as_ref(), report.as_deref(), chunk_delay);
            match tokio::time::timeout(deadline, delivery).await {
                Ok(Ok(sent)) => tracing::info!(sent, "notification delivered"),
                Ok(Err(e)) => tracing::error!(error = %e, "notification delivery incomplete"),
                Err(_) => tracing::error!(
                    deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                    "notification delivery timed out"
                ),
            }
        });
    }

    /// Number of dispatches not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every in-flight dispatch to finish or hit its deadline.
    pub async fn drain(&mut self) {
        if !self.tasks.is_empty() {
            tracing::info!(in_flight = self.tasks.len(), "waiting for notification dispatches");
        }
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "notification task panicked");
            }
        }
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                tracing::error!(error = %e, "notification task panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "deliver_test.rs"]
mod tests;
