use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use skipline_core::{AppConfig, NotifyKind};

use crate::error::NotifyError;

/// Sent on an empty run when heartbeat mode is on.
pub const HEARTBEAT_MESSAGE: &str = "No appointments found at this time matching your criteria.";

const NTFY_TITLE: &str = "NCDMV Appointments";

/// Outbound notification capability.
///
/// `notify(None)` means the run found nothing; whether that produces a
/// message is up to the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message could not be delivered.
    async fn notify(&self, message: Option<&str>) -> Result<(), NotifyError>;

    /// Largest message the transport accepts, in characters. `None` means
    /// unbounded and the report is sent whole.
    fn max_message_len(&self) -> Option<usize>;
}

/// Payload shape of the webhook target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// `{"content": ...}` per message.
    Discord,
    /// signal-cli REST bridge: `{"number", "message", "recipients"}`.
    Signal {
        number: String,
        recipients: Vec<String>,
    },
    /// Plain-text body with markdown and title headers.
    Ntfy,
}

/// Webhook-backed [`Notifier`].
pub struct WebhookNotifier {
    client: Client,
    url: String,
    transport: Transport,
    heartbeat: bool,
    max_len: usize,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        url: impl Into<String>,
        transport: Transport,
        heartbeat: bool,
        max_len: usize,
        timeout_secs: u64,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            transport,
            heartbeat,
            max_len,
        })
    }

    /// Build from application config. Returns `Ok(None)` when no
    /// notification URL is configured.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidConfig`] when Signal delivery is
    /// requested without a sender number.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, NotifyError> {
        let Some(url) = config.notify_url.as_deref() else {
            return Ok(None);
        };

        let transport = match config.effective_notify_kind() {
            NotifyKind::Ntfy => Transport::Ntfy,
            NotifyKind::Signal => {
                let number = config.signal_number.clone().ok_or_else(|| {
                    NotifyError::InvalidConfig(
                        "signal delivery needs SKIPLINE_SIGNAL_NUMBER".to_owned(),
                    )
                })?;
                let recipient = config
                    .signal_group
                    .clone()
                    .unwrap_or_else(|| number.clone());
                let recipients = vec![recipient];
                Transport::Signal { number, recipients }
            }
            NotifyKind::Discord | NotifyKind::Auto => Transport::Discord,
        };

        Self::new(
            url,
            transport,
            config.heartbeat,
            config.notify_max_len,
            config.notify_timeout_secs,
        )
        .map(Some)
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let request = match &self.transport {
            Transport::Discord => self
                .client
                .post(&self.url)
                .json(&serde_json::json!({ "content": text })),
            Transport::Signal { number, recipients } => {
                self.client.post(&self.url).json(&serde_json::json!({
                    "number": number,
                    "message": text,
                    "recipients": recipients,
                }))
            }
            Transport::Ntfy => self
                .client
                .post(&self.url)
                .header("Markdown", "yes")
                .header("Title", NTFY_TITLE)
                .body(text.to_owned()),
        };

        request.send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: Option<&str>) -> Result<(), NotifyError> {
        match message {
            Some(text) => self.send(text).await,
            None if self.heartbeat => {
                tracing::info!("sending heartbeat notification");
                self.send(HEARTBEAT_MESSAGE).await
            }
            None => {
                tracing::debug!("no matches and heartbeat disabled; nothing sent");
                Ok(())
            }
        }
    }

    fn max_message_len(&self) -> Option<usize> {
        match self.transport {
            Transport::Ntfy => None,
            Transport::Discord | Transport::Signal { .. } => Some(self.max_len),
        }
    }
}
