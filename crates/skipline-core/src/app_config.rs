use std::path::PathBuf;

use crate::appointment::AppointmentType;
use crate::filters::FilterSettings;

/// Which webhook payload shape the notification target expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Decide from the URL and Signal settings at startup.
    Auto,
    Discord,
    Signal,
    Ntfy,
}

impl std::fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyKind::Auto => write!(f, "auto"),
            NotifyKind::Discord => write!(f, "discord"),
            NotifyKind::Signal => write!(f, "signal"),
            NotifyKind::Ntfy => write!(f, "ntfy"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub appointment_type: AppointmentType,
    pub locations_path: PathBuf,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub step_max_retries: u32,
    pub step_backoff_ms: u64,
    pub base_interval_secs: u64,
    pub offset_min_secs: i64,
    pub offset_max_secs: i64,
    pub early_alert: bool,
    pub log_level: String,
    pub filters: FilterSettings,
    pub geocoder_url: String,
    pub notify_url: Option<String>,
    pub notify_kind: NotifyKind,
    pub signal_number: Option<String>,
    pub signal_group: Option<String>,
    pub heartbeat: bool,
    pub intro_message: String,
    pub notify_max_len: usize,
    pub notify_chunk_delay_ms: u64,
    pub notify_timeout_secs: u64,
}

impl AppConfig {
    /// Resolve [`NotifyKind::Auto`] against the configured target.
    #[must_use]
    pub fn effective_notify_kind(&self) -> NotifyKind {
        match self.notify_kind {
            NotifyKind::Auto => {
                let is_ntfy = self
                    .notify_url
                    .as_deref()
                    .is_some_and(|u| u.to_ascii_lowercase().contains("ntfy"));
                if is_ntfy {
                    NotifyKind::Ntfy
                } else if self.signal_number.is_some() {
                    NotifyKind::Signal
                } else {
                    NotifyKind::Discord
                }
            }
            explicit => explicit,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("appointment_type", &self.appointment_type)
            .field("locations_path", &self.locations_path)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("step_max_retries", &self.step_max_retries)
            .field("step_backoff_ms", &self.step_backoff_ms)
            .field("base_interval_secs", &self.base_interval_secs)
            .field("offset_min_secs", &self.offset_min_secs)
            .field("offset_max_secs", &self.offset_max_secs)
            .field("early_alert", &self.early_alert)
            .field("log_level", &self.log_level)
            .field("filters", &self.filters)
            .field("geocoder_url", &self.geocoder_url)
            .field("notify_url", &self.notify_url.as_ref().map(|_| "[redacted]"))
            .field("notify_kind", &self.notify_kind)
            .field(
                "signal_number",
                &self.signal_number.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "signal_group",
                &self.signal_group.as_ref().map(|_| "[redacted]"),
            )
            .field("heartbeat", &self.heartbeat)
            .field("intro_message", &self.intro_message)
            .field("notify_max_len", &self.notify_max_len)
            .field("notify_chunk_delay_ms", &self.notify_chunk_delay_ms)
            .field("notify_timeout_secs", &self.notify_timeout_secs)
            .finish()
    }
}
