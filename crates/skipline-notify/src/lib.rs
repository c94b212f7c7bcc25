//! Outbound notifications for appointment reports.
//!
//! Reports are split to the transport's length limit and delivered over a
//! webhook (Discord, a Signal REST bridge, or ntfy). [`Dispatcher`] runs
//! deliveries in the background so the poll loop never waits on them.

pub mod chunk;
pub mod deliver;
pub mod error;
pub mod notifier;

pub use chunk::{chunk_message, SPLIT_MARKER};
pub use deliver::{deliver_report, plan_messages, Dispatcher};
pub use error::NotifyError;
pub use notifier::{Notifier, Transport, WebhookNotifier, HEARTBEAT_MESSAGE};
