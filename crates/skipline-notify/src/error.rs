use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid notifier configuration: {0}")]
    InvalidConfig(String),

    #[error("{failed} of {total} notification chunks failed")]
    Partial { failed: usize, total: usize },
}
