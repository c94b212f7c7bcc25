use thiserror::Error;

use crate::schema::StepKind;

/// Failure of a single step submission.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response carried neither the success nor the error marker.
    #[error("{step} step returned an unrecognized page")]
    TransientMiss { step: StepKind },

    /// The server rendered its application-error page.
    #[error("{step} step hit a server application error")]
    ServerError { step: StepKind },

    #[error("{step} step gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        step: StepKind,
        attempts: u32,
        last: String,
    },
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Step(#[from] StepError),

    /// The step succeeded but its expected content was malformed.
    #[error("failed to parse {context}: {reason}")]
    Parse { context: String, reason: String },

    #[error("journey session aborted: {reason}")]
    SessionAborted { reason: String },

    #[error("journey step {attempted} is not valid in state {state}")]
    OutOfOrder { attempted: StepKind, state: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
