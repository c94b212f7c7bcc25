use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{ScraperError, StepError};
use crate::retry::retry_with_backoff;
use crate::schema::{StepRequest, SERVER_ERROR_MARKER};

/// How a step response body reads once sniffed for markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    TransientMiss,
    TerminalError,
}

/// Classify a response body. The application-error marker wins over the
/// success marker because the error page can echo form content back.
#[must_use]
pub fn classify_response(body: &str, expected_marker: &str) -> ResponseClass {
    if body.contains(SERVER_ERROR_MARKER) {
        ResponseClass::TerminalError
    } else if body.contains(expected_marker) {
        ResponseClass::Success
    } else {
        ResponseClass::TransientMiss
    }
}

/// Transport for one step of the remote journey.
///
/// Implementations return the raw page body only once it has been
/// recognized as the step's expected content.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// # Errors
    ///
    /// - [`StepError::ServerError`]: the server rendered its error page.
    /// - [`StepError::RetryExhausted`]: the retry budget ran out on network
    ///   faults or unrecognized pages.
    async fn execute_step(&self, request: &StepRequest) -> Result<String, StepError>;
}

/// Form-POST step executor over `reqwest`.
///
/// HTTP status codes are ignored: the remote engine returns 200 for its own
/// error page and occasionally non-2xx for pages that carry valid content, so
/// the body markers are the only success signal.
pub struct HttpStepExecutor {
    client: Client,
    /// Additional attempts after the first failure.
    max_retries: u32,
    backoff: Duration,
}

impl HttpStepExecutor {
    /// # Errors
    ///
    /// Returns [`ScraperError::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_ms: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(ScraperError::Client)?;
        Ok(Self {
            client,
            max_retries,
            backoff: Duration::from_millis(backoff_ms),
        })
    }

    async fn attempt(&self, request: &StepRequest) -> Result<String, StepError> {
        let response = self
            .client
            .post(&request.url)
            .query(&request.query)
            .form(&request.form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        match classify_response(&body, request.kind.success_marker()) {
            ResponseClass::Success => Ok(body),
            ResponseClass::TerminalError => Err(StepError::ServerError { step: request.kind }),
            ResponseClass::TransientMiss => {
                tracing::debug!(
                    step = %request.kind,
                    status = status.as_u16(),
                    body_len = body.len(),
                    "step response missing expected marker"
                );
                Err(StepError::TransientMiss { step: request.kind })
            }
        }
    }
}

#[async_trait]
impl StepExecutor for HttpStepExecutor {
    async fn execute_step(&self, request: &StepRequest) -> Result<String, StepError> {
        let step = request.kind;
        tracing::debug!(%step, url = %request.url, "submitting step");
        retry_with_backoff(step, self.max_retries, self.backoff, || self.attempt(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_success() {
        assert_eq!(
            classify_response("<div>UnitIdList</div>", "UnitIdList"),
            ResponseClass::Success
        );
    }

    #[test]
    fn classify_error_marker_wins() {
        let body = format!("{SERVER_ERROR_MARKER} UnitIdList");
        assert_eq!(
            classify_response(&body, "UnitIdList"),
            ResponseClass::TerminalError
        );
    }

    #[test]
    fn classify_neither_is_transient() {
        assert_eq!(
            classify_response("<html>loading</html>", "var Dates"),
            ResponseClass::TransientMiss
        );
        assert_eq!(classify_response("", "var Dates"), ResponseClass::TransientMiss);
    }
}
