//! Journey navigation over the three-step remote workflow.
//!
//! Type selection runs against the shared base token and is stateless. Each
//! per-location probe owns a [`JourneySession`] that threads the continuation
//! token from the day step into every time step, refreshing it whenever a
//! page hands out a new one.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use crate::error::ScraperError;
use crate::extract::{
    extract_journey_token, parse_active_locations, parse_available_days, parse_time_slots,
};
use crate::schema::{StepKind, StepRequest};
use crate::step::StepExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JourneyState {
    ListingDays,
    ListingTimes { last_day: Option<NaiveDate> },
    Done,
    Aborted { reason: String },
}

impl std::fmt::Display for JourneyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JourneyState::ListingDays => write!(f, "listing-days"),
            JourneyState::ListingTimes { last_day: None } => write!(f, "listing-times"),
            JourneyState::ListingTimes {
                last_day: Some(day),
            } => write!(f, "listing-times({day})"),
            JourneyState::Done => write!(f, "done"),
            JourneyState::Aborted { reason } => write!(f, "aborted({reason})"),
        }
    }
}

/// Ephemeral state of one location probe. Never shared between locations.
#[derive(Debug, Clone)]
pub struct JourneySession {
    location: String,
    unit_id: String,
    token: String,
    state: JourneyState,
}

impl JourneySession {
    /// Start a probe for `location` from its stored journey content.
    #[must_use]
    pub fn for_location(
        location: impl Into<String>,
        unit_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            unit_id: unit_id.into(),
            token: token.into(),
            state: JourneyState::ListingDays,
        }
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn state(&self) -> &JourneyState {
        &self.state
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self.state, JourneyState::Aborted { .. })
    }

    /// Mark the probe finished. An aborted session stays aborted.
    pub fn finish(&mut self) {
        if !self.is_aborted() {
            self.state = JourneyState::Done;
        }
    }

    fn abort(&mut self, reason: String) {
        tracing::warn!(location = %self.location, %reason, "journey session aborted");
        self.state = JourneyState::Aborted { reason };
    }

    fn refresh_token(&mut self, body: &str) {
        if let Some(next) = extract_journey_token(body) {
            if next != self.token {
                tracing::debug!(location = %self.location, "journey token refreshed");
                self.token = next;
            }
        }
    }

    fn out_of_order(&self, attempted: StepKind) -> ScraperError {
        match &self.state {
            JourneyState::Aborted { reason } => ScraperError::SessionAborted {
                reason: reason.clone(),
            },
            state => ScraperError::OutOfOrder {
                attempted,
                state: state.to_string(),
            },
        }
    }
}

/// Drives the remote journey through a [`StepExecutor`].
pub struct JourneyNavigator<E> {
    executor: E,
    base_url: String,
}

impl<E: StepExecutor> JourneyNavigator<E> {
    pub fn new(executor: E, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into(),
        }
    }

    /// Build a navigator after checking that `base_url` is an absolute
    /// http(s) origin.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] when the URL does not parse or
    /// uses another scheme.
    pub fn checked(executor: E, base_url: &str) -> Result<Self, ScraperError> {
        let invalid = |reason: String| ScraperError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        };
        let parsed = reqwest::Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        Ok(Self::new(executor, base_url.trim_end_matches('/')))
    }

    #[must_use]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Submit the type-selection step and read which offices are open.
    ///
    /// Zero active offices is a valid, empty result.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Step`] if the step fails terminally or exhausts
    /// its retries.
    pub async fn list_active_locations(
        &self,
        type_id: u8,
        base_token: &str,
    ) -> Result<BTreeSet<String>, ScraperError> {
        let request = StepRequest::list_locations(&self.base_url, type_id, base_token);
        let body = self.executor.execute_step(&request).await?;
        let active = parse_active_locations(&body);
        tracing::info!(type_id, count = active.len(), "active locations listed");
        Ok(active)
    }

    /// Submit the day-listing step for the session's office.
    ///
    /// Any failure aborts the session; no time step can follow.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::OutOfOrder`] / [`ScraperError::SessionAborted`] if the
    ///   session is not waiting on the day step.
    /// - [`ScraperError::Step`] if the step fails.
    /// - [`ScraperError::Parse`] if the embedded date array is malformed.
    pub async fn list_available_days(
        &self,
        session: &mut JourneySession,
    ) -> Result<Vec<NaiveDate>, ScraperError> {
        if session.state != JourneyState::ListingDays {
            return Err(session.out_of_order(StepKind::ListDays));
        }

        let request = StepRequest::list_days(&self.base_url, &session.unit_id, &session.token);
        let body = match self.executor.execute_step(&request).await {
            Ok(body) => body,
            Err(e) => {
                session.abort(e.to_string());
                return Err(e.into());
            }
        };
        session.refresh_token(&body);

        match parse_available_days(&body) {
            Ok(days) => {
                tracing::debug!(location = %session.location, count = days.len(), "days listed");
                session.state = JourneyState::ListingTimes { last_day: None };
                Ok(days)
            }
            Err(e) => {
                session.abort(e.to_string());
                Err(e)
            }
        }
    }

    /// Submit the time-listing step for `date`.
    ///
    /// A failure here only empties this day; the session stays usable for
    /// the next one.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::OutOfOrder`] / [`ScraperError::SessionAborted`] if days
    ///   have not been listed yet or the session was aborted.
    /// - [`ScraperError::Step`] if the step fails.
    pub async fn list_times_for_day(
        &self,
        session: &mut JourneySession,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, ScraperError> {
        if !matches!(session.state, JourneyState::ListingTimes { .. }) {
            return Err(session.out_of_order(StepKind::ListTimes));
        }
        session.state = JourneyState::ListingTimes {
            last_day: Some(date),
        };

        let request = StepRequest::list_times(&self.base_url, date, &session.token);
        let body = self.executor.execute_step(&request).await?;
        session.refresh_token(&body);

        let times = parse_time_slots(&body);
        tracing::debug!(location = %session.location, %date, count = times.len(), "times listed");
        Ok(times)
    }
}

#[cfg(test)]
#[path = "journey_test.rs"]
mod tests;
