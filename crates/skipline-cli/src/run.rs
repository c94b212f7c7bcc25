//! One probe of the remote journey across every candidate location.
//!
//! A run never fails as a whole: a location whose day listing breaks is
//! treated as having no days, and a day whose time listing breaks is treated
//! as having no times.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use skipline_core::{distance_filter, AppointmentType, FilterConfig, LocationBook, SlotCandidate};
use skipline_scraper::{JourneyNavigator, JourneySession, StepExecutor};

/// How a run treats its first match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunMode {
    /// Visit every candidate and report everything found.
    Exhaustive,
    /// Stop at the first matched slot so it can be alerted on immediately.
    EarlyAlert,
}

/// Matched slots of one run, grouped by location.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RunReport {
    slots: BTreeMap<String, BTreeSet<NaiveDateTime>>,
    truncated: bool,
}

impl RunReport {
    pub(crate) fn add(&mut self, slot: &SlotCandidate) {
        self.slots
            .entry(slot.location.clone())
            .or_default()
            .insert(slot.timestamp());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.values().map(BTreeSet::len).sum()
    }

    /// `true` when the run stopped early at its first match.
    pub(crate) fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Earliest slot of the alphabetically first location.
    pub(crate) fn first_match(&self) -> Option<(&str, NaiveDateTime)> {
        self.slots
            .iter()
            .find_map(|(name, times)| times.first().map(|t| (name.as_str(), *t)))
    }

    /// Report body, one block per location, or `None` when nothing matched.
    pub(crate) fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let blocks: Vec<String> = self
            .slots
            .iter()
            .map(|(name, times)| {
                let mut block = format!("**Location: {name}**\n");
                for t in times {
                    block.push_str(&format!("*  {},\n", format_slot(*t)));
                }
                block
            })
            .collect();
        Some(blocks.join("\n").trim().to_owned())
    }

    /// Full outbound message: the intro line followed by the body.
    pub(crate) fn message(&self, intro: &str) -> Option<String> {
        self.render()
            .map(|body| format!("{}\n{body}", intro.trim_end()))
    }
}

/// `8/1/2025 9:00:00 AM`: no zero padding on month, day, or hour.
pub(crate) fn format_slot(t: NaiveDateTime) -> String {
    t.format("%-m/%-d/%Y %-I:%M:%S %p").to_string()
}

/// Everything a run needs; immutable between runs.
pub(crate) struct Watcher<E> {
    navigator: JourneyNavigator<E>,
    book: LocationBook,
    appointment_type: AppointmentType,
    filters: FilterConfig,
    within_distance: Option<BTreeSet<String>>,
}

impl<E: StepExecutor> Watcher<E> {
    pub(crate) fn new(
        navigator: JourneyNavigator<E>,
        book: LocationBook,
        appointment_type: AppointmentType,
        filters: FilterConfig,
    ) -> Self {
        let within_distance = filters
            .distance
            .map(|d| distance_filter(d.origin, d.radius_miles, &book));
        if within_distance.as_ref().is_some_and(BTreeSet::is_empty) {
            tracing::warn!("distance filter is active but no known location is in range");
        }
        Self {
            navigator,
            book,
            appointment_type,
            filters,
            within_distance,
        }
    }

    pub(crate) fn appointment_type(&self) -> AppointmentType {
        self.appointment_type
    }

    /// Locations worth a detailed probe this run, in name order.
    ///
    /// When the active-location step fails the run falls back to the
    /// distance-filtered set, or to every known location when distance
    /// filtering is off.
    pub(crate) async fn candidate_locations(&self) -> BTreeSet<String> {
        let active = self
            .navigator
            .list_active_locations(self.appointment_type.id, &self.book.base_journey)
            .await;

        match (active, &self.within_distance) {
            (Ok(active), Some(allowed)) => active.intersection(allowed).cloned().collect(),
            (Ok(active), None) => active,
            (Err(e), Some(allowed)) => {
                tracing::warn!(
                    error = %e,
                    "active locations unavailable; using distance-filtered set"
                );
                allowed.clone()
            }
            (Err(e), None) => {
                tracing::warn!(
                    error = %e,
                    "active locations unavailable; checking all known locations"
                );
                self.book.names().map(str::to_owned).collect()
            }
        }
    }

    pub(crate) async fn run(&self, mode: RunMode) -> RunReport {
        let candidates = self.candidate_locations().await;
        tracing::info!(
            appointment_type = %self.appointment_type,
            candidates = candidates.len(),
            "checking candidate locations"
        );

        let journey_key = self.appointment_type.journey_key();
        let mut report = RunReport::default();

        for name in &candidates {
            let Some(location) = self.book.get(name) else {
                tracing::warn!(location = %name, "active location missing from reference data");
                continue;
            };
            let (Some(unit_id), Some(token)) =
                (location.unit_id(), location.journey_content(&journey_key))
            else {
                tracing::debug!(location = %name, %journey_key, "no journey recorded; skipping");
                continue;
            };

            let mut session = JourneySession::for_location(name.as_str(), unit_id, token);
            if self.probe_location(&mut session, &mut report, mode).await {
                report.truncated = true;
                tracing::info!(location = %name, "first match found; ending run early");
                break;
            }
        }

        tracing::info!(
            locations = report.slots.len(),
            slots = report.slot_count(),
            "run finished"
        );
        report
    }

    /// Probe one location into `report`. Returns `true` if the run should
    /// stop here.
    async fn probe_location(
        &self,
        session: &mut JourneySession,
        report: &mut RunReport,
        mode: RunMode,
    ) -> bool {
        let location = session.location().to_owned();
        let days = match self.navigator.list_available_days(session).await {
            Ok(days) => days,
            Err(e) => {
                tracing::warn!(
                    location = %location,
                    error = %e,
                    "day listing failed; treating as no days"
                );
                return false;
            }
        };

        let (wanted, skipped): (Vec<_>, Vec<_>) =
            days.into_iter().partition(|d| self.filters.date_matches(*d));
        if !skipped.is_empty() {
            tracing::debug!(
                location = %location,
                skipped = skipped.len(),
                "days outside date range"
            );
        }

        for date in wanted {
            let times = match self.navigator.list_times_for_day(session, date).await {
                Ok(times) => times,
                Err(e) => {
                    tracing::warn!(
                        location = %location,
                        %date,
                        error = %e,
                        "time listing failed; skipping day"
                    );
                    continue;
                }
            };

            for time in times {
                let slot = SlotCandidate {
                    location: location.clone(),
                    date,
                    time,
                };
                if self.filters.matches(&slot) {
                    report.add(&slot);
                    if mode == RunMode::EarlyAlert {
                        session.finish();
                        return true;
                    }
                }
            }
        }

        session.finish();
        false
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
