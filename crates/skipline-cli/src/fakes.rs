//! In-memory stand-ins for the remote journey and the notifier.

use std::sync::Mutex;

use async_trait::async_trait;
use skipline_core::{parse_locations, AppointmentType, FilterConfig};
use skipline_notify::{Notifier, NotifyError};
use skipline_scraper::{JourneyNavigator, StepError, StepExecutor, StepKind, StepRequest};

use crate::run::Watcher;

/// Four offices: A and B are complete, C has only a placeholder journey,
/// D has no unit id.
pub(crate) const BOOK: &str = r#"{
    "fjbase": "BASE",
    "A": {
        "id": 1,
        "address": "1 A St",
        "coordinates": [35.7796, -78.6382],
        "formJourneys": {"formJourney8": {"journeyContent": "TOK-A"}}
    },
    "B": {
        "id": 2,
        "address": "2 B St",
        "coordinates": [36.0726, -79.7920],
        "formJourneys": {"formJourney8": {"journeyContent": "TOK-B"}}
    },
    "C": {
        "id": 3,
        "address": "3 C St",
        "coordinates": [35.2271, -80.8431],
        "formJourneys": {"formJourney8": {"journeyContent": "Placeholder: not gathered"}}
    },
    "D": {
        "address": "4 D St",
        "coordinates": [35.9940, -78.8986],
        "formJourneys": {"formJourney8": {"journeyContent": "TOK-D"}}
    }
}"#;

type Responder = Box<dyn Fn(&StepRequest) -> Result<String, StepError> + Send + Sync>;

/// Answers each step from a closure and records what was submitted.
pub(crate) struct FakeExecutor {
    respond: Responder,
    seen: Mutex<Vec<StepRequest>>,
}

impl FakeExecutor {
    pub(crate) fn new(
        respond: impl Fn(&StepRequest) -> Result<String, StepError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn seen(&self) -> Vec<StepRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepExecutor for FakeExecutor {
    async fn execute_step(&self, request: &StepRequest) -> Result<String, StepError> {
        self.seen.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

pub(crate) fn active_page(names: &[&str]) -> String {
    let items: String = names
        .iter()
        .map(|n| {
            format!(r#"<div class="QflowObjectItem Active-Unit"><div><div>{n}</div></div></div>"#)
        })
        .collect();
    format!("<input name=\"UnitIdList\">{items}")
}

pub(crate) fn days_page(days: &[&str]) -> String {
    let quoted: Vec<String> = days.iter().map(|d| format!("\"{d}\"")).collect();
    format!("<script>var Dates = [{}];</script>", quoted.join(","))
}

pub(crate) fn times_page(stamps: &[&str]) -> String {
    let options: String = stamps
        .iter()
        .map(|s| format!(r#"<option data-datetime="{s}">{s}</option>"#))
        .collect();
    format!("<select><option>Pick a time</option>{options}</select>")
}

/// A and B active; A has one day with a duplicated 9:00, B has no days.
pub(crate) fn scenario_executor() -> FakeExecutor {
    FakeExecutor::new(|req| match req.kind {
        StepKind::ListLocations => Ok(active_page(&["A", "B"])),
        StepKind::ListDays => match req.field("StepControls[3].Model.Value") {
            Some("1") => Ok(days_page(&["2025-08-01"])),
            _ => Ok(days_page(&[])),
        },
        StepKind::ListTimes => Ok(times_page(&[
            "8/1/2025 9:00:00 AM",
            "8/1/2025 9:00:00 AM",
            "8/1/2025 10:30:00 AM",
        ])),
    })
}

pub(crate) fn motorcycle() -> AppointmentType {
    AppointmentType::from_label("Motorcycle Skills Test").unwrap()
}

pub(crate) fn watcher(executor: FakeExecutor, filters: FilterConfig) -> Watcher<FakeExecutor> {
    let book = parse_locations(BOOK, "test").unwrap();
    Watcher::new(
        JourneyNavigator::new(executor, "https://example.test"),
        book,
        motorcycle(),
        filters,
    )
}

/// Records every message it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<Option<String>>>,
}

impl RecordingNotifier {
    pub(crate) fn sent(&self) -> Vec<Option<String>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: Option<&str>) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.map(str::to_owned));
        Ok(())
    }

    fn max_message_len(&self) -> Option<usize> {
        None
    }
}
