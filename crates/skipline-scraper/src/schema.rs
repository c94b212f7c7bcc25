//! Fixed step schema of the remote appointment workflow.
//!
//! Every step is a form POST carrying the step id, the current
//! `formJourney` continuation token, and a list of `StepControls[i].*`
//! fields describing each control on the page. Exactly one control per step
//! carries a variable `Model.Value`; everything else is structural and never
//! changes between requests.

use chrono::NaiveDate;
use uuid::{uuid, Uuid};

/// Path of the page-advancing endpoint shared by the location and day steps.
pub const INDEX_PATH: &str = "/Webapp/Appointment/Index/a7ade79b-996d-4971-8766-97feb75254de";
/// Path of the partial-refresh endpoint used by the time step.
pub const AMEND_PATH: &str = "/Webapp/Appointment/AmendStep";

/// Body substring the server renders for any unhandled failure.
pub const SERVER_ERROR_MARKER: &str = "<title>500 Application Error</title>";

pub const DATES_START_MARKER: &str = "var Dates = ";
pub const DATES_END_MARKER: &str = "];";

const ENGINE_ASSEMBLY: &str = "OABSEngine, Version=2.29.47.104, Culture=neutral, PublicKeyToken=null";

const TYPE_STEP_ID: Uuid = uuid!("09004482-03df-4378-bce7-b39db9dc7711");
const DAY_STEP_ID: Uuid = uuid!("d7147c7b-b911-44a1-9ebd-809506b78cae");
const TIME_STEP_ID: Uuid = uuid!("34cc0d43-4c99-42ea-abec-e639d2e1180b");

const LOCATION_LIST_SUBSTEP_ID: Uuid = uuid!("418e99e5-dd8c-4dc0-b25b-6504ca5217f6");

pub const CALENDAR_CONTROL_ID: Uuid = uuid!("919c2e66-f9d4-44a3-9a11-c271d12d8f3c");
pub const TIME_SLOT_CONTROL_ID: Uuid = uuid!("39f2cb09-28e2-41bf-9f8e-8c8057cbdb93");

/// The three steps this client drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Submit the appointment type; the response lists every office.
    ListLocations,
    /// Submit the office unit id; the response embeds the open dates.
    ListDays,
    /// Submit a date; the response lists the open time slots.
    ListTimes,
}

impl StepKind {
    /// Substring proving the step rendered the content we asked for.
    #[must_use]
    pub fn success_marker(self) -> &'static str {
        match self {
            StepKind::ListLocations => "UnitIdList",
            StepKind::ListDays => "var Dates",
            StepKind::ListTimes => "data-datetime",
        }
    }

    fn step_id(self) -> Uuid {
        match self {
            StepKind::ListLocations => TYPE_STEP_ID,
            StepKind::ListDays => DAY_STEP_ID,
            StepKind::ListTimes => TIME_STEP_ID,
        }
    }

    fn path(self) -> &'static str {
        match self {
            StepKind::ListLocations | StepKind::ListDays => INDEX_PATH,
            StepKind::ListTimes => AMEND_PATH,
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::ListLocations => write!(f, "list-locations"),
            StepKind::ListDays => write!(f, "list-days"),
            StepKind::ListTimes => write!(f, "list-times"),
        }
    }
}

/// One control on a step page.
struct Control {
    model: &'static str,
    id: Uuid,
    /// Additional structural field, e.g. `FieldName` or `Step.StepId`.
    extra: Option<(&'static str, String)>,
    /// Whether this control receives the step's variable value.
    carries_value: bool,
}

impl Control {
    fn plain(model: &'static str, id: Uuid) -> Self {
        Self {
            model,
            id,
            extra: None,
            carries_value: false,
        }
    }

    fn valued(model: &'static str, id: Uuid) -> Self {
        Self {
            carries_value: true,
            ..Self::plain(model, id)
        }
    }

    fn with_extra(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.extra = Some((field, value.into()));
        self
    }
}

fn controls_for(kind: StepKind) -> Vec<Control> {
    match kind {
        StepKind::ListLocations => vec![
            Control::valued("QFlowObjectModel", uuid!("7225b493-d89c-4c14-b670-3f9c5bb24645"))
                .with_extra("FieldName", "ApptTypeIdPreUnit"),
            Control::plain("ListItemModel", uuid!("ede2f6a3-ff89-4412-b382-8cd2e4ff10d3"))
                .with_extra("Step.StepId", LOCATION_LIST_SUBSTEP_ID.to_string()),
            Control::plain(
                "CustomerLocationModel",
                uuid!("2e1c2c27-af0d-40d2-b350-eacdb995d6dd"),
            ),
        ],
        StepKind::ListDays => vec![
            Control::plain("ListItemModel", uuid!("ab66e42f-812f-4cdf-90fd-55456865e085")),
            Control::plain("StringModel", uuid!("aa34462f-6355-4518-82b1-bdf84f068dfa")),
            Control::plain("ListItemModel", uuid!("d9eb34df-9d86-4730-ae38-694b51ae2785")),
            Control::valued("QFlowObjectModel", uuid!("f758c6da-46ae-4e42-bb78-84fecb432a90")),
            Control::plain("ListItemModel", uuid!("b556eac8-0619-42e9-89cc-5a003b646092")),
        ],
        StepKind::ListTimes => vec![
            Control::plain("ListItemModel", uuid!("da1fb91a-c5cb-487f-b293-44c71ffeb1ec")),
            Control::plain("ListItemModel", uuid!("547650da-008d-4fd0-a164-31a489a44e94")),
            Control::valued("CalendarDateModel", CALENDAR_CONTROL_ID),
            Control::plain("TimeSlotModel", TIME_SLOT_CONTROL_ID),
            Control::plain("ListItemModel", uuid!("fc6c2f34-0580-4a8a-8c0b-dbb316e1a6d7")),
        ],
    }
}

/// A fully-built step submission, independent of transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    pub kind: StepKind,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl StepRequest {
    /// Type-selection step; `type_id` is the appointment type's numeric id.
    #[must_use]
    pub fn list_locations(base_url: &str, type_id: u8, journey_token: &str) -> Self {
        Self::build(base_url, StepKind::ListLocations, journey_token, &type_id.to_string())
    }

    /// Day-listing step for one office.
    #[must_use]
    pub fn list_days(base_url: &str, unit_id: &str, journey_token: &str) -> Self {
        Self::build(base_url, StepKind::ListDays, journey_token, unit_id)
    }

    /// Time-listing step for one date at the office the token is bound to.
    #[must_use]
    pub fn list_times(base_url: &str, date: NaiveDate, journey_token: &str) -> Self {
        let mut request = Self::build(
            base_url,
            StepKind::ListTimes,
            journey_token,
            &date.format("%Y-%m-%d").to_string(),
        );
        request.query = vec![
            (
                "stepControlTriggerId".to_owned(),
                CALENDAR_CONTROL_ID.to_string(),
            ),
            (
                "targetStepControlId".to_owned(),
                TIME_SLOT_CONTROL_ID.to_string(),
            ),
        ];
        request
    }

    fn build(base_url: &str, kind: StepKind, journey_token: &str, value: &str) -> Self {
        let mut form = vec![
            ("StepId".to_owned(), kind.step_id().to_string()),
            ("formJourney".to_owned(), journey_token.to_owned()),
        ];

        for (i, control) in controls_for(kind).into_iter().enumerate() {
            let prefix = format!("StepControls[{i}]");
            form.push((
                format!("{prefix}.TargetTypeName"),
                format!("OABSEngine.StepControl, {ENGINE_ASSEMBLY}"),
            ));
            form.push((
                format!("{prefix}.Model.ModelTypeName"),
                format!("OABSEngine.Models.{}, {ENGINE_ASSEMBLY}", control.model),
            ));
            form.push((format!("{prefix}.StepControlId"), control.id.to_string()));
            if control.carries_value {
                form.push((format!("{prefix}.Model.Value"), value.to_owned()));
            }
            if let Some((field, extra)) = control.extra {
                form.push((format!("{prefix}.{field}"), extra));
            }
        }

        Self {
            kind,
            url: format!("{}{}", base_url.trim_end_matches('/'), kind.path()),
            query: Vec::new(),
            form,
        }
    }

    /// Value of a form field, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn journey_token(&self) -> Option<&str> {
        self.field("formJourney")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_locations_carries_type_id_and_token() {
        let req = StepRequest::list_locations("https://example.test/", 8, "BASE");
        assert_eq!(req.kind, StepKind::ListLocations);
        assert_eq!(req.url, format!("https://example.test{INDEX_PATH}"));
        assert_eq!(req.field("StepId"), Some("09004482-03df-4378-bce7-b39db9dc7711"));
        assert_eq!(req.journey_token(), Some("BASE"));
        assert_eq!(req.field("StepControls[0].FieldName"), Some("ApptTypeIdPreUnit"));
        assert_eq!(req.field("StepControls[0].Model.Value"), Some("8"));
        assert_eq!(
            req.field("StepControls[1].Step.StepId"),
            Some("418e99e5-dd8c-4dc0-b25b-6504ca5217f6")
        );
        assert!(req.query.is_empty());
    }

    #[test]
    fn list_days_puts_unit_id_on_fourth_control() {
        let req = StepRequest::list_days("https://example.test", "42", "TOKEN");
        assert_eq!(req.field("StepControls[3].Model.Value"), Some("42"));
        assert_eq!(
            req.field("StepControls[3].Model.ModelTypeName"),
            Some(
                "OABSEngine.Models.QFlowObjectModel, OABSEngine, Version=2.29.47.104, \
                 Culture=neutral, PublicKeyToken=null"
            )
        );
        assert!(req.field("StepControls[0].Model.Value").is_none());
        assert_eq!(
            req.form
                .iter()
                .filter(|(k, _)| k.ends_with(".StepControlId"))
                .count(),
            5
        );
    }

    #[test]
    fn list_times_uses_amend_endpoint_with_trigger_query() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        let req = StepRequest::list_times("https://example.test", date, "TOKEN");
        assert_eq!(req.url, format!("https://example.test{AMEND_PATH}"));
        assert_eq!(req.field("StepControls[2].Model.Value"), Some("2025-08-01"));
        assert_eq!(
            req.query,
            vec![
                (
                    "stepControlTriggerId".to_owned(),
                    "919c2e66-f9d4-44a3-9a11-c271d12d8f3c".to_owned()
                ),
                (
                    "targetStepControlId".to_owned(),
                    "39f2cb09-28e2-41bf-9f8e-8c8057cbdb93".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn success_markers_are_distinct() {
        let kinds = [StepKind::ListLocations, StepKind::ListDays, StepKind::ListTimes];
        for a in kinds {
            for b in kinds {
                if a != b {
                    assert_ne!(a.success_marker(), b.success_marker());
                }
            }
        }
    }
}
