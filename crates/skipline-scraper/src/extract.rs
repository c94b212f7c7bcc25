//! Content extraction from recognized step pages.
//!
//! All functions here are pure and synchronous; `scraper::Html` is not
//! `Send`, so documents are parsed and dropped before any `.await`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ScraperError;
use crate::schema::{DATES_END_MARKER, DATES_START_MARKER};

const SLOT_DATETIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";
const DAY_FORMAT: &str = "%Y-%m-%d";

static LOCATION_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.QflowObjectItem").expect("valid location selector"));
static SLOT_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option[data-datetime]").expect("valid slot selector"));
static JOURNEY_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="formJourney"]"#).expect("valid journey input selector")
});
static JOURNEY_STORAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"sessionStorage\.setItem\(\s*["']formJourney["']\s*,\s*["']([^"']+)["']\s*\)"#)
        .expect("valid journey storage regex")
});

/// Names of locations marked active and not disabled on the type-selection page.
#[must_use]
pub fn parse_active_locations(html: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    document
        .select(&LOCATION_ITEM)
        .filter(|item| {
            let classes: Vec<&str> = item.value().classes().collect();
            classes.contains(&"Active-Unit") && !classes.contains(&"disabled-unit")
        })
        .filter_map(location_name)
        .collect()
}

/// The name lives in the first `div` child of the first `div` child.
fn location_name(item: ElementRef<'_>) -> Option<String> {
    let container = first_child_div(item)?;
    let label = first_child_div(container)?;
    let name = label.text().collect::<String>();
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

fn first_child_div(parent: ElementRef<'_>) -> Option<ElementRef<'_>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "div")
}

/// Extract the embedded `var Dates = [...]` array.
///
/// Entries that are not `YYYY-MM-DD` strings are skipped. An empty array is a
/// valid result meaning no open days.
///
/// # Errors
///
/// Returns [`ScraperError::Parse`] if the array markers are missing or the
/// array is not valid JSON.
pub fn parse_available_days(body: &str) -> Result<Vec<NaiveDate>, ScraperError> {
    let parse_err = |reason: String| ScraperError::Parse {
        context: "available days".to_owned(),
        reason,
    };

    let start = body
        .find(DATES_START_MARKER)
        .map(|i| i + DATES_START_MARKER.len())
        .ok_or_else(|| parse_err(format!("'{DATES_START_MARKER}' marker not found")))?;
    let end = body[start..]
        .find(DATES_END_MARKER)
        .map(|i| start + i + 1)
        .ok_or_else(|| parse_err(format!("'{DATES_END_MARKER}' marker not found")))?;

    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&body[start..end]).map_err(|e| parse_err(e.to_string()))?;

    let mut days: Vec<NaiveDate> = raw
        .iter()
        .filter_map(|v| {
            let s = v.as_str()?;
            match NaiveDate::parse_from_str(s.trim(), DAY_FORMAT) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::debug!(value = %s, error = %e, "skipping unparseable day");
                    None
                }
            }
        })
        .collect();
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

/// Extract time slots from `option[data-datetime]` attributes.
///
/// Values are truncated to the minute, de-duplicated, and returned in
/// chronological order. Unparseable attributes are skipped, so a page with
/// none yields an empty list.
#[must_use]
pub fn parse_time_slots(html: &str) -> Vec<NaiveTime> {
    let document = Html::parse_document(html);
    let times: BTreeSet<NaiveTime> = document
        .select(&SLOT_OPTION)
        .filter_map(|option| option.value().attr("data-datetime"))
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            NaiveDateTime::parse_from_str(raw, SLOT_DATETIME_FORMAT)
                .ok()
                .and_then(|dt| dt.time().with_second(0))
        })
        .collect();
    times.into_iter().collect()
}

/// A refreshed continuation token, if the page hands one out.
#[must_use]
pub fn extract_journey_token(body: &str) -> Option<String> {
    if let Some(caps) = JOURNEY_STORAGE_RE.captures(body) {
        return Some(caps[1].to_owned());
    }
    let document = Html::parse_document(body);
    document
        .select(&JOURNEY_INPUT)
        .filter_map(|input| input.value().attr("value"))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
