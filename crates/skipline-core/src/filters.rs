//! Candidate filtering: distance, date range, and time-of-day range.
//!
//! Filter inputs arrive as raw strings ([`FilterSettings`]). Each filter is
//! resolved independently: a filter that is absent stays inactive, and a
//! filter that is present but invalid is also inactive and produces a
//! [`FilterWarning`]. Nothing here can fail startup.
//!
//! Once resolved into a [`FilterConfig`], every predicate is pure.

use std::collections::BTreeSet;

use chrono::{Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::geo::{distance_miles, GeoPoint};
use crate::locations::LocationBook;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const TIME_FORMAT: &str = "%H:%M";

/// Why an optional filter was switched off.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterWarning {
    #[error("distance filter needs both an address and a radius; got only the {present}")]
    IncompleteDistance { present: &'static str },

    #[error("distance radius '{value}' is not a number")]
    InvalidRadius { value: String },

    #[error("distance radius must be positive, got {value}")]
    NonPositiveRadius { value: String },

    #[error("could not geocode address '{address}'")]
    GeocodeFailed { address: String },

    #[error("{field} '{value}' is not a date (expected YYYY-MM-DD or MM/DD/YYYY)")]
    InvalidDate { field: &'static str, value: String },

    #[error("date range start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("relative date range '{value}' is invalid: {reason}")]
    InvalidRelativeRange { value: String, reason: String },

    #[error("{field} '{value}' is not a time (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },

    #[error("time range start {start} is after end {end}")]
    InvertedTimeRange { start: NaiveTime, end: NaiveTime },
}

/// Raw, unvalidated filter inputs as read from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSettings {
    pub address: Option<String>,
    pub distance_miles: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    /// `Nd`, `Nw`, or `Nm` from today. Takes precedence over absolute bounds.
    pub date_relative: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
}

/// A distance filter waiting for its origin address to be geocoded.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRequest {
    pub address: String,
    pub radius_miles: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFilter {
    pub origin: GeoPoint,
    pub radius_miles: f64,
}

/// Inclusive date bounds; `None` is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| s <= date) && self.end.is_none_or(|e| date <= e)
    }
}

/// Inclusive time-of-day bounds; `None` is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeRange {
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start.is_none_or(|s| s <= time) && self.end.is_none_or(|e| time <= e)
    }
}

/// Output of [`FilterSettings::resolve`]: the distance filter still needs geocoding.
#[derive(Debug, Clone, Default)]
pub struct ResolvedFilters {
    pub distance: Option<DistanceRequest>,
    pub date: Option<DateRange>,
    pub time: Option<TimeRange>,
    pub warnings: Vec<FilterWarning>,
}

impl ResolvedFilters {
    /// Attach the geocoded origin. `origin = None` keeps distance filtering off.
    #[must_use]
    pub fn with_origin(self, origin: Option<GeoPoint>) -> FilterConfig {
        let distance = match (self.distance, origin) {
            (Some(req), Some(origin)) => Some(DistanceFilter {
                origin,
                radius_miles: req.radius_miles,
            }),
            _ => None,
        };
        FilterConfig {
            distance,
            date: self.date,
            time: self.time,
        }
    }
}

/// Immutable, fully-resolved filters for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterConfig {
    pub distance: Option<DistanceFilter>,
    pub date: Option<DateRange>,
    pub time: Option<TimeRange>,
}

/// A raw (location, date, time) triple read from the remote journey.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotCandidate {
    pub location: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotCandidate {
    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl FilterSettings {
    /// Resolve every filter, logging a warning for each one that is disabled.
    #[must_use]
    pub fn resolve(&self, today: NaiveDate) -> ResolvedFilters {
        let mut warnings = Vec::new();
        let distance = keep(&mut warnings, self.parse_distance());
        let date = keep(&mut warnings, self.parse_date_range(today));
        let time = keep(&mut warnings, self.parse_time_range());

        ResolvedFilters {
            distance,
            date,
            time,
            warnings,
        }
    }

    /// # Errors
    ///
    /// Returns a [`FilterWarning`] when only one of address/radius is set or
    /// the radius is not a positive number.
    pub fn parse_distance(&self) -> Result<Option<DistanceRequest>, FilterWarning> {
        let address = non_blank(self.address.as_deref());
        let radius = non_blank(self.distance_miles.as_deref());

        let (address, radius) = match (address, radius) {
            (None, None) => return Ok(None),
            (Some(_), None) => {
                return Err(FilterWarning::IncompleteDistance { present: "address" })
            }
            (None, Some(_)) => return Err(FilterWarning::IncompleteDistance { present: "radius" }),
            (Some(a), Some(r)) => (a, r),
        };

        let radius_miles: f64 = radius.parse().map_err(|_| FilterWarning::InvalidRadius {
            value: radius.to_owned(),
        })?;
        if !radius_miles.is_finite() || radius_miles <= 0.0 {
            return Err(FilterWarning::NonPositiveRadius {
                value: radius.to_owned(),
            });
        }

        Ok(Some(DistanceRequest {
            address: address.to_owned(),
            radius_miles,
        }))
    }

    /// # Errors
    ///
    /// Returns a [`FilterWarning`] for unparseable bounds, an inverted range,
    /// or a malformed relative range.
    pub fn parse_date_range(&self, today: NaiveDate) -> Result<Option<DateRange>, FilterWarning> {
        if let Some(relative) = non_blank(self.date_relative.as_deref()) {
            let end = resolve_relative_end(today, relative)?;
            return Ok(Some(DateRange {
                start: Some(today),
                end: Some(end),
            }));
        }

        let start = non_blank(self.date_start.as_deref())
            .map(|v| parse_date("date range start", v))
            .transpose()?;
        let end = non_blank(self.date_end.as_deref())
            .map(|v| parse_date("date range end", v))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(FilterWarning::InvertedDateRange { start: s, end: e });
            }
        }

        Ok((start.is_some() || end.is_some()).then_some(DateRange { start, end }))
    }

    /// # Errors
    ///
    /// Returns a [`FilterWarning`] for unparseable bounds or an inverted range.
    pub fn parse_time_range(&self) -> Result<Option<TimeRange>, FilterWarning> {
        let start = non_blank(self.time_start.as_deref())
            .map(|v| parse_time("time range start", v))
            .transpose()?;
        let end = non_blank(self.time_end.as_deref())
            .map(|v| parse_time("time range end", v))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(FilterWarning::InvertedTimeRange { start: s, end: e });
            }
        }

        Ok((start.is_some() || end.is_some()).then_some(TimeRange { start, end }))
    }
}

fn keep<T>(
    warnings: &mut Vec<FilterWarning>,
    result: Result<Option<T>, FilterWarning>,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(w) => {
            tracing::warn!(warning = %w, "filter disabled");
            warnings.push(w);
            None
        }
    }
}

impl FilterConfig {
    #[must_use]
    pub fn date_matches(&self, date: NaiveDate) -> bool {
        self.date.is_none_or(|r| r.contains(date))
    }

    #[must_use]
    pub fn time_matches(&self, time: NaiveTime) -> bool {
        self.time.is_none_or(|r| r.contains(time))
    }

    /// A slot matches when every active date/time filter accepts it.
    #[must_use]
    pub fn matches(&self, slot: &SlotCandidate) -> bool {
        self.date_matches(slot.date) && self.time_matches(slot.time)
    }

    #[must_use]
    pub fn has_active_filters(&self) -> bool {
        self.distance.is_some() || self.date.is_some() || self.time.is_some()
    }

    /// Short human summary of the active filters, empty when none are active.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(d) = self.distance {
            parts.push(format!("distance {}mi of {}", d.radius_miles, d.origin));
        }
        if let Some(r) = self.date {
            parts.push(format!(
                "date {} to {}",
                r.start.map_or_else(|| "any".to_owned(), |d| d.to_string()),
                r.end.map_or_else(|| "any".to_owned(), |d| d.to_string()),
            ));
        }
        if let Some(r) = self.time {
            parts.push(format!(
                "time {} to {}",
                r.start
                    .map_or_else(|| "any".to_owned(), |t| t.format("%H:%M").to_string()),
                r.end
                    .map_or_else(|| "any".to_owned(), |t| t.format("%H:%M").to_string()),
            ));
        }
        parts.join("; ")
    }
}

/// Names of locations within `radius_miles` of `origin`.
///
/// Locations without usable coordinates are logged and left out of the
/// result; they never abort the filter.
#[must_use]
pub fn distance_filter(
    origin: GeoPoint,
    radius_miles: f64,
    book: &LocationBook,
) -> BTreeSet<String> {
    let mut allowed = BTreeSet::new();
    for (name, location) in &book.locations {
        match location.geo_point() {
            Ok(point) => {
                let miles = distance_miles(origin, point);
                if miles <= radius_miles {
                    allowed.insert(name.clone());
                }
            }
            Err(reason) => {
                tracing::warn!(location = %name, reason, "skipping location in distance filter");
            }
        }
    }
    tracing::info!(
        count = allowed.len(),
        radius_miles,
        "locations within distance filter"
    );
    allowed
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, FilterWarning> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| FilterWarning::InvalidDate {
            field,
            value: value.to_owned(),
        })
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, FilterWarning> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| FilterWarning::InvalidTime {
        field,
        value: value.to_owned(),
    })
}

/// Resolve `Nd` / `Nw` / `Nm` to an absolute end date.
///
/// Month arithmetic clamps to the last day of the target month
/// (Jan 31 + 1m = Feb 28/29).
fn resolve_relative_end(today: NaiveDate, raw: &str) -> Result<NaiveDate, FilterWarning> {
    let invalid = |reason: &str| FilterWarning::InvalidRelativeRange {
        value: raw.to_owned(),
        reason: reason.to_owned(),
    };

    let lowered = raw.to_ascii_lowercase();
    let Some(unit) = lowered.chars().last() else {
        return Err(invalid("empty value"));
    };
    let count: u32 = lowered[..lowered.len() - unit.len_utf8()]
        .trim()
        .parse()
        .map_err(|_| invalid("expected a whole number followed by d, w, or m"))?;
    if count == 0 {
        return Err(invalid("count must be positive"));
    }

    let end = match unit {
        'd' => today.checked_add_days(Days::new(u64::from(count))),
        'w' => today.checked_add_days(Days::new(u64::from(count) * 7)),
        'm' => today.checked_add_months(Months::new(count)),
        _ => return Err(invalid("unit must be d, w, or m")),
    };
    end.ok_or_else(|| invalid("date out of range"))
}

#[cfg(test)]
#[path = "filters_test.rs"]
mod tests;
