//! Reference location data.
//!
//! The file is a JSON object keyed by location name. One reserved key,
//! [`BASE_JOURNEY_KEY`], holds the continuation token that starts the
//! type-selection step; every other entry describes one office.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::geo::GeoPoint;
use crate::ConfigError;

pub const BASE_JOURNEY_KEY: &str = "fjbase";

/// Journey content written by the data gatherer before it has a real token.
const PLACEHOLDER_PREFIX: &str = "Placeholder:";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JourneyEntry {
    #[serde(rename = "journeyContent", default)]
    pub journey_content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    /// Provider-assigned unit id; the data file stores it as a number or string.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub address: Option<String>,
    /// Kept raw so one malformed pair only disables distance checks for this entry.
    #[serde(default)]
    pub coordinates: Option<serde_json::Value>,
    #[serde(rename = "formJourneys", default)]
    pub form_journeys: BTreeMap<String, JourneyEntry>,
}

impl Location {
    /// The unit id rendered the way the remote form expects it.
    #[must_use]
    pub fn unit_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Parses the `[lat, lon]` pair.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the pair is absent, not a
    /// two-element numeric array, or out of range.
    pub fn geo_point(&self) -> Result<GeoPoint, String> {
        let raw = self
            .coordinates
            .as_ref()
            .ok_or_else(|| "no coordinates recorded".to_owned())?;
        let pair = raw
            .as_array()
            .ok_or_else(|| format!("coordinates are not an array: {raw}"))?;
        if pair.len() != 2 {
            return Err(format!("expected 2 coordinates, found {}", pair.len()));
        }
        let (Some(lat), Some(lon)) = (pair[0].as_f64(), pair[1].as_f64()) else {
            return Err(format!("coordinates are not numeric: {raw}"));
        };
        GeoPoint::new(lat, lon).ok_or_else(|| format!("coordinates out of range: {raw}"))
    }

    /// Continuation token for `journey_key`, ignoring empty and placeholder values.
    #[must_use]
    pub fn journey_content(&self, journey_key: &str) -> Option<&str> {
        self.form_journeys
            .get(journey_key)?
            .journey_content
            .as_deref()
            .filter(|c| !c.trim().is_empty() && !c.starts_with(PLACEHOLDER_PREFIX))
    }
}

/// All known locations plus the base journey token.
#[derive(Debug, Clone, Default)]
pub struct LocationBook {
    pub base_journey: String,
    pub locations: BTreeMap<String, Location>,
}

impl LocationBook {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }
}

/// Load the reference data file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, is not a JSON object, or
/// lacks the base journey token.
pub fn load_locations(path: &Path) -> Result<LocationBook, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LocationsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_locations(&content, &path.display().to_string())
}

/// Parse reference data already held in memory. `origin` is used in errors.
///
/// Entries that do not deserialize as a location are skipped with a warning.
///
/// # Errors
///
/// Returns `ConfigError` if the document is not a JSON object or lacks the
/// base journey token.
pub fn parse_locations(content: &str, origin: &str) -> Result<LocationBook, ConfigError> {
    let root: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(content).map_err(|e| ConfigError::LocationsFileParse {
            path: origin.to_owned(),
            source: e,
        })?;

    let mut base_journey = None;
    let mut locations = BTreeMap::new();

    for (name, value) in root {
        if name == BASE_JOURNEY_KEY {
            base_journey = value.as_str().map(str::to_owned);
            continue;
        }
        match serde_json::from_value::<Location>(value) {
            Ok(location) => {
                locations.insert(name, location);
            }
            Err(e) => {
                tracing::warn!(location = %name, error = %e, "skipping malformed location entry");
            }
        }
    }

    let base_journey = base_journey
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingBaseJourney {
            path: origin.to_owned(),
            key: BASE_JOURNEY_KEY.to_owned(),
        })?;

    Ok(LocationBook {
        base_journey,
        locations,
    })
}
