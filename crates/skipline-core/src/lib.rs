//! Shared domain model and configuration for the skipline appointment watcher.
//!
//! Holds the reference location data, the fixed appointment-type table, the
//! environment-driven [`AppConfig`], and the pure filter pipeline that narrows
//! candidate locations, days, and times.

pub mod app_config;
pub mod appointment;
pub mod config;
pub mod filters;
pub mod geo;
pub mod locations;

use thiserror::Error;

pub use app_config::{AppConfig, NotifyKind};
pub use appointment::{AppointmentType, APPOINTMENT_TYPES};
pub use config::{load_app_config, load_app_config_from_env};
pub use filters::{
    distance_filter, DateRange, DistanceFilter, DistanceRequest, FilterConfig, FilterSettings,
    FilterWarning, ResolvedFilters, SlotCandidate, TimeRange,
};
pub use geo::{distance_miles, GeoPoint};
pub use locations::{load_locations, parse_locations, Location, LocationBook};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("unknown appointment type '{0}'")]
    UnknownAppointmentType(String),

    #[error("failed to read locations file {path}: {source}")]
    LocationsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse locations file {path}: {source}")]
    LocationsFileParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("locations file {path} has no '{key}' base journey token")]
    MissingBaseJourney { path: String, key: String },
}
