use crate::app_config::{AppConfig, NotifyKind};
use crate::appointment::AppointmentType;
use crate::filters::FilterSettings;
use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://skiptheline.ncdot.gov";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "skipline/0.1 (appointment-watcher)";

/// Upper bound for `SKIPLINE_BASE_INTERVAL_SECS`.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Filter variables are collected raw into [`FilterSettings`] and never fail
/// here; they are validated later when the filters are resolved.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let require = |var: &str| -> Result<String, ConfigError> {
        optional(var).ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_flag = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_bool(&or_default(var, default)).ok_or_else(|| {
            invalid(var, "expected true/false, yes/no, on/off, or 1/0".to_string())
        })
    };

    let type_label = require("SKIPLINE_APPOINTMENT_TYPE")?;
    let appointment_type = AppointmentType::from_label(&type_label)
        .ok_or(ConfigError::UnknownAppointmentType(type_label))?;

    let locations_path = PathBuf::from(or_default("SKIPLINE_LOCATIONS_PATH", "locations.json"));
    let base_url = or_default("SKIPLINE_BASE_URL", DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    let request_timeout_secs = parse_u64("SKIPLINE_REQUEST_TIMEOUT_SECS", "20")?;
    let user_agent = or_default("SKIPLINE_USER_AGENT", DEFAULT_USER_AGENT);
    let step_max_retries = parse_u32("SKIPLINE_STEP_MAX_RETRIES", "5")?;
    let step_backoff_ms = parse_u64("SKIPLINE_STEP_BACKOFF_MS", "500")?;

    let base_interval_secs = parse_u64("SKIPLINE_BASE_INTERVAL_SECS", "60")?;
    if base_interval_secs > MAX_INTERVAL_SECS {
        return Err(invalid(
            "SKIPLINE_BASE_INTERVAL_SECS",
            format!("must be at most {MAX_INTERVAL_SECS} (one week)"),
        ));
    }
    // Inverted bounds are kept as given; the scheduler collapses them.
    let offset_min_secs = parse_i64("SKIPLINE_OFFSET_MIN_SECS", "-25")?;
    let offset_max_secs = parse_i64("SKIPLINE_OFFSET_MAX_SECS", "25")?;
    let early_alert = parse_flag("SKIPLINE_EARLY_ALERT", "false")?;
    let log_level = or_default("SKIPLINE_LOG_LEVEL", "info");

    let filters = FilterSettings {
        address: optional("SKIPLINE_ADDRESS"),
        distance_miles: optional("SKIPLINE_DISTANCE_MILES"),
        date_start: optional("SKIPLINE_DATE_START"),
        date_end: optional("SKIPLINE_DATE_END"),
        date_relative: optional("SKIPLINE_DATE_RANGE"),
        time_start: optional("SKIPLINE_TIME_START"),
        time_end: optional("SKIPLINE_TIME_END"),
    };
    let geocoder_url = or_default("SKIPLINE_GEOCODER_URL", DEFAULT_GEOCODER_URL);

    let notify_url = optional("SKIPLINE_NOTIFY_URL");
    let notify_kind = parse_notify_kind(&or_default("SKIPLINE_NOTIFY_KIND", "auto"))?;
    let signal_number = optional("SKIPLINE_SIGNAL_NUMBER");
    let signal_group = optional("SKIPLINE_SIGNAL_GROUP");
    let heartbeat = parse_flag("SKIPLINE_HEARTBEAT", "false")?;
    let intro_message = optional("SKIPLINE_INTRO_MESSAGE")
        .unwrap_or_else(|| format!("Appointments found at {base_url}:"));
    let notify_max_len = parse_usize("SKIPLINE_NOTIFY_MAX_LEN", "1950")?;
    if notify_max_len == 0 {
        return Err(invalid(
            "SKIPLINE_NOTIFY_MAX_LEN",
            "must be greater than zero".to_string(),
        ));
    }
    let notify_chunk_delay_ms = parse_u64("SKIPLINE_NOTIFY_CHUNK_DELAY_MS", "1000")?;
    let notify_timeout_secs = parse_u64("SKIPLINE_NOTIFY_TIMEOUT_SECS", "15")?;

    Ok(AppConfig {
        appointment_type,
        locations_path,
        base_url,
        request_timeout_secs,
        user_agent,
        step_max_retries,
        step_backoff_ms,
        base_interval_secs,
        offset_min_secs,
        offset_max_secs,
        early_alert,
        log_level,
        filters,
        geocoder_url,
        notify_url,
        notify_kind,
        signal_number,
        signal_group,
        heartbeat,
        intro_message,
        notify_max_len,
        notify_chunk_delay_ms,
        notify_timeout_secs,
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a string into a `NotifyKind` variant.
///
/// Returns `Err(ConfigError::InvalidEnvVar)` for unrecognized values.
fn parse_notify_kind(s: &str) -> Result<NotifyKind, ConfigError> {
    match s.to_ascii_lowercase().as_str() {
        "auto" => Ok(NotifyKind::Auto),
        "discord" => Ok(NotifyKind::Discord),
        "signal" => Ok(NotifyKind::Signal),
        "ntfy" => Ok(NotifyKind::Ntfy),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SKIPLINE_NOTIFY_KIND".to_string(),
            reason: format!("unknown kind '{other}'; expected auto, discord, signal, or ntfy"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
