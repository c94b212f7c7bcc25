//! Address geocoding for the distance filter origin.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use skipline_core::GeoPoint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no geocoding result for '{address}'")]
    NotFound { address: String },

    #[error("geocoder returned invalid coordinates ({lat}, {lon})")]
    InvalidCoordinates { lat: String, lon: String },
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// # Errors
    ///
    /// Returns [`GeocodeError`] when the address cannot be resolved.
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim search-endpoint client.
pub struct NominatimGeocoder {
    client: Client,
    search_url: String,
}

impl NominatimGeocoder {
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        search_url: &str,
        user_agent: &str,
        timeout_secs: u64,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.to_owned(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let results: Vec<NominatimResult> = self
            .client
            .get(&self.search_url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let first = results.into_iter().next().ok_or_else(|| GeocodeError::NotFound {
            address: address.to_owned(),
        })?;

        let invalid = || GeocodeError::InvalidCoordinates {
            lat: first.lat.clone(),
            lon: first.lon.clone(),
        };
        let lat: f64 = first.lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = first.lon.trim().parse().map_err(|_| invalid())?;
        let point = GeoPoint::new(lat, lon).ok_or_else(invalid)?;

        tracing::debug!(
            address,
            resolved = first.display_name.as_deref().unwrap_or(""),
            %point,
            "address geocoded"
        );
        Ok(point)
    }
}
