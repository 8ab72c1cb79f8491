//! Geocoding of location names.
//!
//! A `Geocoder` turns a free-text place name into coordinates. The pipeline
//! only talks to it through a run-scoped `GeocodeCache`.

mod cache;
mod nominatim;

use async_trait::async_trait;
use thiserror::Error;
use trial_indexer_shared::GeoPoint;

pub use cache::{GeocodeCache, DEFAULT_GEOCODE_TIMEOUT};
pub use nominatim::{NominatimGeocoder, DEFAULT_NOMINATIM_URL};

/// Errors from a geocoding backend.
///
/// None of these are cached: the next lookup of the same name tries again.
#[derive(Error, Debug, Clone)]
pub enum GeocodeError {
    /// The request could not be sent or its response not received.
    #[error("Geocoder request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("Geocoder returned status {0}")]
    Status(u16),

    /// The response body was not understood.
    #[error("Geocoder response could not be decoded: {0}")]
    Decode(String),
}

impl GeocodeError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Resolves a location name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the backend knows no such place.
    async fn resolve(&self, location: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

/// Geocoder that never finds anything, for offline runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn resolve(&self, _location: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        Ok(None)
    }
}
