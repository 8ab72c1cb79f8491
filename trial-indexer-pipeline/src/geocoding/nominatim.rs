//! Nominatim geocoder.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use trial_indexer_shared::GeoPoint;
use url::Url;

use crate::geocoding::{GeocodeError, Geocoder};

/// Public OpenStreetMap Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim `search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    search_url: Url,
}

impl NominatimGeocoder {
    /// Create a geocoder for the instance at `base_url`.
    ///
    /// Nominatim's usage policy requires an identifying `user_agent`.
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| GeocodeError::request(format!("invalid geocoder url {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let search_url = base
            .join("search")
            .map_err(|e| GeocodeError::request(e.to_string()))?;

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::request(e.to_string()))?;

        Ok(Self { client, search_url })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn resolve(&self, location: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let response = self
            .client
            .get(self.search_url.clone())
            .query(&[("q", location), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| GeocodeError::decode(e.to_string()))?;

        let Some(place) = places.into_iter().next() else {
            debug!(location = %location, "No geocoding result");
            return Ok(None);
        };

        let lat = place
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::decode(format!("lat {:?}: {}", place.lat, e)))?;
        let lon = place
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::decode(format!("lon {:?}: {}", place.lon, e)))?;

        Ok(Some(GeoPoint::new(lat, lon)))
    }
}
