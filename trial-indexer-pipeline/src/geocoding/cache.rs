//! Run-scoped geocode cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use trial_indexer_shared::GeoPoint;

use crate::geocoding::Geocoder;

/// Default time allowed for one geocoder call.
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

type Slot = Arc<Mutex<Option<Option<GeoPoint>>>>;

/// Memoizes geocoder answers for the duration of a run.
///
/// Both hits and "no such place" answers are cached; errors and timeouts
/// are not. Concurrent lookups of the same uncached name wait on a per-name
/// lock so the backend sees a single request for it, while other names
/// proceed independently.
pub struct GeocodeCache {
    geocoder: Arc<dyn Geocoder>,
    timeout: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl GeocodeCache {
    pub fn new(geocoder: Arc<dyn Geocoder>, timeout: Duration) -> Self {
        Self {
            geocoder,
            timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Coordinates for `location`, or `None` if unknown or unavailable.
    pub async fn resolve(&self, location: &str) -> Option<GeoPoint> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(location.to_string()).or_default())
        };

        let mut entry = slot.lock().await;
        if let Some(cached) = *entry {
            return cached;
        }

        match tokio::time::timeout(self.timeout, self.geocoder.resolve(location)).await {
            Ok(Ok(answer)) => {
                *entry = Some(answer);
                answer
            }
            Ok(Err(e)) => {
                warn!(location = %location, error = %e, "Geocoding failed");
                None
            }
            Err(_) => {
                debug!(location = %location, timeout = ?self.timeout, "Geocoding timed out");
                None
            }
        }
    }

    /// Cached answer for `location`, if one was stored.
    pub async fn cached(&self, location: &str) -> Option<Option<GeoPoint>> {
        let slot = self.slots.lock().await.get(location).cloned()?;
        let entry = slot.lock().await;
        *entry
    }
}
