//! Address to coordinate resolution.
//!
//! Lookups go through the [`Geocoder`] trait so the network client can be swapped
//! out. [`AddressResolver`] owns the per-session cache: an address is looked up at
//! most once, and a miss stays a miss until the session ends.

use crate::config::GeocodingConfig;
use crate::error::GeocodeError;
use crate::types::PlaceTable;
use geo::Point;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

pub trait Geocoder {
    /// `Ok(None)` means the service answered but found nothing.
    fn geocode(&self, query: &str) -> Result<Option<Point<f64>>, GeocodeError>;
}

impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    fn geocode(&self, query: &str) -> Result<Option<Point<f64>>, GeocodeError> {
        (**self).geocode(query)
    }
}

/// Client for a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: Url,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_request: Mutex::new(None),
        })
    }

    fn throttle(&self) {
        let mut last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<Point<f64>>, GeocodeError> {
        self.throttle();

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "jsonv2")
            .append_pair("limit", "1");

        debug!("Geocoding {:?}", query);
        let hits: Vec<SearchHit> = self.client.get(url).send()?.error_for_status()?.json()?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let lat: f64 = hit.lat.parse()
            .map_err(|_| GeocodeError::BadResponse(format!("latitude {:?}", hit.lat)))?;
        let lon: f64 = hit.lon.parse()
            .map_err(|_| GeocodeError::BadResponse(format!("longitude {:?}", hit.lon)))?;
        Ok(Some(Point::new(lon, lat)))
    }
}

/// Session-scoped, caching front of a [`Geocoder`].
pub struct AddressResolver<G> {
    geocoder: G,
    country: String,
    cache: HashMap<String, Option<Point<f64>>>,
}

impl<G: Geocoder> AddressResolver<G> {
    pub fn new(geocoder: G, country: impl Into<String>) -> Self {
        Self {
            geocoder,
            country: country.into(),
            cache: HashMap::new(),
        }
    }

    /// Any failure, including no match, resolves to `None`.
    pub fn resolve(&mut self, address: &str) -> Option<Point<f64>> {
        if let Some(cached) = self.cache.get(address) {
            return *cached;
        }

        let query = if self.country.is_empty() {
            address.to_string()
        } else {
            format!("{}, {}", address, self.country)
        };

        let result = match self.geocoder.geocode(&query) {
            Ok(Some(point)) => Some(point),
            Ok(None) => {
                warn!("No match for address {:?}", address);
                None
            }
            Err(e) => {
                warn!("Geocoding failed for {:?}: {}", address, e);
                None
            }
        };

        self.cache.insert(address.to_string(), result);
        result
    }

    /// Fill in missing coordinates then drop the rows that could not be placed.
    /// Returns the number of dropped rows.
    pub fn resolve_table(&mut self, table: &mut PlaceTable) -> usize {
        let pending = table.places.iter().filter(|p| p.location.is_none()).count();
        if pending > 0 {
            info!("Geocoding {} addresses, this may take a few minutes...", pending);
        }

        for place in table.places.iter_mut().filter(|p| p.location.is_none()) {
            place.location = self.resolve(&place.address);
        }

        let before = table.len();
        table.retain(|p| p.location.is_some());
        let dropped = before - table.len();
        if dropped > 0 {
            warn!("Dropped {} rows without coordinates", dropped);
        }
        dropped
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
