// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding with a session-scoped memo cache.
//!
//! Every place name shown in the dashboard comes from the cache, keyed by the
//! literal `"lat,lng"` string. The cache only grows during a session.

use crate::config::Config;
use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Service replied but had no locality/state for the point.
pub const UNKNOWN_LOCATION: &str = "Unknown location";
/// The lookup itself failed.
pub const LOCATION_ERROR: &str = "Error fetching location";
/// The record has no coordinate at all.
pub const MISSING_LOCATION: &str = "Unknown";

/// Upper bound on concurrent geocoding requests per batch.
pub const MAX_CONCURRENT_GEOCODES: usize = 8;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Cache key: both components joined by a comma, as written by `Display`.
    pub fn key(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Reverse geocoding failures. Never surfaced to callers of the memoizer.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(String),

    #[error("geocoding service returned {status}: {message}")]
    Status { status: String, message: String },

    #[error("invalid geocoding response: {0}")]
    Decode(String),
}

/// Resolves a coordinate to a human-readable place name.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, point: Coordinate) -> Result<String, GeocodeError>;
}

// ─── Google Geocoding API ────────────────────────────────────────

/// Google Geocoding API client.
#[derive(Clone)]
pub struct GoogleGeocoder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building geocoding HTTP client")?;

        Ok(Self {
            http,
            base_url: config.geocoding_base_url.clone(),
            api_key: config.geocoding_api_key.clone(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    async fn reverse_geocode(&self, point: Coordinate) -> Result<String, GeocodeError> {
        let url = format!("{}/geocode/json", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("latlng", point.key()), ("key", self.api_key.clone())])
            .send()
            .await
            .map_err(|e| GeocodeError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Http(format!(
                "status {}",
                response.status()
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        place_from_response(body)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

/// Build "{locality}, {state}" from the first result.
fn place_from_response(response: GeocodeResponse) -> Result<String, GeocodeError> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(UNKNOWN_LOCATION.to_string()),
        _ => {
            return Err(GeocodeError::Status {
                message: response.error_message.unwrap_or_default(),
                status: response.status,
            })
        }
    }

    let Some(first) = response.results.first() else {
        return Ok(UNKNOWN_LOCATION.to_string());
    };

    let component = |kind: &str| {
        first
            .address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.as_str())
    };

    match (component("locality"), component("administrative_area_level_1")) {
        (Some(city), Some(state)) => Ok(format!("{}, {}", city, state)),
        _ => Ok(UNKNOWN_LOCATION.to_string()),
    }
}

// ─── Memoizer ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum CacheEntry {
    Resolved(String),
    /// Failed lookup, tagged with the failure sequence number.
    Failed { seq: u64 },
}

/// Session-scoped memo cache in front of a [`ReverseGeocoder`].
///
/// At most one request per key is outstanding at a time, across all
/// concurrent batches. A resolved entry is never replaced. A failed entry is
/// reused by batches that were already running when it failed and retried
/// by batches that start afterwards.
pub struct GeocodeMemoizer {
    geocoder: Arc<dyn ReverseGeocoder>,
    cache: DashMap<String, CacheEntry>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
    failures: AtomicU64,
}

impl GeocodeMemoizer {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self {
            geocoder,
            cache: DashMap::new(),
            inflight: DashMap::new(),
            failures: AtomicU64::new(0),
        }
    }

    /// Resolve every point, returning a place name for each distinct key.
    ///
    /// Duplicate points in `points` cost a single lookup.
    pub async fn resolve_batch(&self, points: &[Coordinate]) -> HashMap<String, String> {
        let epoch = self.failures.load(Ordering::SeqCst);

        let mut distinct: HashMap<String, Coordinate> = HashMap::new();
        for point in points {
            distinct.entry(point.key()).or_insert(*point);
        }

        tracing::debug!(
            requested = points.len(),
            distinct = distinct.len(),
            "Resolving geocode batch"
        );

        stream::iter(distinct)
            .map(|(key, point)| async move {
                let place = self.resolve(&key, point, epoch).await;
                (key, place)
            })
            .buffer_unordered(MAX_CONCURRENT_GEOCODES)
            .collect()
            .await
    }

    async fn resolve(&self, key: &str, point: Coordinate, epoch: u64) -> String {
        if let Some(place) = self.cached(key, epoch) {
            return place;
        }

        let lock = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let place = {
            let _guard = lock.lock().await;
            // Another batch may have finished this key while we waited.
            match self.cached(key, epoch) {
                Some(place) => place,
                None => self.fetch(key, point).await,
            }
        };

        // Waiters hold their own clone, so only the last one out removes it.
        drop(lock);
        self.inflight
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);

        place
    }

    async fn fetch(&self, key: &str, point: Coordinate) -> String {
        match self.geocoder.reverse_geocode(point).await {
            Ok(place) => {
                self.cache
                    .insert(key.to_string(), CacheEntry::Resolved(place.clone()));
                place
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Reverse geocoding failed");
                let seq = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                self.cache.insert(key.to_string(), CacheEntry::Failed { seq });
                LOCATION_ERROR.to_string()
            }
        }
    }

    fn cached(&self, key: &str, epoch: u64) -> Option<String> {
        match self.cache.get(key)?.value() {
            CacheEntry::Resolved(place) => Some(place.clone()),
            CacheEntry::Failed { seq } if *seq > epoch => Some(LOCATION_ERROR.to_string()),
            CacheEntry::Failed { .. } => None,
        }
    }

    /// Current cache contents, failures shown as their sentinel.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.cache
            .iter()
            .map(|entry| {
                let place = match entry.value() {
                    CacheEntry::Resolved(place) => place.clone(),
                    CacheEntry::Failed { .. } => LOCATION_ERROR.to_string(),
                };
                (entry.key().clone(), place)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Look up the display name for an optional point in a resolved batch.
pub fn place_name(places: &HashMap<String, String>, point: Option<Coordinate>) -> String {
    match point {
        None => MISSING_LOCATION.to_string(),
        Some(point) => places
            .get(&point.key())
            .cloned()
            .unwrap_or_else(|| LOCATION_ERROR.to_string()),
    }
}
