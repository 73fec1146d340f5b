use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::navigation_error::NavigationError;
use crate::{services::geocoding_client::geocoding_service::Geocoder, types::geo_point::GeoPoint};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Appended to queries that don't already mention it, e.g. "Coquimbo, Chile".
    pub locality_hint: Option<String>,
    pub cache_ttl: Duration,
    pub lookup_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeocodeResult {
    pub address: String,
    pub point: GeoPoint,
    pub resolved_at: DateTime<Utc>,
    cached_at: Instant,
}

type PendingLookup = Shared<BoxFuture<'static, Result<GeoPoint, NavigationError>>>;

#[derive(Default)]
struct ResolverState {
    cache: HashMap<String, GeocodeResult>,
    in_flight: HashMap<String, (u64, PendingLookup)>,
    next_lookup: u64,
}

/// Resolves delivery addresses to coordinates with a TTL cache and
/// de-duplication of concurrent lookups for the same address.
pub struct AddressResolver {
    geocoder: Arc<dyn Geocoder>,
    config: ResolverConfig,
    state: Arc<Mutex<ResolverState>>,
}

/// Trims, drops `#` and collapses runs of whitespace.
pub fn normalize_address(address: &str) -> String {
    address
        .replace('#', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(',')
        .trim()
        .to_string()
}

impl AddressResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, config: ResolverConfig) -> Self {
        Self {
            geocoder,
            config,
            state: Arc::new(Mutex::new(ResolverState::default())),
        }
    }

    fn query_for(&self, normalized: &str) -> String {
        match &self.config.locality_hint {
            Some(hint)
                if !hint.is_empty()
                    && !normalized.to_lowercase().contains(&hint.to_lowercase()) =>
            {
                format!("{}, {}", normalized, hint)
            }
            _ => normalized.to_string(),
        }
    }

    pub async fn resolve(&self, address: &str) -> Result<GeoPoint, NavigationError> {
        let normalized = normalize_address(address);
        if normalized.is_empty() {
            return Err(NavigationError::AddressNotFound(address.to_string()));
        }

        let query = self.query_for(&normalized);
        let key = query.to_lowercase();

        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(hit) = state.cache.get(&key) {
                if hit.cached_at.elapsed() <= self.config.cache_ttl {
                    debug!(
                        "Geocode cache hit for {} (resolved at {})",
                        hit.address, hit.resolved_at
                    );
                    return Ok(hit.point);
                }
                debug!("Geocode cache entry expired for {}", query);
                state.cache.remove(&key);
            }

            let existing = state.in_flight.get(&key).map(|(_, pending)| pending.clone());
            match existing {
                Some(pending) => {
                    debug!("Joining in-flight geocode for {}", query);
                    pending
                }
                None => {
                    let id = state.next_lookup;
                    state.next_lookup += 1;

                    let pending = lookup(
                        self.geocoder.clone(),
                        self.state.clone(),
                        key.clone(),
                        query,
                        id,
                        self.config.lookup_timeout,
                    )
                    .boxed()
                    .shared();

                    state.in_flight.insert(key, (id, pending.clone()));
                    pending
                }
            }
        };

        pending.await
    }
}

async fn lookup(
    geocoder: Arc<dyn Geocoder>,
    state: Arc<Mutex<ResolverState>>,
    key: String,
    query: String,
    id: u64,
    timeout: Duration,
) -> Result<GeoPoint, NavigationError> {
    info!("Geocoding {}", query);

    let result = match tokio::time::timeout(timeout, geocoder.geocode(&query)).await {
        Ok(Ok(candidates)) => {
            if candidates.len() > 1 {
                debug!("{} candidates for {}, using the first", candidates.len(), query);
            }
            match candidates.into_iter().next() {
                Some(best) => Ok(best.point),
                None => Err(NavigationError::AddressNotFound(query.clone())),
            }
        }
        Ok(Err(e)) => {
            warn!("Geocoding {} failed: {}", query, e);
            Err(NavigationError::LookupFailed(e.to_string()))
        }
        Err(_) => {
            warn!("Geocoding {} timed out after {:?}", query, timeout);
            Err(NavigationError::LookupFailed(format!(
                "timed out after {:?}",
                timeout
            )))
        }
    };

    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);

    if matches!(state.in_flight.get(&key), Some((current, _)) if *current == id) {
        state.in_flight.remove(&key);
    }

    if let Ok(point) = &result {
        state.cache.insert(
            key,
            GeocodeResult {
                address: query,
                point: *point,
                resolved_at: Utc::now(),
                cached_at: Instant::now(),
            },
        );
    }

    result
}
