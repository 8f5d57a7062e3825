use super::{MEASUREMENT_CORRECTION, MeasurementError, MetricsStore, TextMetricsProvider};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tagbadge_core::TextSize;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

type FlightResult = std::result::Result<TextSize, MeasurementError>;
type Flight = Arc<RwLock<Option<FlightResult>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsCacheOptions {
    /// Multiplier applied to both axes of every raw measurement before it is stored.
    pub correction_factor: f64,
    /// Upper bound for a single provider call. `0` disables the limit.
    pub timeout_ms: u64,
}

impl Default for MetricsCacheOptions {
    fn default() -> Self {
        Self {
            correction_factor: MEASUREMENT_CORRECTION,
            timeout_ms: 30_000,
        }
    }
}

/// Hex SHA-256 of `selector` followed by `markup`.
pub fn cache_key(markup: &str, selector: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(selector.as_bytes());
    hasher.update(markup.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

enum Role {
    Leader(OwnedRwLockWriteGuard<Option<FlightResult>>, Flight),
    Follower(Flight),
}

/// Content-addressed, single-flight cache in front of a [`TextMetricsProvider`].
///
/// Concurrent misses on one key share a single provider call. Successful measurements are
/// corrected and written to the store; failures reach every waiter of that flight and are not
/// remembered, so the next caller measures again.
pub struct MetricsCache {
    provider: Arc<dyn TextMetricsProvider>,
    store: Arc<dyn MetricsStore>,
    options: MetricsCacheOptions,
    flights: Mutex<FxHashMap<String, Flight>>,
}

impl std::fmt::Debug for MetricsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCache")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MetricsCache {
    /// Builds a cache without touching the store. Call [`MetricsCache::open`] when the store
    /// needs loading.
    pub fn new(
        provider: Arc<dyn TextMetricsProvider>,
        store: Arc<dyn MetricsStore>,
        options: MetricsCacheOptions,
    ) -> Self {
        Self {
            provider,
            store,
            options,
            flights: Mutex::new(FxHashMap::default()),
        }
    }

    /// Opens `store` and returns a cache ready to serve requests.
    pub async fn open(
        provider: Arc<dyn TextMetricsProvider>,
        store: Arc<dyn MetricsStore>,
        options: MetricsCacheOptions,
    ) -> Result<Self> {
        store.open().await?;
        Ok(Self::new(provider, store, options))
    }

    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }

    pub fn options(&self) -> &MetricsCacheOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn MetricsStore> {
        &self.store
    }

    /// Corrected size of the first element matching `selector` in `markup`.
    pub async fn measure(&self, markup: &str, selector: &str) -> Result<TextSize> {
        let key = cache_key(markup, selector);
        if let Some(size) = self.store.get(&key).await? {
            tracing::debug!(%key, selector, "text metrics cache hit");
            return Ok(size);
        }

        loop {
            match self.join_or_lead(&key).await {
                Role::Leader(guard, flight) => {
                    return self.lead(&key, markup, selector, guard, &flight).await;
                }
                Role::Follower(flight) => {
                    tracing::debug!(%key, selector, "joining in-flight measurement");
                    let outcome = flight.read().await.clone();
                    match outcome {
                        Some(Ok(size)) => return Ok(size),
                        Some(Err(e)) => return Err(e.into()),
                        // The leader was dropped before finishing; take over.
                        None => self.forget_flight(&key, &flight).await,
                    }
                }
            }
        }
    }

    /// Measures every `(markup, selector)` pair concurrently, failing on the first error.
    pub async fn measure_many(&self, requests: &[(&str, &str)]) -> Result<Vec<TextSize>> {
        futures::future::try_join_all(
            requests
                .iter()
                .map(|(markup, selector)| self.measure(markup, selector)),
        )
        .await
    }

    async fn join_or_lead(&self, key: &str) -> Role {
        let mut flights = self.flights.lock().await;
        if let Some(flight) = flights.get(key) {
            return Role::Follower(flight.clone());
        }
        let flight: Flight = Arc::new(RwLock::new(None));
        match flight.clone().try_write_owned() {
            Ok(guard) => {
                flights.insert(key.to_string(), flight.clone());
                Role::Leader(guard, flight)
            }
            // Unreachable for a lock nobody else has seen; treat as a join.
            Err(_) => Role::Follower(flight),
        }
    }

    async fn lead(
        &self,
        key: &str,
        markup: &str,
        selector: &str,
        mut guard: OwnedRwLockWriteGuard<Option<FlightResult>>,
        flight: &Flight,
    ) -> Result<TextSize> {
        // A previous flight may have completed between the store lookup and taking the lead.
        if let Some(size) = self.store.get(key).await? {
            *guard = Some(Ok(size));
            self.forget_flight(key, flight).await;
            return Ok(size);
        }

        tracing::debug!(%key, selector, "text metrics cache miss");
        let outcome = self.measure_corrected(markup, selector).await;
        match &outcome {
            Ok(size) => {
                if let Err(e) = self.store.put(key, *size).await {
                    tracing::warn!(%key, error = %e, "failed to store text metrics");
                }
            }
            Err(e) => tracing::warn!(%key, selector, error = %e, "text measurement failed"),
        }

        *guard = Some(outcome.clone());
        self.forget_flight(key, flight).await;
        drop(guard);
        outcome.map_err(Error::from)
    }

    async fn measure_corrected(&self, markup: &str, selector: &str) -> FlightResult {
        let call = self.provider.measure_raw(markup, selector);
        let raw = if self.options.timeout_ms == 0 {
            call.await?
        } else {
            let limit = Duration::from_millis(self.options.timeout_ms);
            tokio::time::timeout(limit, call)
                .await
                .map_err(|_| MeasurementError::Timeout {
                    timeout_ms: self.options.timeout_ms,
                })??
        };
        Ok(raw.sanitized().scaled(self.options.correction_factor))
    }

    async fn forget_flight(&self, key: &str, flight: &Flight) {
        let mut flights = self.flights.lock().await;
        if flights.get(key).is_some_and(|f| Arc::ptr_eq(f, flight)) {
            flights.remove(key);
        }
    }

    #[cfg(test)]
    pub(crate) async fn in_flight(&self) -> usize {
        self.flights.lock().await.len()
    }
}
