//! In-memory gauge store shared between the polling loop and the scrape
//! handler.
//!
//! Values live in a private prometheus registry owned by the store. Gauge
//! children are atomic floats, so writers for distinct keys never block each
//! other and a scrape never observes a half-written value. The store is
//! constructed once in `main` and shared by reference; there is no global
//! registry.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

/// Reserved gauge value meaning "no valid measurement".
///
/// Published for every configured endpoint before its first poll, and again
/// whenever a poll fails, so a series never disappears from the exposition.
pub const SENTINEL: f64 = -1.0;

const METRIC_NAME: &str = "dap_abi_cert_expired_day";
const METRIC_HELP: &str = "Difference in days between DateLimit and current date";

/// Identity of one metric series: endpoint address plus origin label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub url: String,
    pub origin: String,
}

impl MetricKey {
    pub fn new(url: &str, origin: &str) -> Self {
        MetricKey {
            url: url.to_string(),
            origin: origin.to_string(),
        }
    }
}

/// Concurrency-safe mapping from [`MetricKey`] to the current gauge value.
pub struct MetricStore {
    registry: Registry,
    days_remaining: GaugeVec,
    // Keys that hold a value. Only consulted by `initialize`/`snapshot`;
    // the values themselves are atomic gauge children.
    tracked: Mutex<HashSet<MetricKey>>,
}

impl MetricStore {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let days_remaining = GaugeVec::new(
            Opts::new(METRIC_NAME, METRIC_HELP),
            &["url", "origin_prometheus"],
        )?;
        registry.register(Box::new(days_remaining.clone()))?;
        Ok(MetricStore {
            registry,
            days_remaining,
            tracked: Mutex::new(HashSet::new()),
        })
    }

    /// Publishes the sentinel for `key` unless the key already holds a value.
    ///
    /// Must be called for every configured endpoint before the scrape
    /// endpoint starts serving. Idempotent: a second call is a no-op and
    /// never downgrades a real measurement.
    pub fn initialize(&self, key: &MetricKey) {
        let mut tracked = self.tracked.lock().unwrap();
        if tracked.insert(key.clone()) {
            self.gauge(key).set(SENTINEL);
        }
    }

    /// Unconditionally overwrites the value for `key`, creating the series
    /// if it does not exist yet.
    pub fn set(&self, key: &MetricKey, value: f64) {
        self.tracked.lock().unwrap().insert(key.clone());
        self.gauge(key).set(value);
    }

    /// Point-in-time view of every stored series.
    pub fn snapshot(&self) -> HashMap<MetricKey, f64> {
        let tracked = self.tracked.lock().unwrap();
        tracked
            .iter()
            .map(|key| (key.clone(), self.gauge(key).get()))
            .collect()
    }

    /// Renders the store in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn gauge(&self, key: &MetricKey) -> Gauge {
        self.days_remaining
            .with_label_values(&[&key.url, &key.origin])
    }
}
