//! Metrics Surface: per-(operation, keyspace, shard, tablet-type) timings
//! and error counters.
//!
//! Each fan-out task is timed with `Instant::now()`/`elapsed()` and
//! recorded into a queryable in-memory family keyed on that four-part
//! tuple. A gateway embedding this crate is expected to drain these
//! periodically into its own metrics backend (Prometheus, statsd, …) —
//! this surface intentionally stays dependency-free rather than picking
//! one for them.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::target::{TabletType, Target};

/// The four-part key every metric is recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricsKey {
    pub operation: String,
    pub keyspace: String,
    pub shard: String,
    pub tablet_type: &'static str,
}

impl MetricsKey {
    pub fn new(operation: impl Into<String>, target: &Target) -> Self {
        Self {
            operation: operation.into(),
            keyspace: target.keyspace.clone(),
            shard: target.shard.clone(),
            tablet_type: target.tablet_type.as_str(),
        }
    }
}

/// In-memory timings + error-counter families.
///
/// The counter family's name is derived by appending `"ErrorCount"` to the
/// timings family name, or left empty if the timings family itself is
/// unnamed.
pub struct MetricsSurface {
    timings_name: String,
    timings: Mutex<HashMap<MetricsKey, Vec<Duration>>>,
    error_counts: Mutex<HashMap<MetricsKey, u64>>,
}

impl MetricsSurface {
    pub fn new(timings_name: impl Into<String>) -> Self {
        Self {
            timings_name: timings_name.into(),
            timings: Mutex::new(HashMap::new()),
            error_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn timings_name(&self) -> &str {
        &self.timings_name
    }

    /// The derived error-counter family name.
    pub fn error_count_name(&self) -> String {
        if self.timings_name.is_empty() {
            String::new()
        } else {
            format!("{}ErrorCount", self.timings_name)
        }
    }

    /// Record one timing sample. Called exactly once per action invocation,
    /// on every exit path including errors.
    pub fn record_timing(&self, key: MetricsKey, elapsed: Duration) {
        self.timings.lock().unwrap().entry(key).or_default().push(elapsed);
    }

    /// Increment the error counter for `key`. Callers must not call this
    /// for errors whose code is `IntegrityError`/`BadInput` — see
    /// [`VtErrorCode::is_client_caused`](crate::error::VtErrorCode::is_client_caused).
    pub fn record_error(&self, key: MetricsKey) {
        *self.error_counts.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    pub fn timing_count(&self, key: &MetricsKey) -> usize {
        self.timings.lock().unwrap().get(key).map(Vec::len).unwrap_or(0)
    }

    pub fn error_count(&self, key: &MetricsKey) -> u64 {
        *self.error_counts.lock().unwrap().get(key).unwrap_or(&0)
    }
}
