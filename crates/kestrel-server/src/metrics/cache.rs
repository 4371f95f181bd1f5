//! Cache metrics recording.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registra las metricas de cache.
/// Llamar una vez al inicio para registrar las metricas.
pub fn register_cache_metrics() {
    metrics::describe_counter!("kestrel_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!("kestrel_cache_misses_total", "Total number of cache misses");
    metrics::describe_counter!(
        "kestrel_cache_store_errors_total",
        "Store failures absorbed by the cache layer"
    );
    metrics::describe_counter!(
        "kestrel_cache_malformed_total",
        "Cached payloads that failed to deserialize"
    );
    metrics::describe_counter!(
        "kestrel_cache_invalidated_keys_total",
        "Keys removed by invalidation"
    );
    metrics::describe_histogram!(
        "kestrel_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Recorder de metricas de cache.
///
/// Keeps local atomic counters next to the global recorder so the hit rate
/// can be logged without scraping.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un cache hit
    pub fn record_hit(&self, namespace: &'static str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("kestrel_cache_hits_total", "namespace" => namespace).increment(1);
    }

    /// Registra un cache miss
    pub fn record_miss(&self, namespace: &'static str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("kestrel_cache_misses_total", "namespace" => namespace).increment(1);
    }

    /// Records a store failure absorbed on the given operation.
    pub fn record_store_error(&self, operation: &'static str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!("kestrel_cache_store_errors_total", "operation" => operation).increment(1);
    }

    /// Records a payload that could not be decoded.
    pub fn record_malformed(&self, namespace: &'static str) {
        counter!("kestrel_cache_malformed_total", "namespace" => namespace).increment(1);
    }

    /// Records keys removed by an invalidation.
    pub fn record_invalidated(&self, count: u64) {
        counter!("kestrel_cache_invalidated_keys_total").increment(count);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!("kestrel_cache_operation_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Calcula hit rate (para logging/debugging)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Store failures seen so far.
    pub fn store_errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metrics_hit_rate() {
        let metrics = CacheMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_hit("user");
        metrics.record_hit("user");
        metrics.record_hit("admin");
        metrics.record_miss("admin");

        assert!((metrics.hit_rate() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_counters_are_shared_between_clones() {
        let metrics = CacheMetrics::new();
        let clone = metrics.clone();

        clone.record_miss("user");
        clone.record_store_error("get");

        assert_eq!(metrics.misses(), 1);
        assert_eq!(metrics.store_errors(), 1);
        assert_eq!(metrics.hit_rate(), 0.0);
    }
}
