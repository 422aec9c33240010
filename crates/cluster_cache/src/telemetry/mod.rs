// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and optional OpenTelemetry metrics for cache activity.
//!
//! Every activity is emitted as a `tracing` event named `cluster_cache.event`.
//! With the `metrics` feature, activities are also counted on an
//! OpenTelemetry counter tagged with the cache name and activity.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, MeterProvider},
};

use crate::Generation;

pub(crate) mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

/// Name used to tell cache instances apart in logs and metrics.
pub type CacheName = &'static str;

/// Telemetry sink for a cluster cache.
///
/// Logging through `tracing` is always on; filter it with the subscriber.
/// Metrics are recorded only once a meter provider has been attached.
#[derive(Clone, Debug, Default)]
pub struct CacheTelemetry {
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
}

impl CacheTelemetry {
    /// Creates telemetry that only logs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts activities on a meter obtained from `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_metrics(self, provider: &dyn MeterProvider) -> Self {
        let meter = metrics::create_meter(provider);
        Self {
            event_counter: Some(metrics::create_event_counter(&meter)),
        }
    }

    pub(crate) fn record(&self, name: CacheName, activity: CacheActivity, generation: Generation) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(counter) = &self.event_counter {
            counter.add(
                1,
                &[
                    KeyValue::new(attributes::CACHE_NAME, name),
                    KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
                ],
            );
        }

        Self::emit(name, activity, generation);
    }

    fn emit(name: CacheName, activity: CacheActivity, generation: Generation) {
        let activity_name = activity.as_str();
        let generation = generation.as_secs();

        // Field names must match constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = name,
                    cache.activity = activity_name,
                    cache.generation = generation,
                    "cluster_cache.event"
                )
            };
        }

        match activity.level() {
            tracing::Level::WARN => emit_event!(warn),
            tracing::Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    /// The shared generation was missing and has been written.
    Seeded,
    /// The shared generation was taken over as the local one.
    Adopted,
    Check,
    Stale,
    Fresh,
    Degraded,
    Recovered,
    Reload,
    Hit,
    Miss,
    Negative,
    /// The local generation was written to the coordination store.
    Published,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seeded => "cluster_cache.seeded",
            Self::Adopted => "cluster_cache.adopted",
            Self::Check => "cluster_cache.check",
            Self::Stale => "cluster_cache.stale",
            Self::Fresh => "cluster_cache.fresh",
            Self::Degraded => "cluster_cache.degraded",
            Self::Recovered => "cluster_cache.recovered",
            Self::Reload => "cluster_cache.reload",
            Self::Hit => "cluster_cache.hit",
            Self::Miss => "cluster_cache.miss",
            Self::Negative => "cluster_cache.negative",
            Self::Published => "cluster_cache.published",
        }
    }

    pub fn level(self) -> tracing::Level {
        match self {
            Self::Check | Self::Fresh | Self::Hit | Self::Miss | Self::Negative => tracing::Level::DEBUG,
            Self::Seeded | Self::Adopted | Self::Stale | Self::Recovered | Self::Reload | Self::Published => tracing::Level::INFO,
            Self::Degraded => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::KeyValue;

    use super::testing::{LogCapture, MetricTester};
    use super::*;

    #[test]
    fn activity_names_are_namespaced() {
        let all = [
            CacheActivity::Seeded,
            CacheActivity::Adopted,
            CacheActivity::Check,
            CacheActivity::Stale,
            CacheActivity::Fresh,
            CacheActivity::Degraded,
            CacheActivity::Recovered,
            CacheActivity::Reload,
            CacheActivity::Hit,
            CacheActivity::Miss,
            CacheActivity::Negative,
            CacheActivity::Published,
        ];
        for activity in all {
            assert!(activity.as_str().starts_with("cluster_cache."), "{activity:?}");
        }
    }

    #[test]
    fn degraded_is_the_only_warning() {
        assert_eq!(CacheActivity::Degraded.level(), tracing::Level::WARN);
        assert_eq!(CacheActivity::Reload.level(), tracing::Level::INFO);
        assert_eq!(CacheActivity::Hit.level(), tracing::Level::DEBUG);
    }

    #[test]
    fn record_emits_log_fields() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        CacheTelemetry::new().record("translations", CacheActivity::Degraded, Generation::new(1_700_000_000));

        capture.assert_contains("WARN");
        capture.assert_contains("cluster_cache.event");
        capture.assert_contains(attributes::CACHE_NAME);
        capture.assert_contains(attributes::CACHE_ACTIVITY_NAME);
        capture.assert_contains(attributes::CACHE_GENERATION_NAME);
        capture.assert_contains("translations");
        capture.assert_contains(CacheActivity::Degraded.as_str());
        capture.assert_contains("1700000000");
    }

    #[test]
    fn record_counts_with_metrics() {
        let tester = MetricTester::new();
        let telemetry = CacheTelemetry::new().with_metrics(tester.meter_provider());

        telemetry.record("translations", CacheActivity::Reload, Generation::new(5));

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::CACHE_NAME, "translations"),
            KeyValue::new(attributes::CACHE_ACTIVITY_NAME, "cluster_cache.reload"),
        ]);
    }

    #[test]
    fn record_without_metrics_is_log_only() {
        let telemetry = CacheTelemetry::new();
        assert!(telemetry.event_counter.is_none());
        telemetry.record("translations", CacheActivity::Hit, Generation::new(5));
    }
}
