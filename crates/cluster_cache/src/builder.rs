// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`ClusterCache`].

use std::{marker::PhantomData, time::Duration};

use tick::Clock;

use crate::{
    ClusterCache, ConfigError, Endpoint, EtcdGenerationStore, GenerationStore,
    config::{ClusterCacheConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_NAME, DEFAULT_REQUEST_TIMEOUT},
    staleness::StalenessPolicy,
    telemetry::{CacheName, CacheTelemetry},
};

/// Builder for constructing a [`ClusterCache`].
///
/// Created by calling [`ClusterCache::builder`]. Every setting has a default
/// except the coordination store endpoint, which [`build`](Self::build)
/// requires. [`build_with_store`](Self::build_with_store) skips the endpoint
/// and uses the given store instead.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # futures::executor::block_on(async {
/// use cluster_cache::ClusterCache;
/// use cluster_cache::testing::MockGenerationStore;
/// use std::time::Duration;
/// use tick::Clock;
///
/// let cache = ClusterCache::builder::<String>(Clock::new_frozen())
///     .name("catalog")
///     .check_interval(Duration::from_secs(30))
///     .build_with_store(MockGenerationStore::new())
///     .await;
///
/// assert_eq!(cache.name(), "catalog");
/// # });
/// ```
#[derive(Debug)]
pub struct ClusterCacheBuilder<V> {
    clock: Clock,
    name: CacheName,
    endpoint: Option<String>,
    check_interval: Duration,
    request_timeout: Duration,
    degraded_recovery: Option<Duration>,
    telemetry: CacheTelemetry,
    _phantom: PhantomData<V>,
}

impl<V> ClusterCacheBuilder<V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            name: DEFAULT_NAME,
            endpoint: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            degraded_recovery: None,
            telemetry: CacheTelemetry::new(),
            _phantom: PhantomData,
        }
    }

    /// Sets the name reported in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets the URL of the key holding the shared generation.
    ///
    /// The URL is validated by [`build`](Self::build).
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the minimum time between two staleness checks.
    ///
    /// Defaults to 60 seconds.
    #[must_use]
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the timeout for one request to the coordination store.
    ///
    /// Defaults to 10 seconds. Only used by [`build`](Self::build); stores
    /// passed to [`build_with_store`](Self::build_with_store) bring their own.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Lets a degraded cache probe the coordination store again once `window`
    /// has passed since it became degraded.
    ///
    /// By default a degraded cache never checks again until the process
    /// restarts.
    #[must_use]
    pub fn degraded_recovery(mut self, window: Duration) -> Self {
        self.degraded_recovery = Some(window);
        self
    }

    /// Sets the telemetry sink for cache events.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CacheTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Applies every setting present in `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cluster_cache::{ClusterCache, ClusterCacheConfig};
    /// use tick::Clock;
    ///
    /// let config: ClusterCacheConfig = serde_json::from_str(
    ///     r#"{ "endpoint": "http://127.0.0.1:2379/v2/keys/translations" }"#,
    /// )
    /// .unwrap();
    ///
    /// let builder = ClusterCache::builder::<String>(Clock::new_frozen()).config(&config);
    /// ```
    #[must_use]
    pub fn config(mut self, config: &ClusterCacheConfig) -> Self {
        if let Some(endpoint) = &config.endpoint {
            self.endpoint = Some(endpoint.clone());
        }
        self.check_interval = config.check_interval();
        self.request_timeout = config.request_timeout();
        self.degraded_recovery = config.degraded_recovery();
        self
    }
}

impl<V> ClusterCacheBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Builds a cache backed by the configured etcd key.
    ///
    /// This performs the initial synchronization with the coordination store,
    /// so it waits for at most one read and one write, each bounded by the
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no endpoint was configured, when it is not
    /// an absolute HTTP(S) URL, or when the HTTP client cannot be created.
    pub async fn build(self) -> Result<ClusterCache<V>, ConfigError> {
        let endpoint = self.endpoint.as_deref().ok_or_else(ConfigError::missing_endpoint)?;
        let endpoint = Endpoint::parse(endpoint)?;
        let store = EtcdGenerationStore::new(endpoint, self.clock.clone(), self.request_timeout)?;
        Ok(self.build_with_store(store).await)
    }

    /// Builds a cache backed by `store`, ignoring any configured endpoint.
    pub async fn build_with_store<S>(self, store: S) -> ClusterCache<V, S>
    where
        S: GenerationStore,
    {
        let policy = StalenessPolicy::new(self.clock.clone(), self.check_interval, self.degraded_recovery);
        ClusterCache::start(self.name, self.clock, store, policy, self.telemetry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Staleness, testing::MockGenerationStore};
    use futures::executor::block_on;

    #[test]
    fn defaults() {
        let builder = ClusterCache::builder::<String>(Clock::new_frozen());
        assert_eq!(builder.name, "cluster_cache");
        assert_eq!(builder.check_interval, Duration::from_secs(60));
        assert_eq!(builder.request_timeout, Duration::from_secs(10));
        assert!(builder.endpoint.is_none());
        assert!(builder.degraded_recovery.is_none());
    }

    #[test]
    fn build_without_endpoint_fails() {
        let error = block_on(ClusterCache::builder::<String>(Clock::new_frozen()).build()).unwrap_err();
        assert!(error.reason().contains("endpoint"));
    }

    #[test]
    fn build_with_relative_endpoint_fails() {
        let result = block_on(
            ClusterCache::builder::<String>(Clock::new_frozen())
                .endpoint("v2/keys/translations")
                .build(),
        );
        result.unwrap_err();
    }

    #[test]
    fn config_overrides_settings() {
        let config = ClusterCacheConfig {
            endpoint: Some("http://127.0.0.1:2379/v2/keys/t".to_string()),
            check_interval_secs: 5,
            request_timeout_secs: 1,
            degraded_recovery_secs: Some(300),
        };
        let builder = ClusterCache::builder::<String>(Clock::new_frozen()).config(&config);
        assert_eq!(builder.endpoint.as_deref(), Some("http://127.0.0.1:2379/v2/keys/t"));
        assert_eq!(builder.check_interval, Duration::from_secs(5));
        assert_eq!(builder.request_timeout, Duration::from_secs(1));
        assert_eq!(builder.degraded_recovery, Some(Duration::from_secs(300)));
    }

    #[test]
    fn config_without_endpoint_keeps_builder_endpoint() {
        let config = ClusterCacheConfig::default();
        let builder = ClusterCache::builder::<String>(Clock::new_frozen())
            .endpoint("http://127.0.0.1:2379/v2/keys/t")
            .config(&config);
        assert_eq!(builder.endpoint.as_deref(), Some("http://127.0.0.1:2379/v2/keys/t"));
    }

    #[test]
    fn degraded_recovery_is_applied() {
        let control = tick::ClockControl::new();
        let store = MockGenerationStore::new();
        store.fail_when(|_| true);

        let cache = block_on(
            ClusterCache::builder::<String>(control.to_clock())
                .check_interval(Duration::from_secs(1))
                .degraded_recovery(Duration::from_secs(30))
                .build_with_store(store.clone()),
        );
        assert_eq!(cache.staleness(), Staleness::Degraded);

        store.clear_failures();
        control.advance(Duration::from_secs(31));
        block_on(cache.fetch(&("d", "l").into(), "k", || async { Ok::<_, ()>(None) })).unwrap();
        assert_eq!(cache.staleness(), Staleness::Fresh);
    }
}
