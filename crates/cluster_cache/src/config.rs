// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deserializable cache settings.

use std::time::Duration;

use serde::Deserialize;

use crate::telemetry::CacheName;

pub(crate) const DEFAULT_NAME: CacheName = "cluster_cache";
pub(crate) const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cache settings as they appear in an application's configuration file.
///
/// Missing fields take their defaults. Apply with
/// [`ClusterCacheBuilder::config`](crate::ClusterCacheBuilder::config).
///
/// # Examples
///
/// ```
/// use cluster_cache::ClusterCacheConfig;
/// use std::time::Duration;
///
/// let config: ClusterCacheConfig = serde_json::from_str(r#"{ "check_interval_secs": 30 }"#).unwrap();
/// assert_eq!(config.check_interval(), Duration::from_secs(30));
/// assert_eq!(config.request_timeout(), Duration::from_secs(10));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterCacheConfig {
    /// URL of the key holding the shared generation.
    pub endpoint: Option<String>,
    /// Minimum seconds between two staleness checks.
    pub check_interval_secs: u64,
    /// Timeout in seconds for one coordination store request.
    pub request_timeout_secs: u64,
    /// Seconds after which a degraded cache probes the store again. Absent
    /// means never.
    pub degraded_recovery_secs: Option<u64>,
}

impl ClusterCacheConfig {
    /// Minimum time between two staleness checks.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Timeout for one coordination store request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Recovery window for a degraded cache, if any.
    #[must_use]
    pub fn degraded_recovery(&self) -> Option<Duration> {
        self.degraded_recovery_secs.map(Duration::from_secs)
    }
}

impl Default for ClusterCacheConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            check_interval_secs: DEFAULT_CHECK_INTERVAL.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            degraded_recovery_secs: None,
        }
    }
}
