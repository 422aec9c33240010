// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache construction.

/// The cache configuration is unusable.
///
/// This is the only error the cache reports on its own. It surfaces when the
/// coordination store endpoint was never configured, cannot be parsed, or the
/// HTTP client for it cannot be created. Coordination store outages are never
/// reported as errors; the cache degrades instead.
///
/// # Example
///
/// ```
/// use cluster_cache::{ClusterCache, ConfigError};
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let result = ClusterCache::builder::<String>(Clock::new_frozen()).build().await;
/// let error: ConfigError = result.unwrap_err();
/// assert!(error.to_string().contains("endpoint"));
/// # });
/// ```
#[ohno::error]
#[display("invalid cluster cache configuration: {reason}")]
pub struct ConfigError {
    reason: String,
}

impl ConfigError {
    pub(crate) fn missing_endpoint() -> Self {
        Self::new("no coordination store endpoint configured")
    }

    /// Returns the human-readable reason the configuration was rejected.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_mentions_endpoint() {
        let error = ConfigError::missing_endpoint();
        assert!(error.reason().contains("endpoint"));
        assert!(error.to_string().contains("no coordination store endpoint configured"));
    }

    #[test]
    fn caused_by_includes_cause_in_display() {
        let error = ConfigError::caused_by("bad endpoint", "relative URL without a base");
        let display = error.to_string();
        assert!(display.contains("bad endpoint"), "got: {display}");
        assert!(display.contains("relative URL without a base"), "got: {display}");
    }
}
