// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use reqwest::Url;

use crate::ConfigError;

/// The URL of the coordination store key that holds the shared generation.
///
/// # Examples
///
/// ```
/// use cluster_cache::Endpoint;
///
/// let endpoint = Endpoint::etcd_v2("http://127.0.0.1:2379/", "translations")?;
/// assert_eq!(endpoint.as_str(), "http://127.0.0.1:2379/v2/keys/translations");
///
/// let endpoint: Endpoint = "http://etcd:4001/v2/keys/i18n".parse()?;
/// assert_eq!(endpoint.as_str(), "http://etcd:4001/v2/keys/i18n");
/// # Ok::<(), cluster_cache::ConfigError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parses the full URL of the generation key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `uri` is not an absolute `http` or `https` URL.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(uri.trim()).map_err(|e| ConfigError::caused_by(format!("invalid endpoint `{uri}`"), e))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(Self(url)),
            _ => Err(ConfigError::new(format!("endpoint `{uri}` must be an absolute http(s) URL"))),
        }
    }

    /// Builds the etcd v2 key URL `<base>/v2/keys/<namespace>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `base` is not an absolute `http` or `https` URL
    /// or `namespace` is empty.
    pub fn etcd_v2(base: &str, namespace: &str) -> Result<Self, ConfigError> {
        let namespace = namespace.trim_matches('/');
        if namespace.is_empty() {
            return Err(ConfigError::new("the generation namespace must not be empty"));
        }
        Self::parse(&format!("{}/v2/keys/{namespace}", base.trim().trim_end_matches('/')))
    }

    /// The endpoint as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub(crate) fn url(&self) -> &Url {
        &self.0
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
