// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tick::{Clock, FutureExt};

use super::{Endpoint, GenerationStore};
use crate::{ConfigError, Generation, RemoteGeneration};

/// Body of an etcd v2 `GET /v2/keys/<key>` response; only the value matters.
#[derive(Debug, Deserialize)]
struct KeyResponse {
    node: KeyNode,
}

#[derive(Debug, Deserialize)]
struct KeyNode {
    value: serde_json::Value,
}

impl KeyResponse {
    fn generation(&self) -> Option<Generation> {
        match &self.node.value {
            serde_json::Value::String(text) => text.parse().ok(),
            serde_json::Value::Number(number) => number.as_u64().map(Generation::new),
            _ => None,
        }
    }
}

/// A [`GenerationStore`] backed by an etcd v2 compatible HTTP key.
///
/// - `GET` with `200` reads the generation from `node.value`.
/// - `GET` with `404` reports [`RemoteGeneration::Unknown`].
/// - Any other status, a transport error, an unreadable body or a request that
///   outlives the timeout reports [`RemoteGeneration::Unavailable`].
/// - `PUT` sends the form field `value=<generation>` and ignores the outcome.
///
/// The timeout is measured with the supplied [`Clock`].
#[derive(Clone, Debug)]
pub struct EtcdGenerationStore {
    endpoint: Endpoint,
    client: Client,
    clock: Clock,
    timeout: Duration,
}

impl EtcdGenerationStore {
    /// Creates a store client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be initialized.
    pub fn new(endpoint: Endpoint, clock: Clock, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::caused_by("cannot create the coordination store HTTP client", e))?;
        Ok(Self::with_client(endpoint, client, clock, timeout))
    }

    /// Creates a store client that reuses an existing HTTP client.
    #[must_use]
    pub fn with_client(endpoint: Endpoint, client: Client, clock: Clock, timeout: Duration) -> Self {
        Self {
            endpoint,
            client,
            clock,
            timeout,
        }
    }

    /// The key URL this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn fetch(&self) -> RemoteGeneration {
        let response = match self.client.get(self.endpoint.url().clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "generation read failed");
                return RemoteGeneration::Unavailable;
            }
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return RemoteGeneration::Unknown,
            status => {
                tracing::debug!(endpoint = %self.endpoint, %status, "generation read rejected");
                return RemoteGeneration::Unavailable;
            }
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "generation body unreadable");
                return RemoteGeneration::Unavailable;
            }
        };

        match serde_json::from_slice::<KeyResponse>(&body).ok().and_then(|r| r.generation()) {
            Some(generation) => RemoteGeneration::Known(generation),
            None => {
                tracing::debug!(endpoint = %self.endpoint, "generation body is not a number");
                RemoteGeneration::Unavailable
            }
        }
    }

    async fn publish(&self, generation: Generation) {
        let form = [("value", generation.to_string())];
        match self.client.put(self.endpoint.url().clone()).form(&form).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::debug!(endpoint = %self.endpoint, status = %response.status(), "generation write rejected");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(endpoint = %self.endpoint, error = %e, "generation write failed"),
        }
    }
}

impl GenerationStore for EtcdGenerationStore {
    async fn read(&self) -> RemoteGeneration {
        if let Ok(remote) = self.fetch().timeout(&self.clock, self.timeout).await {
            remote
        } else {
            tracing::debug!(endpoint = %self.endpoint, timeout = ?self.timeout, "generation read timed out");
            RemoteGeneration::Unavailable
        }
    }

    async fn write(&self, generation: Generation) {
        if self.publish(generation).timeout(&self.clock, self.timeout).await.is_err() {
            tracing::debug!(endpoint = %self.endpoint, timeout = ?self.timeout, "generation write timed out");
        }
    }
}
