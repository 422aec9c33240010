// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! An in-process translation cache kept coherent across a cluster.
//!
//! Every process holds translations in memory, grouped by translation domain
//! and locale. Processes agree on a single *generation* number stored under
//! one key of a coordination store such as etcd:
//!
//! - At startup a cache adopts the shared generation, or seeds the key with
//!   its own if the key is empty.
//! - At most once per check interval (60 seconds by default), a lookup reads
//!   the shared generation. If it is newer than the local one, the local cache
//!   is dropped and refilled lazily from the translation source.
//! - [`ClusterCache::delete`] drops the local cache and publishes a newer
//!   generation, so every peer rebuilds on its next check.
//!
//! The coordination store is never on the critical path. When it cannot be
//! reached the cache keeps serving from memory and stops checking, which
//! trades coherence for availability.
//!
//! # Examples
//!
//! ```
//! # #[cfg(feature = "test-util")]
//! # futures::executor::block_on(async {
//! use cluster_cache::{ClusterCache, Entry};
//! use cluster_cache::testing::MockGenerationStore;
//! use tick::Clock;
//!
//! let shared = MockGenerationStore::new();
//! let clock = Clock::new_frozen();
//! let web = ClusterCache::builder::<String>(clock.clone()).build_with_store(shared.clone()).await;
//! let worker = ClusterCache::builder::<String>(clock).build_with_store(shared).await;
//!
//! let english = web.switch_to("messages", "en");
//! let title = english
//!     .fetch("title", || async { Ok::<_, std::io::Error>(Some("Welcome".to_string())) })
//!     .await?;
//! assert_eq!(title.as_deref(), Some("Welcome"));
//!
//! // A missing translation is remembered too.
//! let missing = english.fetch("unknown", || async { Ok::<_, std::io::Error>(None) }).await?;
//! assert_eq!(missing, None);
//! assert_eq!(english.get("unknown"), Some(Entry::Negative));
//!
//! // Both caches started from the same shared generation.
//! assert_eq!(web.local_generation(), worker.local_generation());
//! # Ok::<(), std::io::Error>(())
//! # });
//! ```
//!
//! Production code builds against an etcd v2 key:
//!
//! ```no_run
//! use cluster_cache::ClusterCache;
//! use tick::Clock;
//!
//! # async fn run() -> Result<(), cluster_cache::ConfigError> {
//! let cache = ClusterCache::builder::<String>(Clock::new_tokio())
//!     .endpoint("http://127.0.0.1:2379/v2/keys/translations/generation")
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `metrics`: counts cache activity on an OpenTelemetry counter.
//! - `test-util`: exposes `testing::MockGenerationStore`.

mod builder;
mod cache;
mod config;
mod context;
mod error;
mod generation;
mod remote;
mod staleness;
mod store;
mod telemetry;

#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use builder::ClusterCacheBuilder;
#[doc(inline)]
pub use cache::{ClusterCache, Translations};
#[doc(inline)]
pub use config::ClusterCacheConfig;
#[doc(inline)]
pub use context::ContextKey;
#[doc(inline)]
pub use error::ConfigError;
#[doc(inline)]
pub use generation::{Generation, RemoteGeneration};
#[doc(inline)]
pub use remote::{Endpoint, EtcdGenerationStore, GenerationStore};
#[doc(inline)]
pub use staleness::Staleness;
#[doc(inline)]
pub use store::Entry;
#[doc(inline)]
pub use telemetry::{CacheName, CacheTelemetry};
