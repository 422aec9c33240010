// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Access to the cluster-wide generation counter.
//!
//! [`GenerationStore`] is the seam between the cache and the coordination
//! store. [`EtcdGenerationStore`] speaks the etcd v2 keys protocol over HTTP;
//! tests plug in `MockGenerationStore` instead.

mod endpoint;
mod etcd;

pub use endpoint::Endpoint;
pub use etcd::EtcdGenerationStore;

use crate::{Generation, RemoteGeneration};

/// Reads and writes the single generation value shared by every node.
///
/// Implementations never fail: unreachable stores are reported through
/// [`RemoteGeneration::Unavailable`] on reads, and writes are best effort.
///
/// # Examples
///
/// ```
/// use cluster_cache::{Generation, GenerationStore, RemoteGeneration};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// struct InProcess(AtomicU64);
///
/// impl GenerationStore for InProcess {
///     async fn read(&self) -> RemoteGeneration {
///         match self.0.load(Ordering::Acquire) {
///             0 => RemoteGeneration::Unknown,
///             seconds => RemoteGeneration::Known(Generation::new(seconds)),
///         }
///     }
///
///     async fn write(&self, generation: Generation) {
///         self.0.store(generation.as_secs(), Ordering::Release);
///     }
/// }
/// ```
pub trait GenerationStore: Send + Sync {
    /// Reads the current shared generation.
    fn read(&self) -> impl Future<Output = RemoteGeneration> + Send;

    /// Publishes `generation` as the shared generation, ignoring failures.
    fn write(&self, generation: Generation) -> impl Future<Output = ()> + Send;
}
