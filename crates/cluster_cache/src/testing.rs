// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory coordination store for tests.
//!
//! [`MockGenerationStore`] behaves like a shared key: clones observe the same
//! value, so several caches built on clones of one mock act like nodes of a
//! cluster. Every call is recorded and reads can be made to fail on demand.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Generation, GenerationStore, RemoteGeneration};

/// Recorded coordination store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// A read of the shared generation.
    Read,
    /// A write of the given generation.
    Write(Generation),
}

type FailPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

/// A scriptable [`GenerationStore`] for tests.
///
/// # Examples
///
/// ```
/// use cluster_cache::{Generation, GenerationStore, RemoteGeneration};
/// use cluster_cache::testing::{MockGenerationStore, StoreOp};
/// # futures::executor::block_on(async {
///
/// let store = MockGenerationStore::new();
/// assert_eq!(store.read().await, RemoteGeneration::Unknown);
///
/// store.write(Generation::new(10)).await;
/// assert_eq!(store.read().await, RemoteGeneration::Known(Generation::new(10)));
///
/// store.fail_when(|op| matches!(op, StoreOp::Read));
/// assert_eq!(store.read().await, RemoteGeneration::Unavailable);
/// assert_eq!(store.reads(), 3);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockGenerationStore {
    value: Arc<Mutex<Option<Generation>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
}

impl std::fmt::Debug for MockGenerationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockGenerationStore")
            .field("value", &self.value)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl MockGenerationStore {
    /// Creates a store whose key was never written.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `generation`.
    #[must_use]
    pub fn with_generation(generation: Generation) -> Self {
        let store = Self::new();
        store.set_generation(generation);
        store
    }

    /// Overwrites the stored value without recording an operation, as a peer would.
    pub fn set_generation(&self, generation: Generation) {
        *self.value.lock() = Some(generation);
    }

    /// Removes the stored value, as if the key expired or was deleted.
    pub fn clear_generation(&self) {
        *self.value.lock() = None;
    }

    /// The stored value, if any.
    #[must_use]
    pub fn generation(&self) -> Option<Generation> {
        *self.value.lock()
    }

    /// Makes matching operations fail: reads report unavailability, writes are dropped.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Lets every operation succeed again.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns all recorded operations in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Forgets all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Number of recorded reads.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.operations.lock().iter().filter(|op| matches!(op, StoreOp::Read)).count()
    }

    /// Generations written so far, in call order.
    #[must_use]
    pub fn writes(&self) -> Vec<Generation> {
        self.operations
            .lock()
            .iter()
            .filter_map(|op| match op {
                StoreOp::Write(generation) => Some(*generation),
                StoreOp::Read => None,
            })
            .collect()
    }

    fn record(&self, op: StoreOp) -> bool {
        self.operations.lock().push(op);
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op))
    }
}

impl GenerationStore for MockGenerationStore {
    async fn read(&self) -> RemoteGeneration {
        if self.record(StoreOp::Read) {
            return RemoteGeneration::Unavailable;
        }
        self.generation().map_or(RemoteGeneration::Unknown, RemoteGeneration::Known)
    }

    async fn write(&self, generation: Generation) {
        if !self.record(StoreOp::Write(generation)) {
            self.set_generation(generation);
        }
    }
}
