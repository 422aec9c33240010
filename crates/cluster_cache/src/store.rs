// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Process-local storage: domain, then locale, then message key.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::{ContextKey, Generation};

/// The reserved key of the translation catalog header. It is never looked up.
pub(crate) const META_KEY: &str = "";

/// What the cache knows about a message key that has been looked up.
///
/// A key that was never looked up has no entry at all, which keeps "not yet
/// looked up" apart from "looked up, nothing found".
///
/// # Examples
///
/// ```
/// use cluster_cache::Entry;
///
/// assert_eq!(Entry::from_option(Some("Hallo")), Entry::Present("Hallo"));
/// assert_eq!(Entry::<&str>::from_option(None), Entry::Negative);
/// assert_eq!(Entry::Present(1).into_option(), Some(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Entry<V> {
    /// The lookup ran and produced nothing.
    Negative,
    /// The lookup produced a value.
    Present(V),
}

impl<V> Entry<V> {
    /// Wraps the result of a lookup.
    pub fn from_option(value: Option<V>) -> Self {
        value.map_or(Self::Negative, Self::Present)
    }

    /// Returns the value, or `None` for a negative entry.
    pub fn into_option(self) -> Option<V> {
        match self {
            Self::Negative => None,
            Self::Present(value) => Some(value),
        }
    }

    /// Borrows the value, or `None` for a negative entry.
    pub fn as_option(&self) -> Option<&V> {
        match self {
            Self::Negative => None,
            Self::Present(value) => Some(value),
        }
    }

    /// Returns `true` for a negative entry.
    pub fn is_negative(&self) -> bool {
        matches!(self, Self::Negative)
    }
}

/// A single-initialisation cell shared by every fetch of the same key.
pub(crate) type Slot<V> = Arc<OnceCell<Entry<V>>>;

/// The flat key space of one context.
#[derive(Debug)]
pub(crate) struct ContextMap<V> {
    entries: RwLock<HashMap<String, Slot<V>>>,
}

impl<V> ContextMap<V> {
    fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(META_KEY.to_owned(), Arc::new(OnceCell::new_with(Some(Entry::Negative))));
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns the slot for `key`, creating an empty one if the key was never seen.
    pub(crate) fn slot(&self, key: &str) -> Slot<V> {
        if let Some(slot) = self.entries.read().get(key) {
            return Arc::clone(slot);
        }
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(key.to_owned()).or_default())
    }

    /// Returns the entry for `key` if its lookup has completed.
    pub(crate) fn get(&self, key: &str) -> Option<Entry<V>>
    where
        V: Clone,
    {
        self.entries.read().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Replaces whatever is stored under `key`. The meta key cannot be replaced.
    pub(crate) fn set(&self, key: &str, entry: Entry<V>) -> bool {
        if key == META_KEY {
            return false;
        }
        let slot = Arc::new(OnceCell::new_with(Some(entry)));
        self.entries.write().insert(key.to_owned(), slot);
        true
    }

    /// Number of keys with a stored or in-flight entry, including the meta key.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// All contexts of the process, stamped with the generation they were built at.
#[derive(Debug)]
pub(crate) struct LocalStore<V> {
    generation: Generation,
    domains: HashMap<String, HashMap<String, Arc<ContextMap<V>>>>,
}

impl<V> LocalStore<V> {
    pub(crate) fn new(generation: Generation) -> Self {
        Self {
            generation,
            domains: HashMap::new(),
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    /// Drops every context and restamps the store.
    ///
    /// Contexts are rebuilt lazily by the next [`context`](Self::context) call.
    /// Handles to old contexts that are still in use keep working but are no
    /// longer reachable from the store.
    pub(crate) fn reload(&mut self, generation: Generation) {
        self.domains.clear();
        self.generation = generation;
    }

    /// Returns the context if it already exists.
    pub(crate) fn existing(&self, context: &ContextKey) -> Option<Arc<ContextMap<V>>> {
        self.domains
            .get(context.domain())
            .and_then(|locales| locales.get(context.locale()))
            .map(Arc::clone)
    }

    /// Returns the context, creating an empty one if needed.
    pub(crate) fn context(&mut self, context: &ContextKey) -> Arc<ContextMap<V>> {
        let locales = self.domains.entry(context.domain().to_owned()).or_default();
        Arc::clone(
            locales
                .entry(context.locale().to_owned())
                .or_insert_with(|| Arc::new(ContextMap::new())),
        )
    }

    pub(crate) fn context_count(&self) -> usize {
        self.domains.values().map(HashMap::len).sum()
    }
}
