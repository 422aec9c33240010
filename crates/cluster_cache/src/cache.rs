// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cluster-coherent translation cache.

use std::{fmt::Debug, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tick::Clock;

use crate::{
    ContextKey, Entry, Generation, GenerationStore, RemoteGeneration,
    builder::ClusterCacheBuilder,
    remote::EtcdGenerationStore,
    staleness::{Staleness, StalenessPolicy, Verdict},
    store::{ContextMap, LocalStore, META_KEY},
    telemetry::{CacheActivity, CacheName, CacheTelemetry},
};

/// A process-local translation cache that stays coherent with its peers.
///
/// Entries live in memory, keyed by translation domain, locale and message
/// key. Every node shares one generation number through a coordination store.
/// At most once per check interval, a lookup compares that number with the
/// generation this process built its cache at. If the shared one is newer,
/// the local cache is dropped and rebuilt lazily. [`delete`](Self::delete)
/// bumps the shared generation so that every peer rebuilds on its next check.
///
/// The coordination store is never required for lookups: when it cannot be
/// reached, the cache keeps serving what it has and stops checking.
///
/// A `ClusterCache` is `Send + Sync`; share it between request handlers with
/// an [`Arc`].
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # futures::executor::block_on(async {
/// use cluster_cache::ClusterCache;
/// use cluster_cache::testing::MockGenerationStore;
/// use tick::Clock;
///
/// let cache = ClusterCache::builder::<String>(Clock::new_frozen())
///     .build_with_store(MockGenerationStore::new())
///     .await;
///
/// let german = cache.switch_to("messages", "de");
/// let text = german
///     .fetch("Hello", || async { Ok::<_, std::io::Error>(Some("Hallo".to_string())) })
///     .await?;
/// assert_eq!(text.as_deref(), Some("Hallo"));
/// # Ok::<(), std::io::Error>(())
/// # });
/// ```
pub struct ClusterCache<V, S = EtcdGenerationStore> {
    name: CacheName,
    clock: Clock,
    remote: S,
    policy: Mutex<StalenessPolicy>,
    local: RwLock<LocalStore<V>>,
    telemetry: CacheTelemetry,
}

impl<V, S> Debug for ClusterCache<V, S>
where
    S: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCache")
            .field("name", &self.name)
            .field("remote", &self.remote)
            .field("policy", &self.policy)
            .field("generation", &self.local.read().generation())
            .finish_non_exhaustive()
    }
}

impl ClusterCache<(), ()> {
    /// Creates a cache builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use cluster_cache::ClusterCache;
    /// use std::time::Duration;
    /// use tick::Clock;
    ///
    /// let builder = ClusterCache::builder::<String>(Clock::new_frozen())
    ///     .endpoint("http://127.0.0.1:2379/v2/keys/translations")
    ///     .check_interval(Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn builder<V>(clock: Clock) -> ClusterCacheBuilder<V> {
        ClusterCacheBuilder::new(clock)
    }
}

/// Construction and inspection.
impl<V, S> ClusterCache<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: GenerationStore,
{
    /// Builds the cache and synchronizes with the coordination store once.
    ///
    /// - An empty key is seeded with the local generation.
    /// - An existing generation is adopted as the local one.
    /// - An unreachable store leaves the cache degraded from the start.
    pub(crate) async fn start(name: CacheName, clock: Clock, remote: S, policy: StalenessPolicy, telemetry: CacheTelemetry) -> Self {
        let now = Generation::now(&clock);
        let cache = Self {
            name,
            clock,
            remote,
            policy: Mutex::new(policy),
            local: RwLock::new(LocalStore::new(now)),
            telemetry,
        };

        match cache.remote.read().await {
            RemoteGeneration::Unknown => {
                cache.remote.write(now).await;
                cache.record(CacheActivity::Seeded, now);
            }
            RemoteGeneration::Known(generation) => {
                cache.local.write().reload(generation);
                cache.record(CacheActivity::Adopted, generation);
            }
            RemoteGeneration::Unavailable => {
                cache.policy.lock().degrade();
                cache.record(CacheActivity::Degraded, now);
            }
        }

        cache
    }

    /// Returns the name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns the clock driving generations and check deadlines.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the coordination store client.
    #[must_use]
    pub fn remote(&self) -> &S {
        &self.remote
    }

    /// The generation the local cache was last rebuilt at.
    #[must_use]
    pub fn local_generation(&self) -> Generation {
        self.local.read().generation()
    }

    /// Current state of the staleness checks.
    #[must_use]
    pub fn staleness(&self) -> Staleness {
        self.policy.lock().state()
    }

    /// Number of (domain, locale) contexts held since the last rebuild.
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.local.read().context_count()
    }
}

/// Lookups and invalidation.
impl<V, S> ClusterCache<V, S>
where
    V: Clone + Send + Sync + 'static,
    S: GenerationStore,
{
    /// Binds a view to the `domain`/`locale` context, creating it if needed.
    ///
    /// This never checks staleness or touches the network.
    pub fn switch_to(&self, domain: impl Into<String>, locale: impl Into<String>) -> Translations<'_, V, S> {
        let context = ContextKey::new(domain, locale);
        self.context_map(&context);
        Translations { cache: self, context }
    }

    /// Returns the value for `key`, calling `producer` on the first lookup.
    ///
    /// Staleness is checked first, which may rebuild the local cache. The
    /// producer runs at most once per key and generation, even when several
    /// tasks ask for the same key concurrently; a `None` result is cached as a
    /// negative entry and returned as `None` afterwards. The empty key is the
    /// catalog header and always yields `None` without calling the producer.
    ///
    /// # Errors
    ///
    /// Returns the producer's error unchanged. Nothing is cached in that case,
    /// so the next lookup calls a producer again.
    pub async fn fetch<F, Fut, E>(&self, context: &ContextKey, key: &str, producer: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        self.refresh_if_stale().await;
        let generation = self.local_generation();

        if key == META_KEY {
            self.record(CacheActivity::Negative, generation);
            return Ok(None);
        }

        let slot = self.context_map(context).slot(key);
        if let Some(entry) = slot.get() {
            self.record_hit(entry, generation);
            return Ok(entry.as_option().cloned());
        }

        let entry = slot
            .get_or_try_init(|| async move {
                self.record(CacheActivity::Miss, generation);
                producer().await.map(Entry::from_option)
            })
            .await?;
        Ok(entry.as_option().cloned())
    }

    /// Overwrites `key` in `context` without calling a producer.
    ///
    /// Intended for seeding and tests. Staleness is not checked. Writes to the
    /// empty key are ignored.
    pub fn set(&self, context: &ContextKey, key: &str, value: V) {
        if !self.context_map(context).set(key, Entry::Present(value)) {
            tracing::debug!(cache.name = self.name, "ignoring write to the catalog header key");
        }
    }

    /// Returns what is cached for `key` without producing or checking staleness.
    ///
    /// `None` means the key was never looked up in this generation.
    #[must_use]
    pub fn get(&self, context: &ContextKey, key: &str) -> Option<Entry<V>> {
        self.local.read().existing(context)?.get(key)
    }

    /// Rebuilds the local cache and tells every peer to rebuild theirs.
    ///
    /// The whole cache is dropped: `key` only names the trigger and does not
    /// limit what is invalidated. The new local generation is published to the
    /// coordination store; peers pick it up on their next check. Publishing is
    /// best effort, so this always returns `true`.
    pub async fn delete(&self, key: &str) -> bool {
        self.refresh_if_stale().await;

        let generation = {
            let mut local = self.local.write();
            let generation = Generation::now(&self.clock).max(local.generation().next());
            local.reload(generation);
            generation
        };
        tracing::debug!(cache.name = self.name, key, "invalidation requested");
        self.record(CacheActivity::Reload, generation);

        self.publish(generation).await;
        true
    }

    fn context_map(&self, context: &ContextKey) -> Arc<ContextMap<V>> {
        if let Some(map) = self.local.read().existing(context) {
            return map;
        }
        self.local.write().context(context)
    }

    async fn refresh_if_stale(&self) {
        let (due, was_degraded) = {
            let mut policy = self.policy.lock();
            let was_degraded = policy.is_degraded();
            (policy.begin_check(), was_degraded)
        };
        if !due {
            return;
        }

        let local = self.local_generation();
        self.record(CacheActivity::Check, local);
        let remote = self.remote.read().await;
        let verdict = self.policy.lock().finish_check(remote, local);

        match remote {
            RemoteGeneration::Unavailable => {
                self.record(CacheActivity::Degraded, local);
                return;
            }
            _ if was_degraded => self.record(CacheActivity::Recovered, local),
            _ => {}
        }

        match verdict {
            Verdict::Stale(generation) => {
                self.record(CacheActivity::Stale, generation);
                if self.rebuild(generation) {
                    self.publish(generation).await;
                }
            }
            Verdict::NotStale => self.record(CacheActivity::Fresh, local),
        }
    }

    /// Drops the local cache and stamps it with `generation` unless a newer
    /// rebuild already happened meanwhile.
    fn rebuild(&self, generation: Generation) -> bool {
        let mut local = self.local.write();
        if generation <= local.generation() {
            return false;
        }
        local.reload(generation);
        drop(local);
        self.record(CacheActivity::Reload, generation);
        true
    }

    async fn publish(&self, generation: Generation) {
        self.remote.write(generation).await;
        self.record(CacheActivity::Published, generation);
    }

    fn record_hit(&self, entry: &Entry<V>, generation: Generation) {
        let activity = if entry.is_negative() {
            CacheActivity::Negative
        } else {
            CacheActivity::Hit
        };
        self.record(activity, generation);
    }

    fn record(&self, activity: CacheActivity, generation: Generation) {
        self.telemetry.record(self.name, activity, generation);
    }
}

/// A [`ClusterCache`] bound to one (domain, locale) context.
///
/// Views are cheap to create and hold no cached data themselves, so each
/// request can carry its own context without sharing mutable state.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # futures::executor::block_on(async {
/// use cluster_cache::ClusterCache;
/// use cluster_cache::testing::MockGenerationStore;
/// use tick::Clock;
///
/// let cache = ClusterCache::builder::<String>(Clock::new_frozen())
///     .build_with_store(MockGenerationStore::new())
///     .await;
///
/// let french = cache.switch_to("messages", "fr");
/// french.set("Hello", "Bonjour".to_string());
/// assert_eq!(french.get("Hello").and_then(|e| e.into_option()).as_deref(), Some("Bonjour"));
///
/// let german = cache.switch_to("messages", "de");
/// assert!(german.get("Hello").is_none());
/// # });
/// ```
#[derive(Debug)]
pub struct Translations<'a, V, S = EtcdGenerationStore> {
    cache: &'a ClusterCache<V, S>,
    context: ContextKey,
}

impl<V, S> Translations<'_, V, S>
where
    V: Clone + Send + Sync + 'static,
    S: GenerationStore,
{
    /// The context this view is bound to.
    #[must_use]
    pub fn context(&self) -> &ContextKey {
        &self.context
    }

    /// See [`ClusterCache::fetch`].
    ///
    /// # Errors
    ///
    /// Returns the producer's error unchanged.
    pub async fn fetch<F, Fut, E>(&self, key: &str, producer: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        self.cache.fetch(&self.context, key, producer).await
    }

    /// See [`ClusterCache::set`].
    pub fn set(&self, key: &str, value: V) {
        self.cache.set(&self.context, key, value);
    }

    /// See [`ClusterCache::get`].
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Entry<V>> {
        self.cache.get(&self.context, key)
    }

    /// See [`ClusterCache::delete`].
    pub async fn delete(&self, key: &str) -> bool {
        self.cache.delete(key).await
    }
}
