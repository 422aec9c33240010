// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Generation numbers used to compare local and cluster-wide freshness.

use std::{
    fmt::{self, Display},
    str::FromStr,
    time::{Duration, SystemTime},
};

use tick::Clock;

/// A freshness stamp, in whole seconds since the Unix epoch.
///
/// Generations are compared with `>`: a remote generation strictly greater than
/// the local one means another node invalidated translations after this process
/// last rebuilt its cache.
///
/// # Examples
///
/// ```
/// use cluster_cache::Generation;
///
/// let older = Generation::new(1_700_000_000);
/// let newer: Generation = "1700000001".parse()?;
/// assert!(newer > older);
/// assert_eq!(newer.to_string(), "1700000001");
/// # Ok::<(), std::num::ParseIntError>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Creates a generation from a raw number of seconds.
    #[must_use]
    pub const fn new(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Returns the generation for the current time of `clock`.
    ///
    /// Times before the Unix epoch map to generation zero.
    #[must_use]
    pub fn now(clock: &Clock) -> Self {
        Self::from_system_time(clock.system_time())
    }

    /// Converts a point in time to a generation, truncating to whole seconds.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        Self(time.duration_since(SystemTime::UNIX_EPOCH).map_or(0, |since| since.as_secs()))
    }

    /// Returns the raw number of seconds.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Returns the generation one second after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Generation {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<Generation> for SystemTime {
    fn from(generation: Generation) -> Self {
        Self::UNIX_EPOCH + Duration::from_secs(generation.0)
    }
}

/// The outcome of reading the shared generation from the coordination store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteGeneration {
    /// The store holds a generation.
    Known(Generation),
    /// The key has never been written; the reader should seed it.
    Unknown,
    /// The store could not be reached or answered with something unusable.
    Unavailable,
}

impl RemoteGeneration {
    /// Returns the generation, if one was read.
    #[must_use]
    pub fn generation(self) -> Option<Generation> {
        match self {
            Self::Known(generation) => Some(generation),
            Self::Unknown | Self::Unavailable => None,
        }
    }

    /// Returns `true` if the store answered, with or without a value.
    #[must_use]
    pub fn is_available(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}
