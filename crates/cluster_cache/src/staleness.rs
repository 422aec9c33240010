// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded-staleness decision between the local cache and the cluster.
//!
//! The policy never talks to the network itself. A check is split in two so
//! that the remote read can run without holding the policy lock:
//! [`StalenessPolicy::begin_check`] decides whether a read is due and moves the
//! deadline, [`StalenessPolicy::finish_check`] interprets what the read returned.

use std::time::{Duration, Instant};

use tick::Clock;

use crate::{Generation, RemoteGeneration};

/// Observable state of the staleness policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// The check deadline has not been reached.
    Fresh,
    /// The deadline has passed; the next operation reads the remote generation.
    CheckDue,
    /// The coordination store was unavailable; checks are skipped.
    Degraded,
}

/// Result of one completed check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The cluster holds a newer generation than the local cache.
    Stale(Generation),
    NotStale,
}

#[derive(Debug)]
pub(crate) struct StalenessPolicy {
    clock: Clock,
    interval: Duration,
    /// `None` once the deadline overflowed `Instant`.
    deadline: Option<Instant>,
    degraded_since: Option<Instant>,
    recovery: Option<Duration>,
}

impl StalenessPolicy {
    pub(crate) fn new(clock: Clock, interval: Duration, recovery: Option<Duration>) -> Self {
        let deadline = clock.instant().checked_add(interval);
        Self {
            clock,
            interval,
            deadline,
            degraded_since: None,
            recovery,
        }
    }

    pub(crate) fn state(&self) -> Staleness {
        if self.degraded_since.is_some() {
            return Staleness::Degraded;
        }
        match self.deadline {
            Some(deadline) if self.clock.instant() >= deadline => Staleness::CheckDue,
            _ => Staleness::Fresh,
        }
    }

    /// Returns `true` if the caller must read the remote generation now.
    ///
    /// The deadline moves one interval ahead whenever a read is granted, no
    /// matter how the read turns out.
    pub(crate) fn begin_check(&mut self) -> bool {
        let now = self.clock.instant();

        if let Some(since) = self.degraded_since {
            return match self.recovery {
                Some(window) if now.saturating_duration_since(since) >= window => {
                    // one probe per window; stays degraded until it succeeds
                    self.degraded_since = Some(now);
                    true
                }
                _ => false,
            };
        }

        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = now.checked_add(self.interval);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn finish_check(&mut self, remote: RemoteGeneration, local: Generation) -> Verdict {
        match remote {
            RemoteGeneration::Unavailable => {
                self.degrade();
                Verdict::NotStale
            }
            RemoteGeneration::Unknown => {
                self.recover();
                Verdict::NotStale
            }
            RemoteGeneration::Known(remote) => {
                self.recover();
                if remote > local {
                    Verdict::Stale(remote)
                } else {
                    Verdict::NotStale
                }
            }
        }
    }

    pub(crate) fn degrade(&mut self) {
        self.degraded_since = Some(self.clock.instant());
    }

    fn recover(&mut self) {
        if self.degraded_since.take().is_some() {
            self.deadline = self.clock.instant().checked_add(self.interval);
        }
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded_since.is_some()
    }
}
