// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};

/// Selects the flat key space used for lookups: a translation domain and a locale.
///
/// Each pair owns an independent set of entries, so switching between contexts
/// never invalidates the others.
///
/// # Examples
///
/// ```
/// use cluster_cache::ContextKey;
///
/// let context = ContextKey::new("messages", "de_DE");
/// assert_eq!(context.domain(), "messages");
/// assert_eq!(context.locale(), "de_DE");
/// assert_eq!(context.to_string(), "messages/de_DE");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey {
    domain: String,
    locale: String,
}

impl ContextKey {
    /// Creates a context for the given translation domain and locale.
    pub fn new(domain: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            locale: locale.into(),
        }
    }

    /// The translation domain (text domain).
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.locale)
    }
}

impl<D, L> From<(D, L)> for ContextKey
where
    D: Into<String>,
    L: Into<String>,
{
    fn from((domain, locale): (D, L)) -> Self {
        Self::new(domain, locale)
    }
}
