//! Prefetch batch DTOs.

use crate::domain::errors::FetchError;

/// Outcome of prefetching one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// A valid entry was already cached; nothing was fetched.
    Cached,
    /// Fetched and written to the cache.
    Fetched,
    /// The fetch failed; the cache is unchanged.
    Failed(FetchError),
}

impl PrefetchOutcome {
    /// Returns true if the fetch failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-URL results of a prefetch batch.
#[derive(Debug, Clone, Default)]
pub struct PrefetchReport {
    /// Outcomes in request order.
    pub outcomes: Vec<(String, PrefetchOutcome)>,
}

impl PrefetchReport {
    /// Number of URLs already cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.count(|o| matches!(o, PrefetchOutcome::Cached))
    }

    /// Number of URLs fetched and cached.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.count(|o| matches!(o, PrefetchOutcome::Fetched))
    }

    /// Number of URLs that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(PrefetchOutcome::is_failed)
    }

    /// URLs that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchError)> {
        self.outcomes.iter().filter_map(|(url, outcome)| match outcome {
            PrefetchOutcome::Failed(e) => Some((url.as_str(), e)),
            _ => None,
        })
    }

    /// Outcome recorded for `url`.
    #[must_use]
    pub fn outcome_for(&self, url: &str) -> Option<&PrefetchOutcome> {
        self.outcomes
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&PrefetchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

impl std::fmt::Display for PrefetchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Prefetch: {} fetched, {} already cached, {} failed",
            self.fetched(),
            self.cached(),
            self.failed()
        )
    }
}
