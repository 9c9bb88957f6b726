//! Rebuild-and-swap policy that keeps the false-positive target meaningful
//! past the original capacity and turns deletions into real absences.
//!
//! The controller owns the exact live corpus next to the filter. Whenever the
//! filter's insert counter crosses `threshold * capacity`, or a deletion is
//! pending, a replacement filter is sized from the corpus, fully populated,
//! and only then assigned over the old one. A failed rebuild leaves the old
//! filter in place and is reported as [`RefreshOutcome::Degraded`].

use crate::bits::Layout;
use crate::errors::{BloomError, Result};
use crate::filter::{BloomFilter, BulkReport, FilterParams, Membership};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const DEFAULT_THRESHOLD: f64 = 0.95;
pub const DEFAULT_GROWTH_FACTOR: u64 = 2;

/// Source of the items a rebuilt filter is populated from.
pub trait Corpus {
    fn live_items(&self) -> Result<Vec<String>>;
    /// Returns false if the item was already present.
    fn insert(&mut self, item: String) -> bool;
    /// Returns false if the item was never present.
    fn remove(&mut self, item: &str) -> bool;
    fn holds(&self, item: &str) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory exact set of live words.
#[derive(Debug, Clone, Default)]
pub struct LiveCorpus {
    items: BTreeSet<String>,
}

impl LiveCorpus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Into<String>> FromIterator<S> for LiveCorpus {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { items: iter.into_iter().map(Into::into).collect() }
    }
}

impl Corpus for LiveCorpus {
    fn live_items(&self) -> Result<Vec<String>> {
        Ok(self.items.iter().cloned().collect())
    }
    fn insert(&mut self, item: String) -> bool {
        self.items.insert(item)
    }
    fn remove(&mut self, item: &str) -> bool {
        self.items.remove(item)
    }
    fn holds(&self, item: &str) -> bool {
        self.items.contains(item)
    }
    fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshPolicy {
    /// Fraction of capacity the insert counter may reach before a rebuild.
    pub threshold: f64,
    /// Rebuilt capacity is `max(base capacity, live items * growth_factor)`.
    pub growth_factor: u64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

impl RefreshPolicy {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(BloomError::InvalidParameter(format!(
                "refresh threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        // a rebuild sized `live * growth` must start under `threshold * capacity`
        if self.threshold * self.growth_factor as f64 <= 1.0 {
            return Err(BloomError::InvalidParameter(format!(
                "threshold {} times growth factor {} must exceed 1",
                self.threshold, self.growth_factor
            )));
        }
        Ok(())
    }

    pub fn capacity_for(&self, base_capacity: u64, live: usize) -> u64 {
        (live as u64).saturating_mul(self.growth_factor).max(base_capacity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    CapacityExceeded,
    PendingDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildSummary {
    pub reason: RebuildReason,
    pub carried: u64,
    pub previous_capacity: u64,
    pub capacity: u64,
    pub previous_bit_length: usize,
    pub bit_length: usize,
    pub previous_hash_count: u32,
    pub hash_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Stable,
    Rebuilt(RebuildSummary),
    /// The old filter is still in service; the error is always `RebuildFailed`.
    Degraded(BloomError),
}

impl RefreshOutcome {
    pub fn rebuilt(&self) -> bool {
        matches!(self, RefreshOutcome::Rebuilt(_))
    }
}

#[derive(Debug)]
pub struct BulkOutcome {
    pub report: BulkReport,
    pub refresh: RefreshOutcome,
}

pub struct RefreshController<C: Corpus = LiveCorpus> {
    current: BloomFilter,
    corpus: C,
    base: FilterParams,
    policy: RefreshPolicy,
    rebuilds: u64,
}

impl RefreshController<LiveCorpus> {
    pub fn new(params: FilterParams) -> Result<Self> {
        Self::with_corpus(params, RefreshPolicy::default(), LiveCorpus::new())
    }
}

impl<C: Corpus> RefreshController<C> {
    /// Builds the first filter from whatever `corpus` already holds.
    pub fn with_corpus(params: FilterParams, policy: RefreshPolicy, corpus: C) -> Result<Self> {
        policy.validate()?;
        let items = corpus.live_items()?;
        let capacity = policy.capacity_for(params.capacity, items.len());
        let mut current = BloomFilter::new(params.with_capacity(capacity))?;
        current.try_bulk_add(&items)?;
        Ok(Self {
            current,
            corpus,
            base: params,
            policy,
            rebuilds: 0,
        })
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.current
    }

    pub fn corpus(&self) -> &C {
        &self.corpus
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn contains(&self, word: &str) -> bool {
        self.current.contains(word)
    }

    fn corpus_key(&self, word: &str) -> String {
        if self.base.case_sensitive {
            word.to_owned()
        } else {
            word.to_lowercase()
        }
    }

    /// Fails fast on a malformed word; a failed rebuild is reported in the outcome.
    pub fn add(&mut self, word: &str) -> Result<RefreshOutcome> {
        self.current.add(word)?;
        let key = self.corpus_key(word);
        self.corpus.insert(key);
        Ok(self.evaluate())
    }

    /// Inserts every well-formed word, then evaluates once.
    pub fn bulk_add<I, S>(&mut self, words: I) -> BulkOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BulkReport::default();
        for (idx, word) in words.into_iter().enumerate() {
            let word = word.as_ref();
            match self.current.add(word) {
                Ok(()) => {
                    report.inserted += 1;
                    let key = self.corpus_key(word);
                    self.corpus.insert(key);
                }
                Err(e) => report.rejected.push((idx, e)),
            }
        }
        let refresh = self.evaluate();
        BulkOutcome { report, refresh }
    }

    /// `Ok(None)` if the word was never live; nothing is touched in that case.
    pub fn remove(&mut self, word: &str) -> Result<Option<RefreshOutcome>> {
        let key = self.corpus_key(word);
        if !self.corpus.holds(&key) {
            return Ok(None);
        }
        match self.current.layout() {
            Layout::Counters => self.current.remove(word)?,
            Layout::Bits => self.current.mark_pending_delete(),
        }
        self.corpus.remove(&key);
        Ok(Some(self.evaluate()))
    }

    pub fn needs_rebuild(&self) -> Option<RebuildReason> {
        if self.current.pending_delete() {
            Some(RebuildReason::PendingDelete)
        } else if self.current.over_threshold(self.policy.threshold) {
            Some(RebuildReason::CapacityExceeded)
        } else {
            None
        }
    }

    pub fn evaluate(&mut self) -> RefreshOutcome {
        let Some(reason) = self.needs_rebuild() else {
            return RefreshOutcome::Stable;
        };
        match self.rebuild(reason) {
            Ok(summary) => {
                debug!(
                    ?reason,
                    carried = summary.carried,
                    capacity = summary.capacity,
                    bit_length = summary.bit_length,
                    hash_count = summary.hash_count,
                    "bloom filter rebuilt"
                );
                RefreshOutcome::Rebuilt(summary)
            }
            Err(e) => {
                warn!(?reason, error = %e, "bloom filter rebuild failed, keeping previous filter");
                RefreshOutcome::Degraded(e)
            }
        }
    }

    fn rebuild(&mut self, reason: RebuildReason) -> Result<RebuildSummary> {
        let items = self
            .corpus
            .live_items()
            .map_err(|e| BloomError::RebuildFailed(format!("live corpus unavailable: {e}")))?;
        let capacity = self.policy.capacity_for(self.base.capacity, items.len());
        let mut next = BloomFilter::new(self.base.with_capacity(capacity))
            .map_err(|e| BloomError::RebuildFailed(format!("cannot size replacement: {e}")))?;
        let carried = next
            .try_bulk_add(&items)
            .map_err(|e| BloomError::RebuildFailed(format!("cannot populate replacement: {e}")))?;

        let previous = std::mem::replace(&mut self.current, next);
        self.rebuilds += 1;
        Ok(RebuildSummary {
            reason,
            carried: carried as u64,
            previous_capacity: previous.capacity(),
            capacity: self.current.capacity(),
            previous_bit_length: previous.bit_length(),
            bit_length: self.current.bit_length(),
            previous_hash_count: previous.hash_count(),
            hash_count: self.current.hash_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenCorpus {
        inner: LiveCorpus,
        broken: bool,
    }

    impl Corpus for BrokenCorpus {
        fn live_items(&self) -> Result<Vec<String>> {
            if self.broken {
                return Err(BloomError::Internal("corpus offline".into()));
            }
            self.inner.live_items()
        }
        fn insert(&mut self, item: String) -> bool {
            self.inner.insert(item)
        }
        fn remove(&mut self, item: &str) -> bool {
            self.inner.remove(item)
        }
        fn holds(&self, item: &str) -> bool {
            self.inner.holds(item)
        }
        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn capacity_policy() {
        let p = RefreshPolicy::default();
        assert_eq!(p.capacity_for(100, 0), 100);
        assert_eq!(p.capacity_for(100, 30), 100);
        assert_eq!(p.capacity_for(100, 96), 192);
        assert_eq!(p.capacity_for(1, usize::MAX), u64::MAX);
    }

    #[test]
    fn policy_validation() {
        assert!(RefreshPolicy { threshold: 0.0, growth_factor: 2 }.validate().is_err());
        assert!(RefreshPolicy { threshold: 1.5, growth_factor: 2 }.validate().is_err());
        assert!(RefreshPolicy { threshold: 0.9, growth_factor: 1 }.validate().is_err());
        assert!(RefreshPolicy { threshold: 0.5, growth_factor: 2 }.validate().is_err());
        assert!(RefreshPolicy { threshold: 0.3, growth_factor: 2 }.validate().is_err());
        assert!(RefreshPolicy { threshold: 0.3, growth_factor: 4 }.validate().is_ok());
        assert!(RefreshPolicy { threshold: 0.51, growth_factor: 2 }.validate().is_ok());
        assert!(RefreshPolicy { threshold: 1.0, growth_factor: 3 }.validate().is_ok());
    }

    #[test]
    fn low_threshold_does_not_rebuild_every_add() {
        let policy = RefreshPolicy { threshold: 0.6, growth_factor: 2 };
        let mut c = RefreshController::with_corpus(
            FilterParams::new(10, 0.01),
            policy,
            LiveCorpus::new(),
        )
        .unwrap();
        for i in 0..200 {
            c.add(&format!("w{i}")).unwrap();
        }
        // each rebuild leaves 20% headroom, so growth is geometric, not one per add
        assert!(c.rebuild_count() < 20, "rebuilt {} times", c.rebuild_count());
        assert!(!c.filter().over_threshold(0.6));
    }

    #[test]
    fn initial_corpus_is_loaded() {
        let corpus: LiveCorpus = ["alpha", "beta", "gamma"].into_iter().collect();
        let c = RefreshController::with_corpus(
            FilterParams::new(100, 0.01),
            RefreshPolicy::default(),
            corpus,
        )
        .unwrap();
        assert!(c.contains("beta"));
        assert_eq!(c.filter().inserted_count(), 3);
        assert_eq!(c.rebuild_count(), 0);
    }

    #[test]
    fn bulk_load_over_threshold_rebuilds_once() {
        let mut c = RefreshController::new(FilterParams::new(10, 0.01)).unwrap();
        let words: Vec<String> = (0..50).map(|i| format!("w{i}")).collect();
        let out = c.bulk_add(&words);
        assert!(out.report.is_clean());
        match out.refresh {
            RefreshOutcome::Rebuilt(s) => {
                assert_eq!(s.reason, RebuildReason::CapacityExceeded);
                assert_eq!(s.carried, 50);
                assert_eq!(s.capacity, 100);
            }
            other => panic!("expected rebuild, got {other:?}"),
        }
        assert_eq!(c.rebuild_count(), 1);
        assert!(words.iter().all(|w| c.contains(w)));
    }

    #[test]
    fn case_insensitive_corpus_dedups() {
        let mut c = RefreshController::new(FilterParams::new(100, 0.01)).unwrap();
        c.add("Apple").unwrap();
        c.add("APPLE").unwrap();
        assert_eq!(c.corpus().len(), 1);
        assert_eq!(c.filter().inserted_count(), 2);
    }

    #[test]
    fn remove_on_bit_layout_rebuilds_without_word() {
        let mut c = RefreshController::new(FilterParams::new(100, 0.01)).unwrap();
        c.bulk_add(["keep", "drop", "also"]);
        let out = c.remove("Drop").unwrap().unwrap();
        match out {
            RefreshOutcome::Rebuilt(s) => {
                assert_eq!(s.reason, RebuildReason::PendingDelete);
                assert_eq!(s.carried, 2);
            }
            other => panic!("expected rebuild, got {other:?}"),
        }
        assert!(!c.contains("drop"));
        assert!(c.contains("keep"));
        assert!(!c.filter().pending_delete());
        assert_eq!(c.filter().inserted_count(), 2);
    }

    #[test]
    fn remove_on_counting_layout() {
        let params = FilterParams::new(100, 0.01).layout(Layout::Counters);
        let mut c = RefreshController::new(params).unwrap();
        c.bulk_add(["keep", "drop"]);
        assert!(c.remove("drop").unwrap().unwrap().rebuilt());
        assert!(!c.contains("drop"));
        assert!(c.contains("keep"));
        assert_eq!(c.filter().layout(), Layout::Counters);
    }

    #[test]
    fn remove_unknown_word_is_a_no_op() {
        let mut c = RefreshController::new(FilterParams::new(100, 0.01)).unwrap();
        c.add("known").unwrap();
        let before = c.filter().storage().clone();
        assert_eq!(c.remove("stranger").unwrap(), None);
        assert_eq!(c.filter().storage(), &before);
        assert_eq!(c.rebuild_count(), 0);
    }

    #[test]
    fn malformed_add_changes_nothing() {
        let mut c = RefreshController::new(FilterParams::new(100, 0.01)).unwrap();
        assert!(matches!(c.add("   "), Err(BloomError::InvalidItem(_))));
        assert!(c.corpus().is_empty());
        assert_eq!(c.filter().inserted_count(), 0);
    }

    #[test]
    fn failed_rebuild_keeps_old_filter() {
        let corpus = BrokenCorpus { inner: LiveCorpus::new(), broken: false };
        let mut c = RefreshController::with_corpus(
            FilterParams::new(4, 0.01),
            RefreshPolicy::default(),
            corpus,
        )
        .unwrap();
        c.add("one").unwrap();
        c.add("two").unwrap();
        c.add("three").unwrap();
        let old_bits = c.filter().bit_length();

        c.corpus.broken = true;
        let out = c.add("four").unwrap();
        assert!(matches!(out, RefreshOutcome::Degraded(BloomError::RebuildFailed(_))));
        assert_eq!(c.filter().bit_length(), old_bits);
        assert_eq!(c.rebuild_count(), 0);
        for w in ["one", "two", "three", "four"] {
            assert!(c.contains(w));
        }

        c.corpus.broken = false;
        assert!(c.evaluate().rebuilt());
        assert_eq!(c.filter().inserted_count(), 4);
        assert_eq!(c.filter().capacity(), 8);
    }

    #[test]
    fn failed_delete_rebuild_retries() {
        let corpus = BrokenCorpus { inner: LiveCorpus::new(), broken: false };
        let mut c = RefreshController::with_corpus(
            FilterParams::new(100, 0.01),
            RefreshPolicy::default(),
            corpus,
        )
        .unwrap();
        c.bulk_add(["one", "two", "three"]);

        c.corpus.broken = true;
        let out = c.remove("two").unwrap();
        assert!(matches!(out, Some(RefreshOutcome::Degraded(BloomError::RebuildFailed(_)))));
        assert!(c.filter().pending_delete());
        assert_eq!(c.rebuild_count(), 0);
        // bit layout: still answered by the old filter until a rebuild lands
        assert!(c.contains("two"));
        assert!(!c.corpus().holds("two"));

        c.corpus.broken = false;
        match c.evaluate() {
            RefreshOutcome::Rebuilt(s) => {
                assert_eq!(s.reason, RebuildReason::PendingDelete);
                assert_eq!(s.carried, 2);
            }
            other => panic!("expected rebuild, got {other:?}"),
        }
        assert!(!c.contains("two"));
        assert!(c.contains("one"));
        assert!(c.contains("three"));
        assert!(!c.filter().pending_delete());
        assert_eq!(c.rebuild_count(), 1);
    }

    #[test]
    fn oversized_growth_degrades_instead_of_aborting() {
        // 10 live words * 1e17 needs about an exabyte of storage
        let policy = RefreshPolicy { threshold: 0.95, growth_factor: 100_000_000_000_000_000 };
        let mut c = RefreshController::with_corpus(
            FilterParams::new(10, 0.01),
            policy,
            LiveCorpus::new(),
        )
        .unwrap();
        let old_bits = c.filter().bit_length();
        let words: Vec<String> = (0..10).map(|i| format!("word{i}")).collect();
        for w in &words[..9] {
            assert_eq!(c.add(w).unwrap(), RefreshOutcome::Stable);
        }
        let out = c.add(&words[9]).unwrap();
        assert!(matches!(out, RefreshOutcome::Degraded(BloomError::RebuildFailed(_))), "{out:?}");
        assert_eq!(c.filter().bit_length(), old_bits);
        assert_eq!(c.rebuild_count(), 0);
        for w in &words {
            assert!(c.contains(w));
        }
    }

    #[test]
    fn unsizable_growth_degrades() {
        let policy = RefreshPolicy { threshold: 0.95, growth_factor: u64::MAX / 4 };
        let mut c = RefreshController::with_corpus(
            FilterParams::new(2, 0.01),
            policy,
            LiveCorpus::new(),
        )
        .unwrap();
        c.add("left").unwrap();
        let out = c.add("right").unwrap();
        assert!(matches!(out, RefreshOutcome::Degraded(BloomError::RebuildFailed(_))));
        assert!(c.contains("left") && c.contains("right"));
    }
}
