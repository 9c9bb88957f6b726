use crate::config::SpellConfig;
use crate::text::{get_words, tokenize_words};
use anyhow::{Context, Result};
use spell_core::{
    FilterParams, FilterStats, LiveCorpus, RefreshController, RefreshOutcome, RefreshPolicy,
};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// One writer lock around the whole controller, so readers never see a half-swapped filter.
pub type SharedDictionary = Arc<RwLock<RefreshController>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Add,
    Ignore,
}

/// Decides what happens to a word the dictionary does not know.
pub trait MisspellingHandler {
    fn decide(&mut self, word: &str) -> Result<Decision>;
}

pub struct AddAll;
pub struct IgnoreAll;

impl MisspellingHandler for AddAll {
    fn decide(&mut self, _word: &str) -> Result<Decision> {
        Ok(Decision::Add)
    }
}

impl MisspellingHandler for IgnoreAll {
    fn decide(&mut self, _word: &str) -> Result<Decision> {
        Ok(Decision::Ignore)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub checked: usize,
    pub misspelled: Vec<String>,
    pub added: Vec<String>,
    pub rebuilds: u64,
    /// Messages from rebuilds that failed; the previous filter stayed in use.
    pub degraded: Vec<String>,
}

pub struct SpellChecker {
    dict: RefreshController,
}

impl SpellChecker {
    pub fn from_words<I, S>(params: FilterParams, policy: RefreshPolicy, words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = RefreshController::with_corpus(params, policy, LiveCorpus::new())?;
        let outcome = dict.bulk_add(words);
        for (idx, err) in &outcome.report.rejected {
            warn!(index = idx, error = %err, "dictionary word skipped");
        }
        log_refresh(&outcome.refresh);
        Ok(Self { dict })
    }

    /// Builds the dictionary filter described by `config`.
    pub fn prepare(config: &SpellConfig) -> Result<Self> {
        let words = get_words(&config.dictionary_path).context("loading dictionary")?;
        info!(words = words.len(), "dictionary words read");
        let checker = Self::from_words(config.filter_params(), config.refresh_policy(), &words)?;
        log_filter_stats(&checker.dict.filter().stats());
        Ok(checker)
    }

    pub fn dictionary(&self) -> &RefreshController {
        &self.dict
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.dict.contains(word)
    }

    pub fn into_shared(self) -> SharedDictionary {
        Arc::new(RwLock::new(self.dict))
    }

    pub fn check_text<H: MisspellingHandler>(
        &mut self,
        text: &str,
        handler: &mut H,
    ) -> Result<CheckReport> {
        let mut words = tokenize_words(text);
        words.sort();
        words.dedup();
        self.check_words(words, handler)
    }

    pub fn check_document<H: MisspellingHandler>(
        &mut self,
        path: &Path,
        handler: &mut H,
    ) -> Result<CheckReport> {
        let words = get_words(path).context("loading document")?;
        self.check_words(words, handler)
    }

    pub fn check_words<I, S, H>(&mut self, words: I, handler: &mut H) -> Result<CheckReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        H: MisspellingHandler,
    {
        let before = self.dict.rebuild_count();
        let mut report = CheckReport::default();
        for word in words {
            let word = word.as_ref();
            report.checked += 1;
            if self.dict.contains(word) {
                continue;
            }
            report.misspelled.push(word.to_owned());
            if handler.decide(word)? == Decision::Ignore {
                continue;
            }
            let outcome = self.dict.add(word)?;
            info!(word, "word added to dictionary");
            if let RefreshOutcome::Degraded(e) = &outcome {
                report.degraded.push(e.to_string());
            }
            log_refresh(&outcome);
            report.added.push(word.to_owned());
        }
        report.rebuilds = self.dict.rebuild_count() - before;
        Ok(report)
    }
}

fn log_refresh(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Stable => {}
        RefreshOutcome::Rebuilt(s) => info!(
            reason = ?s.reason,
            carried = s.carried,
            capacity = s.capacity,
            bit_length = s.bit_length,
            hash_count = s.hash_count,
            "dictionary filter resized"
        ),
        RefreshOutcome::Degraded(e) => warn!(error = %e, "dictionary filter kept without resize"),
    }
}

pub fn log_filter_stats(stats: &FilterStats) {
    info!("Expected number of items to be added in Bloom filter:{}", stats.capacity);
    info!("Expected false positive probability:{}", stats.false_positive_target);
    info!("Case sensitive for bloom filter:{}", stats.case_sensitive);
    info!(
        "Bloom filter size that meets above requirements in MB:{:.2}",
        stats.size_in_mb()
    );
    info!(
        "Number of hash functions needed to meet above requirements:{}",
        stats.hash_count
    );
}
