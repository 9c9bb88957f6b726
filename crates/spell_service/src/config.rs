use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use spell_core::refresh::DEFAULT_GROWTH_FACTOR;
use spell_core::{FilterParams, Layout, RefreshPolicy};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "spell_checker_config.json";

/// On-disk shape; every key optional so a missing one gets a precise message.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    num_words: Option<u64>,
    probability: Option<f64>,
    case_sensitive: Option<bool>,
    dictionary_path: Option<PathBuf>,
    counting: Option<bool>,
    growth_factor: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellConfig {
    pub num_words: u64,
    pub probability: f64,
    pub case_sensitive: bool,
    pub dictionary_path: PathBuf,
    pub counting: bool,
    pub growth_factor: u64,
}

fn require<T>(v: Option<T>, key: &str) -> Result<T> {
    v.ok_or_else(|| anyhow!("Missing value for parameter: {key}"))
}

impl SpellConfig {
    /// A relative `dictionary_path` is taken relative to the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Error in file reading: {}", path.display()))?;
        let mut cfg = Self::from_json(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        if cfg.dictionary_path.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.dictionary_path = dir.join(&cfg.dictionary_path);
            }
        }
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Ok(Self {
            num_words: require(raw.num_words, "num_words")?,
            probability: require(raw.probability, "probability")?,
            case_sensitive: raw.case_sensitive.unwrap_or(false),
            dictionary_path: require(raw.dictionary_path, "dictionary_path")?,
            counting: raw.counting.unwrap_or(false),
            growth_factor: raw.growth_factor.unwrap_or(DEFAULT_GROWTH_FACTOR),
        })
    }

    pub fn filter_params(&self) -> FilterParams {
        let layout = if self.counting { Layout::Counters } else { Layout::Bits };
        FilterParams::new(self.num_words, self.probability)
            .case_sensitive(self.case_sensitive)
            .layout(layout)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            growth_factor: self.growth_factor,
            ..RefreshPolicy::default()
        }
    }
}
