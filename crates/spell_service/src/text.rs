use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Reads a whole document; line breaks become plain whitespace for the tokenizer.
pub fn get_data(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Error in file reading: {}", path.display()))
}

/// Drops ASCII punctuation and digits, then splits on whitespace.
pub fn tokenize_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| !c.is_ascii_punctuation() && !c.is_ascii_digit())
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Unique tokens of a file, in sorted order.
pub fn get_words(path: &Path) -> Result<BTreeSet<String>> {
    Ok(tokenize_words(&get_data(path)?).into_iter().collect())
}
