use crate::session::{Decision, MisspellingHandler};
use anyhow::Result;
use std::io::{BufRead, Write};

pub const PROMPT: &str = "Add to dictionary (A/a) or Skip to Ignore >>";

/// Asks on `output` and reads one line of `input` per unknown word.
/// Anything other than `a`/`A` skips the word; end of input skips every remaining word.
pub struct PromptHandler<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptHandler<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> MisspellingHandler for PromptHandler<R, W> {
    fn decide(&mut self, word: &str) -> Result<Decision> {
        writeln!(self.output, "Misspelled word: {word}")?;
        write!(self.output, "{PROMPT}")?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        if line.trim().eq_ignore_ascii_case("a") {
            writeln!(self.output, "Word \"{word}\" added to dictionary")?;
            Ok(Decision::Add)
        } else {
            Ok(Decision::Ignore)
        }
    }
}
