pub mod config;
pub mod prompt;
pub mod session;
pub mod text;

pub use config::{SpellConfig, DEFAULT_CONFIG_FILE};
pub use prompt::PromptHandler;
pub use session::{
    log_filter_stats, AddAll, CheckReport, Decision, IgnoreAll, MisspellingHandler,
    SharedDictionary, SpellChecker,
};
pub use text::{get_data, get_words, tokenize_words};
