pub mod bits;
pub mod errors;
pub mod filter;
pub mod hash;
pub mod refresh;
pub mod sizing;

pub use bits::{BitStore, Layout};
pub use errors::{BloomError, Result};
pub use filter::{BloomFilter, BulkReport, FilterParams, FilterStats, Membership};
pub use refresh::{
    BulkOutcome, Corpus, LiveCorpus, RebuildReason, RebuildSummary, RefreshController,
    RefreshOutcome, RefreshPolicy,
};
pub use sizing::{size_for, Sizing};
