//! The on-disk review corpus.
//!
//! - `materializer`: tops up `{base}/{split}/{label}/{index:06}.txt` from a stream
//! - `source`: paged HuggingFace rows stream feeding the materializer
//! - `loader`: reads the corpus back for training and evaluation

pub mod loader;
pub mod materializer;
pub mod source;
pub mod types;

pub use loader::{load_corpus, read_split, Corpus, Dataset};
pub use materializer::{
    count_reviews, ensure, ensure_layout, materialize, CorpusTargets, SplitReport, SplitTargets,
};
pub use source::{ExampleStream, HfRowsConfig, HfRowsSource, ReviewSource, DEFAULT_DATASET};
pub use types::*;
