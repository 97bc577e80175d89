//! Common types shared by the corpus materializer, loader and streaming source.
//!
//! Defines the split and label vocabulary of the on-disk corpus, the labeled
//! example exchanged between stages, and the errors raised by upstream sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while streaming examples from an upstream source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Failed to parse response data.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// API rate limit exceeded.
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited {
        /// Optional retry-after duration in seconds.
        retry_after: Option<u64>,
    },

    /// A row carried a label outside `{0, 1}`.
    #[error("Unexpected label {label} at row {row}")]
    UnexpectedLabel { row: usize, label: i64 },
}

/// Result type alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// A named partition of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Test];

    /// Directory and upstream split name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ground-truth sentiment of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Neg,
    Pos,
}

impl Label {
    /// Loading order used by the corpus reader: negatives first.
    pub const ALL: [Label; 2] = [Label::Neg, Label::Pos];

    /// Directory name of the label.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Label::Neg => "neg",
            Label::Pos => "pos",
        }
    }

    /// Numeric class: 0 = negative, 1 = positive.
    pub fn as_class(&self) -> u8 {
        match self {
            Label::Neg => 0,
            Label::Pos => 1,
        }
    }

    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            0 => Some(Label::Neg),
            1 => Some(Label::Pos),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A review text paired with its sentiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Review text with line-break markup replaced by spaces.
    pub text: String,
    pub label: Label,
}

impl LabeledExample {
    /// Creates an example, normalizing line-break markup in `text`.
    pub fn new(text: impl AsRef<str>, label: Label) -> Self {
        Self {
            text: normalize_review(text.as_ref()),
            label,
        }
    }
}

/// Replaces `<br />` and `<br/>` markup with single spaces.
pub fn normalize_review(text: &str) -> String {
    text.replace("<br />", " ").replace("<br/>", " ")
}

/// Path of the leaf directory `{base}/{split}/{label}`.
pub fn label_dir(base: &Path, split: Split, label: Label) -> PathBuf {
    base.join(split.as_str()).join(label.dir_name())
}
