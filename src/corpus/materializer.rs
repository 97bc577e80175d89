//! Dataset materializer: tops up the on-disk review corpus from a stream.
//!
//! Each leaf directory `{base}/{split}/{label}` holds one review per file,
//! named by a zero-padded index. A run counts what is already present,
//! consumes the upstream stream only until the missing reviews are written,
//! and never touches an existing file.

use futures::StreamExt;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::CorpusError;

use super::source::ReviewSource;
use super::types::{label_dir, Label, Split};

/// Requested review counts for one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitTargets {
    pub pos: usize,
    pub neg: usize,
}

impl SplitTargets {
    pub fn new(pos: usize, neg: usize) -> Self {
        Self { pos, neg }
    }
}

/// Requested review counts for the whole corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorpusTargets {
    pub train: SplitTargets,
    pub test: SplitTargets,
}

impl Default for CorpusTargets {
    fn default() -> Self {
        Self {
            train: SplitTargets::new(6000, 6000),
            test: SplitTargets::new(2500, 2500),
        }
    }
}

impl CorpusTargets {
    pub fn for_split(&self, split: Split) -> SplitTargets {
        match split {
            Split::Train => self.train,
            Split::Test => self.test,
        }
    }
}

/// Outcome of topping up one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitReport {
    pub split: Split,
    pub before: SplitTargets,
    pub written: SplitTargets,
    pub after: SplitTargets,
}

impl SplitReport {
    /// Whether the run wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.written.pos == 0 && self.written.neg == 0
    }
}

/// Creates the four leaf directories under `base`.
pub fn ensure_layout(base: &Path) -> Result<(), CorpusError> {
    for split in Split::ALL {
        for label in Label::ALL {
            fs::create_dir_all(label_dir(base, split, label))?;
        }
    }
    Ok(())
}

/// Counts the `*.txt` review files in `dir`; a missing directory counts as empty.
pub fn count_reviews(dir: &Path) -> Result<usize, CorpusError> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "txt") {
            count += 1;
        }
    }
    Ok(count)
}

/// File name for review `index`.
pub fn review_file_name(index: usize) -> String {
    format!("{:06}.txt", index)
}

/// Appends reviews to one leaf directory.
struct LeafWriter {
    dir: PathBuf,
    next_index: usize,
    written: usize,
}

impl LeafWriter {
    fn new(dir: PathBuf, existing: usize) -> Self {
        Self {
            dir,
            next_index: existing,
            written: 0,
        }
    }

    /// Writes `text` to the next free index.
    ///
    /// The text goes to a temporary file first and is then persisted without
    /// clobbering, so an interrupted run never leaves a truncated `*.txt`.
    fn write(&mut self, text: &str) -> Result<PathBuf, CorpusError> {
        let mut path = self.dir.join(review_file_name(self.next_index));
        while path.exists() {
            self.next_index += 1;
            path = self.dir.join(review_file_name(self.next_index));
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist_noclobber(&path)
            .map_err(|e| CorpusError::PersistFailed {
                path: path.clone(),
                reason: e.error.to_string(),
            })?;

        self.next_index += 1;
        self.written += 1;
        Ok(path)
    }
}

/// Ensures `split` holds at least `target_pos` positive and `target_neg`
/// negative reviews, streaming the missing ones from `source`.
///
/// The stream is opened only when something is missing and is dropped as
/// soon as both deficits are met. If the stream ends first, the shortfall is
/// logged and the partial result is kept.
pub async fn ensure<S>(
    base: &Path,
    split: Split,
    target_pos: usize,
    target_neg: usize,
    source: &S,
) -> Result<SplitReport, CorpusError>
where
    S: ReviewSource + ?Sized,
{
    let pos_dir = label_dir(base, split, Label::Pos);
    let neg_dir = label_dir(base, split, Label::Neg);
    fs::create_dir_all(&pos_dir)?;
    fs::create_dir_all(&neg_dir)?;

    let cur_pos = count_reviews(&pos_dir)?;
    let cur_neg = count_reviews(&neg_dir)?;
    let need_pos = target_pos.saturating_sub(cur_pos);
    let need_neg = target_neg.saturating_sub(cur_neg);
    let before = SplitTargets::new(cur_pos, cur_neg);

    if need_pos == 0 && need_neg == 0 {
        info!("[{}] already complete: pos={}, neg={}", split, cur_pos, cur_neg);
        return Ok(SplitReport {
            split,
            before,
            written: SplitTargets::new(0, 0),
            after: before,
        });
    }

    info!(
        "[{}] current: pos={}, neg={} | creating: pos={}, neg={}",
        split, cur_pos, cur_neg, need_pos, need_neg
    );

    let mut pos_writer = LeafWriter::new(pos_dir.clone(), cur_pos);
    let mut neg_writer = LeafWriter::new(neg_dir.clone(), cur_neg);
    let mut consumed = 0usize;

    {
        let mut stream = source.stream(split);
        while pos_writer.written < need_pos || neg_writer.written < need_neg {
            let Some(item) = stream.next().await else {
                break;
            };
            let example = item?;
            consumed += 1;

            let writer = match example.label {
                Label::Pos if pos_writer.written < need_pos => &mut pos_writer,
                Label::Neg if neg_writer.written < need_neg => &mut neg_writer,
                _ => continue,
            };
            let path = writer.write(&example.text)?;
            tracing::trace!(path = %path.display(), "Wrote review");
        }
    }

    let written = SplitTargets::new(pos_writer.written, neg_writer.written);
    if written.pos < need_pos || written.neg < need_neg {
        warn!(
            split = %split,
            missing_pos = need_pos - written.pos,
            missing_neg = need_neg - written.neg,
            "Upstream stream ended before targets were met"
        );
    }

    let after = SplitTargets::new(count_reviews(&pos_dir)?, count_reviews(&neg_dir)?);
    info!(
        consumed,
        "[{}] final: pos={}, neg={}", split, after.pos, after.neg
    );

    Ok(SplitReport {
        split,
        before,
        written,
        after,
    })
}

/// Creates the corpus layout under `base` and tops up train, then test.
pub async fn materialize<S>(
    base: &Path,
    targets: CorpusTargets,
    source: &S,
) -> Result<Vec<SplitReport>, CorpusError>
where
    S: ReviewSource + ?Sized,
{
    ensure_layout(base)?;

    let mut reports = Vec::with_capacity(Split::ALL.len());
    for split in Split::ALL {
        let t = targets.for_split(split);
        reports.push(ensure(base, split, t.pos, t.neg, source).await?);
    }

    info!("[✓] Ready in ./{}", base.display());
    Ok(reports)
}
