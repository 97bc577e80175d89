//! Reads the materialized corpus back into memory for training.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CorpusError;

use super::types::{normalize_review, Label, Split};

/// Parallel vectors of review texts and their classes (0 = neg, 1 = pos).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub texts: Vec<String>,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn push(&mut self, text: String, label: Label) {
        self.texts.push(text);
        self.labels.push(label.as_class());
    }
}

/// The train and test splits of the corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub train: Dataset,
    pub test: Dataset,
}

/// Reads `{path}/neg` and `{path}/pos`.
///
/// Only `*.txt` files are read, in name order. Invalid UTF-8 sequences are
/// dropped and line-break markup becomes a space. A missing label directory
/// is a [`CorpusError::MissingDirectory`] naming it.
pub fn read_split(path: &Path) -> Result<Dataset, CorpusError> {
    let mut dataset = Dataset::default();

    for label in Label::ALL {
        let dir = path.join(label.dir_name());
        if !dir.is_dir() {
            return Err(CorpusError::MissingDirectory(dir));
        }

        let entries = fs::read_dir(&dir)?.map(|e| e.map(|e| e.path()));
        for file in review_files(entries)? {
            let bytes = fs::read(&file)?;
            let text: String = bytes.utf8_chunks().map(|c| c.valid()).collect();
            dataset.push(normalize_review(&text), label);
        }
    }

    Ok(dataset)
}

/// Keeps the `*.txt` paths of a directory listing, sorted by name.
///
/// A failed entry fails the whole listing.
fn review_files(entries: impl IntoIterator<Item = io::Result<PathBuf>>) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<_> = entries
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|x| x == "txt"))
        .collect();
    files.sort();
    Ok(files)
}

/// Loads `{root}/train` and `{root}/test`.
pub fn load_corpus(root: &Path) -> Result<Corpus, CorpusError> {
    let train = read_split(&root.join(Split::Train.as_str()))?;
    let test = read_split(&root.join(Split::Test.as_str()))?;
    tracing::debug!(train = train.len(), test = test.len(), "Corpus loaded");
    Ok(Corpus { train, test })
}
