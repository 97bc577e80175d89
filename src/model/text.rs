//! Text analysis for the TF-IDF vectorizer.
//!
//! A document is lowercased, folded to ASCII (NFKD decomposition with every
//! non-ASCII code point dropped), split into word tokens of at least two
//! characters, stripped of English stop words and expanded into n-grams.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Word tokens of two or more word characters.
pub const TOKEN_PATTERN: &str = r"\b\w\w+\b";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_PATTERN).expect("token pattern is valid"));

static STOP_WORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

/// English stop words removed before n-grams are formed.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or",
    "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
    "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Folds `text` to ASCII by decomposing it and dropping non-ASCII code points.
pub fn strip_accents_ascii(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// Analyzer settings; fixed once the vectorizer is fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analyzer {
    pub lowercase: bool,
    pub strip_accents: bool,
    pub stop_words: bool,
    /// Inclusive n-gram range `(min_n, max_n)`.
    pub ngram_range: (usize, usize),
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_accents: true,
            stop_words: true,
            ngram_range: (1, 2),
        }
    }
}

impl Analyzer {
    /// Lowercasing and accent folding.
    pub fn preprocess(&self, doc: &str) -> String {
        let lowered = if self.lowercase {
            doc.to_lowercase()
        } else {
            doc.to_string()
        };
        if self.strip_accents {
            strip_accents_ascii(&lowered)
        } else {
            lowered
        }
    }

    /// Word tokens of `doc` after preprocessing and stop-word removal.
    pub fn tokens(&self, doc: &str) -> Vec<String> {
        let doc = self.preprocess(doc);
        TOKEN_RE
            .find_iter(&doc)
            .map(|m| m.as_str())
            .filter(|t| !(self.stop_words && STOP_WORDS.contains(t)))
            .map(str::to_string)
            .collect()
    }

    /// Every n-gram of `doc` within the configured range, space-joined.
    pub fn analyze(&self, doc: &str) -> Vec<String> {
        let tokens = self.tokens(doc);
        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n.max(1)..=max_n {
            if n == 1 {
                grams.extend(tokens.iter().cloned());
                continue;
            }
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }
}
