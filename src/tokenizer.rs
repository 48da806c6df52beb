use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

lazy_static::lazy_static! {
    static ref ENGLISH_STOPWORDS: BTreeSet<String> = {
        [
            "a", "about", "above", "after", "again", "against", "all", "am", "an", "and",
            "any", "are", "aren", "as", "at", "be", "because", "been", "before", "being",
            "below", "between", "both", "but", "by", "can", "couldn", "d", "did", "didn",
            "do", "does", "doesn", "doing", "don", "down", "during", "each", "few", "for",
            "from", "further", "had", "hadn", "has", "hasn", "have", "haven", "having", "he",
            "her", "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in",
            "into", "is", "isn", "it", "its", "itself", "just", "ll", "m", "ma", "me",
            "mightn", "more", "most", "mustn", "my", "myself", "needn", "no", "nor", "not",
            "now", "o", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
            "ourselves", "out", "over", "own", "re", "s", "same", "shan", "she", "should",
            "shouldn", "so", "some", "such", "t", "than", "that", "the", "their", "theirs",
            "them", "themselves", "then", "there", "these", "they", "this", "those",
            "through", "to", "too", "under", "until", "up", "ve", "very", "was", "wasn", "we",
            "were", "weren", "what", "when", "where", "which", "while", "who", "whom", "why",
            "will", "with", "won", "wouldn", "y", "you", "your", "yours", "yourself",
            "yourselves",
        ]
        .iter()
        .map(|w| w.to_string())
        .collect()
    };
}

/// Built-in English stopword list, used when the caller supplies none.
///
/// Contractions are stored by their alphanumeric fragments ("don", "t") since
/// the tokenizer splits on apostrophes.
pub fn english_stopwords() -> BTreeSet<String> {
    ENGLISH_STOPWORDS.clone()
}

/// Text analyzer shared by indexing and querying.
///
/// Lower-cases the input, splits on non-alphanumeric boundaries and drops
/// stopwords. The stopword set travels with the index so queries are always
/// analyzed the way the corpus was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tokenizer {
    stopwords: BTreeSet<String>,
}

impl Tokenizer {
    /// Create a tokenizer with the given stopwords (matched case-insensitively)
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Tokenizer using the built-in English stopword list
    pub fn english() -> Self {
        Self {
            stopwords: english_stopwords(),
        }
    }

    pub fn stopwords(&self) -> &BTreeSet<String> {
        &self.stopwords
    }

    /// Split already lower-cased text into alphanumeric runs
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.chars()
            .fold(vec![String::new()], |mut tokens, c| {
                if c.is_alphanumeric() {
                    if let Some(last) = tokens.last_mut() {
                        last.push(c);
                    }
                } else if tokens.last().map_or(false, |s| !s.is_empty()) {
                    tokens.push(String::new());
                }
                tokens
            })
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Remove stopwords
    fn stopword_filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|t| !self.stopwords.contains(t))
            .collect()
    }

    /// Full analysis pipeline: fold case, split, drop stopwords
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let folded = text.to_lowercase();
        let tokens = self.tokenize(&folded);
        self.stopword_filter(tokens)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::english()
    }
}
