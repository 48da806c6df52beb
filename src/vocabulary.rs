use crate::error::{Result, SearchError};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Term dictionary: term -> column index, with document frequencies.
///
/// Columns are assigned in first-seen order while walking the corpus in
/// document order, so the layout is deterministic for a given corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyParts", into = "VocabularyParts")]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: HashMap<String, usize>,
    document_frequencies: Vec<usize>,
    num_documents: usize,
}

impl Vocabulary {
    /// Analyze every document and build the vocabulary.
    ///
    /// Returns the analyzed token streams alongside so the weighting step does
    /// not tokenize the corpus a second time.
    pub fn build<S: AsRef<str>>(
        documents: &[S],
        tokenizer: &Tokenizer,
    ) -> Result<(Self, Vec<Vec<String>>)> {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| tokenizer.analyze(doc.as_ref()))
            .collect();
        let vocabulary = Self::from_tokenized(&tokenized)?;
        Ok((vocabulary, tokenized))
    }

    /// Build from documents that are already analyzed
    pub fn from_tokenized(documents: &[Vec<String>]) -> Result<Self> {
        let mut terms = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut document_frequencies = Vec::new();

        for tokens in documents {
            let mut seen: HashSet<usize> = HashSet::new();
            for token in tokens {
                let column = match lookup.get(token) {
                    Some(&column) => column,
                    None => {
                        let column = terms.len();
                        terms.push(token.clone());
                        lookup.insert(token.clone(), column);
                        document_frequencies.push(0);
                        column
                    }
                };
                if seen.insert(column) {
                    document_frequencies[column] += 1;
                }
            }
        }

        if terms.is_empty() {
            return Err(SearchError::EmptyVocabulary);
        }

        Ok(Self {
            terms,
            lookup,
            document_frequencies,
            num_documents: documents.len(),
        })
    }

    /// Column index of a term
    pub fn get(&self, term: &str) -> Option<usize> {
        self.lookup.get(term).copied()
    }

    pub fn term(&self, column: usize) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Number of documents containing the term at `column`
    pub fn document_frequency(&self, column: usize) -> usize {
        self.document_frequencies.get(column).copied().unwrap_or(0)
    }

    pub fn document_frequencies(&self) -> &[usize] {
        &self.document_frequencies
    }

    /// Number of documents the vocabulary was built from
    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Serialized form; the lookup table is rebuilt on load.
#[derive(Clone, Serialize, Deserialize)]
struct VocabularyParts {
    terms: Vec<String>,
    document_frequencies: Vec<usize>,
    num_documents: usize,
}

impl From<VocabularyParts> for Vocabulary {
    fn from(parts: VocabularyParts) -> Self {
        let lookup = parts
            .terms
            .iter()
            .enumerate()
            .map(|(column, term)| (term.clone(), column))
            .collect();
        Self {
            terms: parts.terms,
            lookup,
            document_frequencies: parts.document_frequencies,
            num_documents: parts.num_documents,
        }
    }
}

impl From<Vocabulary> for VocabularyParts {
    fn from(vocabulary: Vocabulary) -> Self {
        Self {
            terms: vocabulary.terms,
            document_frequencies: vocabulary.document_frequencies,
            num_documents: vocabulary.num_documents,
        }
    }
}
