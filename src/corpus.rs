use std::sync::Arc;

/// Ordered, immutable collection of document texts.
///
/// A document's position is its stable index. Cloning shares the underlying
/// storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    documents: Arc<[String]>,
}

impl Corpus {
    pub fn new(documents: Vec<String>) -> Self {
        Self {
            documents: documents.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document text by index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.documents.get(index).map(String::as_str)
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for Corpus {
    fn from(documents: Vec<String>) -> Self {
        Self::new(documents)
    }
}

impl FromIterator<String> for Corpus {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
