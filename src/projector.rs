use crate::error::{Result, SearchError};
use crate::matrix::DenseMatrix;
use crate::tfidf::{l2_normalize, weigh_tokens};
use crate::tokenizer::Tokenizer;
use crate::vocabulary::Vocabulary;

/// Maps query text into the latent space of a built index.
///
/// Uses the index's vocabulary, IDF weights and latent factors as they are;
/// nothing is refit at query time.
pub struct QueryProjector<'a> {
    tokenizer: &'a Tokenizer,
    vocabulary: &'a Vocabulary,
    idf: &'a [f64],
    components: &'a DenseMatrix,
}

impl<'a> QueryProjector<'a> {
    pub fn new(
        tokenizer: &'a Tokenizer,
        vocabulary: &'a Vocabulary,
        idf: &'a [f64],
        components: &'a DenseMatrix,
    ) -> Self {
        Self {
            tokenizer,
            vocabulary,
            idf,
            components,
        }
    }

    /// Unit-normalized TF-IDF vector of the query.
    ///
    /// Terms outside the vocabulary are dropped, so an all-unknown query
    /// yields an empty vector rather than an error.
    pub fn term_vector(&self, query: &str) -> Result<Vec<(usize, f64)>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let tokens = self.tokenizer.analyze(query);
        let mut weights = weigh_tokens(&tokens, self.vocabulary, self.idf);
        l2_normalize(&mut weights);
        Ok(weights)
    }

    /// `query_tfidf · V`, a vector of length k
    pub fn project(&self, query: &str) -> Result<Vec<f64>> {
        let weights = self.term_vector(query)?;
        let mut latent = vec![0.0; self.components.cols()];
        for (column, weight) in weights {
            for (l, &v) in latent.iter_mut().zip(self.components.row(column)) {
                *l += weight * v;
            }
        }
        Ok(latent)
    }
}
