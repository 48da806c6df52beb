//! TF-IDF weighting.
//!
//! `idf(t) = ln((1 + N) / (1 + df(t))) + 1`, `w(d, t) = count(t, d) * idf(t)`,
//! then every row is scaled to unit L2 norm. Cosine ranking downstream relies
//! on the rows being unit length.

use crate::matrix::CsrMatrix;
use crate::vocabulary::Vocabulary;
use std::collections::HashMap;

/// Smoothed inverse document frequency. Always strictly positive.
pub fn smoothed_idf(num_documents: usize, document_frequency: usize) -> f64 {
    ((1.0 + num_documents as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
}

/// IDF weight for every vocabulary column
pub fn idf_vector(vocabulary: &Vocabulary) -> Vec<f64> {
    let n = vocabulary.num_documents();
    vocabulary
        .document_frequencies()
        .iter()
        .map(|&df| smoothed_idf(n, df))
        .collect()
}

/// Raw `count * idf` sparse vector for one token stream.
///
/// Tokens missing from the vocabulary are dropped. The result is sorted by
/// column and is empty when no token is known.
pub fn weigh_tokens(tokens: &[String], vocabulary: &Vocabulary, idf: &[f64]) -> Vec<(usize, f64)> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for token in tokens {
        if let Some(column) = vocabulary.get(token) {
            *counts.entry(column).or_insert(0) += 1;
        }
    }

    let mut weights: Vec<(usize, f64)> = counts
        .into_iter()
        .map(|(column, count)| (column, count as f64 * idf[column]))
        .collect();
    weights.sort_by_key(|&(column, _)| column);
    weights
}

/// Scale a sparse vector to unit length; a zero vector is left as is
pub fn l2_normalize(weights: &mut [(usize, f64)]) {
    let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in weights.iter_mut() {
            *w /= norm;
        }
    }
}

/// Build the documents × terms TF-IDF matrix from analyzed documents
pub fn tfidf_matrix(documents: &[Vec<String>], vocabulary: &Vocabulary, idf: &[f64]) -> CsrMatrix {
    let rows = documents
        .iter()
        .map(|tokens| weigh_tokens(tokens, vocabulary, idf))
        .collect();
    let mut matrix = CsrMatrix::from_rows(vocabulary.len(), rows);
    matrix.normalize_rows();
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::tokenizer::Tokenizer;

    fn build(corpus: &[&str]) -> Result<(Vocabulary, Vec<f64>, CsrMatrix)> {
        let tokenizer = Tokenizer::new(["the", "and"]);
        let (vocab, tokenized) = Vocabulary::build(corpus, &tokenizer)?;
        let idf = idf_vector(&vocab);
        let matrix = tfidf_matrix(&tokenized, &vocab, &idf);
        Ok((vocab, idf, matrix))
    }

    #[test]
    fn test_smoothed_idf() {
        // df == N gives exactly 1
        assert!((smoothed_idf(3, 3) - 1.0).abs() < 1e-15);
        assert!((smoothed_idf(3, 1) - (2.0f64.ln() + 1.0)).abs() < 1e-15);
        assert!(smoothed_idf(1_000_000, 1_000_000) > 0.0);
    }

    #[test]
    fn test_rows_are_unit_length() -> Result<()> {
        let (_, _, m) = build(&["the cat sat", "the dog ran", "cats and dogs", "the the"])?;
        assert_eq!(m.rows(), 4);
        for i in 0..3 {
            assert!((m.row_norm(i) - 1.0).abs() < 1e-12);
        }
        // A document without vocabulary terms stays an all-zero row
        assert_eq!(m.row_norm(3), 0.0);
        assert_eq!(m.zero_rows(), 1);
        Ok(())
    }

    #[test]
    fn test_weights_follow_counts_and_idf() -> Result<()> {
        let (vocab, idf, m) = build(&["apple apple banana", "banana cherry"])?;
        let apple = vocab.get("apple").unwrap();
        let banana = vocab.get("banana").unwrap();

        let (cols, vals) = m.row(0);
        assert_eq!(cols, &[apple, banana]);
        let raw_apple = 2.0 * idf[apple];
        let raw_banana = idf[banana];
        let norm = (raw_apple * raw_apple + raw_banana * raw_banana).sqrt();
        assert!((vals[0] - raw_apple / norm).abs() < 1e-12);
        assert!((vals[1] - raw_banana / norm).abs() < 1e-12);
        assert!(vals.iter().all(|&v| v >= 0.0));
        Ok(())
    }

    #[test]
    fn test_unknown_tokens_are_dropped() -> Result<()> {
        let (vocab, idf, _) = build(&["alpha beta"])?;
        let weights = weigh_tokens(&["gamma".to_string(), "delta".to_string()], &vocab, &idf);
        assert!(weights.is_empty());

        let weights = weigh_tokens(
            &["beta".to_string(), "gamma".to_string(), "beta".to_string()],
            &vocab,
            &idf,
        );
        assert_eq!(weights, vec![(1, 2.0 * idf[1])]);
        Ok(())
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut v = vec![(0, 3.0), (4, 4.0)];
        l2_normalize(&mut v);
        let once = v.clone();
        l2_normalize(&mut v);
        for ((_, a), (_, b)) in once.iter().zip(&v) {
            assert!((a - b).abs() < 1e-15);
        }
        assert!((v[0].1 - 0.6).abs() < 1e-15);

        let mut zero: Vec<(usize, f64)> = Vec::new();
        l2_normalize(&mut zero);
        assert!(zero.is_empty());
    }
}
