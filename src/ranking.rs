use crate::error::{Result, SearchError};
use crate::matrix::DenseMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Ranked search result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub doc_index: usize,
    /// Cosine similarity in [-1, 1]
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(doc_index: usize, score: f64) -> Self {
        Self { doc_index, score }
    }
}

impl Eq for ScoredDocument {}

/// Greater means better: higher score, then lower document index
impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_index.cmp(&self.doc_index))
    }
}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine similarity given precomputed norms.
///
/// Returns exactly 0 when either norm is zero, and clamps rounding noise
/// into [-1, 1].
pub fn cosine_with_norms(a: &[f64], a_norm: f64, b: &[f64], b_norm: f64) -> f64 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let similarity = (dot / (a_norm * b_norm)).clamp(-1.0, 1.0);
    // -0.0 sorts below 0.0 under total_cmp
    if similarity == 0.0 {
        0.0
    } else {
        similarity
    }
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}

/// Select the `k` documents most similar to `query`.
///
/// `document_norms[i]` is the L2 norm of row `i` of `documents`. Uses a
/// bounded min-heap, O(n log k). Ties go to the lower document index.
pub fn rank_top_k(
    query: &[f64],
    documents: &DenseMatrix,
    document_norms: &[f64],
    k: usize,
) -> Result<Vec<ScoredDocument>> {
    if k == 0 {
        return Err(SearchError::InvalidK(k));
    }

    let query_norm = l2_norm(query);
    let capacity = k.min(documents.rows());
    let mut heap: BinaryHeap<Reverse<ScoredDocument>> = BinaryHeap::with_capacity(capacity + 1);

    for (doc_index, &doc_norm) in document_norms.iter().enumerate().take(documents.rows()) {
        let score = cosine_with_norms(query, query_norm, documents.row(doc_index), doc_norm);
        let candidate = ScoredDocument::new(doc_index, score);

        if heap.len() < capacity {
            heap.push(Reverse(candidate));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if candidate > *worst {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
    }

    // Ascending order of Reverse<_> is best-first
    Ok(heap.into_sorted_vec().into_iter().map(|Reverse(d)| d).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(rows: Vec<Vec<f64>>) -> (DenseMatrix, Vec<f64>) {
        let (n, cols) = (rows.len(), rows[0].len());
        let norms = rows.iter().map(|r| l2_norm(r)).collect();
        let data = rows.into_iter().flatten().collect();
        (DenseMatrix::from_vec(n, cols, data).unwrap(), norms)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn test_zero_vectors_score_exactly_zero() {
        let zero = [0.0, 0.0];
        let score = cosine_similarity(&zero, &[1.0, 2.0]);
        assert_eq!(score, 0.0);
        assert!(!score.is_nan());
        assert_eq!(cosine_similarity(&[1.0, 2.0], &zero), 0.0);
    }

    #[test]
    fn test_scores_stay_in_range() {
        // Nearly parallel vectors with rounding noise
        let a = [0.1, 0.2, 0.3];
        let b = [0.1 * 3.0, 0.2 * 3.0, 0.3 * 3.0];
        let score = cosine_similarity(&a, &b);
        assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn test_rank_orders_descending() -> Result<()> {
        let (m, norms) = docs(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![-1.0, 0.0],
        ]);
        let results = rank_top_k(&[1.0, 0.0], &m, &norms, 3)?;
        let order: Vec<usize> = results.iter().map(|r| r.doc_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!((results[0].score - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_ties_break_by_index() -> Result<()> {
        let (m, norms) = docs(vec![
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 5.0],
        ]);
        let results = rank_top_k(&[1.0, 0.0], &m, &norms, 5)?;
        let order: Vec<usize> = results.iter().map(|r| r.doc_index).collect();
        assert_eq!(order, vec![1, 3, 0, 2, 4]);

        // Selection keeps the lowest indices among equal scores
        let results = rank_top_k(&[0.0, 1.0], &m, &norms, 2)?;
        let order: Vec<usize> = results.iter().map(|r| r.doc_index).collect();
        assert_eq!(order, vec![0, 2]);
        Ok(())
    }

    #[test]
    fn test_k_larger_than_corpus() -> Result<()> {
        let (m, norms) = docs(vec![vec![1.0], vec![2.0]]);
        let results = rank_top_k(&[1.0], &m, &norms, 10)?;
        assert_eq!(results.len(), 2);
        Ok(())
    }

    #[test]
    fn test_zero_query_returns_k_zero_scores() -> Result<()> {
        let (m, norms) = docs(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        let results = rank_top_k(&[0.0, 0.0], &m, &norms, 2)?;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 0.0));
        assert_eq!(results[0].doc_index, 0);
        assert_eq!(results[1].doc_index, 1);
        Ok(())
    }

    #[test]
    fn test_invalid_k() {
        let (m, norms) = docs(vec![vec![1.0]]);
        assert_eq!(
            rank_top_k(&[1.0], &m, &norms, 0).unwrap_err(),
            SearchError::InvalidK(0)
        );
    }
}
