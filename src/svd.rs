//! Truncated SVD for latent semantic analysis.
//!
//! Randomized range finder with power iterations (Halko, Martinsson & Tropp,
//! "Finding structure with randomness", 2011), followed by an exact
//! eigendecomposition of the small projected Gram matrix with cyclic Jacobi
//! rotations.
//!
//! Output is canonical for a given input and seed: components are ordered by
//! descending singular value and each one is signed so that the
//! largest-magnitude entry of its term loading is positive.

use crate::error::{Result, SearchError};
use crate::matrix::{CsrMatrix, DenseMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Columns whose residual norm falls below this after orthogonalization are
/// treated as linearly dependent and zeroed.
const DEPENDENCE_EPS: f64 = 1e-10;

/// Relative off-diagonal mass at which the Jacobi solver stops
const JACOBI_TOLERANCE: f64 = 1e-14;

/// Truncated SVD settings
#[derive(Debug, Clone, Copy)]
pub struct TruncatedSvd {
    pub rank: usize,
    pub seed: u64,
    /// Extra random directions sampled beyond `rank`
    pub oversampling: usize,
    pub power_iterations: usize,
    /// Jacobi sweep budget before giving up with `NumericInstability`
    pub max_sweeps: usize,
}

/// Factorization result: `M ≈ U · Σ · Vᵗ`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentModel {
    /// `V`, terms × k. Projects term-space vectors into the latent space.
    pub components: DenseMatrix,
    /// Σ, descending
    pub singular_values: Vec<f64>,
    /// `M · V`, documents × k
    pub document_vectors: DenseMatrix,
}

impl LatentModel {
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }
}

impl TruncatedSvd {
    #[instrument(skip_all, fields(rows = matrix.rows(), cols = matrix.cols(), rank = self.rank))]
    pub fn fit(&self, matrix: &CsrMatrix) -> Result<LatentModel> {
        let max = matrix.rows().min(matrix.cols());
        if self.rank == 0 || self.rank > max {
            return Err(SearchError::RankTooLarge {
                rank: self.rank,
                max,
            });
        }

        let sketch = (self.rank + self.oversampling).min(max);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut omega = DenseMatrix::zeros(matrix.cols(), sketch);
        for r in 0..matrix.cols() {
            for value in omega.row_mut(r) {
                *value = rng.gen_range(-1.0..1.0);
            }
        }

        // Orthonormal basis Q (documents × sketch) for the dominant range of M
        let mut q = orthonormalize(matrix.mul_dense(&omega));
        for _ in 0..self.power_iterations {
            let z = orthonormalize(matrix.transpose_mul_dense(&q));
            q = orthonormalize(matrix.mul_dense(&z));
        }

        // Bᵗ = Mᵗ Q, so B Bᵗ = Qᵗ M Mᵗ Q is sketch × sketch
        let bt = matrix.transpose_mul_dense(&q);
        let gram = bt.transpose_mul(&bt);
        if !gram.is_finite() {
            return Err(SearchError::NumericInstability(
                "non-finite values in projected Gram matrix".to_string(),
            ));
        }

        let (eigenvalues, eigenvectors, sweeps) = jacobi_eigen(gram, self.max_sweeps)?;

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
        order.truncate(self.rank);

        let w = eigenvectors.select_columns(&order);
        let singular_values: Vec<f64> = order
            .iter()
            .map(|&j| eigenvalues[j].max(0.0).sqrt())
            .collect();

        // V = Bᵗ W Σ⁻¹; components with a vanishing singular value stay zero
        let mut components = bt.mul(&w);
        for (j, &sigma) in singular_values.iter().enumerate() {
            let factor = if sigma > DEPENDENCE_EPS { 1.0 / sigma } else { 0.0 };
            components.scale_column(j, factor);
        }
        canonicalize_signs(&mut components);

        if !components.is_finite() {
            return Err(SearchError::NumericInstability(
                "non-finite values in latent factors".to_string(),
            ));
        }

        let document_vectors = matrix.mul_dense(&components);
        debug!(
            sweeps,
            top_singular_value = singular_values.first().copied().unwrap_or(0.0),
            "truncated SVD converged"
        );

        Ok(LatentModel {
            components,
            singular_values,
            document_vectors,
        })
    }
}

/// Modified Gram-Schmidt over the columns, applied twice for stability.
///
/// Dependent columns come out as zero columns.
fn orthonormalize(matrix: DenseMatrix) -> DenseMatrix {
    let (rows, cols) = (matrix.rows(), matrix.cols());
    let mut columns: Vec<Vec<f64>> = (0..cols).map(|c| matrix.column(c)).collect();

    for j in 0..cols {
        let original = norm(&columns[j]);
        for _ in 0..2 {
            for i in 0..j {
                let (done, rest) = columns.split_at_mut(j);
                let basis = &done[i];
                let projection = dot(basis, &rest[0]);
                for (x, b) in rest[0].iter_mut().zip(basis) {
                    *x -= projection * b;
                }
            }
        }
        let residual = norm(&columns[j]);
        if residual <= DEPENDENCE_EPS * original.max(1.0) {
            columns[j].iter_mut().for_each(|x| *x = 0.0);
        } else {
            columns[j].iter_mut().for_each(|x| *x /= residual);
        }
    }

    let mut out = DenseMatrix::zeros(rows, cols);
    for (c, column) in columns.iter().enumerate() {
        for (r, &value) in column.iter().enumerate() {
            out.set(r, c, value);
        }
    }
    out
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues, eigenvectors as columns, and the sweeps used.
fn jacobi_eigen(mut a: DenseMatrix, max_sweeps: usize) -> Result<(Vec<f64>, DenseMatrix, usize)> {
    let n = a.rows();
    let mut v = DenseMatrix::identity(n);
    let scale = (0..n)
        .flat_map(|i| a.row(i).to_vec())
        .map(|x| x * x)
        .sum::<f64>()
        .sqrt();

    let converged = |a: &DenseMatrix| -> bool {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a.get(p, q) * a.get(p, q))
            .sum();
        off == 0.0 || off.sqrt() <= JACOBI_TOLERANCE * scale
    };

    let mut sweeps = 0;
    while !converged(&a) {
        if sweeps == max_sweeps {
            return Err(SearchError::NumericInstability(format!(
                "eigensolver did not converge within {} sweeps",
                max_sweeps
            )));
        }
        sweeps += 1;

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a.get(p, q);
                if apq == 0.0 {
                    continue;
                }
                let theta = (a.get(q, q) - a.get(p, p)) / (2.0 * apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a.get(k, p), a.get(k, q));
                    a.set(k, p, c * akp - s * akq);
                    a.set(k, q, s * akp + c * akq);
                }
                for k in 0..n {
                    let (apk, aqk) = (a.get(p, k), a.get(q, k));
                    a.set(p, k, c * apk - s * aqk);
                    a.set(q, k, s * apk + c * aqk);
                }
                for k in 0..n {
                    let (vkp, vkq) = (v.get(k, p), v.get(k, q));
                    v.set(k, p, c * vkp - s * vkq);
                    v.set(k, q, s * vkp + c * vkq);
                }
            }
        }

        if !a.is_finite() {
            return Err(SearchError::NumericInstability(
                "eigensolver produced non-finite values".to_string(),
            ));
        }
    }

    let eigenvalues = (0..n).map(|i| a.get(i, i)).collect();
    Ok((eigenvalues, v, sweeps))
}

/// Flip each column so its largest-magnitude entry (first on ties) is positive
fn canonicalize_signs(components: &mut DenseMatrix) {
    for c in 0..components.cols() {
        let column = components.column(c);
        let pivot = column
            .iter()
            .copied()
            .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            components.scale_column(c, -1.0);
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svd(rank: usize) -> TruncatedSvd {
        TruncatedSvd {
            rank,
            seed: 42,
            oversampling: 10,
            power_iterations: 5,
            max_sweeps: 64,
        }
    }

    /// 4 × 5 matrix with distinct singular values
    fn sample() -> CsrMatrix {
        CsrMatrix::from_rows(
            5,
            vec![
                vec![(0, 3.0), (1, 1.0)],
                vec![(1, 2.0), (2, 1.0), (4, 0.5)],
                vec![(2, 1.0), (3, 4.0)],
                vec![(0, 1.0), (4, 2.0)],
            ],
        )
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} != {} (tol {})", a, b, tol);
    }

    #[test]
    fn test_rank_bounds() {
        let m = sample();
        assert_eq!(
            svd(5).fit(&m).unwrap_err(),
            SearchError::RankTooLarge { rank: 5, max: 4 }
        );
        assert_eq!(
            svd(0).fit(&m).unwrap_err(),
            SearchError::RankTooLarge { rank: 0, max: 4 }
        );
    }

    #[test]
    fn test_full_rank_reconstructs_gram() -> Result<()> {
        let m = sample();
        let model = svd(4).fit(&m)?;

        // Singular values are descending and positive
        for pair in model.singular_values.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert!(model.singular_values[3] > 0.0);

        // Σσ² equals the squared Frobenius norm at full rank
        let energy: f64 = model.singular_values.iter().map(|s| s * s).sum();
        assert_close(energy, m.frobenius_norm_sq(), 1e-9);

        // Vᵗ V = I
        let vtv = model.components.transpose_mul(&model.components);
        for i in 0..4 {
            for j in 0..4 {
                assert_close(vtv.get(i, j), if i == j { 1.0 } else { 0.0 }, 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_document_vectors_match_singular_values() -> Result<()> {
        let m = sample();
        let model = svd(2).fit(&m)?;
        // Column norms of M·V are the singular values
        for j in 0..2 {
            let column = model.document_vectors.column(j);
            assert_close(norm(&column), model.singular_values[j], 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_sign_convention() -> Result<()> {
        let model = svd(3).fit(&sample())?;
        for c in 0..3 {
            let column = model.components.column(c);
            let pivot = column
                .iter()
                .copied()
                .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
            assert!(pivot > 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_deterministic_for_seed() -> Result<()> {
        let m = sample();
        let a = svd(2).fit(&m)?;
        let b = svd(2).fit(&m)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_top_component_independent_of_seed() -> Result<()> {
        let m = sample();
        let a = svd(2).fit(&m)?;
        let b = TruncatedSvd { seed: 7, ..svd(2) }.fit(&m)?;
        assert_close(a.singular_values[0], b.singular_values[0], 1e-9);
        for (x, y) in a.components.column(0).iter().zip(b.components.column(0)) {
            assert_close(*x, y, 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_sweep_budget_exhausted() {
        let m = sample();
        let err = TruncatedSvd { max_sweeps: 0, ..svd(2) }.fit(&m).unwrap_err();
        assert!(matches!(err, SearchError::NumericInstability(_)));
    }

    #[test]
    fn test_rank_deficient_matrix() -> Result<()> {
        // Second row duplicates the first: numerical rank 1
        let m = CsrMatrix::from_rows(3, vec![vec![(0, 1.0), (1, 1.0)], vec![(0, 1.0), (1, 1.0)]]);
        let model = svd(2).fit(&m)?;
        assert_close(model.singular_values[0], 2.0, 1e-9);
        assert!(model.singular_values[1].abs() < 1e-6);
        assert!(model.components.is_finite());
        Ok(())
    }

    #[test]
    fn test_jacobi_diagonalizes() -> Result<()> {
        let a = DenseMatrix::from_vec(2, 2, vec![2.0, 1.0, 1.0, 2.0]).unwrap();
        let (mut values, _, sweeps) = jacobi_eigen(a, 10)?;
        values.sort_by(|a, b| a.total_cmp(b));
        assert_close(values[0], 1.0, 1e-12);
        assert_close(values[1], 3.0, 1e-12);
        assert!(sweeps >= 1);
        Ok(())
    }
}
