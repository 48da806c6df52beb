//! Sparse and dense matrix types used by the indexing pipeline.
//!
//! Both are `f64`, row-major, with their shape fixed at construction.

use serde::{Deserialize, Serialize};

/// Compressed sparse row matrix.
///
/// Column indices within a row are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from per-row `(column, value)` entries.
    ///
    /// Entries are sorted by column; duplicate columns are summed and exact
    /// zeros are dropped.
    pub fn from_rows(cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        let n_rows = rows.len();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);

        for mut row in rows {
            row.sort_by_key(|&(col, _)| col);
            let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
            for (col, value) in row {
                debug_assert!(col < cols, "column {} out of bounds ({})", col, cols);
                match merged.last_mut() {
                    Some(last) if last.0 == col => last.1 += value,
                    _ => merged.push((col, value)),
                }
            }
            for (col, value) in merged.into_iter().filter(|&(_, v)| v != 0.0) {
                indices.push(col);
                values.push(value);
            }
            indptr.push(indices.len());
        }

        Self {
            rows: n_rows,
            cols,
            indptr,
            indices,
            values,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.values[start..end])
    }

    pub fn row_norm(&self, i: usize) -> f64 {
        self.row(i).1.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Scale every row to unit L2 norm. Zero rows are left untouched.
    pub fn normalize_rows(&mut self) {
        for i in 0..self.rows {
            let norm = self.row_norm(i);
            if norm > 0.0 {
                let (start, end) = (self.indptr[i], self.indptr[i + 1]);
                for value in &mut self.values[start..end] {
                    *value /= norm;
                }
            }
        }
    }

    /// Number of rows without any stored entry
    pub fn zero_rows(&self) -> usize {
        self.indptr.windows(2).filter(|w| w[0] == w[1]).count()
    }

    pub fn frobenius_norm_sq(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// `self · rhs`, where `rhs` is `cols × l`
    pub fn mul_dense(&self, rhs: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.cols, rhs.rows(), "shape mismatch in sparse product");
        let mut out = DenseMatrix::zeros(self.rows, rhs.cols());
        for i in 0..self.rows {
            let (cols, vals) = self.row(i);
            let out_row = out.row_mut(i);
            for (&c, &v) in cols.iter().zip(vals) {
                for (o, &r) in out_row.iter_mut().zip(rhs.row(c)) {
                    *o += v * r;
                }
            }
        }
        out
    }

    /// `selfᵗ · rhs`, where `rhs` is `rows × l`
    pub fn transpose_mul_dense(&self, rhs: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.rows, rhs.rows(), "shape mismatch in transposed sparse product");
        let mut out = DenseMatrix::zeros(self.cols, rhs.cols());
        for i in 0..self.rows {
            let (cols, vals) = self.row(i);
            let rhs_row = rhs.row(i);
            for (&c, &v) in cols.iter().zip(vals) {
                for (o, &r) in out.row_mut(c).iter_mut().zip(rhs_row) {
                    *o += v * r;
                }
            }
        }
        out
    }
}

/// Dense row-major matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DenseParts")]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Unchecked serialized form of [`DenseMatrix`]
#[derive(Deserialize)]
struct DenseParts {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<DenseParts> for DenseMatrix {
    type Error = String;

    fn try_from(parts: DenseParts) -> std::result::Result<Self, Self::Error> {
        let expected = parts.rows.checked_mul(parts.cols);
        if expected != Some(parts.data.len()) {
            return Err(format!(
                "dense matrix {}x{} holds {} values",
                parts.rows,
                parts.cols,
                parts.data.len()
            ));
        }
        Ok(Self {
            rows: parts.rows,
            cols: parts.cols,
            data: parts.data,
        })
    }
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build from row-major data. Returns `None` when the length does not match.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    pub fn scale_column(&mut self, c: usize, factor: f64) {
        for r in 0..self.rows {
            self.data[r * self.cols + c] *= factor;
        }
    }

    /// Keep only the listed columns, in the given order
    pub fn select_columns(&self, columns: &[usize]) -> Self {
        let mut out = Self::zeros(self.rows, columns.len());
        for r in 0..self.rows {
            for (j, &c) in columns.iter().enumerate() {
                out.set(r, j, self.get(r, c));
            }
        }
        out
    }

    /// `self · rhs`
    pub fn mul(&self, rhs: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.cols, rhs.rows, "shape mismatch in dense product");
        let mut out = Self::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for (o, &b) in out.row_mut(i).iter_mut().zip(rhs.row(k)) {
                    *o += a * b;
                }
            }
        }
        out
    }

    /// `selfᵗ · rhs`
    pub fn transpose_mul(&self, rhs: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.rows, rhs.rows, "shape mismatch in transposed dense product");
        let mut out = Self::zeros(self.cols, rhs.cols);
        for k in 0..self.rows {
            let rhs_row = rhs.row(k);
            for i in 0..self.cols {
                let a = self.get(k, i);
                if a == 0.0 {
                    continue;
                }
                for (o, &b) in out.row_mut(i).iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }
        out
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
