//! Exact elimination of linear equality constraints.
//!
//! For a system `A x = b` we compute the reduced row echelon form with partial
//! pivoting and split the coordinates into:
//!
//! - pivot coordinates, determined by the constraints
//! - free coordinates, left to the optimizer
//!
//! The optimizer then searches over the free coordinates only and every point it
//! proposes satisfies the equalities by construction:
//!
//! ```text
//! x_pivot = offset - C · x_free
//! ```
//!
//! Rows with a single unit coefficient (e.g. `w = -1`) pass through the
//! reduction untouched, so pinned coordinates come out bit-exact.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Coefficients below this magnitude are treated as zero during pivoting.
const PIVOT_EPS: f64 = 1e-12;

/// Affine parametrization of `{x : A x = b}` by its free coordinates.
#[derive(Debug, Clone)]
pub struct AffineSubspace {
    dim: usize,
    pivot_cols: Vec<usize>,
    free_cols: Vec<usize>,
    offset: DVector<f64>,
    coupling: DMatrix<f64>,
}

impl AffineSubspace {
    /// The whole space (no equalities).
    pub fn unconstrained(dim: usize) -> Self {
        Self {
            dim,
            pivot_cols: Vec::new(),
            free_cols: (0..dim).collect(),
            offset: DVector::zeros(0),
            coupling: DMatrix::zeros(0, dim),
        }
    }

    /// Reduce `A x = b`.
    ///
    /// Redundant rows are dropped; an inconsistent system is a config error.
    pub fn from_equalities(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<Self, AppError> {
        if a.nrows() != b.len() {
            return Err(AppError::config(format!(
                "Equality system has {} rows but {} right-hand sides.",
                a.nrows(),
                b.len()
            )));
        }
        let dim = a.ncols();
        if a.nrows() == 0 {
            return Ok(Self::unconstrained(dim));
        }

        // Augmented matrix [A | b].
        let mut m = DMatrix::<f64>::zeros(a.nrows(), dim + 1);
        m.view_mut((0, 0), (a.nrows(), dim)).copy_from(a);
        m.set_column(dim, b);

        let rows = m.nrows();
        let mut pivot_cols = Vec::new();
        let mut r = 0usize;

        for c in 0..dim {
            if r == rows {
                break;
            }

            // Partial pivoting: largest magnitude in this column among remaining rows.
            let (best_row, best_abs) = (r..rows)
                .map(|i| (i, m[(i, c)].abs()))
                .max_by(|x, y| x.1.total_cmp(&y.1))
                .unwrap_or((r, 0.0));
            if best_abs <= PIVOT_EPS {
                continue;
            }
            m.swap_rows(r, best_row);

            let pivot = m[(r, c)];
            if pivot != 1.0 {
                for j in 0..=dim {
                    m[(r, j)] /= pivot;
                }
            }

            for i in 0..rows {
                if i == r {
                    continue;
                }
                let factor = m[(i, c)];
                if factor != 0.0 {
                    for j in 0..=dim {
                        m[(i, j)] -= factor * m[(r, j)];
                    }
                }
            }

            pivot_cols.push(c);
            r += 1;
        }

        // Remaining rows are all-zero on the left; their rhs must vanish too.
        for i in r..rows {
            let residual = m[(i, dim)];
            if residual.abs() > PIVOT_EPS {
                return Err(AppError::config(format!(
                    "Equality constraints are inconsistent (row {i} reduces to 0 = {residual})."
                )));
            }
        }

        let free_cols: Vec<usize> = (0..dim).filter(|c| !pivot_cols.contains(c)).collect();

        let mut offset = DVector::<f64>::zeros(pivot_cols.len());
        let mut coupling = DMatrix::<f64>::zeros(pivot_cols.len(), free_cols.len());
        for (i, _) in pivot_cols.iter().enumerate() {
            offset[i] = m[(i, dim)];
            for (j, &fc) in free_cols.iter().enumerate() {
                coupling[(i, j)] = m[(i, fc)];
            }
        }

        Ok(Self {
            dim,
            pivot_cols,
            free_cols,
            offset,
            coupling,
        })
    }

    /// Number of coordinates left to the optimizer.
    pub fn free_dim(&self) -> usize {
        self.free_cols.len()
    }

    /// Map free coordinates to a full vector satisfying the equalities.
    pub fn expand(&self, free: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; self.dim];
        for (&c, &v) in self.free_cols.iter().zip(free) {
            x[c] = v;
        }
        for (i, &pc) in self.pivot_cols.iter().enumerate() {
            let mut v = self.offset[i];
            for (j, &fv) in free.iter().enumerate().take(self.free_cols.len()) {
                let coeff = self.coupling[(i, j)];
                if coeff != 0.0 {
                    v -= coeff * fv;
                }
            }
            x[pc] = v;
        }
        x
    }

    /// Extract the free coordinates of a full vector.
    pub fn restrict(&self, full: &[f64]) -> Vec<f64> {
        self.free_cols.iter().map(|&c| full[c]).collect()
    }
}
