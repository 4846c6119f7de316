//! Matrix kernel: small square matrix inversion and normal equations.
use log::error;
use nalgebra::{DMatrix, DVector};

use crate::{constants::Constants, error::Error};

/// Inverts square matrix `a` in place, by Gauss-Jordan elimination
/// on the augmented `[a | I]` block. Pivots are taken on the diagonal only
/// (rows are never swapped): any pivot whose magnitude does not exceed
/// [Constants::SINGULARITY_THRESHOLD], or that is not finite, is reported
/// as [Error::SingularMatrix].
/// `a` is left untouched on error.
pub fn invert(a: &mut DMatrix<f64>) -> Result<(), Error> {
    let m = a.nrows();
    if m == 0 || a.ncols() != m {
        return Err(Error::InvalidDimensions);
    }
    if m > Constants::MAX_UNKNOWNS {
        return Err(Error::TooManyUnknowns(m));
    }

    let mut aug = DMatrix::<f64>::zeros(m, 2 * m);
    aug.view_mut((0, 0), (m, m)).copy_from(a);
    for i in 0..m {
        aug[(i, m + i)] = 1.0;
    }

    for i in 0..m {
        let pivot = aug[(i, i)];
        if !pivot.is_finite() || pivot.abs() <= Constants::SINGULARITY_THRESHOLD {
            error!("singular matrix: pivot #{} = {:e}", i, pivot);
            return Err(Error::SingularMatrix);
        }
        // columns on the left of the pivot are already reduced
        for j in (i..2 * m).rev() {
            aug[(i, j)] /= pivot;
        }
        for k in 0..m {
            if k == i {
                continue;
            }
            let factor = aug[(k, i)];
            for j in (i..2 * m).rev() {
                aug[(k, j)] -= factor * aug[(i, j)];
            }
        }
    }

    a.copy_from(&aug.view((0, m), (m, m)));
    Ok(())
}

/// Forms the normal equations `(Gt.W.G, Gt.W.dr)`.
/// Uniform weighting applies when `w` is None.
pub(crate) fn normal_equations(
    g: &DMatrix<f64>,
    dr: &DVector<f64>,
    w: Option<&DVector<f64>>,
) -> (DMatrix<f64>, DVector<f64>) {
    let mut g_w = g.transpose();
    if let Some(w) = w {
        for (j, w_j) in w.iter().enumerate() {
            g_w.column_mut(j).scale_mut(*w_j);
        }
    }
    (&g_w * g, &g_w * dr)
}
