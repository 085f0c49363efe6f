/**
 * CfReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Assemble the ridge-regularized normal equations `(YᵀY + reg·I) x = Yᵀr` for the rows of
/// `factors` selected by `rows`, where `r` holds one target per selected row.
pub fn normal_equations(
    factors: &Array2<f64>,
    rows: &[usize],
    targets: &Array1<f64>,
    reg: f64,
) -> (Array2<f64>, Array1<f64>) {

    let y = factors.select(Axis(0), rows);

    let mut gram = y.t().dot(&y);
    for diagonal in gram.diag_mut() {
        *diagonal += reg;
    }

    let rhs = y.t().dot(targets);

    (gram, rhs)
}

/// Solve `a x = b` for a symmetric positive definite `a` via its Cholesky factorization
/// `a = l lᵀ`. Returns `None` if `a` is not positive definite.
pub fn solve_cholesky(a: ArrayView2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {

    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diagonal = a[[i, i]] - sum;
                if !(diagonal > 0.0) {
                    return None;
                }
                l[[i, j]] = diagonal.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // l y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}
