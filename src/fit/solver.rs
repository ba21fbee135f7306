//! Dense linear solve for the Levenberg-Marquardt normal equations.

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when a pivot is too small to divide by.
#[allow(clippy::needless_range_loop)]
pub fn solve<const N: usize>(a: &[[f64; N]; N], b: &[f64; N]) -> Option<[f64; N]> {
    let mut matrix = *a;
    let mut rhs = *b;

    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tiny = scale * 1e-15;

    for col in 0..N {
        let mut max_row = col;
        let mut max_val = matrix[col][col].abs();
        for row in (col + 1)..N {
            if matrix[row][col].abs() > max_val {
                max_val = matrix[row][col].abs();
                max_row = row;
            }
        }

        if max_val <= tiny {
            return None;
        }

        if max_row != col {
            matrix.swap(col, max_row);
            rhs.swap(col, max_row);
        }

        for row in (col + 1)..N {
            let factor = matrix[row][col] / matrix[col][col];
            let pivot_row = matrix[col];
            for (j, m) in matrix[row].iter_mut().enumerate().skip(col) {
                *m -= factor * pivot_row[j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = rhs[i];
        for (j, &xj) in x.iter().enumerate().skip(i + 1) {
            sum -= matrix[i][j] * xj;
        }
        x[i] = sum / matrix[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_needs_pivoting() {
        let a = [[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let expected = [1.0, -2.0, 3.0];
        let b = [
            a[0][0] * expected[0] + a[0][1] * expected[1] + a[0][2] * expected[2],
            a[1][0] * expected[0] + a[1][1] * expected[1] + a[1][2] * expected[2],
            a[2][0] * expected[0] + a[2][1] * expected[1] + a[2][2] * expected[2],
        ];
        let x = solve(&a, &b).unwrap();
        for i in 0..3 {
            assert!((x[i] - expected[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_singular_returns_none() {
        let a = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]];
        assert!(solve(&a, &[1.0, 2.0, 3.0]).is_none());
        assert!(solve(&[[0.0; 3]; 3], &[1.0, 2.0, 3.0]).is_none());
    }
}
