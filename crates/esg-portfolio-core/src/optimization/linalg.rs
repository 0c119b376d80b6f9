//! Small dense linear-algebra helpers over `Vec<Vec<f64>>`.

/// Dot product.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Matrix-vector multiplication.
pub fn mat_vec(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    mat.iter().map(|row| dot(row, v)).collect()
}

/// w' * M * w
pub fn quad_form(mat: &[Vec<f64>], w: &[f64]) -> f64 {
    dot(w, &mat_vec(mat, w))
}

pub fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

pub fn norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` when `A` is numerically singular.
#[allow(clippy::needless_range_loop)]
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = a.len();
    if n == 0 {
        return Some(Vec::new());
    }

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, rhs)| {
            let mut r = row.clone();
            r.push(*rhs);
            r
        })
        .collect();

    let scale = a
        .iter()
        .flat_map(|r| r.iter())
        .fold(0.0_f64, |m, x| m.max(x.abs()))
        .max(1.0);

    for col in 0..n {
        // Partial pivoting
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < 1e-14 * scale {
            return None;
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot_row = aug[col].clone();
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, pv) in aug[row][col..].iter_mut().zip(pivot_row[col..].iter()) {
                *cell -= factor * pv;
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut s = aug[i][n];
        for j in (i + 1)..n {
            s -= aug[i][j] * x[j];
        }
        x[i] = s / aug[i][i];
    }
    Some(x)
}
