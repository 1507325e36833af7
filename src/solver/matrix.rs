//! Dense linear system and direct elimination.

use std::fmt;

/// Pivots smaller than this are treated as zero.
pub const PIVOT_EPSILON: f64 = 1e-15;

/// A zero pivot was met during elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularPivot {
    /// Row of the zero pivot
    pub row: usize,
}

impl fmt::Display for SingularPivot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zero pivot in row {}", self.row)
    }
}

/// Linear system `A·x = z` of one solver group.
#[derive(Debug, Clone)]
pub struct Matrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Right hand side z
    pub z: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// Elimination scratch for A
    lu: Vec<f64>,
    /// Elimination scratch for z
    lz: Vec<f64>,
}

impl Matrix {
    /// Create a zeroed system of dimension `size`.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            lz: vec![0.0; size],
        }
    }

    /// Clear the matrix and right hand side to zero.
    pub fn clear(&mut self) {
        self.a.fill(0.0);
        self.z.fill(0.0);
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Add to the right hand side.
    pub fn add_source(&mut self, row: usize, value: f64) {
        self.z[row] += value;
    }

    /// Scale every row so its diagonal becomes one.
    ///
    /// A row whose diagonal is below `gmin` first gets `gmin` added, which
    /// ties an otherwise floating net weakly to 0 V.
    pub fn precondition(&mut self, gmin: f64) {
        let n = self.size;
        for k in 0..n {
            let mut diag = self.a[k * n + k];
            if diag.abs() < gmin {
                diag += gmin;
            }
            let inv = 1.0 / diag;
            for j in 0..n {
                self.a[k * n + j] *= inv;
            }
            self.a[k * n + k] = 1.0;
            self.z[k] *= inv;
        }
    }

    /// Largest `|A·x - z|` over all rows.
    pub fn residual(&self, x: &[f64]) -> f64 {
        let n = self.size;
        (0..n)
            .map(|i| {
                let row = &self.a[i * n..(i + 1) * n];
                let ax: f64 = row.iter().zip(x).map(|(a, x)| a * x).sum();
                (ax - self.z[i]).abs()
            })
            .fold(0.0, f64::max)
    }

    /// Solve by direct elimination, leaving `A` and `z` untouched.
    pub fn solve_direct(&mut self, x: &mut [f64], pivot: bool) -> Result<(), SingularPivot> {
        match self.size {
            0 => Ok(()),
            1 => self.solve_1(x),
            2 => self.solve_2(x),
            _ => self.solve_gauss(x, pivot),
        }
    }

    fn solve_1(&self, x: &mut [f64]) -> Result<(), SingularPivot> {
        let a = self.a[0];
        if a.abs() < PIVOT_EPSILON {
            return Err(SingularPivot { row: 0 });
        }
        x[0] = self.z[0] / a;
        Ok(())
    }

    /// Cramer's rule.
    fn solve_2(&self, x: &mut [f64]) -> Result<(), SingularPivot> {
        let (a, b, c, d) = (self.a[0], self.a[1], self.a[2], self.a[3]);
        let det = a * d - b * c;
        if det.abs() < PIVOT_EPSILON {
            return Err(SingularPivot { row: 1 });
        }
        let (z0, z1) = (self.z[0], self.z[1]);
        x[0] = (z0 * d - b * z1) / det;
        x[1] = (a * z1 - z0 * c) / det;
        Ok(())
    }

    fn solve_gauss(&mut self, x: &mut [f64], pivot: bool) -> Result<(), SingularPivot> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);
        self.lz.copy_from_slice(&self.z);

        for k in 0..n {
            if pivot {
                let max_row = (k..n)
                    .max_by(|&i, &j| {
                        self.lu[i * n + k]
                            .abs()
                            .total_cmp(&self.lu[j * n + k].abs())
                    })
                    .unwrap_or(k);
                if max_row != k {
                    for j in k..n {
                        self.lu.swap(k * n + j, max_row * n + j);
                    }
                    self.lz.swap(k, max_row);
                }
            }

            let p = self.lu[k * n + k];
            if p.abs() < PIVOT_EPSILON {
                return Err(SingularPivot { row: k });
            }

            // Eliminate below the pivot
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / p;
                if factor == 0.0 {
                    continue;
                }
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
                self.lu[i * n + k] = 0.0;
                self.lz[i] -= factor * self.lz[k];
            }
        }

        // Back substitution
        for i in (0..n).rev() {
            let mut s = self.lz[i];
            for j in (i + 1)..n {
                s -= self.lu[i * n + j] * x[j];
            }
            x[i] = s / self.lu[i * n + i];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn system(rows: &[&[f64]], z: &[f64]) -> Matrix {
        let mut m = Matrix::new(z.len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.set(i, j, v);
            }
        }
        m.z.copy_from_slice(z);
        m
    }

    #[test]
    fn test_small_paths_match_elimination() {
        let mut m = system(&[&[4.0, -1.0], &[-2.0, 3.0]], &[5.0, 4.0]);
        let mut x = [0.0; 2];
        m.solve_direct(&mut x, false).unwrap();
        assert_abs_diff_eq!(x[0], 1.9, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.6, epsilon = 1e-12);
        assert!(m.residual(&x) < 1e-12);

        let mut one = system(&[&[2.0]], &[3.0]);
        let mut y = [0.0];
        one.solve_direct(&mut y, false).unwrap();
        assert_abs_diff_eq!(y[0], 1.5);
    }

    #[test]
    fn test_gauss_three_by_three() {
        let mut m = system(
            &[&[3.0, -1.0, 0.0], &[-1.0, 3.0, -1.0], &[0.0, -1.0, 3.0]],
            &[2.0, 1.0, 2.0],
        );
        let mut x = [0.0; 3];
        m.solve_direct(&mut x, false).unwrap();
        for v in x {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
        }
        // Scratch only
        assert_eq!(m.get(1, 0), -1.0);
    }

    #[test]
    fn test_zero_pivot_needs_pivoting() {
        let mut m = system(
            &[&[0.0, 1.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]],
            &[2.0, 3.0, 4.0],
        );
        let mut x = [0.0; 3];
        assert_eq!(m.solve_direct(&mut x, false), Err(SingularPivot { row: 0 }));
        m.solve_direct(&mut x, true).unwrap();
        assert_abs_diff_eq!(x[0], 3.0);
        assert_abs_diff_eq!(x[1], 2.0);
        assert_abs_diff_eq!(x[2], 4.0);
    }

    #[test]
    fn test_singular_detected() {
        let mut m = system(&[&[1.0, 2.0], &[2.0, 4.0]], &[1.0, 2.0]);
        let mut x = [0.0; 2];
        assert!(m.solve_direct(&mut x, true).is_err());
    }

    #[test]
    fn test_precondition_unit_diagonal() {
        let mut m = system(&[&[2.0, -1.0], &[0.0, 0.0]], &[4.0, 0.0]);
        m.precondition(1e-9);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), -0.5);
        assert_eq!(m.z[0], 2.0);
        assert_eq!(m.get(1, 1), 1.0);
    }
}
