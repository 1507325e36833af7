//! Gauss-Seidel relaxation with adaptive per-row weights.

use super::matrix::Matrix;

/// Result of a relaxation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relaxation {
    /// Sweeps performed
    pub iterations: usize,
    /// Largest change of the last sweep was below the threshold
    pub converged: bool,
}

/// Per-row relaxation weights `(w, 1 - w)`.
///
/// Rows whose off-diagonal weight exceeds the diagonal are damped instead
/// of over-relaxed.
fn row_weights(m: &Matrix, sor: f64) -> Vec<(f64, f64)> {
    let n = m.size;
    (0..n)
        .map(|k| {
            let gtot = m.get(k, k);
            let gabs = 0.5
                * (0..n)
                    .filter(|&j| j != k)
                    .map(|j| m.get(k, j).abs())
                    .sum::<f64>();
            if gabs <= gtot {
                (sor / gtot, 1.0 - sor)
            } else {
                let w = 1.0 / (gtot + gabs);
                (w, gabs * w)
            }
        })
        .collect()
}

/// Relax `x` towards the solution of `m`, starting from its current
/// contents, for at most `max_loops` sweeps.
pub fn gauss_seidel(
    m: &Matrix,
    x: &mut [f64],
    max_loops: usize,
    accuracy: f64,
    sor: f64,
) -> Relaxation {
    let n = m.size;
    let weights = row_weights(m, sor);

    for iteration in 1..=max_loops {
        let mut max_delta = 0.0f64;
        for k in 0..n {
            let mut s = m.z[k];
            for j in 0..n {
                if j != k {
                    s -= m.get(k, j) * x[j];
                }
            }
            let (w, one_m_w) = weights[k];
            let new = one_m_w * x[k] + w * s;
            max_delta = max_delta.max((new - x[k]).abs());
            x[k] = new;
        }
        if max_delta < accuracy {
            return Relaxation {
                iterations: iteration,
                converged: true,
            };
        }
    }

    Relaxation {
        iterations: max_loops,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ladder(n: usize) -> Matrix {
        // Resistor chain between 1 V and 0 V, preconditioned
        let mut m = Matrix::new(n);
        for k in 0..n {
            m.set(k, k, 2.0);
            if k > 0 {
                m.set(k, k - 1, -1.0);
            }
            if k + 1 < n {
                m.set(k, k + 1, -1.0);
            }
        }
        m.z[0] = 1.0;
        m.precondition(1e-9);
        m
    }

    #[test]
    fn test_converges_to_direct_solution() {
        let mut m = ladder(6);
        let mut direct = vec![0.0; 6];
        m.solve_direct(&mut direct, false).unwrap();

        let mut x = vec![0.0; 6];
        let r = gauss_seidel(&m, &mut x, 1000, 1e-12, 1.0);
        assert!(r.converged);
        for (a, b) in x.iter().zip(&direct) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(direct[0], 6.0 / 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_iteration_cap() {
        let m = ladder(8);
        let mut x = vec![0.0; 8];
        let r = gauss_seidel(&m, &mut x, 1, 1e-12, 1.059);
        assert!(!r.converged);
        assert_eq!(r.iterations, 1);
    }

    #[test]
    fn test_weak_diagonal_is_damped() {
        let mut m = Matrix::new(2);
        m.set(0, 0, 1.0);
        m.set(0, 1, -3.0);
        m.set(1, 1, 1.0);
        let w = row_weights(&m, 1.059);
        assert_abs_diff_eq!(w[0].0, 1.0 / 2.5);
        assert_abs_diff_eq!(w[0].1, 1.5 / 2.5);
        assert_abs_diff_eq!(w[1].0, 1.059);
    }
}
