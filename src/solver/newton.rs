//! Newton-Raphson iteration for groups with nonlinear devices.
//!
//! Each iteration re-linearises the nonlinear stamps around the current
//! operating point and solves the resulting linear system. Convergence is
//! declared when no unknown moved by more than the tolerance.

use crate::error::{NetlistError, Result};

/// Newton-Raphson iteration controller.
#[derive(Debug, Clone)]
pub struct NewtonRaphson {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Convergence tolerance (volts)
    pub tolerance: f64,
    /// Previous iterate
    x_prev: Vec<f64>,
}

impl NewtonRaphson {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            x_prev: Vec::new(),
        }
    }

    /// Iterate `step` on `x` until it settles.
    ///
    /// `step` receives the current iterate and must overwrite it with the
    /// solution of the system linearised around it. Returns the number of
    /// iterations used.
    pub fn solve<F>(&mut self, x: &mut [f64], mut step: F) -> Result<usize>
    where
        F: FnMut(&mut [f64]),
    {
        let mut residual = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            self.x_prev.clear();
            self.x_prev.extend_from_slice(x);

            step(x);

            residual = self.residual(x);
            if residual < self.tolerance {
                return Ok(iteration);
            }
        }
        Err(NetlistError::convergence_failure(
            self.max_iterations,
            residual,
        ))
    }

    /// Largest change between the previous and the current iterate.
    fn residual(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(&self.x_prev)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self::new(
            super::params::DEFAULT_NR_LOOPS,
            super::params::DEFAULT_ACCURACY,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_square_root() {
        // x^2 = 2, linearised: x' = (x + 2/x) / 2
        let mut nr = NewtonRaphson::new(25, 1e-12);
        let mut x = [1.0];
        let iterations = nr.solve(&mut x, |x| x[0] = 0.5 * (x[0] + 2.0 / x[0])).unwrap();
        assert_abs_diff_eq!(x[0], 2f64.sqrt(), epsilon = 1e-12);
        assert!(iterations < 10);
    }

    #[test]
    fn test_non_convergence_reported() {
        let mut nr = NewtonRaphson::new(5, 1e-9);
        let mut x = [0.0];
        let err = nr.solve(&mut x, |x| x[0] += 1.0).unwrap_err();
        assert!(matches!(
            err,
            NetlistError::ConvergenceFailure { iterations: 5, .. }
        ));
        assert_eq!(x[0], 5.0);
    }
}
