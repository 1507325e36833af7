//! Time step control from the local truncation error.

/// Tracks the first and second derivative of every net in a group.
#[derive(Debug, Clone, Default)]
pub struct LteEstimator {
    v_prev: Vec<f64>,
    dd_prev: Vec<f64>,
    h_prev: f64,
}

impl LteEstimator {
    /// Create an estimator for `size` nets starting at `v`.
    pub fn new(v: &[f64]) -> Self {
        Self {
            v_prev: v.to_vec(),
            dd_prev: vec![0.0; v.len()],
            h_prev: 0.0,
        }
    }

    /// Forget the history and restart at `v`.
    pub fn reset(&mut self, v: &[f64]) {
        *self = Self::new(v);
    }

    /// Record a step of `h` seconds ending at `v` and return the next
    /// step size, clamped to `[min_ts, max_ts]`.
    ///
    /// The step is `sqrt(lte / |0.5 · d²V/dt²|)` for the net changing
    /// fastest. The first step has no curvature history and returns
    /// `max_ts`.
    pub fn next_timestep(&mut self, v: &[f64], h: f64, lte: f64, min_ts: f64, max_ts: f64) -> f64 {
        let mut ts = max_ts;
        let have_history = self.h_prev > 0.0;
        for (k, &vk) in v.iter().enumerate() {
            let dd = (vk - self.v_prev[k]) / h;
            if have_history {
                let dd2 = (dd - self.dd_prev[k]) / (h + self.h_prev);
                if dd2 != 0.0 {
                    ts = ts.min((lte / (0.5 * dd2).abs()).sqrt());
                }
            }
            self.dd_prev[k] = dd;
            self.v_prev[k] = vk;
        }
        self.h_prev = h;
        ts.clamp(min_ts, max_ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_ramp_takes_max_step() {
        let mut lte = LteEstimator::new(&[0.0]);
        assert_eq!(lte.next_timestep(&[1.0], 1e-5, 5e-5, 1e-6, 1e-3), 1e-3);
        assert_eq!(lte.next_timestep(&[2.0], 1e-5, 5e-5, 1e-6, 1e-3), 1e-3);
    }

    #[test]
    fn test_curvature_shrinks_step() {
        // v = t^2: the divided difference is 1, so ts = sqrt(lte / 0.5)
        let h = 1e-3;
        let mut lte = LteEstimator::new(&[0.0]);
        lte.next_timestep(&[h * h], h, 1e-8, 1e-9, 1.0);
        let ts = lte.next_timestep(&[4.0 * h * h], h, 1e-8, 1e-9, 1.0);
        assert_relative_eq!(ts, (2e-8f64).sqrt(), max_relative = 1e-6);
    }

    #[test]
    fn test_clamped_to_min() {
        let mut lte = LteEstimator::new(&[0.0]);
        lte.next_timestep(&[0.0], 1e-6, 1e-12, 1e-6, 1e-3);
        assert_eq!(lte.next_timestep(&[5.0], 1e-6, 1e-12, 1e-6, 1e-3), 1e-6);
    }
}
