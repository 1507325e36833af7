//! Solver configuration.

use crate::error::{NetlistError, Result};
use crate::time::Time;

/// Default convergence threshold (volts).
pub const DEFAULT_ACCURACY: f64 = 1e-7;

/// Default Gauss-Seidel iteration cap.
pub const DEFAULT_GS_LOOPS: usize = 9;

/// Default Newton-Raphson iteration cap.
pub const DEFAULT_NR_LOOPS: usize = 25;

/// Default static solver frequency (Hz).
pub const DEFAULT_FREQ: f64 = 48_000.0;

/// Configuration for the matrix solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Absolute convergence threshold (volts)
    pub accuracy: f64,
    /// Gauss-Seidel iteration cap before falling back to elimination
    pub gs_loops: usize,
    /// Newton-Raphson iteration cap
    pub nr_loops: usize,
    /// Groups larger than this are solved with Gauss-Seidel
    pub gs_threshold: usize,
    /// Use partial pivoting in direct elimination
    pub pivot: bool,
    /// Static solver frequency (Hz)
    pub freq: f64,
    /// Adapt the time step from the local truncation error
    pub dynamic_ts: bool,
    /// Local truncation error target
    pub lte: f64,
    /// Smallest time step (seconds)
    pub min_timestep: f64,
    /// Largest time step (seconds)
    pub max_timestep: f64,
    /// Over-relaxation factor for Gauss-Seidel
    pub sor_factor: f64,
    /// Resync delay after Newton-Raphson fails to converge
    pub nr_recalc_delay: Time,
    /// Conductance added to junctions and empty rows
    pub gmin: f64,
    /// Solve independent groups concurrently (feature `parallel`)
    pub parallel: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            accuracy: DEFAULT_ACCURACY,
            gs_loops: DEFAULT_GS_LOOPS,
            nr_loops: DEFAULT_NR_LOOPS,
            gs_threshold: 5,
            pivot: false,
            freq: DEFAULT_FREQ,
            dynamic_ts: false,
            lte: 5e-5,
            min_timestep: 1e-6,
            max_timestep: 1.0 / DEFAULT_FREQ,
            sor_factor: 1.059,
            nr_recalc_delay: Time::from_nsec(10),
            gmin: 1e-9,
            parallel: false,
        }
    }
}

impl SolverParams {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence threshold (volts).
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the Gauss-Seidel iteration cap.
    pub fn with_gs_loops(mut self, loops: usize) -> Self {
        self.gs_loops = loops;
        self
    }

    /// Set the Newton-Raphson iteration cap.
    pub fn with_nr_loops(mut self, loops: usize) -> Self {
        self.nr_loops = loops;
        self
    }

    /// Set the group size above which Gauss-Seidel is used.
    pub fn with_gs_threshold(mut self, threshold: usize) -> Self {
        self.gs_threshold = threshold;
        self
    }

    /// Enable partial pivoting.
    pub fn with_pivot(mut self, pivot: bool) -> Self {
        self.pivot = pivot;
        self
    }

    /// Set the static solver frequency. The largest time step follows it.
    pub fn with_freq(mut self, freq: f64) -> Self {
        self.freq = freq;
        self.max_timestep = 1.0 / freq;
        self
    }

    /// Enable adaptive time steps.
    pub fn with_dynamic_ts(mut self, dynamic: bool) -> Self {
        self.dynamic_ts = dynamic;
        self
    }

    /// Set the local truncation error target.
    pub fn with_lte(mut self, lte: f64) -> Self {
        self.lte = lte;
        self
    }

    /// Set the smallest time step (seconds).
    pub fn with_min_timestep(mut self, ts: f64) -> Self {
        self.min_timestep = ts;
        self
    }

    /// Set the largest time step (seconds).
    pub fn with_max_timestep(mut self, ts: f64) -> Self {
        self.max_timestep = ts;
        self
    }

    /// Set the over-relaxation factor.
    pub fn with_sor_factor(mut self, factor: f64) -> Self {
        self.sor_factor = factor;
        self
    }

    /// Solve independent groups concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Period of the static solver clock.
    pub fn step_period(&self) -> Time {
        Time::from_hz(self.freq)
    }

    /// Set a parameter by name, as written in a `.solver` directive.
    pub fn apply(&mut self, key: &str, value: f64) -> Result<()> {
        let invalid = |message: &str| NetlistError::invalid_parameter("solver", key, message);
        let positive = |v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(v)
            } else {
                Err(invalid("must be positive"))
            }
        };
        let count = |v: f64| {
            if v >= 1.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(invalid("must be a positive integer"))
            }
        };

        match key.to_ascii_lowercase().as_str() {
            "accuracy" => self.accuracy = positive(value)?,
            "gs_loops" => self.gs_loops = count(value)?,
            "nr_loops" => self.nr_loops = count(value)?,
            "gs_threshold" => {
                if value < 0.0 || value.fract() != 0.0 {
                    return Err(invalid("must be a non-negative integer"));
                }
                self.gs_threshold = value as usize;
            }
            "pivot" => self.pivot = value != 0.0,
            "freq" => {
                let freq = positive(value)?;
                *self = self.clone().with_freq(freq);
            }
            "dynamic_ts" => self.dynamic_ts = value != 0.0,
            "lte" => self.lte = positive(value)?,
            "min_timestep" => self.min_timestep = positive(value)?,
            "max_timestep" => self.max_timestep = positive(value)?,
            "sor_factor" => {
                if !(0.0..2.0).contains(&value) || value == 0.0 {
                    return Err(invalid("must be in (0, 2)"));
                }
                self.sor_factor = value;
            }
            "nr_recalc_delay" => self.nr_recalc_delay = Time::from_double(positive(value)?),
            "gmin" => self.gmin = positive(value)?,
            "parallel" => self.parallel = value != 0.0,
            _ => return Err(invalid("unknown solver parameter")),
        }
        Ok(())
    }
}
