use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::error::XirrError;
use crate::estimator::annualized_return_estimate;
use crate::time_value::npv_and_derivative;
use crate::types::CashFlowRecord;
use crate::XirrResult;

/// Newton rounds before giving up.
pub const MAX_ITERATIONS: u32 = 50;
/// Step size or NPV magnitude accepted as converged.
pub const TOLERANCE: f64 = 1e-10;

/// Tuning for the Newton-Raphson refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> XirrResult<()> {
        if self.max_iterations == 0 {
            return Err(XirrError::invalid(
                "max_iterations",
                "at least one iteration is required",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(XirrError::invalid(
                "tolerance",
                format!("tolerance must be a positive finite number, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}

/// Polled once per Newton round; returning `true` stops the refinement.
pub trait CancelCheck {
    fn is_cancelled(&self) -> bool;
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl CancelCheck for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Receives `(round, rate, epsilon)` after every Newton step. Purely
/// observational.
pub trait IterationObserver {
    fn on_iteration(&self, round: u32, rate: f64, epsilon: f64);
}

impl<F> IterationObserver for F
where
    F: Fn(u32, f64, f64),
{
    fn on_iteration(&self, round: u32, rate: f64, epsilon: f64) {
        self(round, rate, epsilon)
    }
}

/// Why no rate came out of the solver.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RefineFailure {
    #[error("XIRR requires at least 2 cash flows, got {records}")]
    InsufficientData { records: usize },

    #[error("Newton step became non-finite at iteration {iteration}")]
    Diverged { iteration: u32 },

    #[error("did not converge after {iterations} iterations (epsilon: {last_epsilon})")]
    NotConverged { iterations: u32, last_epsilon: f64 },

    #[error("interrupted at iteration {iteration}")]
    Cancelled { iteration: u32 },
}

/// A converged rate and how it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub rate: f64,
    pub initial_guess: f64,
    /// Newton rounds run, including the converging one.
    pub iterations: u32,
}

/// Estimates a starting rate and refines it with Newton-Raphson.
///
/// Never mutates the flows it is given, so one finalized sequence can be
/// solved any number of times.
#[derive(Clone, Default)]
pub struct XirrSolver {
    config: SolverConfig,
    cancel: Option<Arc<dyn CancelCheck + Send + Sync>>,
    observer: Option<Arc<dyn IterationObserver + Send + Sync>>,
}

impl fmt::Debug for XirrSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XirrSolver")
            .field("config", &self.config)
            .field("cancel", &self.cancel.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl XirrSolver {
    pub fn new(config: SolverConfig) -> XirrResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn with_cancellation(mut self, cancel: impl CancelCheck + Send + Sync + 'static) -> Self {
        self.cancel = Some(Arc::new(cancel));
        self
    }

    pub fn with_observer(
        mut self,
        observer: impl IterationObserver + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// XIRR of `flows`, or `None` when no sensible rate exists.
    ///
    /// `guess_override` replaces the annualized-return estimate as the
    /// starting point. Only cancellation and a non-finite override are
    /// errors; too few flows, divergence and non-convergence are `None`.
    pub fn compute_xirr(
        &self,
        flows: &[CashFlowRecord],
        guess_override: Option<f64>,
    ) -> XirrResult<Option<f64>> {
        if let Some(guess) = guess_override {
            if !guess.is_finite() {
                return Err(XirrError::invalid(
                    "guess",
                    format!("initial guess must be finite, got {guess}"),
                ));
            }
        }

        match self.solve(flows, guess_override) {
            Ok(solution) => Ok(Some(solution.rate)),
            Err(RefineFailure::Cancelled { iteration }) => Err(XirrError::Cancelled { iteration }),
            Err(failure) => {
                debug!(records = flows.len(), %failure, "No XIRR result");
                Ok(None)
            }
        }
    }

    /// Like [`compute_xirr`](Self::compute_xirr) but keeps the failure reason
    /// and iteration count.
    pub fn solve(
        &self,
        flows: &[CashFlowRecord],
        guess_override: Option<f64>,
    ) -> Result<Solution, RefineFailure> {
        if flows.len() < 2 {
            return Err(RefineFailure::InsufficientData {
                records: flows.len(),
            });
        }

        let initial_guess = guess_override.unwrap_or_else(|| annualized_return_estimate(flows));
        debug!(records = flows.len(), initial_guess, "Calculating XIRR");

        let (rate, iterations) = self.newton(flows, initial_guess)?;
        Ok(Solution {
            rate,
            initial_guess,
            iterations,
        })
    }

    /// Newton-Raphson on the NPV function, starting from `initial_guess`.
    /// Time zero is the first record's timestamp.
    pub fn refine(
        &self,
        flows: &[CashFlowRecord],
        initial_guess: f64,
    ) -> Result<f64, RefineFailure> {
        if flows.is_empty() {
            return Err(RefineFailure::InsufficientData { records: 0 });
        }
        self.newton(flows, initial_guess).map(|(rate, _)| rate)
    }

    fn newton(&self, flows: &[CashFlowRecord], initial_guess: f64) -> Result<(f64, u32), RefineFailure> {
        let tolerance = self.config.tolerance;
        let mut guess = initial_guess;
        let mut epsilon = f64::NAN;

        for round in 0..self.config.max_iterations {
            if let Some(cancel) = &self.cancel {
                if cancel.is_cancelled() {
                    debug!(round, "XIRR refinement cancelled");
                    return Err(RefineFailure::Cancelled { iteration: round });
                }
            }

            let (result, deriv) = npv_and_derivative(guess, flows);
            let new_guess = guess - result / deriv;
            epsilon = (new_guess - guess).abs();

            trace!(round, rate = new_guess, epsilon, "Newton iteration");
            if let Some(observer) = &self.observer {
                observer.on_iteration(round, new_guess, epsilon);
            }

            if !new_guess.is_finite() {
                debug!(round, "XIRR diverged");
                return Err(RefineFailure::Diverged { iteration: round });
            }
            if epsilon <= tolerance || result.abs() < tolerance {
                debug!(round, rate = new_guess, "XIRR converged");
                return Ok((new_guess, round + 1));
            }

            guess = new_guess;
        }

        debug!(
            iterations = self.config.max_iterations,
            epsilon, "XIRR did not converge"
        );
        Err(RefineFailure::NotConverged {
            iterations: self.config.max_iterations,
            last_epsilon: epsilon,
        })
    }
}

/// XIRR with the default solver configuration.
pub fn xirr(flows: &[CashFlowRecord], guess_override: Option<f64>) -> XirrResult<Option<f64>> {
    XirrSolver::default().compute_xirr(flows, guess_override)
}
