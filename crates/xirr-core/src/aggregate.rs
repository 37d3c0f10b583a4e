//! Streaming aggregate protocol: create state on the first row, feed rows,
//! finalize once per group.
//!
//! A host engine drives [`transition`] and [`finalize`] directly, threading
//! the state through as an owned value. [`GroupedXirr`] does the same for a
//! whole keyed row stream.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::accumulator::CashFlowAccumulator;
use crate::error::XirrError;
use crate::solver::{RefineFailure, XirrSolver};
use crate::types::Timestamp;
use crate::XirrResult;

fn required(amount: Option<f64>, timestamp: Option<Timestamp>) -> XirrResult<(f64, Timestamp)> {
    let amount = amount.ok_or_else(|| XirrError::usage("xirr: amount must not be null"))?;
    let timestamp =
        timestamp.ok_or_else(|| XirrError::usage("xirr: timestamp must not be null"))?;
    Ok((amount, timestamp))
}

/// Fold one row into the group state, creating it on the first row.
///
/// `guess` is only consulted when the state is created; later rows cannot
/// change it.
pub fn transition(
    state: Option<CashFlowAccumulator>,
    amount: Option<f64>,
    timestamp: Option<Timestamp>,
    guess: Option<f64>,
) -> XirrResult<CashFlowAccumulator> {
    let (amount, timestamp) = required(amount, timestamp)?;
    let mut state = match (state, guess) {
        (Some(state), _) => state,
        (None, Some(guess)) => CashFlowAccumulator::with_guess(guess)?,
        (None, None) => CashFlowAccumulator::new(),
    };
    state.append(amount, timestamp)?;
    Ok(state)
}

/// Result for a group. A missing state means the group saw no rows.
pub fn finalize(
    state: Option<&CashFlowAccumulator>,
    solver: &XirrSolver,
) -> XirrResult<Option<f64>> {
    match state {
        Some(state) => solver.compute_xirr(state.finalize(), state.guess_override()),
        None => Ok(None),
    }
}

/// Outcome for one group of a [`GroupedXirr`] run.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResult<K> {
    pub group: K,
    pub records: usize,
    pub xirr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// One accumulator per group key, kept in first-seen order.
#[derive(Debug, Clone)]
pub struct GroupedXirr<K> {
    groups: Vec<(K, CashFlowAccumulator)>,
    index: HashMap<K, usize>,
    guess: Option<f64>,
}

impl<K: Eq + Hash + Clone> Default for GroupedXirr<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> GroupedXirr<K> {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
            guess: None,
        }
    }

    /// Every group created from now on starts Newton's method at `guess`.
    pub fn with_guess(guess: f64) -> XirrResult<Self> {
        if !guess.is_finite() {
            return Err(XirrError::invalid(
                "guess",
                format!("initial guess must be finite, got {guess}"),
            ));
        }
        Ok(Self {
            guess: Some(guess),
            ..Self::new()
        })
    }

    /// Feed one row. Rows for a group must arrive in the order they should
    /// be accumulated.
    pub fn feed(
        &mut self,
        group: K,
        amount: Option<f64>,
        timestamp: Option<Timestamp>,
    ) -> XirrResult<()> {
        match self.index.get(&group) {
            Some(&idx) => {
                let (amount, timestamp) = required(amount, timestamp)?;
                self.groups[idx].1.append(amount, timestamp)
            }
            None => {
                let state = transition(None, amount, timestamp, self.guess)?;
                self.index.insert(group.clone(), self.groups.len());
                self.groups.push((group, state));
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, group: &K) -> Option<&CashFlowAccumulator> {
        self.index.get(group).map(|&idx| &self.groups[idx].1)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&K, &CashFlowAccumulator)> {
        self.groups.iter().map(|(k, acc)| (k, acc))
    }

    /// XIRR of a single group. Asking for a group that was never fed is a
    /// lifecycle error.
    pub fn finalize(&self, group: &K, solver: &XirrSolver) -> XirrResult<Option<f64>> {
        let state = self
            .get(group)
            .ok_or_else(|| XirrError::usage("xirr: finalize called for a group that was never created"))?;
        finalize(Some(state), solver)
    }

    /// Solve every group in first-seen order. Cancellation aborts the whole
    /// run; every other failure is recorded on its group.
    pub fn finalize_all(&self, solver: &XirrSolver) -> XirrResult<Vec<GroupResult<K>>> {
        let mut results = Vec::with_capacity(self.groups.len());
        for (group, state) in &self.groups {
            let flows = state.finalize();
            let (xirr, iterations, failure) = match solver.solve(flows, state.guess_override()) {
                Ok(solution) => (Some(solution.rate), Some(solution.iterations), None),
                Err(RefineFailure::Cancelled { iteration }) => {
                    return Err(XirrError::Cancelled { iteration });
                }
                Err(failure) => (None, None, Some(failure.to_string())),
            };
            results.push(GroupResult {
                group: group.clone(),
                records: flows.len(),
                xirr,
                iterations,
                failure,
            });
        }
        Ok(results)
    }
}
