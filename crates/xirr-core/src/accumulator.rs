use std::mem;

use tracing::debug;

use crate::error::XirrError;
use crate::types::{CashFlowRecord, Timestamp};
use crate::XirrResult;

/// Slots reserved up front; enough for most cash-flow histories without
/// reallocating.
pub const INITIAL_CAPACITY: usize = 64;

/// Collects dated cash flows for one group in arrival order.
///
/// `append` is the only mutation. A flow sharing its timestamp with the
/// immediately preceding record is folded into that record; flows are never
/// reordered. `finalize` hands out a shared borrow, so a view can be read any
/// number of times and can never observe a half-finished append.
#[derive(Debug, Clone)]
pub struct CashFlowAccumulator {
    flows: Vec<CashFlowRecord>,
    guess_override: Option<f64>,
}

impl Default for CashFlowAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl CashFlowAccumulator {
    pub fn new() -> Self {
        Self {
            flows: Vec::with_capacity(INITIAL_CAPACITY),
            guess_override: None,
        }
    }

    /// An empty accumulator whose group skips the annualized-return estimate
    /// and seeds Newton's method with `guess` instead. Fixed for the lifetime
    /// of the accumulator.
    pub fn with_guess(guess: f64) -> XirrResult<Self> {
        if !guess.is_finite() {
            return Err(XirrError::invalid(
                "guess",
                format!("initial guess must be finite, got {guess}"),
            ));
        }
        let mut acc = Self::new();
        acc.guess_override = Some(guess);
        Ok(acc)
    }

    pub fn guess_override(&self) -> Option<f64> {
        self.guess_override
    }

    /// Add one cash flow.
    ///
    /// Zero amounts are dropped. A record whose amount cancels to zero
    /// through coalescing is kept; a later flow at the same timestamp may
    /// still add to it.
    pub fn append(&mut self, amount: f64, timestamp: Timestamp) -> XirrResult<()> {
        if !amount.is_finite() {
            return Err(XirrError::invalid(
                "amount",
                format!("cash flow amount must be finite, got {amount}"),
            ));
        }
        if !timestamp.is_finite() {
            return Err(XirrError::invalid(
                "timestamp",
                format!("cash flow timestamp must be a finite point in time, got {timestamp}"),
            ));
        }

        if amount == 0.0 {
            return Ok(());
        }

        if let Some(last) = self.flows.last_mut() {
            if last.timestamp == timestamp {
                last.amount += amount;
                return Ok(());
            }
        }

        if self.flows.len() == self.flows.capacity() {
            // Double before writing
            let grow_by = self.flows.capacity().max(INITIAL_CAPACITY);
            self.flows.reserve_exact(grow_by);
        }
        self.flows.push(CashFlowRecord::new(amount, timestamp));
        Ok(())
    }

    /// Read-only view of everything appended so far. Performs no mutation
    /// and returns the same sequence on every call until the next append.
    pub fn finalize(&self) -> &[CashFlowRecord] {
        let bytes = self.footprint_bytes();
        debug!(
            records = self.flows.len(),
            bytes,
            mb = bytes / (1024 * 1024),
            "Finalizing XIRR cash flows"
        );
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.flows.capacity()
    }

    /// Bytes held by the record buffer, including unused capacity.
    pub fn footprint_bytes(&self) -> usize {
        self.flows.capacity() * mem::size_of::<CashFlowRecord>()
    }
}
