pub mod accumulator;
pub mod error;
pub mod estimator;
pub mod solver;
pub mod time_value;
pub mod types;

#[cfg(feature = "aggregate")]
pub mod aggregate;

pub use accumulator::CashFlowAccumulator;
pub use error::XirrError;
pub use solver::{RefineFailure, SolverConfig, XirrSolver};
pub use types::*;

/// Standard result type for all xirr operations
pub type XirrResult<T> = Result<T, XirrError>;
