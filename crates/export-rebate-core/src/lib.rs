pub mod allocation;
pub mod error;
pub mod rates;
pub mod rounding;
pub mod settlement;
pub mod solver;
pub mod types;

pub use error::RebateError;
pub use types::*;

/// Standard result type for all engine operations
pub type RebateResult<T> = Result<T, RebateError>;
