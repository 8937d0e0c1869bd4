use thiserror::Error;

#[derive(Debug, Error)]
pub enum RebateError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Degenerate parameters: {context} evaluates to zero, no solution exists")]
    DegenerateDenominator { context: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Duplicate record: factory '{factory}' / product '{product}' appears more than once")]
    DuplicateRecord { factory: String, product: String },

    #[error("Allocation for factory '{factory}' / product '{product}' has no source record")]
    UnmatchedAllocation { factory: String, product: String },
}
