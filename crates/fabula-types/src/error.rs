use thiserror::Error;

/// Errors that can occur in type operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    #[error("Empty {0} identifier")]
    EmptyIdentifier(&'static str),

    #[error("Negative token amount: {0}")]
    NegativeAmount(i128),
}
