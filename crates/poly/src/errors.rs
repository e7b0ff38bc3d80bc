use thiserror::Error;

/// A result type for polynomial and basis computations
pub type Result<T> = std::result::Result<T, PolyError>;

/// An error when building distributions, quadratures or polynomial bases
#[derive(Error, Debug)]
pub enum PolyError {
    /// When distribution bounds or scale do not define a valid support
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    /// When a polynomial degree or quadrature order is not valid
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    /// When dimensions of the given inputs are not consistent
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
}
