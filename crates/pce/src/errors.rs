use polychaos_doe::DoeError;
use polychaos_poly::PolyError;
use thiserror::Error;

/// A result type for polynomial chaos algorithms
pub type Result<T> = std::result::Result<T, PceError>;

/// An error when using [`PolynomialChaos`](crate::PolynomialChaos) or [`SobolIndices`](crate::SobolIndices)
#[derive(Error, Debug)]
pub enum PceError {
    /// When distributions or basis computations fail
    #[error(transparent)]
    PolyError(#[from] PolyError),
    /// When design of experiments fails
    #[error(transparent)]
    DoeError(#[from] DoeError),
    /// When the number of design rows and responses differ
    #[error("rows(design)={rows} != len(responses)={responses}")]
    SizeMismatch {
        /// Number of design rows
        rows: usize,
        /// Number of responses
        responses: usize,
    },
    /// When input dimension does not match the basis dimension
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When the least-squares system cannot be solved reliably
    #[error("Ill-conditioned system: {0}")]
    IllConditionedSystem(String),
    /// When the basis has no non-constant term
    #[error("Empty basis: no non-constant term to decompose the variance")]
    EmptyBasis,
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When error during saving
    #[cfg(feature = "persistent")]
    #[error("Save error: {0}")]
    SaveError(#[from] serde_json::Error),
    /// When error during loading
    #[error("Load IO error")]
    LoadIoError(#[from] std::io::Error),
    /// When error during loading
    #[error("Load error: {0}")]
    LoadError(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
