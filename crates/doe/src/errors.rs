use polychaos_poly::PolyError;
use thiserror::Error;

/// A result type for design of experiments
pub type Result<T> = std::result::Result<T, DoeError>;

/// An error when building a design of experiments
#[derive(Error, Debug)]
pub enum DoeError {
    /// When distributions or basis computations fail
    #[error(transparent)]
    PolyError(#[from] PolyError),
    /// When the candidate pool cannot provide enough samples
    #[error(
        "Infeasible design: {candidates} distinct candidates available while {required} samples are required"
    )]
    InfeasibleDesign {
        /// Number of distinct candidate points
        candidates: usize,
        /// Number of requested samples
        required: usize,
    },
    /// When the selected samples do not allow a well-posed least-squares fit
    #[error("Ill-conditioned design: {0}")]
    IllConditioned(String),
    /// When dimensions of basis and distributions are not consistent
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
}
