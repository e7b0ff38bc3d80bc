use polychaos_doe::DoeError;
use polychaos_pce::PceError;
use polychaos_poly::PolyError;
use thiserror::Error;

/// A result type for uncertainty quantification studies
pub type Result<T> = std::result::Result<T, StudyError>;

/// An error when running an [`UqStudy`](crate::UqStudy) or exchanging files with the simulator
#[derive(Error, Debug)]
pub enum StudyError {
    /// When distributions or basis computations fail
    #[error(transparent)]
    PolyError(#[from] PolyError),
    /// When design of experiments fails
    #[error(transparent)]
    DoeError(#[from] DoeError),
    /// When surrogate fitting or sensitivity analysis fails
    #[error(transparent)]
    PceError(#[from] PceError),
    /// When reading or writing a file fails
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// When reading or writing a csv file fails
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    /// When writing a npy file fails
    #[error("NPY write error: {0}")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
    /// When reading a npy file fails
    #[error("NPY read error: {0}")]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    /// When data do not fit the expected shape
    #[error("Shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
    /// When a value of a data file is not a number
    #[error("Parse error at line {line}: `{value}` is not a number")]
    ParseError {
        /// Line number, starting at 1
        line: usize,
        /// Faulty value
        value: String,
    },
    /// When a surrogate is requested before fitting
    #[error("No surrogate fitted yet")]
    NotFitted,
    /// When a design is requested before being built or loaded
    #[error("No design built or loaded yet")]
    NoDesign,
}
