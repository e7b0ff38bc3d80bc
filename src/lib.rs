//! Polynomial chaos surrogates and Sobol' sensitivity analysis of simulators with
//! uncertain parameters.
//!
//! This crate gathers the workspace libraries:
//! * [poly]: input distributions, orthonormal polynomials, Gauss quadrature and
//!   truncated multi-index bases,
//! * [doe]: designs of experiments subsampled from tensor quadrature grids or
//!   random candidate pools,
//! * [pce]: least-squares polynomial chaos expansions and Sobol' indices,
//!
//! and adds the [io] file interface with the external simulator and the
//! [UqStudy] orchestration of a whole study.
//!
//! ```no_run
//! use polychaos::{io, Parameter, TruncationRule, UqStudy};
//!
//! // A cantilever made of 15 segments with uncertain thicknesses
//! let parameters = vec![Parameter::uniform(0.05, 0.15, 2).unwrap(); 15];
//! let mut study = UqStudy::new(parameters, TruncationRule::TotalOrder).unwrap();
//! study.design(42).unwrap();
//! study.write_design("design.csv").unwrap();
//!
//! // Deflections computed by the simulator, one per design row
//! study.fit_from_file("deflections.txt").unwrap();
//! for (subset, index) in study.sobol(1).unwrap() {
//!     println!("{subset:?}: {index}");
//! }
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub use polychaos_doe as doe;
pub use polychaos_pce as pce;
pub use polychaos_poly as poly;

pub use polychaos_doe::{Design, DesignBuilder, MeshPolicy, SubsamplingPolicy};
pub use polychaos_pce::{PceParams, PolynomialChaos, SobolIndices, compute_sobol_indices};
pub use polychaos_poly::{Basis, Distribution, MultiIndex, Parameter, TruncationRule};

mod errors;
pub mod io;
mod study;

pub use errors::*;
pub use study::*;
