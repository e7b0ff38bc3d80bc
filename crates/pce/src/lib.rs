//! This library implements [polynomial chaos expansions](https://en.wikipedia.org/wiki/Polynomial_chaos)
//! (PCE) fitted by least-squares regression, and the variance-based global sensitivity
//! analysis ([Sobol' indices](https://en.wikipedia.org/wiki/Variance-based_sensitivity_analysis))
//! derived analytically from the expansion coefficients.
//!
//! PCE models are implemented by [PolynomialChaos] parameterized by [PceParams].
//! Sobol' indices are given by [SobolIndices], either computed from a fitted model
//! (and cached in it) or directly from coefficients aligned with a basis.
//!
//! ```
//! use polychaos_doe::DesignBuilder;
//! use polychaos_pce::PolynomialChaos;
//! use polychaos_poly::{Basis, Distribution, TruncationRule};
//! use linfa::prelude::*;
//!
//! let u = Distribution::<f64>::uniform(-1.0, 1.0).unwrap();
//! let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
//! let design = DesignBuilder::new(&basis, &[u, u]).seed(42).build().unwrap();
//!
//! // y = 3 x1 + x1^2 does not depend on x2
//! let xt = design.points().to_owned();
//! let yt = xt.column(0).mapv(|x| 3.0 * x + x * x);
//! let pce = PolynomialChaos::params(&[u, u], basis)
//!     .fit(&Dataset::new(xt, yt))
//!     .expect("PCE fitted");
//!
//! let first_order = pce.sobol_indices().first_order();
//! assert!((first_order[0] - 1.0).abs() < 1e-10);
//! assert!(first_order[1].abs() < 1e-10);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
pub mod metrics;
mod parameters;
mod sensitivity;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
pub use sensitivity::*;
