/*!
This library implements the polynomial building blocks of polynomial chaos expansions:

* [probability laws](crate::Distribution) of uncertain inputs together with the
  three-term [recurrence](crate::Recurrence) of their orthonormal polynomial family,
* Gauss quadrature rules computed with the Golub-Welsch algorithm,
* multivariate [bases](crate::Basis) of orthonormal polynomials described by
  [multi-indices](crate::MultiIndex) selected with a [truncation rule](crate::TruncationRule).

Example:
```
use polychaos_poly::{Basis, Distribution, TruncationRule};
use ndarray::array;

// Two inputs uniformly distributed on [-1, 1]
let u = Distribution::uniform(-1., 1.).unwrap();
// Total-order basis of order 2: 1, x1, x2, x1^2, x1.x2, x2^2 (orthonormal forms)
let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
assert_eq!(basis.len(), 6);
// (n, 6) measurement matrix at n points
let m = basis.evaluate(&array![[0., 0.5], [1., -1.]], &[u, u]).unwrap();
assert_eq!(m.dim(), (2, 6));
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod basis;
mod distribution;
mod errors;
mod recurrence;

pub use basis::*;
pub use distribution::*;
pub use errors::*;
pub use recurrence::*;
