/*!
This library implements the designs of experiments used to fit polynomial chaos
expansions by least-squares regression.

Inputs are described by their [distributions](polychaos_poly::Distribution).
The following sampling methods are available:
* [Random sampling](crate::random::Random) drawing points from the input distributions,
* [Quadrature grid](crate::tensor_grid::QuadratureGrid) addressing the tensor grid
  of the inputs Gauss nodes without enumerating it.

A [`DesignBuilder`] uses one of them as a candidate pool and extracts a reduced design
whose size is proportional to the polynomial basis size, either by random search
or greedy QR selection, so that high dimension problems (say 15 inputs at order 2)
stay tractable.

Example:
```
use polychaos_doe::{DesignBuilder, QuadratureGrid, Random, SamplingMethod};
use polychaos_poly::{Basis, Distribution, TruncationRule};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

let u = Distribution::uniform(0.05, 0.15).unwrap();
let n = Distribution::normal(1.0, 0.1).unwrap();

// Five samples drawn from the distributions with random generator for reproducibility
let samples = Random::new(&[u, n]).with_rng(Xoshiro256Plus::seed_from_u64(42)).sample(5);
// or else picked in the 3x3 Gauss grid
let samples = QuadratureGrid::new(&[u, n], &[3, 3]).unwrap().sample(5);

// Design for an order 2 polynomial chaos expansion
let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
let design = DesignBuilder::new(&basis, &[u, n]).seed(42).build().unwrap();
assert_eq!(design.nrows(), 9);
```
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod design;
mod errors;
mod random;
mod subsampling;
mod tensor_grid;
mod traits;
mod utils;

pub use design::*;
pub use errors::*;
pub use random::*;
pub use subsampling::*;
pub use tensor_grid::*;
pub use traits::*;
pub use utils::*;
