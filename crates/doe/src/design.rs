//! Reduced least-squares designs for polynomial chaos regression.
//!
//! A [`DesignBuilder`] draws a pool of candidate points (distinct points of the
//! tensor Gauss grid or Monte-Carlo draws) and selects a subset of
//! `max(P, ceil(oversampling * P))` points, `P` being the basis size, making
//! the measurement matrix well conditioned.
//!
//! ```
//! use polychaos_doe::{DesignBuilder, SubsamplingPolicy};
//! use polychaos_poly::{Basis, Distribution, TruncationRule};
//!
//! let basis = Basis::build(3, 2, TruncationRule::TotalOrder).unwrap();
//! let u = Distribution::uniform(-1.0, 1.0).unwrap();
//! let design = DesignBuilder::new(&basis, &[u, u, u])
//!     .subsampling(SubsamplingPolicy::Qr)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! assert_eq!(design.nrows(), 15);
//! ```

use std::sync::{Arc, RwLock};

use crate::errors::{DoeError, Result};
use crate::random::Random;
use crate::subsampling::{pivoted_qr, random_search};
use crate::tensor_grid::QuadratureGrid;
use crate::traits::SamplingMethod;
use crate::utils::rcond;
use linfa::Float;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::{Rng, SeedableRng};
use polychaos_poly::{Basis, Distribution, Parameter, TruncationRule, unzip_parameters};
use rand_xoshiro::Xoshiro256Plus;
use std::fmt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

type RngRef<R> = Arc<RwLock<R>>;

/// Reciprocal condition number below which a design is rejected
pub const DESIGN_RCOND_MIN: f64 = 1e-10;

/// How the candidate pool is generated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum MeshPolicy {
    /// Distinct points of the tensor grid of Gauss nodes (`order + 1` per input)
    #[default]
    Tensor,
    /// Independent draws from the input distributions
    MonteCarlo,
}

/// How the design is extracted from the candidate pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum SubsamplingPolicy {
    /// Best of random subsets wrt the smallest singular value
    #[default]
    Random,
    /// Greedy column-pivoted QR selection
    Qr,
}

/// Sample points at which the simulation has to be run
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Design<F: Float> {
    /// (n, d) sample points
    points: Array2<F>,
    /// Quadrature weights of the points, summing to one
    weights: Array1<F>,
}

impl<F: Float> Design<F> {
    /// Constructor from points and weights
    pub fn new(points: Array2<F>, weights: Array1<F>) -> Result<Self> {
        if points.nrows() != weights.len() {
            return Err(DoeError::DimensionMismatch(format!(
                "{} points given with {} weights",
                points.nrows(),
                weights.len()
            )));
        }
        Ok(Design { points, weights })
    }

    /// Design with equal weights
    pub fn unweighted(points: Array2<F>) -> Self {
        let n = points.nrows();
        let w = if n > 0 { F::one() / F::cast(n) } else { F::zero() };
        Design {
            points,
            weights: Array1::from_elem(n, w),
        }
    }

    /// (n, d) sample points
    pub fn points(&self) -> &Array2<F> {
        &self.points
    }

    /// Weights of the sample points
    pub fn weights(&self) -> &Array1<F> {
        &self.weights
    }

    /// Number of sample points
    pub fn nrows(&self) -> usize {
        self.points.nrows()
    }

    /// Dimension of the sample points
    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    /// Points and weights
    pub fn into_inner(self) -> (Array2<F>, Array1<F>) {
        (self.points, self.weights)
    }
}

/// Builder of reduced designs for least-squares regression on a basis
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct DesignBuilder<F: Float, R: Rng> {
    basis: Basis,
    distributions: Vec<Distribution<F>>,
    mesh: MeshPolicy,
    subsampling: SubsamplingPolicy,
    oversampling: f64,
    candidate_factor: usize,
    max_iters: usize,
    rng: RngRef<R>,
}

impl<F: Float> DesignBuilder<F, Xoshiro256Plus> {
    /// Constructor given the basis and the distributions of the inputs
    pub fn new(basis: &Basis, distributions: &[Distribution<F>]) -> Self {
        Self::new_with_rng(basis, distributions, Xoshiro256Plus::from_entropy())
    }

    /// Constructor building the basis from the parameters orders under the given rule
    pub fn from_parameters(parameters: &[Parameter<F>], rule: TruncationRule) -> Result<Self> {
        let (distributions, orders) = unzip_parameters(parameters);
        let basis = Basis::new(&orders, rule)?;
        Ok(Self::new(&basis, &distributions))
    }
}

impl<F: Float, R: Rng> DesignBuilder<F, R> {
    /// Constructor with a given random generator
    pub fn new_with_rng(basis: &Basis, distributions: &[Distribution<F>], rng: R) -> Self {
        DesignBuilder {
            basis: basis.clone(),
            distributions: distributions.to_vec(),
            mesh: MeshPolicy::default(),
            subsampling: SubsamplingPolicy::default(),
            oversampling: 1.5,
            candidate_factor: 10,
            max_iters: 100,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Set the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> DesignBuilder<F, R2> {
        DesignBuilder {
            basis: self.basis,
            distributions: self.distributions,
            mesh: self.mesh,
            subsampling: self.subsampling,
            oversampling: self.oversampling,
            candidate_factor: self.candidate_factor,
            max_iters: self.max_iters,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Use a seeded random generator
    pub fn seed(self, seed: u64) -> DesignBuilder<F, Xoshiro256Plus> {
        self.with_rng(Xoshiro256Plus::seed_from_u64(seed))
    }

    /// Set the candidate pool generation policy
    pub fn mesh(mut self, mesh: MeshPolicy) -> Self {
        self.mesh = mesh;
        self
    }

    /// Set the subsampling policy
    pub fn subsampling(mut self, subsampling: SubsamplingPolicy) -> Self {
        self.subsampling = subsampling;
        self
    }

    /// Set the ratio of the number of points to the basis size (default 1.5, at least 1)
    pub fn oversampling(mut self, oversampling: f64) -> Self {
        self.oversampling = oversampling;
        self
    }

    /// Set the ratio of the candidate pool size to the number of points (default 10)
    pub fn candidate_factor(mut self, candidate_factor: usize) -> Self {
        self.candidate_factor = candidate_factor;
        self
    }

    /// Set the number of random subsets tried by the random subsampling (default 100)
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Basis the design is built for
    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    /// Distributions of the inputs
    pub fn distributions(&self) -> &[Distribution<F>] {
        &self.distributions
    }

    /// Number of design points: `max(P, ceil(oversampling * P))`
    pub fn required_rows(&self) -> usize {
        let p = self.basis.len();
        p.max((self.oversampling * p as f64).ceil() as usize)
    }

    fn validate(&self) -> Result<()> {
        if self.basis.dimension() != self.distributions.len() {
            return Err(DoeError::DimensionMismatch(format!(
                "basis of dimension {} with {} distributions",
                self.basis.dimension(),
                self.distributions.len()
            )));
        }
        if !self.oversampling.is_finite() || self.oversampling < 1. {
            return Err(DoeError::InvalidValueError(format!(
                "oversampling should be greater than or equal to 1, got {}",
                self.oversampling
            )));
        }
        if self.candidate_factor == 0 {
            return Err(DoeError::InvalidValueError(
                "candidate factor should be strictly positive".to_string(),
            ));
        }
        if self.max_iters == 0 {
            return Err(DoeError::InvalidValueError(
                "max iterations should be strictly positive".to_string(),
            ));
        }
        Ok(())
    }

    fn candidates(&self, size: usize, rng: &mut R) -> Result<(Array2<F>, Array1<F>)> {
        match self.mesh {
            MeshPolicy::Tensor => {
                let levels = self.basis.orders().iter().map(|o| o + 1).collect::<Vec<_>>();
                let grid = QuadratureGrid::new_with_rng(
                    &self.distributions,
                    &levels,
                    Xoshiro256Plus::seed_from_u64(rng.r#gen::<u64>()),
                )?;
                Ok(grid.draw_using(size, rng))
            }
            MeshPolicy::MonteCarlo => {
                let random = Random::new_with_rng(
                    &self.distributions,
                    Xoshiro256Plus::seed_from_u64(rng.r#gen::<u64>()),
                );
                let points = random.sample(size);
                let w = F::one() / F::cast(size);
                Ok((points, Array1::from_elem(size, w)))
            }
        }
    }

    /// Build the design
    ///
    /// Fails with [`DoeError::InfeasibleDesign`] when fewer distinct candidates than
    /// required points are available and with [`DoeError::IllConditioned`] when the
    /// selected points do not determine the basis coefficients.
    pub fn build(&self) -> Result<Design<F>> {
        self.validate()?;
        let rows = self.required_rows();
        let pool_size = rows.saturating_mul(self.candidate_factor);

        let mut rng = self.rng.write().unwrap();
        let (pool, pool_weights) = self.candidates(pool_size, &mut *rng)?;
        log::debug!(
            "{:?} mesh: {} candidates for {} points ({} basis terms)",
            self.mesh,
            pool.nrows(),
            rows,
            self.basis.len()
        );
        if pool.nrows() < rows {
            return Err(DoeError::InfeasibleDesign {
                candidates: pool.nrows(),
                required: rows,
            });
        }

        let m = self.basis.evaluate(&pool, &self.distributions)?;
        let indices = if pool.nrows() == rows {
            (0..rows).collect()
        } else {
            match self.subsampling {
                SubsamplingPolicy::Random => {
                    random_search(&m, rows, self.max_iters, &mut *rng)?.0
                }
                SubsamplingPolicy::Qr => pivoted_qr(&m, rows)?,
            }
        };

        let rc = rcond(&m.select(Axis(0), &indices))?;
        log::debug!("Design reciprocal condition number: {rc}");
        if rc < F::cast(DESIGN_RCOND_MIN) {
            return Err(DoeError::IllConditioned(format!(
                "reciprocal condition number {rc} of the measurement matrix is below {DESIGN_RCOND_MIN}"
            )));
        }

        let points = pool.select(Axis(0), &indices);
        let mut weights = pool_weights.select(Axis(0), &indices);
        let total = weights.sum();
        if total > F::zero() {
            weights.mapv_inplace(|w| w / total);
        }
        log::info!(
            "Design of {} points in dimension {} built ({:?} mesh, {:?} subsampling)",
            points.nrows(),
            points.ncols(),
            self.mesh,
            self.subsampling
        );
        Ok(Design { points, weights })
    }
}

impl<F: Float> fmt::Display for Design<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Design({} points, dim={})", self.nrows(), self.dim())
    }
}
