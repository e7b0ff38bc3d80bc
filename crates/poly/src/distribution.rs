//! Probability laws of the uncertain inputs and their orthogonal polynomial families.
//!
//! The following distributions are implemented:
//! * uniform on `[lower, upper]`, associated to Legendre polynomials,
//! * normal `N(mean, std^2)`, associated to probabilists' Hermite polynomials.
//!
//! Polynomials are rescaled to the distribution support so that they are
//! orthonormal with respect to the distribution itself.

use crate::errors::{PolyError, Result};
use crate::recurrence::Recurrence;
use linfa::Float;
use ndarray::{Array, Array1, Array2, ArrayBase, Data, Ix1};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::{StandardNormal, Uniform};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability law of one uncertain input
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Distribution<F: Float> {
    /// Uniform law on `[lower, upper]`
    Uniform {
        /// Lower bound of the support
        lower: F,
        /// Upper bound of the support
        upper: F,
    },
    /// Gaussian law
    Normal {
        /// Mean value
        mean: F,
        /// Standard deviation
        std: F,
    },
}

impl<F: Float> Distribution<F> {
    /// Uniform distribution constructor
    ///
    /// Fails with [`PolyError::InvalidDomain`] when `lower >= upper` or bounds are not finite.
    ///
    /// ```
    /// use polychaos_poly::Distribution;
    ///
    /// let u = Distribution::uniform(0.05, 0.15).unwrap();
    /// assert!(Distribution::uniform(1., 1.).is_err());
    /// ```
    pub fn uniform(lower: F, upper: F) -> Result<Self> {
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(PolyError::InvalidDomain(format!(
                "uniform bounds should be finite, got [{lower}, {upper}]"
            )));
        }
        if lower >= upper {
            return Err(PolyError::InvalidDomain(format!(
                "uniform lower bound should be less than upper bound, got [{lower}, {upper}]"
            )));
        }
        Ok(Distribution::Uniform { lower, upper })
    }

    /// Normal distribution constructor
    ///
    /// Fails with [`PolyError::InvalidDomain`] when `std <= 0` or values are not finite.
    pub fn normal(mean: F, std: F) -> Result<Self> {
        if !(mean.is_finite() && std.is_finite()) || std <= F::zero() {
            return Err(PolyError::InvalidDomain(format!(
                "normal law requires finite mean and positive std, got N({mean}, {std})"
            )));
        }
        Ok(Distribution::Normal { mean, std })
    }

    /// Interval containing the samples of the distribution
    pub fn support(&self) -> (F, F) {
        match *self {
            Distribution::Uniform { lower, upper } => (lower, upper),
            Distribution::Normal { .. } => (F::neg_infinity(), F::infinity()),
        }
    }

    /// Expected value
    pub fn mean(&self) -> F {
        match *self {
            Distribution::Uniform { lower, upper } => (lower + upper) / F::cast(2.),
            Distribution::Normal { mean, .. } => mean,
        }
    }

    /// Variance
    pub fn variance(&self) -> F {
        match *self {
            Distribution::Uniform { lower, upper } => {
                let w = upper - lower;
                w * w / F::cast(12.)
            }
            Distribution::Normal { std, .. } => std * std,
        }
    }

    /// Recurrence coefficients `(alpha_k, beta_k)` for `k = 0..n` of the monic
    /// polynomials orthogonal with respect to this distribution.
    pub fn recurrence(&self, n: usize) -> Result<Recurrence<F>> {
        let (alpha, beta) = self.recurrence_coefficients(n);
        Recurrence::new(alpha, beta)
    }

    /// Recurrence coefficients `(alpha, beta)` as two arrays of length `n`
    pub fn recurrence_coefficients(&self, n: usize) -> (Array1<F>, Array1<F>) {
        match *self {
            Distribution::Uniform { lower, upper } => {
                let center = (lower + upper) / F::cast(2.);
                let half = (upper - lower) / F::cast(2.);
                let alpha = Array1::from_elem(n, center);
                let beta = Array1::from_shape_fn(n, |k| {
                    if k == 0 {
                        F::one()
                    } else {
                        let k = F::cast(k);
                        let four = F::cast(4.);
                        half * half * k * k / (four * k * k - F::one())
                    }
                });
                (alpha, beta)
            }
            Distribution::Normal { mean, std } => {
                let alpha = Array1::from_elem(n, mean);
                let beta = Array1::from_shape_fn(n, |k| {
                    if k == 0 {
                        F::one()
                    } else {
                        std * std * F::cast(k)
                    }
                });
                (alpha, beta)
            }
        }
    }

    /// Gauss quadrature rule with `n` points of the distribution.
    /// Weights sum to one and nodes are sorted in ascending order.
    ///
    /// Fails with [`PolyError::InvalidOrder`] when `n == 0`.
    pub fn quadrature_rule(&self, n: usize) -> Result<(Array1<F>, Array1<F>)> {
        if n == 0 {
            return Err(PolyError::InvalidOrder(
                "quadrature rule requires at least one point".to_string(),
            ));
        }
        self.recurrence(n)?.gauss_quadrature(n)
    }

    /// Evaluate orthonormal polynomials of degree `0..=degree` at points `x`.
    /// Returns a (x.len(), degree + 1) matrix.
    pub fn orthonormal(
        &self,
        degree: usize,
        x: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<Array2<F>> {
        Ok(self
            .recurrence(degree + 1)?
            .orthonormal(degree, &x.to_owned()))
    }

    /// Draw `n` independent samples of the distribution
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Array1<F> {
        match *self {
            Distribution::Uniform { lower, upper } => {
                Array::random_using(n, Uniform::new(0., 1.), rng)
                    .mapv(|v: f64| lower + (upper - lower) * F::cast(v))
            }
            Distribution::Normal { mean, std } => {
                let z: Array1<f64> = Array::random_using(n, StandardNormal, rng);
                z.mapv(|v| mean + std * F::cast(v))
            }
        }
    }
}

impl<F: Float> fmt::Display for Distribution<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Distribution::Uniform { lower, upper } => write!(f, "U[{lower}, {upper}]"),
            Distribution::Normal { mean, std } => write!(f, "N({mean}, {std}^2)"),
        }
    }
}

/// An uncertain input: a distribution together with the maximum polynomial
/// order used to represent the output dependency on this input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Parameter<F: Float> {
    distribution: Distribution<F>,
    order: usize,
}

impl<F: Float> Parameter<F> {
    /// Constructor given a distribution and a polynomial order
    pub fn new(distribution: Distribution<F>, order: usize) -> Self {
        Parameter {
            distribution,
            order,
        }
    }

    /// Uniform parameter on `[lower, upper]` with given order
    pub fn uniform(lower: F, upper: F, order: usize) -> Result<Self> {
        Ok(Self::new(Distribution::uniform(lower, upper)?, order))
    }

    /// Normal parameter with given order
    pub fn normal(mean: F, std: F, order: usize) -> Result<Self> {
        Ok(Self::new(Distribution::normal(mean, std)?, order))
    }

    /// Distribution of the parameter
    pub fn distribution(&self) -> &Distribution<F> {
        &self.distribution
    }

    /// Maximum polynomial order of the parameter
    pub fn order(&self) -> usize {
        self.order
    }
}

/// Split parameters into their distributions and orders
pub fn unzip_parameters<F: Float>(
    parameters: &[Parameter<F>],
) -> (Vec<Distribution<F>>, Vec<usize>) {
    parameters
        .iter()
        .map(|p| (p.distribution, p.order))
        .unzip()
}
