use std::sync::{Arc, RwLock};

use crate::SamplingMethod;
use linfa::Float;
use ndarray::Array2;
use ndarray_rand::{rand::Rng, rand::SeedableRng};
use polychaos_poly::Distribution;
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

type RngRef<R> = Arc<RwLock<R>>;

/// The Random design consists in drawing samples independently from the
/// distribution of each input component (Monte-Carlo sampling).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Random<F: Float, R: Rng> {
    /// Distribution of each component of x
    distributions: Vec<Distribution<F>>,
    /// Random generator used for reproducibility
    rng: RngRef<R>,
}

impl<F: Float> Random<F, Xoshiro256Plus> {
    /// Constructor given the distributions of the input components
    ///
    /// ```
    /// use polychaos_doe::Random;
    /// use polychaos_poly::Distribution;
    ///
    /// let u = Distribution::uniform(0.0, 1.0).unwrap();
    /// let n = Distribution::normal(5.0, 0.5).unwrap();
    /// let doe = Random::new(&[u, n]);
    /// ```
    pub fn new(distributions: &[Distribution<F>]) -> Self {
        Self::new_with_rng(distributions, Xoshiro256Plus::from_entropy())
    }
}

impl<F: Float, R: Rng> Random<F, R> {
    /// Constructor given the distributions of the input components
    /// and a random generator for reproducibility
    pub fn new_with_rng(distributions: &[Distribution<F>], rng: R) -> Self {
        Random {
            distributions: distributions.to_vec(),
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Set random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> Random<F, R2> {
        Random {
            distributions: self.distributions,
            rng: Arc::new(RwLock::new(rng)),
        }
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for Random<F, R> {
    fn distributions(&self) -> &[Distribution<F>] {
        &self.distributions
    }

    fn sample(&self, ns: usize) -> Array2<F> {
        let mut rng = self.rng.write().unwrap();
        let mut doe = Array2::zeros((ns, self.distributions.len()));
        for (j, dist) in self.distributions.iter().enumerate() {
            doe.column_mut(j).assign(&dist.sample(ns, &mut *rng));
        }
        doe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_abs_diff_ne};

    #[test]
    fn test_random_reproducible() {
        let u = Distribution::uniform(5., 10.).unwrap();
        let n = Distribution::normal(0., 1.).unwrap();
        let s1 = Random::new(&[u, n])
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(9);
        let s2 = Random::new(&[u, n])
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(9);
        assert_eq!(s1.dim(), (9, 2));
        assert_abs_diff_eq!(s1, s2);
        assert!(s1.column(0).iter().all(|v| (5. ..=10.).contains(v)));
    }

    #[test]
    fn test_no_duplicate() {
        let u = Distribution::uniform(0., 1.).unwrap();
        let doe = Random::new(&[u, u]).with_rng(Xoshiro256Plus::seed_from_u64(42));
        let sample1 = doe.sample(5);
        let sample2 = doe.sample(5);
        assert_abs_diff_ne!(sample1, sample2);
    }
}
