//! Variance-based sensitivity analysis of polynomial chaos expansions.
//!
//! With an orthonormal basis the variance of the expansion is the sum of the
//! squared non-constant coefficients. Grouping terms by the exact set of inputs
//! they depend on (the support of their multi-index) gives the partial
//! variance of every subset of inputs, hence the Sobol' indices:
//!
//! * the index of a subset `S` is the variance carried by the terms whose
//!   support is exactly `S` divided by the total variance, so second order
//!   indices are pure interaction effects (first order effects excluded),
//! * the total-effect index of input `i` sums the indices of every subset
//!   containing `i`.

use crate::errors::{PceError, Result};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
use polychaos_poly::Basis;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sobol' decomposition of the variance of a polynomial chaos expansion
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize",
        deserialize = "F: Deserialize<'de>"
    ))
)]
pub struct SobolIndices<F: Float> {
    /// Number of inputs
    dim: usize,
    /// Total variance of the expansion
    variance: F,
    /// Partial variance of each input subset carried by at least one term, sorted by subset
    partial_variances: Vec<(Vec<usize>, F)>,
}

impl<F: Float> SobolIndices<F> {
    /// Sobol' decomposition given the coefficients aligned with the orthonormal basis terms.
    ///
    /// When the basis has no non-constant term or the variance is zero, the
    /// decomposition is degenerate and every index is 0.
    ///
    /// Fails with [`PceError::DimensionMismatch`] when coefficients and basis lengths differ.
    pub fn from_coefficients(
        coefficients: &ArrayBase<impl Data<Elem = F>, Ix1>,
        basis: &Basis,
    ) -> Result<Self> {
        if coefficients.len() != basis.len() {
            return Err(PceError::DimensionMismatch(format!(
                "{} coefficients given for a basis of {} terms",
                coefficients.len(),
                basis.len()
            )));
        }
        Ok(Self::decompose(coefficients, basis))
    }

    /// Same as [`SobolIndices::from_coefficients`] but fails with
    /// [`PceError::EmptyBasis`] when the basis has no non-constant term.
    pub fn try_from_coefficients(
        coefficients: &ArrayBase<impl Data<Elem = F>, Ix1>,
        basis: &Basis,
    ) -> Result<Self> {
        if basis.non_constant_len() == 0 {
            return Err(PceError::EmptyBasis);
        }
        Self::from_coefficients(coefficients, basis)
    }

    pub(crate) fn decompose(coefficients: &ArrayBase<impl Data<Elem = F>, Ix1>, basis: &Basis) -> Self {
        let mut partial_variances = BTreeMap::new();
        let mut variance = F::zero();
        for (term, c) in basis.iter().zip(coefficients.iter()) {
            if term.is_constant() {
                continue;
            }
            let v = *c * *c;
            variance += v;
            *partial_variances.entry(term.support()).or_insert_with(F::zero) += v;
        }
        if variance <= F::zero() || !variance.is_finite() {
            log::warn!("Degenerate Sobol' decomposition: zero variance, all indices set to 0");
        }
        SobolIndices {
            dim: basis.dimension(),
            variance,
            partial_variances: partial_variances.into_iter().collect(),
        }
    }

    /// Number of inputs
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total variance of the expansion
    pub fn variance(&self) -> F {
        self.variance
    }

    /// Whether the variance is zero, in which case all indices are 0
    pub fn is_degenerate(&self) -> bool {
        !(self.variance > F::zero() && self.variance.is_finite())
    }

    /// Sobol' index of the given input subset (pure effect of the exact subset).
    /// The subset is given as input indices in any order; 0 for an absent subset.
    pub fn get(&self, subset: &[usize]) -> F {
        if self.is_degenerate() {
            return F::zero();
        }
        let mut key = subset.to_vec();
        key.sort_unstable();
        key.dedup();
        self.partial_variances
            .binary_search_by(|(s, _)| s.cmp(&key))
            .map(|k| self.partial_variances[k].1 / self.variance)
            .unwrap_or(F::zero())
    }

    /// Sobol' indices of every input subset of size `order` in canonical order
    /// (lexicographic over ascending input indices), absent subsets having index 0.
    /// An order greater than the dimension has no subset and gives an empty mapping.
    ///
    /// Fails with [`PceError::InvalidValueError`] when order is 0.
    pub fn order(&self, order: usize) -> Result<Vec<(Vec<usize>, F)>> {
        if order == 0 {
            return Err(PceError::InvalidValueError(
                "Sobol' order should be strictly positive".to_string(),
            ));
        }
        Ok(combinations(self.dim, order)
            .into_iter()
            .map(|s| {
                let v = self.get(&s);
                (s, v)
            })
            .collect())
    }

    /// Indices of every order from 1 to `max_order`, each order as given by [`SobolIndices::order`]
    pub fn up_to_order(&self, max_order: usize) -> Result<Vec<Vec<(Vec<usize>, F)>>> {
        if max_order == 0 {
            return Err(PceError::InvalidValueError(
                "Sobol' max order should be strictly positive".to_string(),
            ));
        }
        (1..=max_order).map(|k| self.order(k)).collect()
    }

    /// First order indices, one per input
    pub fn first_order(&self) -> Array1<F> {
        Array1::from_shape_fn(self.dim, |i| self.get(&[i]))
    }

    /// Second order (pure interaction) indices of every input pair in canonical order
    pub fn second_order(&self) -> Vec<(Vec<usize>, F)> {
        self.order(2).unwrap_or_default()
    }

    /// Total-effect indices, one per input
    pub fn total(&self) -> Array1<F> {
        let mut total = Array1::zeros(self.dim);
        if self.is_degenerate() {
            return total;
        }
        for (subset, v) in self.partial_variances.iter() {
            for &i in subset {
                total[i] += *v / self.variance;
            }
        }
        total
    }

    /// Indices of the subsets carried by at least one term of the expansion
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<usize>, F)> + '_ {
        self.partial_variances.iter().map(move |(s, v)| {
            let index = if self.is_degenerate() {
                F::zero()
            } else {
                *v / self.variance
            };
            (s, index)
        })
    }
}

impl<F: Float> fmt::Display for SobolIndices<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Sobol(dim={}, variance={}, first_order={}, total={})",
            self.dim,
            self.variance,
            self.first_order(),
            self.total()
        )
    }
}

/// Sobol' indices of orders 1 to `max_order` of the expansion given by
/// coefficients aligned with the basis terms.
///
/// A constant basis or a zero variance expansion gives zero indices.
pub fn compute_sobol_indices<F: Float>(
    coefficients: &ArrayBase<impl Data<Elem = F>, Ix1>,
    basis: &Basis,
    max_order: usize,
) -> Result<Vec<Vec<(Vec<usize>, F)>>> {
    SobolIndices::from_coefficients(coefficients, basis)?.up_to_order(max_order)
}

/// Subsets of size `k` of `0..n` in lexicographic order
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut res = Vec::new();
    if k == 0 || k > n {
        return res;
    }
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        res.push(current.clone());
        // rightmost position which can still be incremented
        let Some(i) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            break;
        };
        current[i] += 1;
        for j in i + 1..k {
            current[j] = current[j - 1] + 1;
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::{Dataset, Fit};
    use ndarray::{Array2, Zip, array};
    use ndarray_rand::rand::SeedableRng;
    use polychaos_doe::{Random, SamplingMethod};
    use polychaos_poly::{Distribution, MultiIndex, TruncationRule};
    use rand_xoshiro::Xoshiro256Plus;

    fn ishigami(x: &Array2<f64>) -> Array1<f64> {
        let mut y = Array1::zeros(x.nrows());
        Zip::from(&mut y).and(x.rows()).for_each(|y, x| {
            *y = x[0].sin() + 7. * x[1].sin().powi(2) + 0.1 * x[2].powi(4) * x[0].sin();
        });
        y
    }

    #[test]
    fn test_combinations() {
        assert_eq!(
            combinations(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
        assert_eq!(combinations(15, 2).len(), 105);
        assert!(combinations(2, 3).is_empty());
    }

    #[test]
    fn test_pure_interaction() {
        // terms [0,0] [1,0] [0,1] [2,0] [1,1] [0,2]
        let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
        let c = array![5., 1., 2., 0., 1., 0.];
        let sobol = SobolIndices::from_coefficients(&c, &basis).unwrap();
        assert_abs_diff_eq!(sobol.variance(), 6.);
        assert_abs_diff_eq!(sobol.first_order(), array![1. / 6., 4. / 6.], epsilon = 1e-12);
        let second = sobol.second_order();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, vec![0, 1]);
        assert_abs_diff_eq!(second[0].1, 1. / 6., epsilon = 1e-12);
        assert_abs_diff_eq!(sobol.get(&[1, 0]), 1. / 6., epsilon = 1e-12);
        assert_abs_diff_eq!(sobol.total(), array![2. / 6., 5. / 6.], epsilon = 1e-12);
    }

    #[test]
    fn test_ishigami_indices() {
        let pi = std::f64::consts::PI;
        let u = Distribution::uniform(-pi, pi).unwrap();
        let xt = Random::new(&[u, u, u])
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(800);
        let yt = ishigami(&xt);
        let basis = Basis::build(3, 10, TruncationRule::TotalOrder).unwrap();
        let pce = crate::PolynomialChaos::params(&[u, u, u], basis)
            .fit(&Dataset::new(xt, yt))
            .expect("PCE fitted");

        // analytic values with a = 7, b = 0.1
        let sobol = pce.sobol_indices();
        let first = sobol.first_order();
        assert_abs_diff_eq!(first[0], 0.3139, epsilon = 5e-3);
        assert_abs_diff_eq!(first[1], 0.4424, epsilon = 5e-3);
        assert_abs_diff_eq!(first[2], 0., epsilon = 5e-3);
        assert_abs_diff_eq!(sobol.get(&[0, 2]), 0.2437, epsilon = 5e-3);
        assert_abs_diff_eq!(sobol.get(&[0, 1]), 0., epsilon = 5e-3);
        assert_abs_diff_eq!(sobol.get(&[1, 2]), 0., epsilon = 5e-3);
        assert_abs_diff_eq!(sobol.total(), array![0.5576, 0.4424, 0.2437], epsilon = 5e-3);
    }

    #[test]
    fn test_indices_sum_to_one() {
        let basis = Basis::build(3, 3, TruncationRule::TotalOrder).unwrap();
        let c = Array1::from_shape_fn(basis.len(), |k| 1. / (k as f64 + 1.));
        let sobol = SobolIndices::from_coefficients(&c, &basis).unwrap();
        let sum: f64 = (1..=3)
            .map(|k| sobol.order(k).unwrap().iter().map(|(_, v)| v).sum::<f64>())
            .sum();
        assert_abs_diff_eq!(sum, 1., epsilon = 1e-12);
        assert!(sobol.iter().all(|(_, v)| (0. ..=1.).contains(&v)));
    }

    #[test]
    fn test_absent_variable_is_zero() {
        let basis = Basis::build(3, 2, TruncationRule::TotalOrder).unwrap();
        let mut c = Array1::zeros(basis.len());
        c[basis.position(&MultiIndex::new(vec![1, 0, 0])).unwrap()] = 2.;
        c[basis.position(&MultiIndex::new(vec![0, 1, 1])).unwrap()] = 1.;
        let sobol = SobolIndices::from_coefficients(&c, &basis).unwrap();
        assert_eq!(sobol.first_order()[1], 0.);
        assert_eq!(sobol.first_order()[2], 0.);
        assert_eq!(sobol.get(&[0, 2]), 0.);
        assert_abs_diff_eq!(sobol.get(&[1, 2]), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_constant_basis() {
        let basis = Basis::constant(3).unwrap();
        let c = array![4.2];
        let sobol = SobolIndices::from_coefficients(&c, &basis).unwrap();
        assert!(sobol.is_degenerate());
        assert_eq!(sobol.first_order(), Array1::<f64>::zeros(3));
        assert_eq!(sobol.total(), Array1::<f64>::zeros(3));
        assert!(sobol.order(2).unwrap().iter().all(|(_, v)| *v == 0.));
        assert!(matches!(
            SobolIndices::try_from_coefficients(&c, &basis),
            Err(PceError::EmptyBasis)
        ));
    }

    #[test]
    fn test_compute_up_to_order() {
        let basis = Basis::build(3, 2, TruncationRule::TotalOrder).unwrap();
        let c = Array1::from_shape_fn(basis.len(), |k| k as f64);
        let indices = compute_sobol_indices(&c, &basis, 2).unwrap();
        assert_eq!(indices.len(), 2);
        assert_eq!(indices[0].len(), 3);
        assert_eq!(indices[1].len(), 3);
        assert_eq!(indices[1][2].0, vec![1, 2]);
        let indices = compute_sobol_indices(&c, &basis, 4).unwrap();
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[2].len(), 1);
        assert!(indices[3].is_empty());
        assert!(matches!(
            compute_sobol_indices(&c, &basis, 0),
            Err(PceError::InvalidValueError(_))
        ));

        let constant = compute_sobol_indices(&array![1.], &Basis::constant(2).unwrap(), 2).unwrap();
        assert!(constant.iter().flatten().all(|(_, v)| *v == 0.));
    }

    #[test]
    fn test_single_input_orders() {
        // y = x + x^2 in orthonormal form
        let basis = Basis::build(1, 2, TruncationRule::TotalOrder).unwrap();
        let indices = compute_sobol_indices(&array![0., 1., 1.], &basis, 2).unwrap();
        assert_eq!(indices.len(), 2);
        assert_eq!(indices[0], vec![(vec![0], 1.)]);
        assert!(indices[1].is_empty());
    }

    #[test]
    fn test_degenerate_zero_variance() {
        let basis = Basis::build(2, 1, TruncationRule::TotalOrder).unwrap();
        let sobol = SobolIndices::from_coefficients(&array![1., 0., 0.], &basis).unwrap();
        assert!(sobol.is_degenerate());
        assert_eq!(sobol.first_order(), array![0., 0.]);
    }

    #[test]
    fn test_invalid_order_and_length() {
        let basis = Basis::build(2, 1, TruncationRule::TotalOrder).unwrap();
        let sobol = SobolIndices::from_coefficients(&array![1., 1., 0.], &basis).unwrap();
        assert!(matches!(
            sobol.order(0),
            Err(PceError::InvalidValueError(_))
        ));
        assert!(sobol.order(3).unwrap().is_empty());
        assert!(matches!(
            SobolIndices::from_coefficients(&array![1., 1.], &basis),
            Err(PceError::DimensionMismatch(_))
        ));
    }
}
