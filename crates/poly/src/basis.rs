//! Multivariate polynomial bases described by sets of multi-indices.
//!
//! A basis term is the product of univariate orthonormal polynomials, one per
//! input dimension, whose degrees are given by a [`MultiIndex`].
//! Terms are kept under a [`TruncationRule`] and enumerated in graded
//! lexicographic order: by increasing total degree, then by decreasing degree
//! of the first dimension, the second one, and so on.
//!
//! ```
//! use polychaos_poly::{Basis, TruncationRule};
//!
//! let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
//! let terms: Vec<Vec<usize>> = basis.iter().map(|t| t.to_vec()).collect();
//! assert_eq!(
//!     terms,
//!     vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![2, 0], vec![1, 1], vec![0, 2]]
//! );
//! ```

use crate::distribution::Distribution;
use crate::errors::{PolyError, Result};
use crate::recurrence::Recurrence;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tolerance used when comparing non-integer norms of multi-indices to the order
const NORM_TOL: f64 = 1e-10;

/// Per-dimension polynomial degrees of one basis term
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct MultiIndex(Vec<usize>);

impl MultiIndex {
    /// Constructor from the per-dimension degrees
    pub fn new(degrees: Vec<usize>) -> Self {
        MultiIndex(degrees)
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the multi-index has no dimension
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total degree (sum of the per-dimension degrees)
    pub fn degree(&self) -> usize {
        self.0.iter().sum()
    }

    /// Largest per-dimension degree
    pub fn max_degree(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Dimensions having a non-zero degree, in ascending order
    pub fn support(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether this is the constant term
    pub fn is_constant(&self) -> bool {
        self.0.iter().all(|d| *d == 0)
    }

    /// Per-dimension degrees as a slice
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Per-dimension degrees as a vector
    pub fn to_vec(&self) -> Vec<usize> {
        self.0.clone()
    }
}

impl std::ops::Index<usize> for MultiIndex {
    type Output = usize;
    fn index(&self, i: usize) -> &usize {
        &self.0[i]
    }
}

impl From<Vec<usize>> for MultiIndex {
    fn from(degrees: Vec<usize>) -> Self {
        MultiIndex(degrees)
    }
}

impl fmt::Display for MultiIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Rule selecting which multi-indices belong to the basis
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum TruncationRule {
    /// Sum of degrees lower than or equal to the order
    #[default]
    TotalOrder,
    /// Each degree lower than or equal to its dimension order (full tensor product)
    Tensor,
    /// q-quasi-norm of degrees lower than or equal to the order, with `0 < q <= 1`
    Hyperbolic {
        /// Quasi-norm exponent
        q: f64,
    },
    /// Euclidean norm of degrees lower than or equal to the order
    Euclidean,
}

impl TruncationRule {
    /// Norm of the (partial) multi-index used by the rule.
    /// Norms are non decreasing when a component increases, which allows
    /// pruning the enumeration as soon as a prefix exceeds the order.
    fn norm(&self, degrees: &[usize]) -> f64 {
        match *self {
            TruncationRule::TotalOrder => degrees.iter().sum::<usize>() as f64,
            TruncationRule::Tensor => degrees.iter().copied().max().unwrap_or(0) as f64,
            TruncationRule::Hyperbolic { q } => degrees
                .iter()
                .map(|&d| (d as f64).powf(q))
                .sum::<f64>()
                .powf(1. / q),
            TruncationRule::Euclidean => degrees
                .iter()
                .map(|&d| (d * d) as f64)
                .sum::<f64>()
                .sqrt(),
        }
    }

    /// Largest total degree a multi-index may have under this rule
    fn max_total_degree(&self, orders: &[usize]) -> usize {
        let cap: usize = orders.iter().sum();
        let p = orders.iter().copied().max().unwrap_or(0);
        match *self {
            TruncationRule::TotalOrder | TruncationRule::Hyperbolic { .. } => p.min(cap),
            TruncationRule::Tensor => cap,
            TruncationRule::Euclidean => {
                let bound = (orders.len() as f64).sqrt() * p as f64;
                (bound.floor() as usize).min(cap)
            }
        }
    }

    fn check(&self) -> Result<()> {
        if let TruncationRule::Hyperbolic { q } = *self {
            if !(q > 0. && q <= 1.) {
                return Err(PolyError::InvalidValueError(format!(
                    "hyperbolic truncation requires 0 < q <= 1, got {q}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TruncationRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TruncationRule::TotalOrder => write!(f, "total-order"),
            TruncationRule::Tensor => write!(f, "tensor-grid"),
            TruncationRule::Hyperbolic { q } => write!(f, "hyperbolic(q={q})"),
            TruncationRule::Euclidean => write!(f, "euclidean-degree"),
        }
    }
}

/// Number of multi-indices of a total-order basis in `dim` dimensions at order `order`,
/// that is the binomial coefficient `C(dim + order, order)`.
pub fn total_order_cardinality(dim: usize, order: usize) -> usize {
    let mut res = 1usize;
    for k in 1..=order {
        res = res * (dim + k) / k;
    }
    res
}

/// An ordered set of multi-indices defining a multivariate polynomial basis
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Basis {
    /// Maximum degree for each dimension
    orders: Vec<usize>,
    /// Rule used to select the multi-indices
    rule: TruncationRule,
    /// Basis terms in evaluation order, the constant term comes first
    terms: Vec<MultiIndex>,
}

impl Basis {
    /// Build an isotropic basis in `dimension` dimensions where every dimension
    /// has the same maximum order.
    ///
    /// Fails with [`PolyError::DimensionMismatch`] when `dimension == 0`.
    pub fn build(dimension: usize, max_order: usize, rule: TruncationRule) -> Result<Basis> {
        Self::new(&vec![max_order; dimension], rule)
    }

    /// Build a basis given the maximum order of each dimension.
    ///
    /// The global order of the truncation rule is the largest dimension order
    /// and each multi-index component is also bounded by its dimension order.
    pub fn new(orders: &[usize], rule: TruncationRule) -> Result<Basis> {
        if orders.is_empty() {
            return Err(PolyError::DimensionMismatch(
                "basis dimension should be strictly positive".to_string(),
            ));
        }
        rule.check()?;
        let p = orders.iter().copied().max().unwrap_or(0);
        let mut terms = Vec::new();
        let mut current = vec![0; orders.len()];
        for degree in 0..=rule.max_total_degree(orders) {
            enumerate_degree(&rule, orders, p, degree, 0, &mut current, &mut terms);
        }
        log::debug!(
            "{} basis with orders {:?}: {} terms",
            rule,
            orders,
            terms.len()
        );
        Ok(Basis {
            orders: orders.to_vec(),
            rule,
            terms,
        })
    }

    /// Basis reduced to the constant term
    pub fn constant(dimension: usize) -> Result<Basis> {
        Self::new(&vec![0; dimension], TruncationRule::TotalOrder)
    }

    /// Build a basis from explicitly given multi-indices.
    /// The order is kept as given: coefficients are aligned with it.
    pub fn from_terms(terms: Vec<MultiIndex>) -> Result<Basis> {
        let dim = terms.first().map(|t| t.len()).unwrap_or(0);
        if dim == 0 {
            return Err(PolyError::DimensionMismatch(
                "basis dimension should be strictly positive".to_string(),
            ));
        }
        if let Some(t) = terms.iter().find(|t| t.len() != dim) {
            return Err(PolyError::DimensionMismatch(format!(
                "multi-index {t} should have {dim} components"
            )));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(t) = terms.iter().find(|t| !seen.insert(*t)) {
            return Err(PolyError::InvalidValueError(format!(
                "duplicated multi-index {t} in basis"
            )));
        }
        let orders = (0..dim)
            .map(|j| terms.iter().map(|t| t[j]).max().unwrap_or(0))
            .collect();
        Ok(Basis {
            orders,
            rule: TruncationRule::Tensor,
            terms,
        })
    }

    /// Number of basis terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the basis has no term (never the case for a built basis)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of input dimensions
    pub fn dimension(&self) -> usize {
        self.orders.len()
    }

    /// Maximum degree of each dimension
    pub fn orders(&self) -> &[usize] {
        &self.orders
    }

    /// Truncation rule
    pub fn rule(&self) -> TruncationRule {
        self.rule
    }

    /// Basis terms in evaluation order
    pub fn terms(&self) -> &[MultiIndex] {
        &self.terms
    }

    /// Iterator over basis terms
    pub fn iter(&self) -> std::slice::Iter<'_, MultiIndex> {
        self.terms.iter()
    }

    /// Position of the given multi-index in the basis if any
    pub fn position(&self, index: &MultiIndex) -> Option<usize> {
        self.terms.iter().position(|t| t == index)
    }

    /// Number of terms which are not the constant term
    pub fn non_constant_len(&self) -> usize {
        self.terms.iter().filter(|t| !t.is_constant()).count()
    }

    /// Position of every term indexed by its multi-index
    pub fn positions(&self) -> HashMap<MultiIndex, usize> {
        self.terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect()
    }

    /// Evaluate every basis term at the `x` points given as a (n, dim) matrix.
    /// Returns the (n, len) measurement matrix where the (i, k) entry is the kth
    /// basis term evaluated at the ith point: `prod_j psi_{alpha_kj}^{(j)}(x_ij)`.
    ///
    /// Fails with [`PolyError::DimensionMismatch`] when `x` columns or number of
    /// distributions do not match the basis dimension.
    pub fn evaluate<F: Float>(
        &self,
        x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
        distributions: &[Distribution<F>],
    ) -> Result<Array2<F>> {
        let dim = self.dimension();
        if distributions.len() != dim {
            return Err(PolyError::DimensionMismatch(format!(
                "basis of dimension {} evaluated with {} distributions",
                dim,
                distributions.len()
            )));
        }
        if x.ncols() != dim {
            return Err(PolyError::DimensionMismatch(format!(
                "basis of dimension {} evaluated at points of dimension {}",
                dim,
                x.ncols()
            )));
        }
        let recurrences = distributions
            .iter()
            .zip(self.orders.iter())
            .map(|(d, &p)| d.recurrence(p + 1))
            .collect::<Result<Vec<Recurrence<F>>>>()?;

        let mut res = Array2::zeros((x.nrows(), self.len()));
        Zip::from(res.rows_mut())
            .and(x.rows())
            .par_for_each(|mut row_res, row_x| {
                let univariates = recurrences
                    .iter()
                    .zip(self.orders.iter())
                    .zip(row_x.iter())
                    .map(|((rec, &p), &xj)| {
                        let mut psi = Array1::zeros(p + 1);
                        rec.fill_orthonormal(xj, psi.view_mut());
                        psi
                    })
                    .collect::<Vec<_>>();
                for (k, term) in self.terms.iter().enumerate() {
                    row_res[k] = term
                        .as_slice()
                        .iter()
                        .zip(univariates.iter())
                        .fold(F::one(), |acc, (&d, psi)| acc * psi[d]);
                }
            });
        Ok(res)
    }
}

impl<'a> IntoIterator for &'a Basis {
    type Item = &'a MultiIndex;
    type IntoIter = std::slice::Iter<'a, MultiIndex>;
    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Basis(rule={}, dim={}, orders={:?}, terms={})",
            self.rule,
            self.dimension(),
            self.orders,
            self.len()
        )
    }
}

/// Recursively enumerate the multi-indices of total degree `remaining` over
/// dimensions `j..` which satisfy the truncation rule, in decreasing
/// lexicographic order of the components.
fn enumerate_degree(
    rule: &TruncationRule,
    orders: &[usize],
    p: usize,
    remaining: usize,
    j: usize,
    current: &mut Vec<usize>,
    terms: &mut Vec<MultiIndex>,
) {
    let dim = orders.len();
    if j == dim - 1 {
        if remaining <= orders[j] {
            current[j] = remaining;
            if rule.norm(current) <= p as f64 + NORM_TOL {
                terms.push(MultiIndex(current.clone()));
            }
            current[j] = 0;
        }
        return;
    }
    // the remaining dimensions must be able to absorb what is left
    let tail_cap: usize = orders[j + 1..].iter().sum();
    let lowest = remaining.saturating_sub(tail_cap);
    for d in (lowest..=remaining.min(orders[j])).rev() {
        current[j] = d;
        if rule.norm(&current[..=j]) <= p as f64 + NORM_TOL {
            enumerate_degree(rule, orders, p, remaining - d, j + 1, current, terms);
        }
    }
    current[j] = 0;
}
