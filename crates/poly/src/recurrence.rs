use crate::errors::{PolyError, Result};
use linfa::Float;
use linfa_linalg::eigh::*;
use ndarray::{Array1, Array2, ArrayViewMut1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Three-term recurrence coefficients of the monic orthogonal polynomials
/// of a probability measure:
///
/// `p_{k+1}(x) = (x - alpha_k) p_k(x) - beta_k p_{k-1}(x)`
///
/// where `beta_0` is the total mass of the measure (1 for a probability measure).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Recurrence<F: Float> {
    alpha: Array1<F>,
    beta: Array1<F>,
}

impl<F: Float> Recurrence<F> {
    /// Constructor from `alpha` and `beta` coefficients of the same length
    pub fn new(alpha: Array1<F>, beta: Array1<F>) -> Result<Self> {
        if alpha.len() != beta.len() {
            return Err(PolyError::DimensionMismatch(format!(
                "recurrence coefficients should have same length, got alpha={} and beta={}",
                alpha.len(),
                beta.len()
            )));
        }
        if beta.iter().any(|b| *b <= F::zero()) {
            return Err(PolyError::InvalidValueError(
                "recurrence beta coefficients should be positive".to_string(),
            ));
        }
        Ok(Recurrence { alpha, beta })
    }

    /// `alpha_k` coefficients
    pub fn alpha(&self) -> &Array1<F> {
        &self.alpha
    }

    /// `beta_k` coefficients
    pub fn beta(&self) -> &Array1<F> {
        &self.beta
    }

    /// Highest polynomial degree which can be evaluated in orthonormal form
    pub fn max_degree(&self) -> usize {
        self.alpha.len().saturating_sub(1)
    }

    /// Fill `out` with the orthonormal polynomials `psi_0(x), ..., psi_p(x)`
    /// where `p = out.len() - 1`.
    ///
    /// Orthonormal polynomials satisfy
    /// `sqrt(beta_{k+1}) psi_{k+1}(x) = (x - alpha_k) psi_k(x) - sqrt(beta_k) psi_{k-1}(x)`
    ///
    /// **Panics** if `out.len()` is greater than the number of coefficients.
    pub fn fill_orthonormal(&self, x: F, mut out: ArrayViewMut1<F>) {
        let n = out.len();
        if n == 0 {
            return;
        }
        assert!(
            n <= self.alpha.len(),
            "not enough recurrence coefficients ({}) to evaluate degree {}",
            self.alpha.len(),
            n - 1
        );
        out[0] = F::one() / self.beta[0].sqrt();
        if n > 1 {
            out[1] = (x - self.alpha[0]) * out[0] / self.beta[1].sqrt();
        }
        for k in 1..n.saturating_sub(1) {
            out[k + 1] = ((x - self.alpha[k]) * out[k] - self.beta[k].sqrt() * out[k - 1])
                / self.beta[k + 1].sqrt();
        }
    }

    /// Evaluate orthonormal polynomials up to `degree` at the given points.
    /// Returns a (x.len(), degree + 1) matrix.
    pub fn orthonormal(&self, degree: usize, x: &Array1<F>) -> Array2<F> {
        let mut res = Array2::zeros((x.len(), degree + 1));
        for (xi, row) in x.iter().zip(res.rows_mut()) {
            self.fill_orthonormal(*xi, row);
        }
        res
    }

    /// Gauss quadrature rule with `n` points computed with the Golub-Welsch algorithm:
    /// nodes are the eigenvalues of the symmetric Jacobi matrix and weights are
    /// `beta_0` times the squared first components of the normalized eigenvectors.
    ///
    /// Returns `(nodes, weights)` with nodes sorted in ascending order.
    pub fn gauss_quadrature(&self, n: usize) -> Result<(Array1<F>, Array1<F>)> {
        if n == 0 {
            return Err(PolyError::InvalidOrder(
                "quadrature rule requires at least one point".to_string(),
            ));
        }
        if n > self.alpha.len() {
            return Err(PolyError::InvalidOrder(format!(
                "{} recurrence coefficients cannot define a {}-point quadrature",
                self.alpha.len(),
                n
            )));
        }
        if n == 1 {
            return Ok((Array1::from_elem(1, self.alpha[0]), Array1::from_elem(1, self.beta[0])));
        }

        let mut jacobi = Array2::<F>::zeros((n, n));
        for k in 0..n {
            jacobi[[k, k]] = self.alpha[k];
            if k + 1 < n {
                let off = self.beta[k + 1].sqrt();
                jacobi[[k, k + 1]] = off;
                jacobi[[k + 1, k]] = off;
            }
        }
        let (eigvals, eigvecs) = jacobi.eigh_into()?;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| {
            eigvals[i]
                .partial_cmp(&eigvals[j])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let nodes = order.iter().map(|&k| eigvals[k]).collect::<Array1<F>>();
        let weights = order
            .iter()
            .map(|&k| self.beta[0] * eigvecs[[0, k]] * eigvecs[[0, k]])
            .collect::<Array1<F>>();
        Ok((nodes, weights))
    }
}
