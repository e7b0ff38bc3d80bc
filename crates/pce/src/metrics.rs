//! Predictivity metrics of polynomial chaos expansions by cross validation.
//!
//! The leave-one-out error of a least-squares expansion needs no refit: with
//! `W^1/2 M = QR` the thin QR decomposition of the (weighted) measurement matrix,
//! the prediction error at a left-out point `i` is `r_i / (1 - h_i)` where `r_i`
//! is its training residual and `h_i = |Q_i|^2` its leverage.

use crate::PolynomialChaos;
use crate::errors::{PceError, Result};
use linfa::Float;
use linfa_linalg::qr::*;
use ndarray::{ArrayBase, Axis, Data, Ix1};

/// Leverage above which a training point cannot be left out
const MAX_LEVERAGE: f64 = 1. - 1e-10;

/// A trait for Q2 predictive coefficient cross validation score
pub trait PredictScore<F: Float> {
    /// Compute quality metric Q2 with kfold cross validation,
    /// the model being refitted on every training fold
    fn q2_score(&self, kfold: usize) -> Result<F>;

    /// Q2 predictive coefficient with Leave-One-Out Cross-Validation
    fn looq2_score(&self) -> Result<F>;
}

impl<F: Float> PredictScore<F> for PolynomialChaos<F> {
    fn q2_score(&self, kfold: usize) -> Result<F> {
        let (xt, yt) = self.training_data();
        let n = yt.len();
        if kfold < 2 || kfold > n {
            return Err(PceError::InvalidValueError(format!(
                "`kfold` should be in [2, {n}], got {kfold}"
            )));
        }
        let tss = total_sum_of_squares(yt)?;
        // Predictive Residual Sum of Squares
        let mut press = F::zero();
        for k in 0..kfold {
            let (train, valid): (Vec<usize>, Vec<usize>) = (0..n).partition(|i| i % kfold != k);
            let weights = self
                .training_weights()
                .map(|w| w.select(Axis(0), &train));
            let model = self.params.fit_with(
                &xt.select(Axis(0), &train),
                &yt.select(Axis(0), &train),
                weights.as_ref(),
            )?;
            let pred = model.predict(&xt.select(Axis(0), &valid))?;
            press += (&yt.select(Axis(0), &valid) - &pred).mapv(|v| v * v).sum();
        }
        Ok(F::one() - press / tss)
    }

    fn looq2_score(&self) -> Result<F> {
        let (xt, yt) = self.training_data();
        if self.params.regularization > F::zero() {
            // leverages do not account for the ridge term
            return self.q2_score(yt.len());
        }
        let tss = total_sum_of_squares(yt)?;
        let mut m = self.basis().evaluate(xt, self.distributions())?;
        let residuals = yt - &m.dot(self.coefficients());
        if let Some(w) = self.training_weights() {
            let sw = w.mapv(|v| v.sqrt());
            m *= &sw.view().insert_axis(Axis(1));
        }
        let (q, _) = m.qr()?.into_decomp();
        let leverages = q.mapv(|v| v * v).sum_axis(Axis(1));

        let mut press = F::zero();
        for (i, (r, h)) in residuals.iter().zip(leverages.iter()).enumerate() {
            if *h > F::cast(MAX_LEVERAGE) {
                return Err(PceError::IllConditionedSystem(format!(
                    "training point {i} of leverage {h} cannot be left out"
                )));
            }
            let e = *r / (F::one() - *h);
            press += e * e;
        }
        Ok(F::one() - press / tss)
    }
}

fn total_sum_of_squares<F: Float>(y: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<F> {
    let mean = y.mean().unwrap_or(F::zero());
    let tss = y.mapv(|v| (v - mean) * (v - mean)).sum();
    if tss > F::zero() {
        Ok(tss)
    } else {
        Err(PceError::InvalidValueError(
            "Q2 is undefined for constant responses".to_string(),
        ))
    }
}
