use crate::errors::{PceError, Result};
use linfa::{Float, ParamGuard};
use polychaos_poly::{Basis, Distribution, Parameter, TruncationRule, unzip_parameters};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Default threshold on the reciprocal condition number of the least-squares system
pub const PCE_RCOND_MIN: f64 = 1e-10;

/// A set of validated polynomial chaos parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize",
        deserialize = "F: Deserialize<'de>"
    ))
)]
pub struct PceValidParams<F: Float> {
    /// Distribution of each input
    pub(crate) distributions: Vec<Distribution<F>>,
    /// Polynomial basis of the expansion
    pub(crate) basis: Basis,
    /// Whether dataset weights are used in the least-squares fit
    pub(crate) weighted: bool,
    /// Ridge regularization factor
    pub(crate) regularization: F,
    /// Minimum reciprocal condition number of the least-squares system
    pub(crate) rcond: F,
}

impl<F: Float> PceValidParams<F> {
    /// Get input distributions
    pub fn distributions(&self) -> &[Distribution<F>] {
        &self.distributions
    }

    /// Get the polynomial basis
    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    /// Whether dataset weights are used
    pub fn weighted(&self) -> bool {
        self.weighted
    }

    /// Get ridge regularization factor
    pub fn regularization(&self) -> F {
        self.regularization
    }

    /// Get the reciprocal condition number threshold
    pub fn rcond(&self) -> F {
        self.rcond
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the fit of
/// a [polynomial chaos expansion](crate::PolynomialChaos).
pub struct PceParams<F: Float>(PceValidParams<F>);

impl<F: Float> PceParams<F> {
    /// A constructor for PCE parameters given input distributions and basis
    pub fn new(distributions: &[Distribution<F>], basis: Basis) -> PceParams<F> {
        Self(PceValidParams {
            distributions: distributions.to_vec(),
            basis,
            weighted: false,
            regularization: F::zero(),
            rcond: F::cast(PCE_RCOND_MIN),
        })
    }

    /// A constructor building the basis from the parameters orders under the given rule
    pub fn from_parameters(parameters: &[Parameter<F>], rule: TruncationRule) -> Result<Self> {
        let (distributions, orders) = unzip_parameters(parameters);
        let basis = Basis::new(&orders, rule)?;
        Ok(Self::new(&distributions, basis))
    }

    /// A constructor for PCE parameters from validated parameters
    pub fn new_from_valid(params: &PceValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Use dataset weights (e.g. quadrature weights of the design) in the fit
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.0.weighted = weighted;
        self
    }

    /// Set ridge regularization factor, 0 means ordinary least squares
    pub fn regularization(mut self, regularization: F) -> Self {
        self.0.regularization = regularization;
        self
    }

    /// Set the reciprocal condition number below which the fit is rejected
    pub fn rcond(mut self, rcond: F) -> Self {
        self.0.rcond = rcond;
        self
    }
}

impl<F: Float> From<PceValidParams<F>> for PceParams<F> {
    fn from(valid: PceValidParams<F>) -> Self {
        PceParams(valid)
    }
}

impl<F: Float> ParamGuard for PceParams<F> {
    type Checked = PceValidParams<F>;
    type Error = PceError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.basis.dimension() != self.0.distributions.len() {
            return Err(PceError::DimensionMismatch(format!(
                "basis of dimension {} with {} distributions",
                self.0.basis.dimension(),
                self.0.distributions.len()
            )));
        }
        if !self.0.regularization.is_finite() || self.0.regularization < F::zero() {
            return Err(PceError::InvalidValueError(format!(
                "`regularization` should be positive, got {}",
                self.0.regularization
            )));
        }
        if !(self.0.rcond >= F::zero() && self.0.rcond < F::one()) {
            return Err(PceError::InvalidValueError(format!(
                "`rcond` should be in [0, 1), got {}",
                self.0.rcond
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_checks() {
        let u = Distribution::uniform(-1., 1.).unwrap();
        let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
        assert!(PceParams::new(&[u, u], basis.clone()).check_ref().is_ok());
        assert!(matches!(
            PceParams::new(&[u], basis.clone()).check(),
            Err(PceError::DimensionMismatch(_))
        ));
        assert!(matches!(
            PceParams::new(&[u, u], basis.clone())
                .regularization(-1.)
                .check(),
            Err(PceError::InvalidValueError(_))
        ));
        assert!(matches!(
            PceParams::new(&[u, u], basis).rcond(1.5).check(),
            Err(PceError::InvalidValueError(_))
        ));
    }

    #[test]
    fn test_from_parameters() {
        let params = [
            Parameter::uniform(0., 1., 3).unwrap(),
            Parameter::normal(0., 1., 1).unwrap(),
        ];
        let checked = PceParams::from_parameters(&params, TruncationRule::TotalOrder)
            .unwrap()
            .check()
            .unwrap();
        assert_eq!(checked.basis().orders(), &[3, 1]);
        assert_eq!(checked.distributions().len(), 2);
        assert!(!checked.weighted());
    }
}
