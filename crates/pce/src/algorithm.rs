use crate::errors::{PceError, Result};
use crate::parameters::{PceParams, PceValidParams};
use crate::sensitivity::SobolIndices;

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use linfa_linalg::{qr::*, svd::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, concatenate};
use polychaos_poly::{Basis, Distribution};

use log::{debug, info};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[cfg(feature = "persistent")]
use std::fs;
#[cfg(feature = "persistent")]
use std::io::Write;

/// A polynomial chaos expansion (PCE) represents the output of a model as
/// a linear combination of multivariate polynomials orthonormal with respect
/// to the joint distribution of the independent inputs:
///
/// ```text
/// y(x) = sum_k c_k psi_k(x)
/// ```
///
/// Coefficients `c_k` are fitted by least-squares regression on a design of
/// experiments. The orthonormality of the basis gives the statistics of the
/// output directly from the coefficients: the mean is the constant term
/// coefficient and the variance is the sum of the other squared coefficients,
/// which is further decomposed into Sobol' sensitivity indices.
///
/// # Example
///
/// ```
/// use polychaos_pce::PolynomialChaos;
/// use polychaos_poly::{Basis, Distribution, TruncationRule};
/// use linfa::prelude::*;
/// use ndarray::{Array1, array};
///
/// let u = Distribution::<f64>::uniform(-1.0, 1.0).unwrap();
/// let basis = Basis::build(1, 2, TruncationRule::TotalOrder).unwrap();
///
/// let xt = array![[-1.0], [-0.5], [0.0], [0.5], [1.0]];
/// let yt = xt.column(0).mapv(|x| 1.0 + 2.0 * x);
///
/// let pce = PolynomialChaos::params(&[u], basis)
///     .fit(&Dataset::new(xt, yt))
///     .expect("PCE fitted");
/// assert!((pce.mean() - 1.0).abs() < 1e-10);
/// assert!((pce.variance() - 4.0 / 3.0).abs() < 1e-10);
/// ```
#[derive(Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize",
        deserialize = "F: Deserialize<'de>"
    ))
)]
pub struct PolynomialChaos<F: Float> {
    /// Coefficients aligned with the basis terms
    coefficients: Array1<F>,
    /// Parameters used to fit this model
    pub(crate) params: PceValidParams<F>,
    /// Training data (input, output)
    pub(crate) training_data: (Array2<F>, Array1<F>),
    /// Weights of the training points, set by a weighted fit
    pub(crate) training_weights: Option<Array1<F>>,
    /// Sobol' decomposition computed on first request
    #[cfg_attr(feature = "serializable", serde(skip))]
    sobol: OnceLock<SobolIndices<F>>,
}

impl<F: Float> Clone for PolynomialChaos<F> {
    fn clone(&self) -> Self {
        Self {
            coefficients: self.coefficients.to_owned(),
            params: self.params.clone(),
            training_data: self.training_data.clone(),
            training_weights: self.training_weights.clone(),
            sobol: self.sobol.clone(),
        }
    }
}

impl<F: Float> fmt::Display for PolynomialChaos<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "PCE(basis={}, mean={}, variance={})",
            self.params.basis,
            self.mean(),
            self.variance(),
        )
    }
}

impl<F: Float> PolynomialChaos<F> {
    /// PCE parameters constructor
    pub fn params(distributions: &[Distribution<F>], basis: Basis) -> PceParams<F> {
        PceParams::new(distributions, basis)
    }

    /// Coefficients aligned with the basis terms
    pub fn coefficients(&self) -> &Array1<F> {
        &self.coefficients
    }

    /// Polynomial basis
    pub fn basis(&self) -> &Basis {
        &self.params.basis
    }

    /// Input distributions
    pub fn distributions(&self) -> &[Distribution<F>] {
        &self.params.distributions
    }

    /// Parameters used to fit the model
    pub fn params_used(&self) -> &PceValidParams<F> {
        &self.params
    }

    /// Training data (input, output)
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    /// Weights of the training points when fitted by weighted least squares
    pub fn training_weights(&self) -> Option<&Array1<F>> {
        self.training_weights.as_ref()
    }

    /// Mean of the output: coefficient of the constant term
    pub fn mean(&self) -> F {
        self.basis()
            .iter()
            .zip(self.coefficients.iter())
            .find(|(t, _)| t.is_constant())
            .map(|(_, c)| *c)
            .unwrap_or(F::zero())
    }

    /// Variance of the output: sum of the squared non-constant coefficients
    pub fn variance(&self) -> F {
        self.basis()
            .iter()
            .zip(self.coefficients.iter())
            .filter(|(t, _)| !t.is_constant())
            .fold(F::zero(), |acc, (_, c)| acc + *c * *c)
    }

    /// Standard deviation of the output
    pub fn std(&self) -> F {
        self.variance().sqrt()
    }

    /// Predict output values at n given `x` points of nx components specified as a (n, nx) matrix.
    /// Returns n scalar output values as a vector (n,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>) -> Result<Array1<F>> {
        if x.ncols() != self.basis().dimension() {
            return Err(PceError::DimensionMismatch(format!(
                "PCE of dimension {} predicted at points of dimension {}",
                self.basis().dimension(),
                x.ncols()
            )));
        }
        let m = self.basis().evaluate(x, self.distributions())?;
        Ok(m.dot(&self.coefficients))
    }

    /// Sobol' decomposition of the output variance, computed once per fitted model
    pub fn sobol_indices(&self) -> &SobolIndices<F> {
        self.sobol
            .get_or_init(|| SobolIndices::decompose(&self.coefficients, self.basis()))
    }

    /// Sobol' indices of every input subset of the given size in canonical order
    pub fn sobol_order(&self, order: usize) -> Result<Vec<(Vec<usize>, F)>> {
        self.sobol_indices().order(order)
    }

    /// Total-effect Sobol' indices, one per input
    pub fn total_sobol_indices(&self) -> Array1<F> {
        self.sobol_indices().total()
    }
}

#[cfg(feature = "persistent")]
impl<F: Float + Serialize + for<'de> Deserialize<'de>> PolynomialChaos<F> {
    /// Save the model in the given json file
    pub fn save(&self, path: &str) -> Result<()> {
        let mut file = fs::File::create(path)?;
        let bytes = serde_json::to_vec(self)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Load a model from the given json file
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read(path)?;
        let pce: PolynomialChaos<F> = serde_json::from_slice(&data)
            .map_err(|err| PceError::LoadError(err.to_string()))?;
        if pce.coefficients.len() != pce.params.basis.len() {
            return Err(PceError::LoadError(format!(
                "{} coefficients for a basis of {} terms",
                pce.coefficients.len(),
                pce.params.basis.len()
            )));
        }
        Ok(pce)
    }
}

impl<F, D> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for PolynomialChaos<F>
where
    F: Float,
    D: Data<Elem = F> + Sync,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("PCE prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

impl<F: Float, D: Data<Elem = F> + Sync> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, PceError>
    for PceValidParams<F>
{
    type Object = PolynomialChaos<F>;

    /// Fit PCE coefficients by least squares, using dataset weights when `weighted` is set
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let weights = if self.weighted {
            dataset
                .weights()
                .map(|w| w.iter().map(|v| F::cast(*v)).collect::<Array1<F>>())
        } else {
            None
        };
        self.fit_with(dataset.records(), dataset.targets(), weights.as_ref())
    }
}

impl<F: Float> PceValidParams<F> {
    /// Fit PCE coefficients by weighted least squares, rows being scaled by
    /// the square root of the given weights.
    pub fn fit_weighted(
        &self,
        x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        weights: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<PolynomialChaos<F>> {
        if weights.len() != x.nrows() {
            return Err(PceError::DimensionMismatch(format!(
                "{} weights given for {} design rows",
                weights.len(),
                x.nrows()
            )));
        }
        if weights.iter().any(|w| !(*w >= F::zero())) {
            return Err(PceError::InvalidValueError(
                "weights should be positive".to_string(),
            ));
        }
        self.fit_with(x, y, Some(&weights.to_owned()))
    }

    pub(crate) fn fit_with(
        &self,
        x: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
        weights: Option<&Array1<F>>,
    ) -> Result<PolynomialChaos<F>> {
        if x.nrows() != y.len() {
            return Err(PceError::SizeMismatch {
                rows: x.nrows(),
                responses: y.len(),
            });
        }
        if x.ncols() != self.basis.dimension() {
            return Err(PceError::DimensionMismatch(format!(
                "design of dimension {} for a basis of dimension {}",
                x.ncols(),
                self.basis.dimension()
            )));
        }
        let m = self.basis.evaluate(x, &self.distributions)?;
        let coefficients = least_squares(&m, y, weights, self.regularization, self.rcond)?;
        debug!("PCE coefficients: {coefficients}");

        let pce = PolynomialChaos {
            coefficients,
            params: self.clone(),
            training_data: (x.to_owned(), y.to_owned()),
            training_weights: weights.cloned(),
            sobol: OnceLock::new(),
        };
        info!(
            "PCE fitted on {} points with {} terms (mean={}, variance={})",
            x.nrows(),
            self.basis.len(),
            pce.mean(),
            pce.variance()
        );
        Ok(pce)
    }
}

/// Solve the (weighted, regularized) least-squares problem `min |W^1/2 (M c - y)|^2 + lambda |c|^2`
/// with a thin QR decomposition of the system matrix.
fn least_squares<F: Float>(
    m: &Array2<F>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    weights: Option<&Array1<F>>,
    regularization: F,
    rcond: F,
) -> Result<Array1<F>> {
    let mut a = m.to_owned();
    let mut b = y.to_owned();
    if let Some(w) = weights {
        let sw = w.mapv(|v| v.sqrt());
        a *= &sw.view().insert_axis(Axis(1));
        b *= &sw;
    }
    if regularization > F::zero() {
        let p = a.ncols();
        let ridge = Array2::<F>::eye(p).mapv(|v| v * regularization.sqrt());
        a = concatenate![Axis(0), a, ridge];
        b = concatenate![Axis(0), b, Array1::<F>::zeros(p)];
    }
    if a.nrows() < a.ncols() {
        return Err(PceError::IllConditionedSystem(format!(
            "{} equations for {} unknown coefficients",
            a.nrows(),
            a.ncols()
        )));
    }

    let (q, r) = a.qr()?.into_decomp();

    // Check whether we have an ill-conditionned problem
    let (_, sv, _) = r.svd(false, false)?;
    let smin = sv.iter().fold(F::infinity(), |acc, &s| acc.min(s));
    let smax = sv.iter().fold(F::zero(), |acc, &s| acc.max(s));
    let cond = if smax > F::zero() { smin / smax } else { F::zero() };
    if !(cond >= rcond) {
        return Err(PceError::IllConditionedSystem(format!(
            "reciprocal condition number {cond} is below {rcond}"
        )));
    }

    let rhs = q.t().dot(&b).insert_axis(Axis(1));
    let c = r.solve_triangular_into(rhs, UPLO::Upper)?;
    Ok(c.remove_axis(Axis(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Dataset;
    use linfa::ParamGuard;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;
    use polychaos_doe::{DesignBuilder, Random, SamplingMethod};
    use polychaos_poly::{MultiIndex, TruncationRule};
    use rand_xoshiro::Xoshiro256Plus;

    fn uniforms(d: usize) -> Vec<Distribution<f64>> {
        vec![Distribution::uniform(-1., 1.).unwrap(); d]
    }

    #[test]
    fn test_linear_plus_square_sobol() {
        let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
        let design = DesignBuilder::new(&basis, &uniforms(2))
            .seed(42)
            .build()
            .unwrap();
        let xt = design.points().to_owned();
        let yt = xt.column(0).mapv(|x| 3. * x + x * x);
        let pce = PolynomialChaos::params(&uniforms(2), basis)
            .fit(&Dataset::new(xt, yt))
            .expect("PCE fitted");

        // x^2 = 1/3 + 2/(3 sqrt(5)) psi_2(x) and x = psi_1(x) / sqrt(3)
        assert_abs_diff_eq!(pce.mean(), 1. / 3., epsilon = 1e-10);
        assert_abs_diff_eq!(pce.variance(), 3. + 4. / 45., epsilon = 1e-10);
        let sobol = pce.sobol_indices();
        assert_abs_diff_eq!(sobol.first_order(), array![1., 0.], epsilon = 1e-10);
        assert_abs_diff_eq!(sobol.get(&[0, 1]), 0., epsilon = 1e-10);
        assert_abs_diff_eq!(pce.total_sobol_indices(), array![1., 0.], epsilon = 1e-10);
    }

    #[test]
    fn test_size_mismatch() {
        let basis = Basis::build(3, 2, TruncationRule::TotalOrder).unwrap();
        let xt = Random::new(&uniforms(3))
            .with_rng(Xoshiro256Plus::seed_from_u64(42))
            .sample(100);
        let yt = Array1::<f64>::zeros(99);
        let res = PolynomialChaos::params(&uniforms(3), basis)
            .check()
            .unwrap()
            .fit_with(&xt, &yt, None);
        match res {
            Err(err @ PceError::SizeMismatch { .. }) => {
                assert_eq!(err.to_string(), "rows(design)=100 != len(responses)=99")
            }
            _ => panic!("size mismatch expected"),
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let basis = Basis::build(3, 1, TruncationRule::TotalOrder).unwrap();
        let xt = array![[0., 0.], [0.5, 0.5], [1., -1.], [-1., 1.], [0.2, 0.3]];
        let yt = array![0., 1., 2., 3., 4.];
        assert!(matches!(
            PolynomialChaos::params(&uniforms(3), basis)
                .check()
                .unwrap()
                .fit_with(&xt, &yt, None),
            Err(PceError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_underdetermined_system() {
        let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
        let xt = array![[0., 0.], [0.5, 0.5], [1., -1.]];
        let yt = array![0., 1., 2.];
        assert!(matches!(
            PolynomialChaos::params(&uniforms(2), basis).fit(&Dataset::new(xt, yt)),
            Err(PceError::IllConditionedSystem(_))
        ));
    }

    #[test]
    fn test_collinear_design_is_ill_conditioned() {
        // all points on the diagonal x1 = x2 cannot separate x1 from x2
        let basis = Basis::build(2, 1, TruncationRule::TotalOrder).unwrap();
        let xt = array![[-1., -1.], [0., 0.], [0.5, 0.5], [1., 1.]];
        let yt = array![0., 1., 2., 3.];
        assert!(matches!(
            PolynomialChaos::params(&uniforms(2), basis).fit(&Dataset::new(xt, yt)),
            Err(PceError::IllConditionedSystem(_))
        ));
    }

    #[test]
    fn test_polynomial_round_trip_and_idempotence() {
        let basis = Basis::build(3, 3, TruncationRule::TotalOrder).unwrap();
        let c = Array1::from_shape_fn(basis.len(), |k| (k as f64 * 0.37).sin());
        let design = DesignBuilder::new(&basis, &uniforms(3))
            .seed(0)
            .build()
            .unwrap();
        let xt = design.points().to_owned();
        let yt = basis.evaluate(&xt, &uniforms(3)).unwrap().dot(&c);
        let params = PolynomialChaos::params(&uniforms(3), basis).check().unwrap();
        let pce1 = params.fit(&Dataset::new(xt.clone(), yt.clone())).unwrap();
        let pce2 = params.fit(&Dataset::new(xt, yt)).unwrap();
        assert_abs_diff_eq!(pce1.coefficients(), &c, epsilon = 1e-10);
        assert_eq!(pce1.coefficients(), pce2.coefficients());
    }

    #[test]
    fn test_predict() {
        let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
        let design = DesignBuilder::new(&basis, &uniforms(2))
            .seed(1)
            .build()
            .unwrap();
        let f = |x: f64, y: f64| 1. + x - 2. * x * y + 0.5 * y * y;
        let xt = design.points().to_owned();
        let yt: Array1<f64> = xt.rows().into_iter().map(|r| f(r[0], r[1])).collect();
        let pce = PolynomialChaos::params(&uniforms(2), basis)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let x = array![[0.1, 0.2], [-0.7, 0.4]];
        let expected = array![f(0.1, 0.2), f(-0.7, 0.4)];
        assert_abs_diff_eq!(pce.predict(&x).unwrap(), expected, epsilon = 1e-10);
        let y: Array1<f64> = linfa::traits::Predict::predict(&pce, &x);
        assert_abs_diff_eq!(y, expected, epsilon = 1e-10);
        assert!(matches!(
            pce.predict(&array![[0.1, 0.2, 0.3]]),
            Err(PceError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_weighted_fit_on_quadrature_grid() {
        let u = Distribution::uniform(0., 2.).unwrap();
        let basis = Basis::build(1, 3, TruncationRule::TotalOrder).unwrap();
        let (xt, w) = u.quadrature_rule(4).unwrap();
        let xt = xt.insert_axis(Axis(1));
        let yt = xt.column(0).mapv(|x| x * x * x);
        let pce = PolynomialChaos::params(&[u], basis)
            .weighted(true)
            .check()
            .unwrap()
            .fit_weighted(&xt, &yt, &w)
            .unwrap();
        // E[x^3] = 2 for x ~ U[0, 2]
        assert_abs_diff_eq!(pce.mean(), 2., epsilon = 1e-10);
        assert_eq!(pce.training_weights(), Some(&w));
        let dataset = Dataset::new(xt.clone(), yt.clone())
            .with_weights(w.mapv(|v| v as f32));
        let pce2 = PolynomialChaos::params(&[u], pce.basis().clone())
            .weighted(true)
            .fit(&dataset)
            .unwrap();
        assert_abs_diff_eq!(pce2.mean(), 2., epsilon = 1e-5);
    }

    #[test]
    fn test_regularization_shrinks_coefficients() {
        let basis = Basis::build(2, 2, TruncationRule::TotalOrder).unwrap();
        let design = DesignBuilder::new(&basis, &uniforms(2))
            .seed(5)
            .build()
            .unwrap();
        let xt = design.points().to_owned();
        let yt = xt.column(0).mapv(|x| 2. * x);
        let ols = PolynomialChaos::params(&uniforms(2), basis.clone())
            .fit(&Dataset::new(xt.clone(), yt.clone()))
            .unwrap();
        let ridge = PolynomialChaos::params(&uniforms(2), basis)
            .regularization(1.)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let k = ols.basis().position(&MultiIndex::new(vec![1, 0])).unwrap();
        assert_abs_diff_eq!(ols.coefficients()[k], 2. / 3f64.sqrt(), epsilon = 1e-10);
        let norm = |c: &Array1<f64>| c.dot(c).sqrt();
        assert!(norm(ridge.coefficients()) < norm(ols.coefficients()));
    }

    #[test]
    fn test_sobol_cache() {
        let basis = Basis::build(2, 1, TruncationRule::TotalOrder).unwrap();
        let xt = array![[-1., -1.], [1., -1.], [-1., 1.], [1., 1.]];
        let yt = array![0., 2., 1., 3.];
        let pce = PolynomialChaos::params(&uniforms(2), basis)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let s1 = pce.sobol_indices() as *const SobolIndices<f64>;
        let s2 = pce.sobol_indices() as *const SobolIndices<f64>;
        assert_eq!(s1, s2);
        assert_abs_diff_eq!(pce.sobol_indices().first_order().sum(), 1., epsilon = 1e-12);
        assert_eq!(pce.sobol_order(1).unwrap().len(), 2);
    }

    #[cfg(feature = "persistent")]
    #[test]
    fn test_save_load() {
        let basis = Basis::build(2, 1, TruncationRule::TotalOrder).unwrap();
        let xt = array![[-1., -1.], [1., -1.], [-1., 1.], [1., 1.]];
        let yt = array![0., 2., 1., 3.];
        let pce = PolynomialChaos::params(&uniforms(2), basis)
            .fit(&Dataset::new(xt, yt))
            .unwrap();
        let path = std::env::temp_dir().join("polychaos_pce_save_load.json");
        let path = path.to_str().unwrap();
        pce.save(path).expect("PCE saving");
        let loaded = PolynomialChaos::<f64>::load(path).expect("PCE loading");
        assert_eq!(pce.coefficients(), loaded.coefficients());
        assert_abs_diff_eq!(
            pce.sobol_indices().total(),
            loaded.sobol_indices().total(),
            epsilon = 1e-12
        );
    }
}
