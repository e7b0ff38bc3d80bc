use crate::errors::{Result, StudyError};
use crate::io;
use env_logger::{Builder, Env};
use linfa::ParamGuard;
use linfa::prelude::*;
use ndarray::{Array1, Array2};
use polychaos_doe::{Design, DesignBuilder};
use polychaos_pce::{PceParams, PolynomialChaos};
use polychaos_poly::{Basis, Distribution, Parameter, TruncationRule, unzip_parameters};
use rand_xoshiro::Xoshiro256Plus;
use std::path::Path;

/// Environment variable holding the log filter, `info` by default
pub const POLYCHAOS_LOG: &str = "POLYCHAOS_LOG";

/// Uncertainty quantification study of a simulator with uncertain parameters.
///
/// A study goes through the following steps:
/// 1. the polynomial basis is built from the parameters orders,
/// 2. a design is built (or loaded) and written for the simulator,
/// 3. simulator responses are read back and a polynomial chaos expansion is fitted,
/// 4. Sobol' indices are derived from the expansion.
///
/// ```no_run
/// use polychaos::{Parameter, TruncationRule, UqStudy};
///
/// let parameters = vec![Parameter::uniform(0.05, 0.15, 2).unwrap(); 15];
/// let mut study = UqStudy::new(parameters, TruncationRule::TotalOrder).unwrap();
/// study.design(42).unwrap();
/// study.write_design("design.csv").unwrap();
/// // ... run the simulator on each row of design.csv ...
/// study.fit_from_file("deflections.txt").unwrap();
/// println!("{:?}", study.sobol(1).unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct UqStudy {
    parameters: Vec<Parameter<f64>>,
    distributions: Vec<Distribution<f64>>,
    basis: Basis,
    weighted: bool,
    design: Option<Design<f64>>,
    model: Option<PolynomialChaos<f64>>,
}

impl UqStudy {
    /// Constructor of a study given uncertain parameters, the basis being
    /// truncated with the given rule from the parameters orders
    pub fn new(parameters: Vec<Parameter<f64>>, rule: TruncationRule) -> Result<Self> {
        let env = Env::new().filter_or(POLYCHAOS_LOG, "info");
        let mut builder = Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        let (distributions, orders) = unzip_parameters(&parameters);
        let basis = Basis::new(&orders, rule)?;
        log::info!(
            "Study of {} parameters with a basis of {} terms",
            parameters.len(),
            basis.len()
        );
        Ok(UqStudy {
            parameters,
            distributions,
            basis,
            weighted: false,
            design: None,
            model: None,
        })
    }

    /// Fit with design weights (e.g. quadrature weights) instead of ordinary least squares
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Uncertain parameters of the study
    pub fn parameters(&self) -> &[Parameter<f64>] {
        &self.parameters
    }

    /// Distributions of the parameters
    pub fn distributions(&self) -> &[Distribution<f64>] {
        &self.distributions
    }

    /// Polynomial basis truncated from the parameters orders
    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    /// Design builder of the study, with default settings and a random seed
    pub fn design_builder(&self) -> DesignBuilder<f64, Xoshiro256Plus> {
        DesignBuilder::new(&self.basis, &self.distributions)
    }

    /// Build the design with default settings and the given seed
    pub fn design(&mut self, seed: u64) -> Result<&Design<f64>> {
        self.design_with(|builder| builder.seed(seed))
    }

    /// Build the design with settings applied to the default builder
    pub fn design_with<F>(&mut self, settings: F) -> Result<&Design<f64>>
    where
        F: FnOnce(DesignBuilder<f64, Xoshiro256Plus>) -> DesignBuilder<f64, Xoshiro256Plus>,
    {
        let design = settings(self.design_builder()).build()?;
        Ok(self.set_design(design))
    }

    /// Use an existing design, any fitted surrogate is discarded
    pub fn set_design(&mut self, design: Design<f64>) -> &Design<f64> {
        self.model = None;
        self.design.insert(design)
    }

    /// Use a design previously written with [`UqStudy::write_design`], unweighted
    pub fn load_design<P: AsRef<Path>>(&mut self, path: P) -> Result<&Design<f64>> {
        let points = io::read_design_csv(path)?;
        if points.ncols() != self.basis.dimension() {
            return Err(polychaos_doe::DoeError::DimensionMismatch(format!(
                "design of dimension {} for {} parameters",
                points.ncols(),
                self.basis.dimension()
            ))
            .into());
        }
        Ok(self.set_design(Design::unweighted(points)))
    }

    /// Current design
    pub fn current_design(&self) -> Result<&Design<f64>> {
        self.design.as_ref().ok_or(StudyError::NoDesign)
    }

    /// Write the current design points as csv for the simulator
    pub fn write_design<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        io::write_design_csv(path, self.current_design()?.points())
    }

    /// Fit the surrogate on the current design given the simulator responses,
    /// replacing any previous surrogate
    pub fn fit(&mut self, responses: Array1<f64>) -> Result<&PolynomialChaos<f64>> {
        let design = self.current_design()?;
        io::check_alignment(design.points(), &responses)?;
        let params =
            PceParams::new(&self.distributions, self.basis.clone()).weighted(self.weighted);
        let model = if self.weighted {
            params
                .check()?
                .fit_weighted(design.points(), &responses, design.weights())?
        } else {
            params.fit(&Dataset::new(design.points().to_owned(), responses))?
        };
        log::info!(
            "Surrogate fitted: mean={}, variance={}",
            model.mean(),
            model.variance()
        );
        Ok(self.model.insert(model))
    }

    /// Fit the surrogate reading the responses from a file (see [`io::read_responses`])
    pub fn fit_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&PolynomialChaos<f64>> {
        let responses = io::read_responses(path)?;
        self.fit(responses)
    }

    /// Fitted surrogate
    pub fn model(&self) -> Result<&PolynomialChaos<f64>> {
        self.model.as_ref().ok_or(StudyError::NotFitted)
    }

    /// Predict with the fitted surrogate
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.model()?.predict(x)?)
    }

    /// Sobol' indices of every parameter subset of the given size, in canonical order
    pub fn sobol(&self, order: usize) -> Result<Vec<(Vec<usize>, f64)>> {
        Ok(self.model()?.sobol_order(order)?)
    }

    /// First order Sobol' indices, one per parameter
    pub fn first_order_sobol(&self) -> Result<Array1<f64>> {
        Ok(self.model()?.sobol_indices().first_order())
    }

    /// Total-effect Sobol' indices, one per parameter
    pub fn total_sobol(&self) -> Result<Array1<f64>> {
        Ok(self.model()?.total_sobol_indices())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quadratic_study() -> UqStudy {
        let parameters = vec![Parameter::uniform(-1., 1., 2).unwrap(); 2];
        UqStudy::new(parameters, TruncationRule::TotalOrder).unwrap()
    }

    #[test]
    fn test_not_fitted_and_no_design() {
        let mut study = quadratic_study();
        assert_eq!(study.basis().len(), 6);
        assert!(matches!(study.sobol(1), Err(StudyError::NotFitted)));
        assert!(matches!(
            study.fit(Array1::zeros(9)),
            Err(StudyError::NoDesign)
        ));
    }

    #[test]
    fn test_study_fit() {
        let mut study = quadratic_study();
        let xt = study.design(42).unwrap().points().to_owned();
        let yt = xt.column(0).mapv(|x| 3. * x + x * x);
        study.fit(yt).unwrap();
        let first = study.first_order_sobol().unwrap();
        assert_abs_diff_eq!(first[0], 1., epsilon = 1e-10);
        assert_abs_diff_eq!(first[1], 0., epsilon = 1e-10);
        let second = study.sobol(2).unwrap();
        assert_eq!(second[0].0, vec![0, 1]);
        assert_abs_diff_eq!(second[0].1, 0., epsilon = 1e-10);
    }

    #[test]
    fn test_weighted_fit_uses_design_weights() {
        let mut study = quadratic_study().weighted(true);
        let xt = study.design(3).unwrap().points().to_owned();
        let yt = xt.column(0).mapv(|x| 1. + x * x) + &xt.column(1);
        study.fit(yt).unwrap();
        let weights = study.current_design().unwrap().weights().clone();
        let model = study.model().unwrap();
        assert_eq!(model.training_weights(), Some(&weights));
        // E[1 + x1^2 + x2] = 4/3 for x ~ U[-1, 1]^2
        assert_abs_diff_eq!(model.mean(), 4. / 3., epsilon = 1e-10);
    }

    #[test]
    fn test_new_design_discards_model() {
        let mut study = quadratic_study().weighted(true);
        let xt = study.design(0).unwrap().points().to_owned();
        study.fit(xt.column(1).to_owned()).unwrap();
        assert!(study.model().is_ok());
        study.design(1).unwrap();
        assert!(matches!(study.model(), Err(StudyError::NotFitted)));
    }
}
