use linfa::Float;
use ndarray::Array2;
use polychaos_poly::Distribution;

/// Sampling method allowing to generate a DoE for a set of uncertain inputs
///
/// A sampling method is able to generate a set of `ns` samples of `x = (x_i)`
/// with i in [1, nx] where each component `x_i` follows its own distribution
/// and nx is the dimension of the sample space.
pub trait SamplingMethod<F: Float> {
    /// Returns the distributions of the input components
    fn distributions(&self) -> &[Distribution<F>];

    /// Generates a (ns, nx)-shaped array of samples
    ///
    /// # Parameters
    ///
    /// * `ns`: number of samples
    ///
    /// # Returns
    ///
    /// * A (ns, nx) matrix of samples where nx is the dimension of the sample space
    fn sample(&self, ns: usize) -> Array2<F>;

    /// Dimension of the sample space
    fn dim(&self) -> usize {
        self.distributions().len()
    }
}
