use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::SamplingMethod;
use crate::errors::{DoeError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, s};
use ndarray_rand::rand::{Rng, SeedableRng};
use polychaos_poly::Distribution;
use rand_xoshiro::Xoshiro256Plus;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

type RngRef<R> = Arc<RwLock<R>>;

/// Maximum number of random draws per requested point when drawing distinct grid points
const MAX_DRAWS_PER_POINT: usize = 100;

/// The QuadratureGrid design is the tensor product of the Gauss quadrature
/// nodes of each input distribution.
///
/// The grid size grows exponentially with the dimension (3 nodes in 15 dimensions
/// gives more than 14 million points), so points are addressed by their
/// per-dimension levels and drawn without enumerating the whole grid.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct QuadratureGrid<F: Float, R: Rng> {
    /// Distribution of each component of x
    distributions: Vec<Distribution<F>>,
    /// Gauss nodes of each component
    nodes: Vec<Array1<F>>,
    /// Gauss weights of each component
    weights: Vec<Array1<F>>,
    /// Random generator used for reproducibility
    rng: RngRef<R>,
}

impl<F: Float> QuadratureGrid<F, Xoshiro256Plus> {
    /// Constructor given the input distributions and the number of quadrature
    /// nodes for each of them.
    ///
    /// ```
    /// use polychaos_doe::QuadratureGrid;
    /// use polychaos_poly::Distribution;
    ///
    /// let u = Distribution::uniform(-1.0, 1.0).unwrap();
    /// let grid = QuadratureGrid::new(&[u, u], &[3, 2]).unwrap();
    /// assert_eq!(grid.grid_size(), Some(6));
    /// ```
    pub fn new(distributions: &[Distribution<F>], levels: &[usize]) -> Result<Self> {
        Self::new_with_rng(distributions, levels, Xoshiro256Plus::from_entropy())
    }
}

impl<F: Float, R: Rng> QuadratureGrid<F, R> {
    /// Constructor with given input distributions, number of nodes per component
    /// and random generator.
    pub fn new_with_rng(distributions: &[Distribution<F>], levels: &[usize], rng: R) -> Result<Self> {
        if distributions.len() != levels.len() {
            return Err(DoeError::DimensionMismatch(format!(
                "{} distributions given with {} node counts",
                distributions.len(),
                levels.len()
            )));
        }
        let (nodes, weights) = distributions
            .iter()
            .zip(levels.iter())
            .map(|(d, &n)| d.quadrature_rule(n))
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();
        Ok(QuadratureGrid {
            distributions: distributions.to_vec(),
            nodes,
            weights,
            rng: Arc::new(RwLock::new(rng)),
        })
    }

    /// Set the random generator
    pub fn with_rng<R2: Rng>(self, rng: R2) -> QuadratureGrid<F, R2> {
        QuadratureGrid {
            distributions: self.distributions,
            nodes: self.nodes,
            weights: self.weights,
            rng: Arc::new(RwLock::new(rng)),
        }
    }

    /// Gauss nodes of each component
    pub fn nodes(&self) -> &[Array1<F>] {
        &self.nodes
    }

    /// Number of points of the full grid, `None` when it overflows `usize`
    pub fn grid_size(&self) -> Option<usize> {
        self.nodes
            .iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(n.len()))
    }

    /// Per-component levels of the grid point at the given index.
    /// The first component varies the slowest.
    pub fn levels(&self, mut index: usize) -> Vec<usize> {
        let mut levels = vec![0; self.nodes.len()];
        for (j, n) in self.nodes.iter().enumerate().rev() {
            levels[j] = index % n.len();
            index /= n.len();
        }
        levels
    }

    /// Grid point and its quadrature weight given per-component levels
    pub fn point(&self, levels: &[usize]) -> (Array1<F>, F) {
        let x = levels
            .iter()
            .zip(self.nodes.iter())
            .map(|(&l, n)| n[l])
            .collect::<Array1<F>>();
        let w = levels
            .iter()
            .zip(self.weights.iter())
            .fold(F::one(), |acc, (&l, w)| acc * w[l]);
        (x, w)
    }

    /// Enumerate every point of the grid with its quadrature weight.
    ///
    /// Fails with [`DoeError::InfeasibleDesign`] when the grid size overflows.
    pub fn enumerate(&self) -> Result<(Array2<F>, Array1<F>)> {
        let nrows = self.grid_size().ok_or(DoeError::InfeasibleDesign {
            candidates: usize::MAX,
            required: usize::MAX,
        })?;
        let nx = self.nodes.len();
        let mut doe = Array2::<F>::zeros((nrows, nx));
        let mut weights = Array1::<F>::ones(nrows);

        let mut level_repeat = nrows;
        let mut range_repeat = 1;
        for j in 0..nx {
            let n = self.nodes[j].len();
            level_repeat /= n;
            let mut chunk = Array1::zeros(level_repeat * n);
            let mut wchunk = Array1::zeros(level_repeat * n);
            for i in 0..n {
                chunk
                    .slice_mut(s![i * level_repeat..(i + 1) * level_repeat])
                    .fill(self.nodes[j][i]);
                wchunk
                    .slice_mut(s![i * level_repeat..(i + 1) * level_repeat])
                    .fill(self.weights[j][i]);
            }
            for k in 0..range_repeat {
                let rows = n * level_repeat * k..n * level_repeat * (k + 1);
                doe.slice_mut(s![rows.clone(), j]).assign(&chunk);
                let mut w = weights.slice_mut(s![rows]);
                w *= &wchunk;
            }
            range_repeat *= n;
        }
        Ok((doe, weights))
    }

    /// Draw up to `ns` distinct grid points at random using the given random generator.
    /// The whole grid is returned when it has no more than `ns` points.
    pub fn draw_using<R2: Rng>(&self, ns: usize, rng: &mut R2) -> (Array2<F>, Array1<F>) {
        if let Some(size) = self.grid_size() {
            if size <= ns {
                if let Ok(all) = self.enumerate() {
                    return all;
                }
            }
        }
        let nx = self.nodes.len();
        let mut seen = HashSet::with_capacity(ns);
        let mut picked = Vec::with_capacity(ns);
        let mut draws = 0;
        while picked.len() < ns && draws < MAX_DRAWS_PER_POINT * ns {
            draws += 1;
            let levels = self
                .nodes
                .iter()
                .map(|n| rng.gen_range(0..n.len()))
                .collect::<Vec<_>>();
            if seen.insert(levels.clone()) {
                picked.push(levels);
            }
        }
        let mut doe = Array2::zeros((picked.len(), nx));
        let mut weights = Array1::zeros(picked.len());
        for (i, levels) in picked.iter().enumerate() {
            let (x, w) = self.point(levels);
            doe.row_mut(i).assign(&x);
            weights[i] = w;
        }
        (doe, weights)
    }
}

impl<F: Float, R: Rng> SamplingMethod<F> for QuadratureGrid<F, R> {
    fn distributions(&self) -> &[Distribution<F>] {
        &self.distributions
    }

    fn sample(&self, ns: usize) -> Array2<F> {
        let mut rng = self.rng.write().unwrap();
        self.draw_using(ns, &mut *rng).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_enumerate_grid() {
        let u = Distribution::uniform(5., 10.).unwrap();
        let v = Distribution::uniform(0., 1.).unwrap();
        let grid = QuadratureGrid::new(&[u, v], &[3, 1]).unwrap();
        let (doe, weights) = grid.enumerate().unwrap();
        let a = 2.5 * (3f64 / 5.).sqrt();
        let expected = array![[7.5 - a, 0.5], [7.5, 0.5], [7.5 + a, 0.5]];
        assert_abs_diff_eq!(expected, doe, epsilon = 1e-12);
        assert_abs_diff_eq!(weights, array![5. / 18., 8. / 18., 5. / 18.], epsilon = 1e-12);
    }

    #[test]
    fn test_enumerate_order_first_component_slowest() {
        let u = Distribution::uniform(-1., 1.).unwrap();
        let grid = QuadratureGrid::new(&[u, u, u], &[2, 2, 2]).unwrap();
        let (doe, weights) = grid.enumerate().unwrap();
        assert_eq!(doe.nrows(), 8);
        for i in 0..8 {
            let (x, w) = grid.point(&grid.levels(i));
            assert_abs_diff_eq!(doe.row(i), x.view(), epsilon = 1e-12);
            assert_abs_diff_eq!(weights[i], w, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(weights.sum(), 1., epsilon = 1e-12);
    }

    #[test]
    fn test_draw_distinct_points_in_large_grid() {
        let u = Distribution::uniform(-1., 1.).unwrap();
        let dists = vec![u; 15];
        let grid = QuadratureGrid::new(&dists, &[3; 15])
            .unwrap()
            .with_rng(Xoshiro256Plus::seed_from_u64(42));
        assert_eq!(grid.grid_size(), Some(14_348_907));
        let doe = grid.sample(500);
        assert_eq!(doe.dim(), (500, 15));
        let distinct: HashSet<Vec<u64>> = doe
            .rows()
            .into_iter()
            .map(|r| r.iter().map(|v: &f64| v.to_bits()).collect())
            .collect();
        assert_eq!(distinct.len(), 500);
    }

    #[test]
    fn test_draw_returns_whole_small_grid() {
        let u = Distribution::uniform(-1., 1.).unwrap();
        let grid = QuadratureGrid::new(&[u, u], &[3, 3]).unwrap();
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let (doe, _) = grid.draw_using(20, &mut rng);
        assert_eq!(doe.nrows(), 9);
    }

    #[test]
    fn test_mismatched_levels() {
        let u = Distribution::uniform(-1., 1.).unwrap();
        assert!(matches!(
            QuadratureGrid::new(&[u, u], &[3]),
            Err(DoeError::DimensionMismatch(_))
        ));
    }
}
