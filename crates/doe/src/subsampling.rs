use crate::errors::{DoeError, Result};
use crate::utils::singular_value_range;
use linfa::Float;
use ndarray::{Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_rand::rand::seq::index;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use rayon::prelude::*;

/// Relative squared residual norm below which a candidate adds no new direction
const RESIDUAL_TOL: f64 = 1e-12;

/// Smallest singular value of the rows `indices` of the measurement matrix,
/// 0 when it cannot be computed.
fn subset_criterion<F: Float>(m: &ArrayBase<impl Data<Elem = F>, Ix2>, indices: &[usize]) -> F {
    match singular_value_range(&m.select(Axis(0), indices)) {
        Ok((smin, _)) if smin.is_finite() => smin,
        _ => F::zero(),
    }
}

/// Random search of the subset of `rows` candidates maximizing the smallest
/// singular value of the corresponding measurement matrix rows.
///
/// Each of the `max_iters` trials draws its subset from its own generator seeded
/// by `rng`, so trials run in parallel while the result only depends on `rng`.
/// Ties are resolved in favor of the earliest trial.
///
/// Returns the selected candidate indices in ascending order and the criterion value.
pub fn random_search<F: Float, R: Rng>(
    m: &ArrayBase<impl Data<Elem = F> + Sync, Ix2>,
    rows: usize,
    max_iters: usize,
    rng: &mut R,
) -> Result<(Vec<usize>, F)> {
    let n = m.nrows();
    if rows > n {
        return Err(DoeError::InfeasibleDesign {
            candidates: n,
            required: rows,
        });
    }
    let seeds = (0..max_iters.max(1))
        .map(|_| rng.r#gen::<u64>())
        .collect::<Vec<_>>();

    let best = seeds
        .into_par_iter()
        .enumerate()
        .map(|(i, seed)| {
            let mut trial_rng = Xoshiro256Plus::seed_from_u64(seed);
            let mut indices = index::sample(&mut trial_rng, n, rows).into_vec();
            indices.sort_unstable();
            let crit = subset_criterion(m, &indices);
            (i, indices, crit)
        })
        .reduce_with(|a, b| {
            if b.2 > a.2 || (b.2 == a.2 && b.0 < a.0) {
                b
            } else {
                a
            }
        });

    match best {
        Some((i, indices, crit)) => {
            log::debug!("Random subsampling: best smallest singular value {crit} at trial {i}");
            Ok((indices, crit))
        }
        None => Err(DoeError::InfeasibleDesign {
            candidates: n,
            required: rows,
        }),
    }
}

/// Greedy selection of `rows` candidates with a column-pivoted Gram-Schmidt
/// process on the transposed measurement matrix: at each step the candidate
/// whose row has the largest residual norm once projected out of the span
/// of the already selected rows is picked.
///
/// A pass stops when the selected rows span the whole basis; then a new pass
/// starts from scratch on the remaining candidates until `rows` candidates are
/// selected.
///
/// Returns the selected candidate indices in ascending order.
pub fn pivoted_qr<F: Float>(
    m: &ArrayBase<impl Data<Elem = F>, Ix2>,
    rows: usize,
) -> Result<Vec<usize>> {
    let n = m.nrows();
    if rows > n {
        return Err(DoeError::InfeasibleDesign {
            candidates: n,
            required: rows,
        });
    }
    let mut used = vec![false; n];
    let mut selected = Vec::with_capacity(rows);

    while selected.len() < rows {
        let remaining = (0..n).filter(|&i| !used[i]).collect::<Vec<_>>();
        let mut residuals: Array2<F> = m.select(Axis(0), &remaining);
        let scale = residuals
            .map_axis(Axis(1), |r| r.dot(&r))
            .max()
            .map(|v| *v)
            .unwrap_or(F::zero());
        if scale <= F::zero() {
            break;
        }
        let tol = scale * F::cast(RESIDUAL_TOL);
        let mut picked_in_pass = 0;
        while selected.len() < rows && picked_in_pass < m.ncols() {
            let norms = residuals.map_axis(Axis(1), |r| r.dot(&r));
            let k = match norms.argmax() {
                Ok(k) => k,
                Err(_) => break,
            };
            if norms[k] <= tol {
                break;
            }
            let q = residuals.row(k).mapv(|v| v / norms[k].sqrt());
            let proj = residuals.dot(&q);
            for (mut r, p) in residuals.rows_mut().into_iter().zip(proj.iter()) {
                r.scaled_add(-*p, &q);
            }
            residuals.row_mut(k).fill(F::zero());
            used[remaining[k]] = true;
            selected.push(remaining[k]);
            picked_in_pass += 1;
        }
        log::debug!(
            "QR subsampling pass: {} candidates selected ({}/{})",
            picked_in_pass,
            selected.len(),
            rows
        );
        if picked_in_pass == 0 {
            break;
        }
    }

    if selected.len() < rows {
        return Err(DoeError::InfeasibleDesign {
            candidates: n,
            required: rows,
        });
    }
    selected.sort_unstable();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_random_search_picks_well_conditioned_subset() {
        // rows 1 and 2 are collinear, any subset including both is singular
        let m = array![[1., 0.], [0., 1.], [0., 2.], [1., 1.]];
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let (indices, crit) = random_search(&m, 2, 50, &mut rng).unwrap();
        assert_eq!(indices.len(), 2);
        assert_ne!(indices, vec![1, 2]);
        assert!(crit > 0.);
    }

    #[test]
    fn test_random_search_is_reproducible() {
        let m = Array2::from_shape_fn((30, 4), |(i, j)| ((i * 7 + j * 3) % 11) as f64 - 5.);
        let mut rng1 = Xoshiro256Plus::seed_from_u64(0);
        let mut rng2 = Xoshiro256Plus::seed_from_u64(0);
        let r1 = random_search(&m, 8, 20, &mut rng1).unwrap();
        let r2 = random_search(&m, 8, 20, &mut rng2).unwrap();
        assert_eq!(r1.0, r2.0);
        assert_abs_diff_eq!(r1.1, r2.1);
    }

    #[test]
    fn test_random_search_too_many_rows() {
        let m = array![[1., 0.], [0., 1.]];
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        assert!(matches!(
            random_search(&m, 3, 10, &mut rng),
            Err(DoeError::InfeasibleDesign {
                candidates: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn test_pivoted_qr_skips_collinear_candidates() {
        let m = array![[0., 1.], [0., 2.], [3., 0.], [0.5, 0.5]];
        let selected = pivoted_qr(&m, 2).unwrap();
        assert_eq!(selected, vec![1, 2]);
    }

    #[test]
    fn test_pivoted_qr_restarts_passes() {
        let m = array![[0., 1.], [0., 2.], [3., 0.], [0.5, 0.5]];
        // second pass on candidates 0 and 3 once 1 and 2 are taken
        let selected = pivoted_qr(&m, 3).unwrap();
        assert_eq!(selected, vec![0, 1, 2]);
        assert_eq!(pivoted_qr(&m, 4).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pivoted_qr_rank_deficient_pool() {
        let m = array![[1., 0.], [2., 0.], [0., 0.]];
        assert!(matches!(
            pivoted_qr(&m, 3),
            Err(DoeError::InfeasibleDesign { .. })
        ));
    }
}
