use crate::errors::{DoeError, Result};
use linfa::Float;
use linfa_linalg::{qr::*, svd::*};
use ndarray::{Array1, ArrayBase, Data, Ix2};

/// Singular values of a tall (n, p) matrix with `n >= p` computed from the
/// R factor of its QR decomposition.
pub fn singular_values<F: Float>(m: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
    if m.nrows() < m.ncols() {
        return Err(DoeError::IllConditioned(format!(
            "{} rows cannot determine {} unknowns",
            m.nrows(),
            m.ncols()
        )));
    }
    let (_, r) = m.to_owned().qr()?.into_decomp();
    let (_, sv, _) = r.svd(false, false)?;
    Ok(sv)
}

/// Smallest and largest singular values of a tall matrix
pub fn singular_value_range<F: Float>(
    m: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<(F, F)> {
    let sv = singular_values(m)?;
    if sv.iter().any(|s| !s.is_finite()) {
        return Err(DoeError::IllConditioned(
            "non finite singular values".to_string(),
        ));
    }
    let smin = sv.iter().fold(F::infinity(), |acc, &s| acc.min(s));
    let smax = sv.iter().fold(F::zero(), |acc, &s| acc.max(s));
    Ok((smin, smax))
}

/// Reciprocal condition number `smin / smax` of a tall matrix, 0 when singular
pub fn rcond<F: Float>(m: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<F> {
    if m.nrows() < m.ncols() {
        return Ok(F::zero());
    }
    match singular_value_range(m) {
        Ok((smin, smax)) if smax > F::zero() => Ok(smin / smax),
        Ok(_) | Err(DoeError::IllConditioned(_)) => Ok(F::zero()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_singular_value_range() {
        let m = array![[3., 0.], [0., 2.], [0., 0.]];
        let (smin, smax) = singular_value_range(&m).unwrap();
        assert_abs_diff_eq!(smin, 2., epsilon = 1e-12);
        assert_abs_diff_eq!(smax, 3., epsilon = 1e-12);
        assert_abs_diff_eq!(rcond(&m).unwrap(), 2. / 3., epsilon = 1e-12);
    }

    #[test]
    fn test_rank_deficient() {
        let m = array![[1., 2.], [2., 4.], [3., 6.]];
        assert!(rcond(&m).unwrap() < 1e-10);
    }

    #[test]
    fn test_wide_matrix() {
        let m = array![[1., 2., 3.]];
        assert!(matches!(
            singular_values(&m),
            Err(DoeError::IllConditioned(_))
        ));
    }
}
