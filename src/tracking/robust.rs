//! Tukey M-estimator with a median-absolute-deviation scale.
//!
//! Produces per-feature weights in `[0, 1]` from raw residuals; weights
//! of zero mark hard-rejected outliers for the current iteration. The
//! weight vector doubles as input: a weight already at zero stays a
//! rejection candidate (one-sided hysteresis), which keeps outliers from
//! flickering back in across VVS iterations.

/// Tukey biweight tuning constant (~95% efficiency under Gaussian noise).
pub const TUKEY_CONSTANT: f64 = 4.6851;

/// MAD-to-standard-deviation scale for a normal distribution.
pub const MAD_SCALE: f64 = 1.4826;

/// Caller-owned scratch buffers for the two median computations.
///
/// Reset on every call; carries no state between calls. Owning it at the
/// call site (rather than hiding it in the estimator) keeps repeated
/// calls allocation-free without cross-call aliasing hazards.
#[derive(Debug, Clone, Default)]
pub struct MadScratch {
    residues: Vec<f64>,
    normres: Vec<f64>,
}

/// Median as the element at position `ceil(n/2) - 1` after a partial
/// order.
///
/// Not the interpolated median for even-length input; the cheaper
/// select-based approximation is intentional and part of the weight
/// semantics.
fn median_in_place(values: &mut [f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let index = (values.len() + 1) / 2 - 1;
    let (_, median, _) = values.select_nth_unstable_by(index, |a, b| a.total_cmp(b));
    *median
}

/// Compute Tukey biweight weights for a residual vector, in place.
///
/// `weights` carries the previous iteration's weights in and the new
/// weights out (seed with all-ones for a fresh estimation). The scale is
/// the median absolute deviation of the residuals, scaled by
/// [`MAD_SCALE`] and clamped from below by `noise_threshold`.
///
/// Per sample, with `u = |residual - median| / scale`:
/// - `scale == 0` and the prior weight is non-zero: weight 1 (degenerate
///   zero-noise configuration, no rejection this round);
/// - `|u| <= 4.6851` and the prior weight is non-zero:
///   `(1 - (u/4.6851)²)²`;
/// - otherwise 0. A weight zeroed in an earlier call stays zero until
///   the zero-scale branch reverts it.
///
/// Empty residuals are a no-op.
///
/// # Panics
/// Panics if `weights` is shorter than `residuals`.
pub fn tukey_weights(
    residuals: &[f64],
    weights: &mut [f64],
    noise_threshold: f64,
    scratch: &mut MadScratch,
) {
    if residuals.is_empty() {
        return;
    }
    assert!(
        weights.len() >= residuals.len(),
        "weight vector shorter than residual vector"
    );

    scratch.residues.clear();
    scratch.residues.extend_from_slice(residuals);
    let median = median_in_place(&mut scratch.residues);

    scratch.normres.clear();
    scratch
        .normres
        .extend(residuals.iter().map(|r| (r - median).abs()));

    scratch.residues.clear();
    scratch.residues.extend_from_slice(&scratch.normres);
    let normmedian = median_in_place(&mut scratch.residues);

    // 1.4826 keeps the scale estimate consistent with a normal
    // distribution's standard deviation.
    let mut sigma = MAD_SCALE * normmedian;
    if sigma < noise_threshold {
        sigma = noise_threshold;
    }

    psi_tukey(sigma, &scratch.normres, weights);
}

fn psi_tukey(sigma: f64, normres: &[f64], weights: &mut [f64]) {
    for (weight, &x) in weights.iter_mut().zip(normres) {
        // sigma can only be 0 when noise_threshold == 0; keep previously
        // accepted samples instead of dividing by zero.
        if sigma.abs() <= f64::EPSILON && weight.abs() > f64::EPSILON {
            *weight = 1.0;
            continue;
        }

        let u = x / sigma;
        if u.abs() <= TUKEY_CONSTANT && weight.abs() > f64::EPSILON {
            let t = 1.0 - (u / TUKEY_CONSTANT) * (u / TUKEY_CONSTANT);
            *weight = t * t;
        } else {
            // Outlier
            *weight = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn weigh(residuals: &[f64], noise_threshold: f64) -> Vec<f64> {
        let mut weights = vec![1.0; residuals.len()];
        let mut scratch = MadScratch::default();
        tukey_weights(residuals, &mut weights, noise_threshold, &mut scratch);
        weights
    }

    #[test]
    fn median_uses_lower_of_even_pair() {
        let mut values = [4.0, 1.0, 3.0, 2.0];
        // ceil(4/2) - 1 = 1: second smallest, not the 2.5 interpolation.
        assert_eq!(median_in_place(&mut values), 2.0);

        let mut values = [5.0, 1.0, 3.0];
        assert_eq!(median_in_place(&mut values), 3.0);
    }

    #[test]
    fn single_outlier_is_rejected() {
        let weights = weigh(&[0.01, 0.02, -0.01, 5.0], 0.001);
        assert!(weights[3].abs() < 1e-12, "outlier weight: {}", weights[3]);
        for &w in &weights[..3] {
            assert!(w > 0.8, "inlier weight too low: {}", w);
        }
    }

    #[test]
    fn zero_variance_clamps_to_noise_threshold() {
        // All-identical residuals give a MAD of exactly zero; the scale
        // must clamp instead of dividing by zero.
        let weights = weigh(&[0.5; 7], 0.01);
        for &w in &weights {
            assert_relative_eq!(w, 1.0);
        }
    }

    #[test]
    fn zero_scale_preserves_prior_nonzero_weights() {
        let residuals = [0.5; 4];
        let mut weights = vec![1.0, 0.25, 0.0, 1.0];
        let mut scratch = MadScratch::default();
        tukey_weights(&residuals, &mut weights, 0.0, &mut scratch);

        // Non-zero priors are kept at 1; a zeroed prior stays zero.
        assert_eq!(weights, vec![1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn zeroed_weight_is_sticky() {
        let mut weights = vec![1.0; 4];
        let mut scratch = MadScratch::default();

        tukey_weights(&[0.01, 0.02, -0.01, 5.0], &mut weights, 0.001, &mut scratch);
        assert!(weights[3].abs() < 1e-12);

        // Next iteration the residual has come back to the pack, but the
        // sample was already rejected: it stays out while scale > 0.
        tukey_weights(&[0.01, 0.02, -0.01, 0.015], &mut weights, 0.001, &mut scratch);
        assert_eq!(weights[3], 0.0);
        assert!(weights[0] > 0.8);
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut weights = vec![0.42];
        let mut scratch = MadScratch::default();
        tukey_weights(&[], &mut weights, 0.001, &mut scratch);
        assert_eq!(weights, vec![0.42]);
    }

    #[test]
    fn single_element_clamps_to_noise_threshold() {
        let weights = weigh(&[1.7], 0.05);
        assert_relative_eq!(weights[0], 1.0);
    }

    #[test]
    fn weights_stay_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let n = rng.gen_range(1..40);
            let residuals: Vec<f64> = (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect();
            let weights = weigh(&residuals, rng.gen_range(0.0..0.1));
            for &w in &weights {
                assert!((0.0..=1.0).contains(&w), "weight out of range: {}", w);
            }
        }
    }

    #[test]
    fn identical_calls_are_idempotent() {
        let residuals = [0.3, -0.2, 0.05, 1.4, -0.7];
        let priors = [1.0, 1.0, 0.5, 1.0, 0.0];

        let mut first = priors.to_vec();
        let mut second = priors.to_vec();
        let mut scratch = MadScratch::default();
        tukey_weights(&residuals, &mut first, 0.01, &mut scratch);
        tukey_weights(&residuals, &mut second, 0.01, &mut scratch);

        assert_eq!(first, second);
    }

    #[test]
    fn inliers_near_scale_get_partial_weight() {
        // A residual close to the rejection edge gets a small but
        // non-zero weight; well inside it stays near 1.
        let residuals = [0.0, 0.0, 0.0, 0.0, 0.0, 0.04];
        let weights = weigh(&residuals, 0.01);

        assert!(weights[5] > 0.0 && weights[5] < 0.5, "edge weight: {}", weights[5]);
        assert_relative_eq!(weights[0], 1.0);
    }
}
