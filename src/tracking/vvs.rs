//! Weighted Gauss-Newton machinery for the VVS loop.

use nalgebra::{DMatrix, DVector, Matrix6, Vector6};

use super::error::{Result, TrackingError};
use super::robust::MadScratch;
use crate::core::types::Pose;
use crate::features::FaceFeatures;

/// Relative singular-value cutoff for the pseudo-inverse.
const SINGULAR_VALUE_CUTOFF: f64 = 1e-6;

/// Working buffers for one `track()` call.
///
/// Allocated per call and dropped with it; nothing leaks across calls.
/// The weight vector starts at all-ones (the first-iteration seed for
/// the M-estimator) and then carries weights between iterations.
pub(crate) struct VvsBuffers {
    pub jacobian: DMatrix<f64>,
    pub residuals: DVector<f64>,
    pub weights: DVector<f64>,
    pub scratch: MadScratch,
}

impl VvsBuffers {
    pub fn new(rows: usize) -> Self {
        Self {
            jacobian: DMatrix::zeros(rows, 6),
            residuals: DVector::zeros(rows),
            weights: DVector::from_element(rows, 1.0),
            scratch: MadScratch::default(),
        }
    }
}

/// Fill the residual vector and interaction matrix from all active faces
/// at the given pose. Rows are laid out in face order; the layout is
/// stable across iterations so weights keep their meaning.
pub(crate) fn build_system(
    faces: &[&dyn FaceFeatures],
    pose: &Pose,
    jacobian: &mut DMatrix<f64>,
    residuals: &mut DVector<f64>,
) {
    let mut row = 0;
    for face in faces {
        face.accumulate(pose, row, jacobian, residuals);
        row += face.feature_count();
    }
    debug_assert_eq!(row, jacobian.nrows());
}

/// Solve the weighted normal equations for a pose correction:
/// `Δ = (LᵀWL)⁺ LᵀW r`.
///
/// The pseudo-inverse uses an SVD with singular values below
/// [`SINGULAR_VALUE_CUTOFF`] of the largest treated as zero, so redundant
/// geometry (a single visible plane constrains only three of the six
/// degrees of freedom) yields the minimum-norm update instead of an
/// exploding one.
pub(crate) fn solve_update(
    jacobian: &DMatrix<f64>,
    residuals: &DVector<f64>,
    weights: &DVector<f64>,
) -> Result<Vector6<f64>> {
    let mut weight_sum = 0.0;
    let mut h = Matrix6::zeros();
    let mut g = Vector6::zeros();

    for i in 0..jacobian.nrows() {
        let w = weights[i];
        if w == 0.0 {
            continue;
        }
        weight_sum += w;

        let l = Vector6::new(
            jacobian[(i, 0)],
            jacobian[(i, 1)],
            jacobian[(i, 2)],
            jacobian[(i, 3)],
            jacobian[(i, 4)],
            jacobian[(i, 5)],
        );
        h += w * (l * l.transpose());
        g += (w * residuals[i]) * l;
    }

    if weight_sum <= f64::EPSILON {
        return Err(TrackingError::NumericalInstability(
            "all feature weights are zero",
        ));
    }

    let svd = h.svd(true, true);
    let cutoff = SINGULAR_VALUE_CUTOFF * svd.singular_values.max();
    let delta = svd
        .solve(&g, cutoff)
        .map_err(|_| TrackingError::NumericalInstability("pseudo-inverse failed"))?;

    if !delta.iter().all(|v| v.is_finite()) {
        return Err(TrackingError::NumericalInstability(
            "pose update is not finite",
        ));
    }

    Ok(delta)
}
