//! Per-face feature extraction: residuals and interaction-matrix rows.
//!
//! Each visible face of the tracked model contributes scalar residuals
//! and matching rows of the interaction (Jacobian) matrix relating the
//! residual to a 6-DOF camera-frame pose twist. Two residual
//! formulations exist behind the same trait:
//!
//! - [`DepthDenseFace`]: point-to-plane distance of every sampled depth
//!   point against the predicted model plane.
//! - [`DepthNormalFace`]: consistency between the predicted face normal
//!   and the plane fitted to the observed samples.
//!
//! The optimizer consumes both identically; which kind gets built per
//! face is a configuration choice.

mod depth_dense;
mod depth_normal;

pub use depth_dense::DepthDenseFace;
pub use depth_normal::DepthNormalFace;

use nalgebra::{DMatrix, DVector, Vector3};

use crate::core::types::Pose;

/// A face that can produce residuals and interaction-matrix rows at a
/// given pose.
///
/// Implementations append `feature_count()` consecutive rows starting at
/// `row0`; the buffers are sized by the optimizer before the call. A
/// face whose `feature_count()` is zero is skipped for the whole
/// `track()` call.
pub trait FaceFeatures {
    /// Number of scalar features this face currently contributes.
    fn feature_count(&self) -> usize;

    /// Write residuals and interaction rows for the current pose.
    fn accumulate(
        &self,
        pose: &Pose,
        row0: usize,
        jacobian: &mut DMatrix<f64>,
        residuals: &mut DVector<f64>,
    );
}

/// Write one interaction row `[linear | angular]`.
#[inline]
pub(crate) fn write_row(
    jacobian: &mut DMatrix<f64>,
    row: usize,
    linear: &Vector3<f64>,
    angular: &Vector3<f64>,
) {
    jacobian[(row, 0)] = linear.x;
    jacobian[(row, 1)] = linear.y;
    jacobian[(row, 2)] = linear.z;
    jacobian[(row, 3)] = angular.x;
    jacobian[(row, 4)] = angular.y;
    jacobian[(row, 5)] = angular.z;
}
