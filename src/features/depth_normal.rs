//! Surface-normal features: orientation consistency per face.

use nalgebra::{DMatrix, DVector, Point3, Unit, Vector3};

use super::{write_row, FaceFeatures};
use crate::core::math::skew;
use crate::core::types::{CloudRegion, DepthCloud, Plane, Pose};

/// Number of scalar features a normal face contributes.
const FEATURES_PER_FACE: usize = 4;

/// A visible model face compared against the plane fitted to its
/// observed depth samples.
///
/// Contributes four features: the three components of the difference
/// between the predicted face normal and the observed one, plus the
/// signed distance of the observed centroid to the predicted plane. The
/// normal rows constrain orientation, the centroid row constrains
/// translation along the face normal.
#[derive(Debug, Clone)]
pub struct DepthNormalFace {
    plane: Plane,
    observed_normal: Unit<Vector3<f64>>,
    observed_centroid: Point3<f64>,
}

impl DepthNormalFace {
    /// Build a face from its object-frame plane and observed camera-frame
    /// samples.
    ///
    /// The observed plane is estimated by least squares; returns `None`
    /// when the fit is degenerate or its planarity quality falls below
    /// `min_quality` (occluded or noisy faces contribute nothing rather
    /// than a wrong orientation).
    pub fn from_samples(
        plane: Plane,
        samples: &[Point3<f64>],
        min_quality: f64,
    ) -> Option<Self> {
        let fit = Plane::fit(samples)?;
        if fit.quality < min_quality {
            return None;
        }
        Some(Self {
            plane,
            observed_normal: fit.plane.normal(),
            observed_centroid: fit.centroid,
        })
    }

    /// Sample a face region from an organized depth cloud and fit the
    /// observed plane; see [`DepthNormalFace::from_samples`].
    pub fn from_cloud(
        plane: Plane,
        cloud: &DepthCloud,
        region: &CloudRegion,
        step_x: usize,
        step_y: usize,
        min_quality: f64,
    ) -> Option<Self> {
        let samples = cloud.sample_region(region, step_x, step_y);
        Self::from_samples(plane, &samples, min_quality)
    }

    /// Object-frame plane of this face.
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Centroid of the observed samples, in the camera frame.
    pub fn observed_centroid(&self) -> Point3<f64> {
        self.observed_centroid
    }
}

impl FaceFeatures for DepthNormalFace {
    fn feature_count(&self) -> usize {
        FEATURES_PER_FACE
    }

    fn accumulate(
        &self,
        pose: &Pose,
        row0: usize,
        jacobian: &mut DMatrix<f64>,
        residuals: &mut DVector<f64>,
    ) {
        let predicted = self.plane.transformed(pose);
        let n = predicted.normal().into_inner();

        // A least-squares plane fit leaves the normal sign ambiguous;
        // align the observation to the predicted hemisphere.
        let mut observed = self.observed_normal.into_inner();
        if observed.dot(&n) < 0.0 {
            observed = -observed;
        }

        let s = skew(&n);
        for k in 0..3 {
            let row = row0 + k;
            residuals[row] = n[k] - observed[k];
            write_row(
                jacobian,
                row,
                &Vector3::zeros(),
                &Vector3::new(s[(k, 0)], s[(k, 1)], s[(k, 2)]),
            );
        }

        let row = row0 + 3;
        residuals[row] = predicted.signed_distance(&self.observed_centroid);
        write_row(
            jacobian,
            row,
            &n,
            &self.observed_centroid.coords.cross(&n),
        );
    }
}
