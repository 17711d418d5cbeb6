//! Dense depth features: point-to-plane residuals.

use nalgebra::{DMatrix, DVector, Point3};

use super::{write_row, FaceFeatures};
use crate::core::types::{CloudRegion, DepthCloud, Plane, Pose};

/// A visible model face with densely sampled depth observations.
///
/// The face is a plane in the object frame; the observations are
/// camera-frame points sampled from the depth cloud inside the face's
/// projected region. Each observed point contributes one feature: its
/// signed distance to the predicted plane, with interaction row
/// `[n | X × n]` for the camera-frame twist.
#[derive(Debug, Clone)]
pub struct DepthDenseFace {
    plane: Plane,
    points: Vec<Point3<f64>>,
}

impl DepthDenseFace {
    /// Create a face from its object-frame plane and observed camera-frame
    /// sample points.
    pub fn new(plane: Plane, points: Vec<Point3<f64>>) -> Self {
        Self { plane, points }
    }

    /// Sample a face from an organized depth cloud.
    ///
    /// `region` is the face's projected bounding region (chosen by the
    /// external visibility subsystem); sampling strides over it at
    /// `step_x`/`step_y` pixels. The face may come out with zero
    /// features, in which case the optimizer skips it.
    pub fn from_cloud(
        plane: Plane,
        cloud: &DepthCloud,
        region: &CloudRegion,
        step_x: usize,
        step_y: usize,
    ) -> Self {
        let points = cloud.sample_region(region, step_x, step_y);
        Self { plane, points }
    }

    /// Object-frame plane of this face.
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Observed sample points, in the camera frame.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }
}

impl FaceFeatures for DepthDenseFace {
    fn feature_count(&self) -> usize {
        self.points.len()
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

        for (k, point) in self.points.iter().enumerate() {
            let row = row0 + k;
            residuals[row] = predicted.signed_distance(point);
            write_row(jacobian, row, &n, &point.coords.cross(&n));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Vector3, Vector6};

    fn grid_on_z_plane(z: f64, extent: f64, n: usize) -> Vec<Point3<f64>> {
        let mut points = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let x = (i as f64 / (n - 1) as f64 - 0.5) * 2.0 * extent;
                let y = (j as f64 / (n - 1) as f64 - 0.5) * 2.0 * extent;
                points.push(Point3::new(x, y, z));
            }
        }
        points
    }

    #[test]
    fn residuals_vanish_at_true_pose() {
        let plane = Plane::new(Vector3::z(), -2.0);
        let face = DepthDenseFace::new(plane, grid_on_z_plane(2.0, 0.5, 4));

        let n = face.feature_count();
        let mut jacobian = DMatrix::zeros(n, 6);
        let mut residuals = DVector::zeros(n);
        face.accumulate(&Pose::identity(), 0, &mut jacobian, &mut residuals);

        assert_relative_eq!(residuals.amax(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn depth_offset_produces_uniform_residual() {
        let plane = Plane::new(Vector3::z(), -2.0);
        let face = DepthDenseFace::new(plane, grid_on_z_plane(2.0, 0.5, 4));

        // Estimate believes the object is 0.1 m further away.
        let pose = Pose::exp(&Vector6::new(0.0, 0.0, 0.1, 0.0, 0.0, 0.0));
        let n = face.feature_count();
        let mut jacobian = DMatrix::zeros(n, 6);
        let mut residuals = DVector::zeros(n);
        face.accumulate(&pose, 0, &mut jacobian, &mut residuals);

        for i in 0..n {
            assert_relative_eq!(residuals[i], -0.1, epsilon = 1e-12);
            // Row layout: [n | X × n] with n = +z.
            assert_relative_eq!(jacobian[(i, 2)], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn interaction_rows_match_numeric_derivative() {
        let plane = Plane::new(Vector3::new(0.2, -0.4, 1.0), -1.8);
        let face = DepthDenseFace::new(plane, grid_on_z_plane(2.0, 0.4, 3));
        let pose = Pose::exp(&Vector6::new(0.05, -0.02, 0.08, 0.04, 0.03, -0.06));

        let n = face.feature_count();
        let mut jacobian = DMatrix::zeros(n, 6);
        let mut residuals = DVector::zeros(n);
        face.accumulate(&pose, 0, &mut jacobian, &mut residuals);

        // Finite differences of r under pose <- exp(delta) ∘ pose must
        // match -L (the linearization convention is r(delta) ≈ r - L·delta).
        let eps = 1e-7;
        for dof in 0..6 {
            let mut twist = Vector6::zeros();
            twist[dof] = eps;
            let perturbed = pose.exp_update(&twist);

            let mut jac_p = DMatrix::zeros(n, 6);
            let mut res_p = DVector::zeros(n);
            face.accumulate(&perturbed, 0, &mut jac_p, &mut res_p);

            for i in 0..n {
                let numeric = (res_p[i] - residuals[i]) / eps;
                assert_relative_eq!(numeric, -jacobian[(i, dof)], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn from_cloud_respects_stride() {
        let plane = Plane::new(Vector3::z(), -1.0);
        let mut cloud = DepthCloud::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                cloud.set(x, y, Some(Point3::new(x as f64 * 0.01, y as f64 * 0.01, 1.0)));
            }
        }

        let region = CloudRegion::new(0, 0, 8, 8);
        let face = DepthDenseFace::from_cloud(plane, &cloud, &region, 4, 4);
        assert_eq!(face.feature_count(), 4);
    }
}
