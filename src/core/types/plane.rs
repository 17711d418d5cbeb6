//! 3D plane representation and least-squares plane fitting.

use nalgebra::{Matrix3, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use super::pose::Pose;

/// A plane in 3D space: `normal · X + offset = 0`, with unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    normal: Unit<Vector3<f64>>,
    offset: f64,
}

/// Result of a least-squares plane fit.
#[derive(Debug, Clone, Copy)]
pub struct PlaneFit {
    /// The fitted plane.
    pub plane: Plane,
    /// Centroid of the fitted samples.
    pub centroid: Point3<f64>,
    /// Planarity quality in [0, 1] (1.0 = perfectly planar samples).
    pub quality: f64,
}

impl Plane {
    /// Create a plane from a (not necessarily unit) normal and offset.
    ///
    /// The offset is rescaled together with the normal so the plane
    /// equation is preserved.
    pub fn new(normal: Vector3<f64>, offset: f64) -> Self {
        let norm = normal.norm();
        Self {
            normal: Unit::new_unchecked(normal / norm),
            offset: offset / norm,
        }
    }

    /// Plane through `point` with the given normal direction.
    pub fn from_point_normal(point: &Point3<f64>, normal: Vector3<f64>) -> Self {
        let normal = Unit::new_normalize(normal);
        let offset = -normal.dot(&point.coords);
        Self { normal, offset }
    }

    /// Unit normal of the plane.
    #[inline]
    pub fn normal(&self) -> Unit<Vector3<f64>> {
        self.normal
    }

    /// Plane offset (`normal · X + offset = 0`).
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Signed distance from a point to the plane.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.offset
    }

    /// Express a plane given in the object frame in the camera frame,
    /// using the camera-from-object pose.
    pub fn transformed(&self, pose: &Pose) -> Plane {
        let normal = pose.rotation * self.normal.into_inner();
        let offset = self.offset - normal.dot(&pose.translation);
        Plane {
            normal: Unit::new_unchecked(normal),
            offset,
        }
    }

    /// Least-squares plane fit through a set of points.
    ///
    /// Fits via the eigen-decomposition of the sample covariance: the
    /// normal is the eigenvector of the smallest eigenvalue. Quality is
    /// one minus the ratio of the smallest to the middle eigenvalue, so
    /// collinear or degenerate samples score near zero.
    ///
    /// Returns `None` for fewer than 3 points or a degenerate spread.
    pub fn fit(points: &[Point3<f64>]) -> Option<PlaneFit> {
        if points.len() < 3 {
            return None;
        }

        let n = points.len() as f64;
        let centroid = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / n;

        let mut cov = Matrix3::zeros();
        for p in points {
            let d = p.coords - centroid;
            cov += d * d.transpose();
        }

        let eigen = cov.symmetric_eigen();
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
        let [lo, mid, _] = order;

        let lambda_mid = eigen.eigenvalues[mid];
        if lambda_mid <= 1e-12 {
            // All samples collinear (or coincident): no unique plane.
            return None;
        }
        let quality = 1.0 - (eigen.eigenvalues[lo] / lambda_mid).max(0.0);

        let normal = Unit::new_normalize(eigen.eigenvectors.column(lo).into_owned());
        let centroid = Point3::from(centroid);
        let offset = -normal.dot(&centroid.coords);

        Some(PlaneFit {
            plane: Plane { normal, offset },
            centroid,
            quality,
        })
    }
}
