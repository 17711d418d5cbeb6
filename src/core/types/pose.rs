//! Rigid-body pose for 6-DOF tracking.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::core::math::skew;

/// Rigid transform from object frame to camera frame (camera-from-object).
///
/// Six degrees of freedom: three of translation, three of rotation.
/// Updates during optimization go through [`Pose::exp_update`] so the
/// estimate stays on the SE(3) manifold; components are never added
/// element-wise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Rotation part (unit quaternion).
    pub rotation: UnitQuaternion<f64>,
    /// Translation part in meters.
    pub translation: Vector3<f64>,
}

impl Pose {
    /// Create a pose from rotation and translation.
    #[inline]
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Identity pose.
    #[inline]
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Compose two poses: `self ∘ other` (apply `other` first, then `self`).
    ///
    /// # Example
    /// ```
    /// use drishti_track::Pose;
    ///
    /// let p = Pose::exp(&nalgebra::Vector6::new(0.1, -0.2, 0.3, 0.02, 0.01, -0.03));
    /// let roundtrip = p.compose(&p.inverse());
    /// assert!(roundtrip.log().norm() < 1e-12);
    /// ```
    #[inline]
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: self.rotation * other.rotation,
            translation: self.translation + self.rotation * other.translation,
        }
    }

    /// Inverse of this pose.
    #[inline]
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Transform a point from object frame to camera frame.
    #[inline]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.rotation.transform_point(point) + self.translation
    }

    /// Rotate a direction vector from object frame to camera frame.
    #[inline]
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * vector
    }

    /// Exponential map from a twist `[v, ω]` (linear first, angular second)
    /// to a rigid transform.
    pub fn exp(twist: &Vector6<f64>) -> Pose {
        let v = Vector3::new(twist[0], twist[1], twist[2]);
        let w = Vector3::new(twist[3], twist[4], twist[5]);
        let theta = w.norm();

        let rotation = UnitQuaternion::from_scaled_axis(w);
        let translation = if theta < 1e-9 {
            v
        } else {
            let wx = skew(&w);
            let a = (1.0 - theta.cos()) / (theta * theta);
            let b = (theta - theta.sin()) / (theta * theta * theta);
            (Matrix3::identity() + a * wx + b * (wx * wx)) * v
        };

        Pose {
            rotation,
            translation,
        }
    }

    /// Logarithm map: the twist `[v, ω]` such that `Pose::exp(log) == self`.
    pub fn log(&self) -> Vector6<f64> {
        let w = self.rotation.scaled_axis();
        let theta = w.norm();
        let t = self.translation;

        let v = if theta < 1e-9 {
            t
        } else {
            let wx = skew(&w);
            let coeff = (1.0 - (theta * theta.sin()) / (2.0 * (1.0 - theta.cos())))
                / (theta * theta);
            (Matrix3::identity() - 0.5 * wx + coeff * (wx * wx)) * t
        };

        Vector6::new(v.x, v.y, v.z, w.x, w.y, w.z)
    }

    /// Apply a camera-frame twist update: `exp(twist) ∘ self`.
    ///
    /// This is the left-multiplicative update used by the optimizer; the
    /// twist lives in the camera frame.
    #[inline]
    pub fn exp_update(&self, twist: &Vector6<f64>) -> Pose {
        Pose::exp(twist).compose(self)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
