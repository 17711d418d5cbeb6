//! Math primitives shared across the tracker.

use nalgebra::{Matrix3, Vector3};

/// Skew-symmetric (cross-product) matrix of a 3-vector.
///
/// `skew(a) * b == a.cross(&b)` for all `b`.
///
/// # Example
/// ```
/// use drishti_track::core::math::skew;
/// use nalgebra::Vector3;
///
/// let a = Vector3::new(1.0, 2.0, 3.0);
/// let b = Vector3::new(-0.5, 0.25, 4.0);
/// assert!((skew(&a) * b - a.cross(&b)).norm() < 1e-12);
/// ```
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skew_is_antisymmetric() {
        let m = skew(&Vector3::new(0.3, -1.2, 2.5));
        assert_eq!(m + m.transpose(), Matrix3::zeros());
    }

    #[test]
    fn skew_matches_cross_product() {
        let a = Vector3::new(0.1, 0.2, 0.3);
        let b = Vector3::new(-1.0, 0.5, 2.0);
        assert!((skew(&a) * b - a.cross(&b)).norm() < 1e-15);
    }
}
