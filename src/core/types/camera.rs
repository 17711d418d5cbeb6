//! Pinhole camera intrinsics.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Pinhole camera intrinsic parameters.
///
/// Used to project tracked geometry into the sensor image and to
/// back-project depth images into organized point clouds. Distortion is
/// assumed to be corrected upstream by the acquisition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in x, in pixels.
    pub fx: f64,
    /// Focal length in y, in pixels.
    pub fy: f64,
    /// Principal point x, in pixels.
    pub cx: f64,
    /// Principal point y, in pixels.
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create intrinsics from focal lengths and principal point.
    #[inline]
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Project a camera-frame point to pixel coordinates.
    ///
    /// Returns `None` for points at or behind the camera plane.
    #[inline]
    pub fn project(&self, point: &Point3<f64>) -> Option<(f64, f64)> {
        if point.z <= 0.0 {
            return None;
        }
        Some((
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        ))
    }

    /// Back-project a pixel at the given depth (z, meters) into the camera frame.
    #[inline]
    pub fn back_project(&self, u: f64, v: f64, depth: f64) -> Point3<f64> {
        Point3::new(
            (u - self.cx) / self.fx * depth,
            (v - self.cy) / self.fy * depth,
            depth,
        )
    }
}
