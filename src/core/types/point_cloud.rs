//! Organized depth point clouds.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::camera::CameraIntrinsics;

/// Rectangular pixel region of an organized cloud.
///
/// Chosen by the external visibility subsystem (one region per visible
/// face); half-open in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudRegion {
    /// Left edge (inclusive), in pixels.
    pub x: usize,
    /// Top edge (inclusive), in pixels.
    pub y: usize,
    /// Region width in pixels.
    pub width: usize,
    /// Region height in pixels.
    pub height: usize,
}

impl CloudRegion {
    /// Create a region from its top-left corner and size.
    #[inline]
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Organized point cloud from a depth sensor.
///
/// Width × height grid of camera-frame points; invalid returns (missing
/// depth, saturated pixels) are `None`. The grid layout is preserved so
/// faces can be sampled at a pixel stride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthCloud {
    points: Vec<Option<Point3<f64>>>,
    width: usize,
    height: usize,
}

impl DepthCloud {
    /// Create an empty cloud of the given dimensions (all points invalid).
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            points: vec![None; width * height],
            width,
            height,
        }
    }

    /// Create a cloud from a row-major grid of optional points.
    ///
    /// # Panics
    /// Panics if `points.len() != width * height`.
    pub fn from_points(points: Vec<Option<Point3<f64>>>, width: usize, height: usize) -> Self {
        assert_eq!(points.len(), width * height, "organized cloud size mismatch");
        Self {
            points,
            width,
            height,
        }
    }

    /// Back-project a row-major depth image (z in meters) into an
    /// organized cloud. Non-positive or non-finite depths become invalid
    /// points.
    ///
    /// # Panics
    /// Panics if `depths.len() != width * height`.
    pub fn from_depth_image(
        depths: &[f64],
        width: usize,
        height: usize,
        camera: &CameraIntrinsics,
    ) -> Self {
        assert_eq!(depths.len(), width * height, "depth image size mismatch");
        let points = depths
            .iter()
            .enumerate()
            .map(|(i, &z)| {
                if z.is_finite() && z > 0.0 {
                    let u = (i % width) as f64;
                    let v = (i / width) as f64;
                    Some(camera.back_project(u, v, z))
                } else {
                    None
                }
            })
            .collect();
        Self {
            points,
            width,
            height,
        }
    }

    /// Cloud width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cloud height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Point at pixel (x, y), if valid and in bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Point3<f64>> {
        if x < self.width && y < self.height {
            self.points[y * self.width + x]
        } else {
            None
        }
    }

    /// Mark the point at pixel (x, y).
    ///
    /// # Panics
    /// Panics if out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, point: Option<Point3<f64>>) {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.points[y * self.width + x] = point;
    }

    /// Collect the valid points of a region at the given pixel stride.
    ///
    /// The region is clamped to the cloud bounds; invalid points are
    /// skipped. A stride of 1 takes every pixel.
    pub fn sample_region(
        &self,
        region: &CloudRegion,
        step_x: usize,
        step_y: usize,
    ) -> Vec<Point3<f64>> {
        let step_x = step_x.max(1);
        let step_y = step_y.max(1);
        let x_end = (region.x + region.width).min(self.width);
        let y_end = (region.y + region.height).min(self.height);

        let mut samples = Vec::new();
        let mut y = region.y;
        while y < y_end {
            let mut x = region.x;
            while x < x_end {
                if let Some(p) = self.points[y * self.width + x] {
                    samples.push(p);
                }
                x += step_x;
            }
            y += step_y;
        }
        samples
    }
}
