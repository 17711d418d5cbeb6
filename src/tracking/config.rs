//! Tracker configuration.

use serde::{Deserialize, Serialize};

/// Which residual formulation to build per face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureMode {
    /// Dense point-to-plane distances (one feature per sampled point).
    #[default]
    DepthDense,
    /// Surface-normal consistency (four features per face).
    DepthNormal,
}

/// Configuration for the pose-refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum number of VVS iterations per `track()` call.
    pub max_iterations: u32,

    /// Convergence threshold on the norm of the applied pose update.
    pub convergence_threshold: f64,

    /// Gain applied to each pose update (1.0 = full Gauss-Newton step).
    pub gain: f64,

    /// Noise floor for the robust scale estimate, in residual units
    /// (meters for depth features).
    ///
    /// Keeps the M-estimator from over-rejecting once residuals reach
    /// the sensor noise level.
    pub noise_threshold: f64,

    /// Depth-cloud sampling stride in x (pixels).
    pub sampling_step_x: usize,

    /// Depth-cloud sampling stride in y (pixels).
    pub sampling_step_y: usize,

    /// Minimum planarity quality for an observed plane fit (normal mode).
    ///
    /// Faces whose fit scores below this are skipped for the frame.
    pub min_plane_quality: f64,

    /// Residual formulation to use.
    pub feature_mode: FeatureMode,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            convergence_threshold: 1e-6,
            gain: 1.0,
            noise_threshold: 1e-3, // ~1 mm depth noise
            sampling_step_x: 2,
            sampling_step_y: 2,
            min_plane_quality: 0.8,
            feature_mode: FeatureMode::DepthDense,
        }
    }
}
