//! Robust 6-DOF pose refinement: the virtual visual servoing (VVS) loop.
//!
//! One [`DepthTracker::track`] call refines a pose estimate against the
//! currently visible faces:
//!
//! 1. collect the residual vector and interaction matrix from all active
//!    faces at the current pose,
//! 2. re-weight the residuals with the Tukey M-estimator (seeded with
//!    the previous iteration's weights),
//! 3. solve the weighted normal equations through an SVD pseudo-inverse,
//! 4. compose the correction onto the pose via the exponential map,
//! 5. repeat until the update norm drops below the convergence threshold
//!    or the iteration budget runs out.
//!
//! The loop is synchronous and single-threaded; all working state lives
//! in per-call buffers.

mod config;
mod error;
pub mod robust;
mod vvs;

pub use config::{FeatureMode, TrackerConfig};
pub use error::{Result, TrackingError};
pub use robust::{tukey_weights, MadScratch, MAD_SCALE, TUKEY_CONSTANT};

use log::{debug, trace};
use nalgebra::DVector;

use crate::core::types::{CloudRegion, DepthCloud, Plane, Pose};
use crate::features::{DepthDenseFace, DepthNormalFace, FaceFeatures};

/// Outcome of a successful `track()` call.
#[derive(Debug, Clone)]
pub struct TrackResult {
    /// Refined camera-from-object pose.
    pub pose: Pose,

    /// Residual vector evaluated at the refined pose (one entry per
    /// feature, in face order).
    pub residuals: DVector<f64>,

    /// Final robust weights, aligned with `residuals`. Zero marks a
    /// feature rejected as an outlier.
    pub weights: DVector<f64>,

    /// Whether the update norm fell below the convergence threshold
    /// (false means the iteration budget ran out first).
    pub converged: bool,

    /// Number of iterations performed.
    pub iterations: u32,

    /// Weight-averaged mean squared residual at the refined pose.
    pub mse: f64,
}

/// Model-based 6-DOF pose tracker over depth features.
///
/// The tracker owns only its configuration; visibility, model geometry
/// and depth acquisition belong to external collaborators, which hand in
/// one [`FaceFeatures`] provider per visible face.
///
/// # Example
/// ```
/// use drishti_track::{DepthTracker, DepthDenseFace, FaceFeatures, Plane, Pose, TrackerConfig};
/// use nalgebra::{Point3, Vector3, Vector6};
///
/// // A 4x4 patch of depth samples on the plane z = 2.
/// let mut points = Vec::new();
/// for i in 0..4 {
///     for j in 0..4 {
///         points.push(Point3::new(i as f64 * 0.1, j as f64 * 0.1, 2.0));
///     }
/// }
/// let face = DepthDenseFace::new(Plane::new(Vector3::z(), -2.0), points);
///
/// // Start 5 cm off in depth; the optimizer pulls the pose back.
/// let initial = Pose::exp(&Vector6::new(0.0, 0.0, 0.05, 0.0, 0.0, 0.0));
/// let faces: Vec<&dyn FaceFeatures> = vec![&face];
/// let result = DepthTracker::new(TrackerConfig::default())
///     .track(&initial, &faces)
///     .unwrap();
///
/// assert!(result.converged);
/// assert!(result.pose.log().norm() < 1e-5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DepthTracker {
    config: TrackerConfig,
}

impl DepthTracker {
    /// Create a tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Build the feature provider for one visible face, using the
    /// configured residual formulation and sampling stride.
    ///
    /// `region` is the face's projected bounding region in the cloud, as
    /// determined by the external visibility subsystem. Returns `None`
    /// when the face yields no usable features (nothing sampled, or a
    /// plane fit below the quality floor in normal mode); such faces
    /// simply drop out of the frame.
    pub fn build_face(
        &self,
        plane: Plane,
        cloud: &DepthCloud,
        region: &CloudRegion,
    ) -> Option<Box<dyn FaceFeatures>> {
        match self.config.feature_mode {
            FeatureMode::DepthDense => {
                let face = DepthDenseFace::from_cloud(
                    plane,
                    cloud,
                    region,
                    self.config.sampling_step_x,
                    self.config.sampling_step_y,
                );
                (face.feature_count() > 0).then(|| Box::new(face) as Box<dyn FaceFeatures>)
            }
            FeatureMode::DepthNormal => DepthNormalFace::from_cloud(
                plane,
                cloud,
                region,
                self.config.sampling_step_x,
                self.config.sampling_step_y,
                self.config.min_plane_quality,
            )
            .map(|face| Box::new(face) as Box<dyn FaceFeatures>),
        }
    }

    /// Refine a pose estimate against the currently visible faces.
    ///
    /// Faces with zero features are skipped. Fails with
    /// [`TrackingError::NoActiveFeatures`] when nothing is left,
    /// [`TrackingError::DegenerateSystem`] when fewer features than pose
    /// degrees of freedom remain, and
    /// [`TrackingError::NumericalInstability`] when the weighted system
    /// cannot produce a finite update. All failures are terminal for the
    /// call; the pose estimate is never partially updated on error.
    pub fn track(
        &self,
        initial_pose: &Pose,
        faces: &[&dyn FaceFeatures],
    ) -> Result<TrackResult> {
        let active: Vec<&dyn FaceFeatures> = faces
            .iter()
            .copied()
            .filter(|f| f.feature_count() > 0)
            .collect();
        let rows: usize = active.iter().map(|f| f.feature_count()).sum();

        if rows == 0 {
            return Err(TrackingError::NoActiveFeatures);
        }
        if rows < 6 {
            return Err(TrackingError::DegenerateSystem { features: rows });
        }

        debug!(
            "tracking {} feature(s) from {} active face(s)",
            rows,
            active.len()
        );

        let mut buffers = vvs::VvsBuffers::new(rows);
        let mut pose = *initial_pose;
        let mut converged = false;
        let mut iterations = 0;

        for iteration in 0..self.config.max_iterations {
            iterations = iteration + 1;

            vvs::build_system(&active, &pose, &mut buffers.jacobian, &mut buffers.residuals);
            robust::tukey_weights(
                buffers.residuals.as_slice(),
                buffers.weights.as_mut_slice(),
                self.config.noise_threshold,
                &mut buffers.scratch,
            );

            let delta =
                vvs::solve_update(&buffers.jacobian, &buffers.residuals, &buffers.weights)?;
            let step = self.config.gain * delta;
            pose = pose.exp_update(&step);

            let step_norm = step.norm();
            trace!("iteration {}: |delta| = {:.3e}", iteration, step_norm);

            if step_norm < self.config.convergence_threshold {
                converged = true;
                break;
            }
        }

        // Re-evaluate at the refined pose so the reported residuals match
        // the returned estimate.
        vvs::build_system(&active, &pose, &mut buffers.jacobian, &mut buffers.residuals);
        let mse = weighted_mse(&buffers.residuals, &buffers.weights);

        debug!(
            "{} after {} iteration(s), mse = {:.3e}",
            if converged {
                "converged"
            } else {
                "iteration budget exhausted"
            },
            iterations,
            mse
        );

        Ok(TrackResult {
            pose,
            residuals: buffers.residuals,
            weights: buffers.weights,
            converged,
            iterations,
            mse,
        })
    }
}

/// Mean squared residual, averaged by robust weight.
fn weighted_mse(residuals: &DVector<f64>, weights: &DVector<f64>) -> f64 {
    let mut sum = 0.0;
    let mut weight_sum = 0.0;
    for i in 0..residuals.len() {
        sum += weights[i] * residuals[i] * residuals[i];
        weight_sum += weights[i];
    }
    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        f64::MAX
    }
}
