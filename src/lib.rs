//! drishti-track: robust 6-DOF model-based object tracking on depth data.
//!
//! The crate implements the pose-refinement core of a model-based
//! tracker: a virtual visual servoing (VVS) loop that aligns a 3D model
//! against depth observations, with a Tukey M-estimator rejecting
//! outlying samples every iteration.
//!
//! # Architecture
//!
//! Three layers, lowest first:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   tracking/                         │  ← VVS loop, robust
//! │        (DepthTracker, Tukey M-estimator)            │    weighting, config
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   features/                         │  ← Residuals and
//! │      (point-to-plane, normal consistency)           │    interaction rows
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │            (pose, plane, cloud, math)               │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Everything upstream of feature extraction (CAD model loading, face
//! visibility, occlusion culling, depth acquisition) is an external
//! collaborator. Callers segment the depth cloud per visible face,
//! build one feature provider per face, and hand the set to
//! [`DepthTracker::track`] together with the previous frame's pose.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Feature extraction (depends on core)
// ============================================================================
pub mod features;

// ============================================================================
// Layer 3: Pose optimization (depends on core, features)
// ============================================================================
pub mod tracking;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{CameraIntrinsics, CloudRegion, DepthCloud, Plane, PlaneFit, Pose};

// Features
pub use crate::features::{DepthDenseFace, DepthNormalFace, FaceFeatures};

// Tracking
pub use crate::tracking::{
    tukey_weights, DepthTracker, FeatureMode, MadScratch, TrackResult, TrackerConfig,
    TrackingError,
};
