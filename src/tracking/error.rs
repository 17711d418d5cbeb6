//! Error types for the tracking core.

/// Result type alias
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Terminal failures of a single `track()` call.
///
/// None of these is retried internally: re-running with the same inputs
/// yields the same outcome. Recovery (re-initialization, falling back to
/// a motion model) is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    /// Fewer features than pose degrees of freedom.
    #[error("degenerate system: {features} feature(s) cannot constrain 6 pose degrees of freedom")]
    DegenerateSystem {
        /// Number of features that survived visibility and sampling.
        features: usize,
    },

    /// No face produced any feature this frame.
    #[error("no active features after visibility and sampling")]
    NoActiveFeatures,

    /// The weighted least-squares update could not be computed.
    #[error("numerical instability: {0}")]
    NumericalInstability(&'static str),
}
