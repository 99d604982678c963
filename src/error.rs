//! Error types for pose input and session routing.

use thiserror::Error;

use crate::pose::LandmarkIndex;

/// Problems with a landmark set handed to the analyzers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    /// The payload does not carry one entry per canonical landmark.
    #[error("expected {expected} landmarks, got {got}")]
    LandmarkCount { expected: usize, got: usize },

    /// A landmark an analyzer needs has a non-finite coordinate.
    #[error("landmark {landmark:?} is missing or malformed")]
    InvalidLandmark { landmark: LandmarkIndex },
}

/// Errors surfaced by a per-connection session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Unknown exercise type: {0}")]
    UnknownExercise(String),
}
