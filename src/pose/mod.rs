pub mod estimator;
pub mod landmark;

pub use estimator::PoseEstimator;
pub use landmark::{Landmark, LandmarkIndex, Pose, PoseFrame};
