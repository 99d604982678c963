use anyhow::Result;

use super::landmark::Pose;

/// Image → landmark capability.
///
/// One instance is built at server startup and shared by every connection,
/// so implementations take `&self` and must be thread-safe. Implementations
/// are expected to run in continuous-tracking mode and to return `Ok(None)`
/// when no body is found. Multi-person output is not supported: return the
/// single most confident body.
pub trait PoseEstimator: Send + Sync {
    /// Estimate the pose in one encoded (JPEG/PNG) image.
    fn estimate(&self, image: &[u8]) -> Result<Option<Pose>>;
}

impl<F> PoseEstimator for F
where
    F: Fn(&[u8]) -> Result<Option<Pose>> + Send + Sync,
{
    fn estimate(&self, image: &[u8]) -> Result<Option<Pose>> {
        self(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};

    #[test]
    fn test_closure_estimator() {
        let estimator = |image: &[u8]| -> Result<Option<Pose>> {
            if image.is_empty() {
                return Ok(None);
            }
            Ok(Some(Pose::new([Landmark::new(0.5, 0.5, 0.0, 1.0); LandmarkIndex::COUNT])))
        };

        assert!(estimator.estimate(&[]).unwrap().is_none());
        let pose = estimator.estimate(&[0xff, 0xd8]).unwrap().unwrap();
        assert_eq!(pose.get(LandmarkIndex::Nose).x, 0.5);
    }
}
