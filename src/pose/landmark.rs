use serde::{Deserialize, Serialize};

use crate::error::PoseError;

/// BlazePose 33-landmark indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    const ALL: [LandmarkIndex; Self::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye,
            RightEyeOuter, LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist,
            RightWrist, LeftPinky, RightPinky, LeftIndex, RightIndex,
            LeftThumb, RightThumb, LeftHip, RightHip, LeftKnee, RightKnee,
            LeftAnkle, RightAnkle, LeftHeel, RightHeel, LeftFootIndex,
            RightFootIndex,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Single landmark in normalized image space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized X (0.0..1.0)
    pub x: f32,
    /// Normalized Y (0.0..1.0)
    pub y: f32,
    /// Relative depth, smaller is closer to the camera
    pub z: f32,
    /// Visibility confidence (0.0..1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Planar position used by the angle and stability checks
    pub fn xy(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// One detected body: all 33 landmarks
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl Pose {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    /// Build from an estimator or wire payload; the slice must hold exactly 33 entries.
    pub fn from_slice(landmarks: &[Landmark]) -> Result<Self, PoseError> {
        let landmarks: [Landmark; LandmarkIndex::COUNT] =
            landmarks.try_into().map_err(|_| PoseError::LandmarkCount {
                expected: LandmarkIndex::COUNT,
                got: landmarks.len(),
            })?;
        Ok(Self { landmarks })
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// Landmark lookup for analyzers: rejects NaN/inf coordinates so a bad
    /// frame never reaches the state machines.
    pub fn require(&self, index: LandmarkIndex) -> Result<&Landmark, PoseError> {
        let landmark = self.get(index);
        if landmark.is_finite() {
            Ok(landmark)
        } else {
            Err(PoseError::InvalidLandmark { landmark: index })
        }
    }

    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.landmarks[index as usize] = landmark;
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}

/// A pose tagged with its capture time
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    /// Capture time in microseconds, monotonic within one connection
    pub timestamp_us: u64,
    pub pose: Pose,
}

impl PoseFrame {
    pub fn new(timestamp_us: u64, pose: Pose) -> Self {
        Self { timestamp_us, pose }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
        assert_eq!(LandmarkIndex::RightFootIndex as usize, 32);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(23), Some(LandmarkIndex::LeftHip));
        assert_eq!(LandmarkIndex::from_index(32), Some(LandmarkIndex::RightFootIndex));
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_from_index_matches_discriminant() {
        for i in 0..LandmarkIndex::COUNT {
            assert_eq!(LandmarkIndex::from_index(i).unwrap() as usize, i);
        }
    }

    #[test]
    fn test_landmark_is_visible() {
        let lm = Landmark::new(0.5, 0.5, 0.0, 0.95);
        assert!(lm.is_visible(0.9));
        assert!(!lm.is_visible(0.95));
    }

    #[test]
    fn test_pose_from_slice() {
        let landmarks = vec![Landmark::new(0.1, 0.2, 0.0, 1.0); LandmarkIndex::COUNT];
        let pose = Pose::from_slice(&landmarks).unwrap();
        assert_eq!(pose.get(LandmarkIndex::LeftKnee).y, 0.2);
    }

    #[test]
    fn test_pose_from_slice_wrong_count() {
        let landmarks = vec![Landmark::default(); 17];
        let err = Pose::from_slice(&landmarks).unwrap_err();
        assert_eq!(err, PoseError::LandmarkCount { expected: 33, got: 17 });
    }

    #[test]
    fn test_require_rejects_nan() {
        let mut pose = Pose::default();
        pose.set(LandmarkIndex::LeftKnee, Landmark::new(f32::NAN, 0.5, 0.0, 1.0));
        assert!(pose.require(LandmarkIndex::LeftHip).is_ok());
        assert_eq!(
            pose.require(LandmarkIndex::LeftKnee).unwrap_err(),
            PoseError::InvalidLandmark { landmark: LandmarkIndex::LeftKnee }
        );
    }
}
