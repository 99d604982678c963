use tracing::debug;

use crate::config::CurlConfig;
use crate::error::PoseError;
use crate::geometry::{angle, SampleWindow};
use crate::pose::{LandmarkIndex, PoseFrame};

use super::{Analysis, ExerciseAnalyzer, ExerciseKind, Feedback, RepCounters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Unknown,
    Down,
    Up,
}

/// Bicep curl: counts extended → flexed transitions and checks that elbows
/// and shoulders stayed put over the rep.
pub struct CurlAnalyzer {
    config: CurlConfig,
    stage: Stage,
    counters: RepCounters,
    left_elbow: SampleWindow<[f32; 2]>,
    right_elbow: SampleWindow<[f32; 2]>,
    left_shoulder: SampleWindow<[f32; 2]>,
    right_shoulder: SampleWindow<[f32; 2]>,
}

/// One frame's worth of arm measurements
struct ArmSample {
    left_elbow_angle: f32,
    right_elbow_angle: f32,
    left_shoulder_angle: f32,
    right_shoulder_angle: f32,
    left_elbow: [f32; 2],
    right_elbow: [f32; 2],
    left_shoulder: [f32; 2],
    right_shoulder: [f32; 2],
}

impl ArmSample {
    fn measure(frame: &PoseFrame) -> Result<Self, PoseError> {
        use LandmarkIndex::*;
        let pose = &frame.pose;
        let l_shoulder = pose.require(LeftShoulder)?;
        let l_elbow = pose.require(LeftElbow)?;
        let l_wrist = pose.require(LeftWrist)?;
        let l_hip = pose.require(LeftHip)?;
        let r_shoulder = pose.require(RightShoulder)?;
        let r_elbow = pose.require(RightElbow)?;
        let r_wrist = pose.require(RightWrist)?;
        let r_hip = pose.require(RightHip)?;

        Ok(Self {
            left_elbow_angle: angle(l_shoulder, l_elbow, l_wrist),
            right_elbow_angle: angle(r_shoulder, r_elbow, r_wrist),
            left_shoulder_angle: angle(l_hip, l_shoulder, l_elbow),
            right_shoulder_angle: angle(r_hip, r_shoulder, r_elbow),
            left_elbow: l_elbow.xy(),
            right_elbow: r_elbow.xy(),
            left_shoulder: l_shoulder.xy(),
            right_shoulder: r_shoulder.xy(),
        })
    }
}

impl CurlAnalyzer {
    pub fn new(config: CurlConfig, window_capacity: usize) -> Self {
        Self {
            config,
            stage: Stage::Unknown,
            counters: RepCounters::default(),
            left_elbow: SampleWindow::new(window_capacity),
            right_elbow: SampleWindow::new(window_capacity),
            left_shoulder: SampleWindow::new(window_capacity),
            right_shoulder: SampleWindow::new(window_capacity),
        }
    }

    fn clear_windows(&mut self) {
        self.left_elbow.clear();
        self.right_elbow.clear();
        self.left_shoulder.clear();
        self.right_shoulder.clear();
    }

    fn record_positions(&mut self, s: &ArmSample) {
        self.left_elbow.push(s.left_elbow);
        self.right_elbow.push(s.right_elbow);
        self.left_shoulder.push(s.left_shoulder);
        self.right_shoulder.push(s.right_shoulder);
    }

    /// Classify the rep that just reached the top.
    fn evaluate(&mut self, s: &ArmSample) -> Feedback {
        let c = &self.config;
        let left_ok = self.left_elbow.is_stable(c.elbow_position_threshold)
            && self.left_shoulder.is_stable(c.shoulder_position_threshold);
        let right_ok = self.right_elbow.is_stable(c.elbow_position_threshold)
            && self.right_shoulder.is_stable(c.shoulder_position_threshold);
        let elbows_close = s.left_shoulder_angle < c.elbow_close_threshold
            && s.right_shoulder_angle < c.elbow_close_threshold;

        let mut issues = Vec::new();
        if !left_ok {
            issues.push("Left arm improper movement.");
        }
        if !right_ok {
            issues.push("Right arm improper movement.");
        }
        if !elbows_close {
            issues.push("Elbow not close to body.");
        }

        let correct = issues.is_empty();
        let count = self.counters.record(correct);
        debug!(count, left_ok, right_ok, elbows_close, "curl rep");
        if correct {
            Feedback::positive(count, "Good rep! Excellent form on both arms.")
        } else {
            Feedback::corrective(count, format!("Incorrect rep due to: {}", issues.join(" ")))
        }
    }
}

impl ExerciseAnalyzer for CurlAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Curl
    }

    fn analyze(&mut self, frame: &PoseFrame) -> Result<Analysis, PoseError> {
        let s = ArmSample::measure(frame)?;
        let c = &self.config;
        let extended = s.left_elbow_angle > c.extension_threshold
            && s.right_elbow_angle > c.extension_threshold;
        let flexed = s.left_elbow_angle < c.flex_threshold
            && s.right_elbow_angle < c.flex_threshold;

        if self.stage == Stage::Unknown {
            self.clear_windows();
        }

        if extended {
            // New rep starts from the extended position
            self.stage = Stage::Down;
            self.clear_windows();
        }

        if flexed && self.stage == Stage::Down {
            self.stage = Stage::Up;
            self.record_positions(&s);
            let feedback = self.evaluate(&s);
            return Ok(Analysis::feedback(feedback));
        }

        self.record_positions(&s);
        Ok(Analysis::none())
    }

    fn counters(&self) -> RepCounters {
        self.counters
    }

    fn reset(&mut self) {
        self.stage = Stage::Unknown;
        self.counters = RepCounters::default();
        self.clear_windows();
    }
}
