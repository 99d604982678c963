use tracing::debug;

use crate::config::LateralRaiseConfig;
use crate::error::PoseError;
use crate::geometry::{angle, SampleWindow};
use crate::pose::{LandmarkIndex, PoseFrame};

use super::{Analysis, ExerciseAnalyzer, ExerciseKind, Feedback, RepCounters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Unknown,
    Up,
    Down,
}

/// Side lateral raise, judged by the peak shoulder abduction of each arm.
///
/// Only frames with both arms above `rep_threshold` are sampled. A raise that
/// never gets there is not counted when the arms come back down.
pub struct LateralRaiseAnalyzer {
    config: LateralRaiseConfig,
    stage: Stage,
    counters: RepCounters,
    left_angles: SampleWindow<f32>,
    right_angles: SampleWindow<f32>,
}

impl LateralRaiseAnalyzer {
    pub fn new(config: LateralRaiseConfig, window_capacity: usize) -> Self {
        Self {
            config,
            stage: Stage::Unknown,
            counters: RepCounters::default(),
            left_angles: SampleWindow::new(window_capacity),
            right_angles: SampleWindow::new(window_capacity),
        }
    }

    fn shoulder_angles(frame: &PoseFrame) -> Result<(f32, f32), PoseError> {
        use LandmarkIndex::*;
        let pose = &frame.pose;
        let left = angle(
            pose.require(LeftHip)?,
            pose.require(LeftShoulder)?,
            pose.require(LeftElbow)?,
        );
        let right = angle(
            pose.require(RightHip)?,
            pose.require(RightShoulder)?,
            pose.require(RightElbow)?,
        );
        Ok((left, right))
    }

    fn finish(&mut self) -> Feedback {
        let c = &self.config;
        let left_peak = self.left_angles.max().unwrap_or(0.0);
        let right_peak = self.right_angles.max().unwrap_or(0.0);

        let mut issues = Vec::new();
        if left_peak > c.max_angle || right_peak > c.max_angle {
            issues.push("Arms raised too high; avoid overextending above shoulder level.");
        }
        if left_peak < c.min_lift_angle || right_peak < c.min_lift_angle {
            issues.push("Arms not lifted enough; raise them to shoulder height.");
        }

        let correct = issues.is_empty();
        let count = self.counters.record(correct);
        debug!(count, left_peak, right_peak, "lateral raise rep");
        if correct {
            Feedback::positive(count, "Good rep! Excellent form.")
        } else {
            Feedback::corrective(count, format!("Incorrect rep due to: {}", issues.join(" ")))
        }
    }
}

impl ExerciseAnalyzer for LateralRaiseAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::LateralRaise
    }

    fn analyze(&mut self, frame: &PoseFrame) -> Result<Analysis, PoseError> {
        let (left, right) = Self::shoulder_angles(frame)?;
        let down = self.config.down_threshold;
        let rep = self.config.rep_threshold;

        if left < down && right < down {
            let mut analysis = Analysis::none();
            if self.stage == Stage::Up {
                self.left_angles.push(left);
                self.right_angles.push(right);
                analysis = Analysis::feedback(self.finish());
            }
            self.stage = Stage::Down;
            self.left_angles.clear();
            self.right_angles.clear();
            return Ok(analysis);
        }

        if left > rep && right > rep {
            self.stage = Stage::Up;
            self.left_angles.push(left);
            self.right_angles.push(right);
        }
        Ok(Analysis::none())
    }

    fn counters(&self) -> RepCounters {
        self.counters
    }

    fn reset(&mut self) {
        self.stage = Stage::Unknown;
        self.counters = RepCounters::default();
        self.left_angles.clear();
        self.right_angles.clear();
    }
}
