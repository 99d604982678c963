use tracing::debug;

use crate::config::PlankConfig;
use crate::error::PoseError;
use crate::geometry::angle;
use crate::pose::{LandmarkIndex, PoseFrame};

use super::{Analysis, ExerciseAnalyzer, ExerciseKind, Feedback, RepCounters};

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Plank hold: evaluated every frame, tracks how long the body stayed straight.
///
/// Rep counters exist for a uniform response shape but a hold never completes
/// a rep, so they stay at zero.
pub struct PlankAnalyzer {
    config: PlankConfig,
    counters: RepCounters,
    /// Capture time of the first frame of the current good hold
    hold_start_us: Option<u64>,
    /// Seconds banked from holds that already ended
    banked: f64,
    correct_duration: f64,
}

impl PlankAnalyzer {
    pub fn new(config: PlankConfig) -> Self {
        Self {
            config,
            counters: RepCounters::default(),
            hold_start_us: None,
            banked: 0.0,
            correct_duration: 0.0,
        }
    }

    /// Accumulated seconds of correct form
    pub fn correct_duration(&self) -> f64 {
        self.correct_duration
    }

    fn with_duration(&self, feedback: Option<Feedback>) -> Analysis {
        Analysis {
            feedback,
            correct_duration: Some(self.correct_duration),
        }
    }
}

impl ExerciseAnalyzer for PlankAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Plank
    }

    fn analyze(&mut self, frame: &PoseFrame) -> Result<Analysis, PoseError> {
        use LandmarkIndex::*;
        let pose = &frame.pose;
        let l_shoulder = pose.require(LeftShoulder)?;
        let r_shoulder = pose.require(RightShoulder)?;
        let l_hip = pose.require(LeftHip)?;
        let r_hip = pose.require(RightHip)?;
        let l_ankle = pose.require(LeftAnkle)?;
        let r_ankle = pose.require(RightAnkle)?;

        let min_visibility = self.config.min_hip_visibility;
        if !l_hip.is_visible(min_visibility) || !r_hip.is_visible(min_visibility) {
            return Ok(self.with_duration(None));
        }

        let body_angle = (angle(l_shoulder, l_hip, l_ankle) + angle(r_shoulder, r_hip, r_ankle)) / 2.0;
        let straight =
            body_angle >= self.config.min_body_angle && body_angle <= self.config.max_body_angle;
        let now = frame.timestamp_us;

        let feedback = if straight {
            match self.hold_start_us {
                None => self.hold_start_us = Some(now),
                Some(start) => {
                    let held = now.saturating_sub(start) as f64 / MICROS_PER_SEC;
                    self.correct_duration = self.banked + held;
                }
            }
            Feedback::positive(self.counters.total, "Good plank! Keep holding your body straight.")
        } else {
            if self.hold_start_us.take().is_some() {
                self.banked = self.correct_duration;
                debug!(correct_duration = self.correct_duration, body_angle, "plank hold broken");
            }
            Feedback::corrective(
                self.counters.total,
                "Incorrect plank. Ensure your body is in a straight line from shoulders to ankles.",
            )
        };

        Ok(self.with_duration(Some(feedback)))
    }

    fn counters(&self) -> RepCounters {
        self.counters
    }

    fn reset(&mut self) {
        self.counters = RepCounters::default();
        self.hold_start_us = None;
        self.banked = 0.0;
        self.correct_duration = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::testing::{ray, PoseBuilder};

    const SECOND: u64 = 1_000_000;

    /// Side-on plank: shoulders left of the hips, ankles placed so the
    /// shoulder-hip-ankle angle is `deg` on both sides.
    fn plank_frame(deg: f32, hip_visibility: f32, t: u64) -> PoseFrame {
        use LandmarkIndex::*;
        let mut b = PoseBuilder::new();
        for (dy, sh_i, hip_i, an_i) in [
            (0.0, LeftShoulder, LeftHip, LeftAnkle),
            (0.01, RightShoulder, RightHip, RightAnkle),
        ] {
            let hip = [0.5, 0.5 + dy];
            let shoulder = [0.2, 0.45 + dy];
            let ankle = ray(hip, shoulder, deg, 0.35);
            b = b
                .at(sh_i, shoulder)
                .at(hip_i, hip)
                .at(an_i, ankle)
                .visibility(hip_i, hip_visibility);
        }
        b.frame(t)
    }

    #[test]
    fn test_duration_strictly_increases_while_holding() {
        let mut a = PlankAnalyzer::new(PlankConfig::default());
        let mut last = -1.0;
        for i in 0..10 {
            let analysis = a.analyze(&plank_frame(175.0, 0.95, i * SECOND / 10)).unwrap();
            let feedback = analysis.feedback.unwrap();
            assert_eq!(feedback.intent, 1);
            let duration = analysis.correct_duration.unwrap();
            if i > 0 {
                assert!(duration > last, "frame {i}: {duration} <= {last}");
            }
            last = duration;
        }
        assert!((last - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_bad_frame_freezes_duration() {
        let mut a = PlankAnalyzer::new(PlankConfig::default());
        a.analyze(&plank_frame(175.0, 0.95, 0)).unwrap();
        a.analyze(&plank_frame(175.0, 0.95, 2 * SECOND)).unwrap();
        assert!((a.correct_duration() - 2.0).abs() < 1e-9);

        let analysis = a.analyze(&plank_frame(140.0, 0.95, 3 * SECOND)).unwrap();
        let feedback = analysis.feedback.unwrap();
        assert_eq!(feedback.intent, 0);
        assert!(feedback.text.contains("straight line"));
        assert!((analysis.correct_duration.unwrap() - 2.0).abs() < 1e-9);

        // New hold restarts the timer without losing banked time
        let d = a.analyze(&plank_frame(175.0, 0.95, 10 * SECOND)).unwrap().correct_duration.unwrap();
        assert!((d - 2.0).abs() < 1e-9);
        let d = a.analyze(&plank_frame(175.0, 0.95, 11 * SECOND)).unwrap().correct_duration.unwrap();
        assert!((d - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_hip_visibility_skips_evaluation() {
        let mut a = PlankAnalyzer::new(PlankConfig::default());
        a.analyze(&plank_frame(175.0, 0.95, 0)).unwrap();
        let analysis = a.analyze(&plank_frame(140.0, 0.5, SECOND)).unwrap();
        assert!(analysis.feedback.is_none());
        assert_eq!(analysis.correct_duration, Some(0.0));
        // Hold was not broken by the unusable frame
        let d = a.analyze(&plank_frame(175.0, 0.95, 2 * SECOND)).unwrap().correct_duration.unwrap();
        assert!((d - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_visibility_must_exceed_threshold() {
        let mut a = PlankAnalyzer::new(PlankConfig::default());
        let analysis = a.analyze(&plank_frame(175.0, 0.9, 0)).unwrap();
        assert!(analysis.feedback.is_none());
    }

    #[test]
    fn test_counters_untouched() {
        let mut a = PlankAnalyzer::new(PlankConfig::default());
        for (i, deg) in [175.0, 140.0, 175.0, 120.0].into_iter().enumerate() {
            let feedback = a.analyze(&plank_frame(deg, 0.95, i as u64 * SECOND)).unwrap().feedback;
            assert_eq!(feedback.unwrap().count, 0);
        }
        assert_eq!(a.counters(), RepCounters::default());
    }

    #[test]
    fn test_reset() {
        let mut a = PlankAnalyzer::new(PlankConfig::default());
        a.analyze(&plank_frame(175.0, 0.95, 0)).unwrap();
        a.analyze(&plank_frame(175.0, 0.95, SECOND)).unwrap();
        a.reset();
        a.reset();
        assert_eq!(a.correct_duration(), 0.0);
        assert!(a.hold_start_us.is_none());
        assert_eq!(a.banked, 0.0);
    }
}
