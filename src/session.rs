//! Per-connection analyzer registry.
//!
//! A [`Session`] is owned by exactly one connection task. It holds one
//! analyzer per exercise and is dropped, with all rep state, when the
//! connection closes.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::AnalyzerConfig;
use crate::error::SessionError;
use crate::exercise::{ExerciseAnalyzer, ExerciseKind, RepCounters};
use crate::pose::PoseFrame;
use crate::protocol::FrameResponse;

pub const NO_POSE_DETECTED: &str = "No pose detected";

pub struct Session {
    analyzers: HashMap<ExerciseKind, Box<dyn ExerciseAnalyzer>>,
}

impl Session {
    /// One fresh analyzer for every known exercise
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_analyzers(ExerciseKind::ALL.iter().map(|kind| kind.analyzer(config)))
    }

    /// Registry over an explicit set of analyzers, keyed by their kind
    pub fn with_analyzers<I>(analyzers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn ExerciseAnalyzer>>,
    {
        Self {
            analyzers: analyzers.into_iter().map(|a| (a.kind(), a)).collect(),
        }
    }

    fn lookup(&mut self, exercise: &str) -> Result<&mut Box<dyn ExerciseAnalyzer>, SessionError> {
        let kind: ExerciseKind = exercise.parse()?;
        self.analyzers
            .get_mut(&kind)
            .ok_or_else(|| SessionError::UnknownExercise(exercise.to_string()))
    }

    /// Route one frame to the named analyzer.
    ///
    /// `frame` is `None` when the estimator found no body; the analyzer is not
    /// invoked. Landmark problems are reported in the response's `error`
    /// field and leave the analyzer as it was.
    pub fn process(
        &mut self,
        exercise: &str,
        frame: Option<&PoseFrame>,
    ) -> Result<FrameResponse, SessionError> {
        let analyzer = self.lookup(exercise)?;
        let kind = analyzer.kind();

        let Some(frame) = frame else {
            return Ok(FrameResponse::error(kind, analyzer.counters(), NO_POSE_DETECTED));
        };

        match analyzer.analyze(frame) {
            Ok(analysis) => {
                if let Some(feedback) = &analysis.feedback {
                    if kind != ExerciseKind::Plank {
                        debug!(exercise = %kind, count = feedback.count, intent = feedback.intent, "rep finished");
                    }
                }
                Ok(FrameResponse::analysis(kind, analyzer.counters(), analysis))
            }
            Err(e) => {
                debug!(exercise = %kind, error = %e, "frame rejected");
                Ok(FrameResponse::error(
                    kind,
                    analyzer.counters(),
                    format!("Error analyzing {}: {}", kind, e),
                ))
            }
        }
    }

    /// Reinitialize one analyzer. Other exercises are untouched.
    pub fn reset(&mut self, exercise: &str) -> Result<(), SessionError> {
        let analyzer = self.lookup(exercise)?;
        analyzer.reset();
        info!(exercise = %analyzer.kind(), "analyzer reset");
        Ok(())
    }

    pub fn counters(&self, kind: ExerciseKind) -> Option<RepCounters> {
        self.analyzers.get(&kind).map(|a| a.counters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::testing::{below, ray, PoseBuilder};
    use crate::exercise::{Analysis, Feedback, LungeAnalyzer};
    use crate::config::LungeConfig;
    use crate::error::PoseError;
    use crate::pose::{Landmark, LandmarkIndex};

    /// Arms at `deg` from the torso, elbows straight.
    fn raise(deg: f32) -> PoseFrame {
        use LandmarkIndex::*;
        let mut b = PoseBuilder::new();
        for (sh, d, hip_i, sh_i, el_i, wr_i) in [
            ([0.6, 0.3], deg, LeftHip, LeftShoulder, LeftElbow, LeftWrist),
            ([0.4, 0.3], -deg, RightHip, RightShoulder, RightElbow, RightWrist),
        ] {
            let hip = below(sh, 0.3);
            let elbow = ray(sh, hip, -d, 0.15);
            let wrist = ray(elbow, sh, 175.0, 0.12);
            b = b.at(hip_i, hip).at(sh_i, sh).at(el_i, elbow).at(wr_i, wrist);
        }
        b.frame(0)
    }

    fn one_lateral_rep(session: &mut Session) -> FrameResponse {
        session.process("lateral_raises", Some(&raise(20.0))).unwrap();
        session.process("lateral_raises", Some(&raise(90.0))).unwrap();
        session.process("lateral_raises", Some(&raise(20.0))).unwrap()
    }

    #[test]
    fn test_process_routes_by_exercise() {
        let mut session = Session::new(&AnalyzerConfig::default());
        let response = one_lateral_rep(&mut session);

        assert_eq!(response.exercise, ExerciseKind::LateralRaise);
        assert_eq!(response.total_reps, 1);
        assert_eq!(response.correct_reps, 1);
        assert_eq!(response.feedback.unwrap().intent, 1);
        assert!(response.error.is_none());
        assert_eq!(session.counters(ExerciseKind::Curl), Some(RepCounters::default()));
    }

    #[test]
    fn test_unknown_exercise() {
        let mut session = Session::new(&AnalyzerConfig::default());
        let err = session.process("squat", Some(&raise(20.0))).unwrap_err();
        assert_eq!(err, SessionError::UnknownExercise("squat".to_string()));
        assert_eq!(session.reset("squat").unwrap_err(), err);

        // Still usable afterwards
        assert_eq!(one_lateral_rep(&mut session).total_reps, 1);
    }

    #[test]
    fn test_exercise_missing_from_registry() {
        let lunge: Box<dyn ExerciseAnalyzer> = Box::new(LungeAnalyzer::new(LungeConfig::default()));
        let mut session = Session::with_analyzers([lunge]);
        assert!(session.process("lunge", Some(&raise(20.0))).is_ok());
        assert_eq!(
            session.process("plank", Some(&raise(20.0))).unwrap_err(),
            SessionError::UnknownExercise("plank".to_string())
        );
    }

    #[test]
    fn test_no_pose_detected() {
        let mut session = Session::new(&AnalyzerConfig::default());
        session.process("lateral_raises", Some(&raise(20.0))).unwrap();
        session.process("lateral_raises", Some(&raise(90.0))).unwrap();

        let response = session.process("lateral_raises", None).unwrap();
        assert_eq!(response.error.as_deref(), Some(NO_POSE_DETECTED));
        assert!(response.feedback.is_none());

        // Up stage survived the empty frame
        let response = session.process("lateral_raises", Some(&raise(20.0))).unwrap();
        assert_eq!(response.total_reps, 1);
    }

    #[test]
    fn test_landmark_failure_is_reported() {
        let mut session = Session::new(&AnalyzerConfig::default());
        let mut bad = raise(20.0);
        bad.pose.set(LandmarkIndex::LeftKnee, Landmark::new(f32::NAN, 0.0, 0.0, 1.0));

        let response = session.process("lunge", Some(&bad)).unwrap();
        let error = response.error.unwrap();
        assert!(error.starts_with("Error analyzing lunge"), "{error}");
        assert!(response.feedback.is_none());
        assert_eq!(response.total_reps, 0);
    }

    #[test]
    fn test_plank_reports_duration() {
        let mut session = Session::new(&AnalyzerConfig::default());
        let response = session.process("plank", Some(&raise(20.0))).unwrap();
        assert!(response.correct_duration.is_some());

        let response = session.process("bicep_curl", Some(&raise(20.0))).unwrap();
        assert!(response.correct_duration.is_none());
    }

    #[test]
    fn test_reset_is_isolated_and_idempotent() {
        let mut session = Session::new(&AnalyzerConfig::default());
        one_lateral_rep(&mut session);

        struct Fixed(RepCounters);
        impl ExerciseAnalyzer for Fixed {
            fn kind(&self) -> ExerciseKind {
                ExerciseKind::Curl
            }
            fn analyze(&mut self, _: &PoseFrame) -> Result<Analysis, PoseError> {
                self.0.record(true);
                Ok(Analysis::feedback(Feedback::positive(self.0.total, "ok")))
            }
            fn counters(&self) -> RepCounters {
                self.0
            }
            fn reset(&mut self) {
                self.0 = RepCounters::default();
            }
        }
        session.analyzers.insert(ExerciseKind::Curl, Box::new(Fixed(RepCounters::default())));
        session.process("bicep_curl", Some(&raise(20.0))).unwrap();
        session.process("bicep_curl", Some(&raise(20.0))).unwrap();

        session.reset("lateral_raises").unwrap();
        assert_eq!(session.counters(ExerciseKind::LateralRaise), Some(RepCounters::default()));
        assert_eq!(
            session.counters(ExerciseKind::Curl),
            Some(RepCounters { total: 2, correct: 2, incorrect: 0 })
        );

        session.reset("lateral_raises").unwrap();
        assert_eq!(session.counters(ExerciseKind::LateralRaise), Some(RepCounters::default()));

        // Fresh rep after reset starts from one
        assert_eq!(one_lateral_rep(&mut session).total_reps, 1);
    }
}
