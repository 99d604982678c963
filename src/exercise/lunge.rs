use tracing::debug;

use crate::config::LungeConfig;
use crate::error::PoseError;
use crate::geometry::angle;
use crate::pose::{Landmark, LandmarkIndex, PoseFrame};

use super::{Analysis, ExerciseAnalyzer, ExerciseKind, Feedback, RepCounters, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Standing,
    Lunging,
}

/// Front-leg measurements collected while lunging
#[derive(Debug, Clone, Copy)]
struct FrontLeg {
    side: Side,
    /// Deepest (smallest) knee angle reached
    min_knee_angle: f32,
    /// Largest horizontal knee-to-ankle offset seen
    max_knee_over_toe: f32,
}

impl FrontLeg {
    fn new(side: Side, leg: &Leg) -> Self {
        Self {
            side,
            min_knee_angle: leg.knee_angle,
            max_knee_over_toe: leg.knee_over_toe,
        }
    }

    fn update(&mut self, leg: &Leg) {
        self.min_knee_angle = self.min_knee_angle.min(leg.knee_angle);
        self.max_knee_over_toe = self.max_knee_over_toe.max(leg.knee_over_toe);
    }
}

struct Leg {
    knee_angle: f32,
    knee_over_toe: f32,
    knee_z: f32,
}

impl Leg {
    fn measure(hip: &Landmark, knee: &Landmark, ankle: &Landmark) -> Self {
        Self {
            knee_angle: angle(hip, knee, ankle),
            knee_over_toe: (knee.x - ankle.x).abs(),
            knee_z: knee.z,
        }
    }
}

/// Forward lunge: standing → lunging on either leg → standing again.
pub struct LungeAnalyzer {
    config: LungeConfig,
    stage: Stage,
    front: Option<FrontLeg>,
    counters: RepCounters,
}

impl LungeAnalyzer {
    pub fn new(config: LungeConfig) -> Self {
        Self {
            config,
            stage: Stage::Standing,
            front: None,
            counters: RepCounters::default(),
        }
    }

    fn measure(frame: &PoseFrame) -> Result<(Leg, Leg), PoseError> {
        use LandmarkIndex::*;
        let pose = &frame.pose;
        let left = Leg::measure(
            pose.require(LeftHip)?,
            pose.require(LeftKnee)?,
            pose.require(LeftAnkle)?,
        );
        let right = Leg::measure(
            pose.require(RightHip)?,
            pose.require(RightKnee)?,
            pose.require(RightAnkle)?,
        );
        Ok((left, right))
    }

    fn finish(&mut self, front: FrontLeg) -> Feedback {
        let c = &self.config;
        let mut issues = Vec::new();
        if front.min_knee_angle < c.min_front_knee_angle
            || front.min_knee_angle > c.max_front_knee_angle
        {
            issues.push("Bend your front knee to about 90 degrees.");
        }
        if front.max_knee_over_toe > c.max_knee_over_toe {
            issues.push("Ensure your front knee does not go past your toes.");
        }

        let correct = issues.is_empty();
        let count = self.counters.record(correct);
        debug!(
            count,
            side = ?front.side,
            knee_angle = front.min_knee_angle,
            knee_over_toe = front.max_knee_over_toe,
            "lunge rep"
        );
        if correct {
            Feedback::positive(count, "Good lunge!")
        } else {
            Feedback::corrective(count, format!("Incorrect lunge. {}", issues.join(" ")))
        }
    }
}

impl ExerciseAnalyzer for LungeAnalyzer {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Lunge
    }

    fn analyze(&mut self, frame: &PoseFrame) -> Result<Analysis, PoseError> {
        let (left, right) = Self::measure(frame)?;
        let threshold = self.config.lunge_threshold;

        match self.stage {
            Stage::Standing => {
                let entered = if left.knee_angle < threshold && left.knee_z < right.knee_z {
                    Some(FrontLeg::new(Side::Left, &left))
                } else if right.knee_angle < threshold && right.knee_z < left.knee_z {
                    Some(FrontLeg::new(Side::Right, &right))
                } else {
                    None
                };
                if let Some(front) = entered {
                    self.stage = Stage::Lunging;
                    self.front = Some(front);
                }
                Ok(Analysis::none())
            }
            Stage::Lunging => {
                let Some(mut front) = self.front else {
                    self.stage = Stage::Standing;
                    return Ok(Analysis::none());
                };
                front.update(match front.side {
                    Side::Left => &left,
                    Side::Right => &right,
                });

                let standing = self.config.standing_threshold;
                if left.knee_angle > standing && right.knee_angle > standing {
                    self.stage = Stage::Standing;
                    self.front = None;
                    Ok(Analysis::feedback(self.finish(front)))
                } else {
                    self.front = Some(front);
                    Ok(Analysis::none())
                }
            }
        }
    }

    fn counters(&self) -> RepCounters {
        self.counters
    }

    fn reset(&mut self) {
        self.stage = Stage::Standing;
        self.front = None;
        self.counters = RepCounters::default();
    }
}
