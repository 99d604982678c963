//! Per-exercise repetition state machines.
//!
//! Every analyzer consumes one [`PoseFrame`] at a time, in capture order, and
//! keeps its stage and sample windows private. The session layer talks to them
//! only through [`ExerciseAnalyzer`].

pub mod curl;
pub mod lateral_raise;
pub mod lunge;
pub mod plank;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::error::{PoseError, SessionError};
use crate::pose::PoseFrame;

pub use curl::CurlAnalyzer;
pub use lateral_raise::LateralRaiseAnalyzer;
pub use lunge::LungeAnalyzer;
pub use plank::PlankAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseKind {
    #[serde(rename = "bicep_curl")]
    Curl,
    #[serde(rename = "lunge")]
    Lunge,
    #[serde(rename = "plank")]
    Plank,
    #[serde(rename = "lateral_raises")]
    LateralRaise,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::Curl,
        ExerciseKind::Lunge,
        ExerciseKind::Plank,
        ExerciseKind::LateralRaise,
    ];

    /// Wire tag sent by clients
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Curl => "bicep_curl",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::Plank => "plank",
            ExerciseKind::LateralRaise => "lateral_raises",
        }
    }

    /// Fresh analyzer for this exercise
    pub fn analyzer(&self, config: &AnalyzerConfig) -> Box<dyn ExerciseAnalyzer> {
        let capacity = config.window.capacity;
        match self {
            ExerciseKind::Curl => Box::new(CurlAnalyzer::new(config.curl.clone(), capacity)),
            ExerciseKind::Lunge => Box::new(LungeAnalyzer::new(config.lunge.clone())),
            ExerciseKind::Plank => Box::new(PlankAnalyzer::new(config.plank.clone())),
            ExerciseKind::LateralRaise => Box::new(LateralRaiseAnalyzer::new(
                config.lateral_raise.clone(),
                capacity,
            )),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SessionError::UnknownExercise(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Rep counts for one analyzer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepCounters {
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
}

impl RepCounters {
    /// Count a finished rep and return the new total.
    pub fn record(&mut self, correct: bool) -> u32 {
        self.total += 1;
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.total
    }
}

/// Feedback for one rep (or one held frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Total reps at emission time
    pub count: u32,
    pub text: String,
    /// 1 = good form, 0 = corrective
    pub intent: u8,
}

impl Feedback {
    pub fn positive(count: u32, text: impl Into<String>) -> Self {
        Self { count, text: text.into(), intent: 1 }
    }

    pub fn corrective(count: u32, text: impl Into<String>) -> Self {
        Self { count, text: text.into(), intent: 0 }
    }

    pub fn is_positive(&self) -> bool {
        self.intent == 1
    }
}

/// Result of analyzing one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub feedback: Option<Feedback>,
    /// Accumulated seconds of correct hold (isometric exercises only)
    pub correct_duration: Option<f64>,
}

impl Analysis {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn feedback(feedback: Feedback) -> Self {
        Self {
            feedback: Some(feedback),
            correct_duration: None,
        }
    }
}

/// One exercise's rep-detection state machine.
///
/// `analyze` must leave the analyzer untouched when it returns `Err`, so the
/// next good frame resumes from the same stage.
pub trait ExerciseAnalyzer: Send {
    fn kind(&self) -> ExerciseKind;

    fn analyze(&mut self, frame: &PoseFrame) -> Result<Analysis, PoseError>;

    fn counters(&self) -> RepCounters;

    /// Back to the initial stage with zeroed counters and empty windows.
    fn reset(&mut self);
}
