//! Pipeline stage identifiers
//!
//! Each stage names an abstract downstream step (embedding service, clinical
//! language model, guardrail check, ...). The order of a pipeline is the
//! order in which the caller is expected to run the stages.

use crate::ScreeningError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Downstream processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Capture and record the observation
    Intake,
    /// Vector embedding of the observation
    Embedding,
    /// Temporal context from prior observations
    Temporal,
    /// Clinical language model analysis
    Medgemma,
    /// Safety and guardrail check
    Safety,
    /// Caregiver-facing summary
    Summarizer,
}

impl Stage {
    /// All stages in canonical order
    pub const ALL: [Stage; 6] = [
        Stage::Intake,
        Stage::Embedding,
        Stage::Temporal,
        Stage::Medgemma,
        Stage::Safety,
        Stage::Summarizer,
    ];

    /// Stage identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Embedding => "embedding",
            Stage::Temporal => "temporal",
            Stage::Medgemma => "medgemma",
            Stage::Safety => "safety",
            Stage::Summarizer => "summarizer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScreeningError::Config(format!("Unknown stage: {}", s)))
    }
}

/// Shortened pipeline for urgent observations
pub const BYPASS_PIPELINE: [Stage; 2] = [Stage::Intake, Stage::Safety];

/// Full enrichment pipeline for observations touching a developmental domain
pub const FULL_PIPELINE: [Stage; 6] = [
    Stage::Intake,
    Stage::Embedding,
    Stage::Temporal,
    Stage::Medgemma,
    Stage::Safety,
    Stage::Summarizer,
];

/// Pipeline used when no category matches
pub const DEFAULT_PIPELINE: [Stage; 3] = [Stage::Intake, Stage::Medgemma, Stage::Safety];

/// Render a pipeline as `intake -> safety`
pub fn format_pipeline(pipeline: &[Stage]) -> String {
    pipeline
        .iter()
        .map(Stage::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
