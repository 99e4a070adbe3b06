//! Priority tiers for queue ordering

use crate::ScreeningError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse urgency classification, ordered by severity
///
/// The derived ordering follows declaration order, so `Urgent` compares
/// greatest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    /// Nothing notable
    #[default]
    Low,
    /// Needs monitoring or a follow-up
    Medium,
    /// Caregiver concern, delay or regression
    High,
    /// Emergency markers present
    Urgent,
}

impl PriorityTier {
    /// Tier identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Low => "low",
            PriorityTier::Medium => "medium",
            PriorityTier::High => "high",
            PriorityTier::Urgent => "urgent",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityTier {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(PriorityTier::Low),
            "medium" => Ok(PriorityTier::Medium),
            "high" => Ok(PriorityTier::High),
            "urgent" => Ok(PriorityTier::Urgent),
            other => Err(ScreeningError::Config(format!("Unknown priority tier: {}", other))),
        }
    }
}
