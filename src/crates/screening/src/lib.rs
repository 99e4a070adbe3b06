//! Screening routing policy
//!
//! Maps free-text caregiver observations to:
//! - an ordered pipeline of downstream processing stages
//! - a coarse priority tier used for queueing and urgency badges
//!
//! Both decisions are pure functions over immutable pattern tables, so a
//! single [`RoutingPolicy`] can be shared across threads without locking.
//!
//! ```
//! use screening::{classify_priority, select_pipeline, PriorityTier, Stage};
//!
//! let pipeline = select_pipeline("Child had a seizure at daycare", 30);
//! assert_eq!(pipeline, vec![Stage::Intake, Stage::Safety]);
//! assert_eq!(classify_priority("Child had a seizure at daycare"), PriorityTier::Urgent);
//! ```

pub mod config;
pub mod policy;
pub mod priority;
pub mod rules;
pub mod stage;

use std::sync::LazyLock;
use thiserror::Error;

pub use config::{load_policy, load_yaml_config, load_yaml_file, PolicyConfig};
pub use policy::{RouteDecision, RoutingPolicy};
pub use priority::PriorityTier;
pub use rules::{Category, CategoryRule, CompiledRules, PriorityMarkers, RuleTable};
pub use stage::{Stage, BYPASS_PIPELINE, DEFAULT_PIPELINE, FULL_PIPELINE};

/// Errors that can occur while building a routing policy
///
/// Routing itself is total; these only surface from configuration and
/// rule compilation.
#[derive(Debug, Error)]
pub enum ScreeningError {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rule pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}' in {category} rules: {source}")]
    InvalidPattern {
        category: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A category was declared more than once in a rule table
    #[error("Category '{0}' is declared more than once")]
    DuplicateCategory(Category),

    /// The rule table has no usable urgent markers
    #[error("Rule table must declare at least one urgent pattern")]
    MissingUrgentRules,
}

/// Result type for screening operations
pub type Result<T> = std::result::Result<T, ScreeningError>;

static DEFAULT_POLICY: LazyLock<RoutingPolicy> = LazyLock::new(RoutingPolicy::builtin);

/// The process-wide policy built from the built-in rule tables
pub fn default_policy() -> &'static RoutingPolicy {
    &DEFAULT_POLICY
}

/// Select the stage pipeline for an observation using the built-in rules
///
/// See [`RoutingPolicy::select_pipeline`].
pub fn select_pipeline(observation_text: &str, age_months: u32) -> Vec<Stage> {
    DEFAULT_POLICY.select_pipeline(observation_text, age_months)
}

/// Classify the priority tier of an observation using the built-in rules
///
/// See [`RoutingPolicy::classify_priority`].
pub fn classify_priority(observation_text: &str) -> PriorityTier {
    DEFAULT_POLICY.classify_priority(observation_text)
}

/// Route an observation using the built-in rules
pub fn route(observation_text: &str, age_months: u32) -> RouteDecision {
    DEFAULT_POLICY.route(observation_text, age_months)
}
