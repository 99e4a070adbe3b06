//! Routing policy
//!
//! Decides which pipeline of stages should process an observation and, on
//! an independent path, how urgent it is. The two decisions share urgent
//! markers but otherwise use different pattern sets, so they are not
//! guaranteed to agree: a `high` priority observation can still get the
//! default pipeline.

use crate::rules::{Category, CompiledRules, RuleTable};
use crate::stage::{Stage, BYPASS_PIPELINE, DEFAULT_PIPELINE, FULL_PIPELINE};
use crate::{PriorityTier, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Combined routing outcome for one observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Stages to run, in order
    pub pipeline: Vec<Stage>,
    /// Queueing priority
    pub priority: PriorityTier,
    /// Categories whose patterns matched, urgent first
    pub matched_categories: Vec<Category>,
    /// Child age as supplied by the caller
    pub age_months: u32,
}

impl RouteDecision {
    /// Whether the urgent bypass was taken
    pub fn is_bypass(&self) -> bool {
        self.pipeline == BYPASS_PIPELINE
    }
}

/// Pure routing policy over compiled pattern tables
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    table: RuleTable,
    rules: CompiledRules,
}

impl RoutingPolicy {
    /// Build a policy from a rule table
    pub fn new(table: RuleTable) -> Result<Self> {
        let rules = table.compile()?;
        info!(
            categories = table.categories.len(),
            domains = rules.domain_count(),
            high_markers = table.priority.high.len(),
            medium_markers = table.priority.medium.len(),
            "Routing policy compiled"
        );
        Ok(Self { table, rules })
    }

    /// Build a policy from the built-in tables
    pub fn builtin() -> Self {
        let table = RuleTable::builtin();
        // The built-in tables are covered by tests and always compile.
        let rules = match table.compile() {
            Ok(rules) => rules,
            Err(e) => unreachable!("built-in rule table failed to compile: {}", e),
        };
        Self { table, rules }
    }

    /// The rule table this policy was compiled from
    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Select the ordered stage pipeline for an observation
    ///
    /// Urgent markers are checked first and short-circuit to
    /// `[intake, safety]`. Otherwise any developmental domain match gives the
    /// full pipeline, and no match gives `[intake, medgemma, safety]`.
    ///
    /// `age_months` does not influence the result.
    pub fn select_pipeline(&self, observation_text: &str, age_months: u32) -> Vec<Stage> {
        let text = normalize(observation_text);
        let pipeline = self.pipeline_for(&text);

        debug!(age_months, stages = pipeline.len(), "Selected pipeline: {:?}", pipeline);
        pipeline
    }

    /// Classify the priority tier of an observation
    ///
    /// First match wins: urgent, then high, then medium, else low.
    pub fn classify_priority(&self, observation_text: &str) -> PriorityTier {
        let text = normalize(observation_text);
        let tier = self.tier_for(&text);
        debug!(priority = %tier, "Classified priority");
        tier
    }

    /// Categories matching an observation, urgent first then domains in
    /// declaration order
    pub fn matched_categories(&self, observation_text: &str) -> Vec<Category> {
        let text = normalize(observation_text);
        self.categories_for(&text)
    }

    /// Evaluate both decisions for one observation
    pub fn route(&self, observation_text: &str, age_months: u32) -> RouteDecision {
        let text = normalize(observation_text);

        let matched_categories = self.categories_for(&text);
        let pipeline = self.pipeline_for(&text);
        let priority = self.tier_for(&text);

        debug!(
            age_months,
            priority = %priority,
            categories = ?matched_categories,
            "Routed observation to {:?}",
            pipeline
        );

        RouteDecision {
            pipeline,
            priority,
            matched_categories,
            age_months,
        }
    }

    fn pipeline_for(&self, text: &str) -> Vec<Stage> {
        if self.rules.is_urgent(text) {
            BYPASS_PIPELINE.to_vec()
        } else if self.rules.any_domain(text) {
            FULL_PIPELINE.to_vec()
        } else {
            DEFAULT_PIPELINE.to_vec()
        }
    }

    fn tier_for(&self, text: &str) -> PriorityTier {
        if self.rules.is_urgent(text) {
            PriorityTier::Urgent
        } else if self.rules.is_high(text) {
            PriorityTier::High
        } else if self.rules.is_medium(text) {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }

    fn categories_for(&self, text: &str) -> Vec<Category> {
        let mut categories = Vec::new();
        if self.rules.is_urgent(text) {
            categories.push(Category::Urgent);
        }
        categories.extend(self.rules.matching_domains(text));
        categories
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Trim and case-fold observation text before matching
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
