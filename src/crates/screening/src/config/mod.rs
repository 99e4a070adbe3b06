//! Policy configuration
//!
//! Rule tables are layered: built-in tables, then an optional rules file,
//! then inline rules from the policy file itself. Each layer replaces the
//! categories it declares.
//!
//! ```yaml
//! rules_file: ${SCREENING_RULES_DIR:.}/clinic-rules.yaml
//! rules:
//!   categories:
//!     - category: motor
//!       patterns: ['\bwalk', '\bhop']
//!   priority:
//!     medium: ['\bwatch\b']
//! ```

pub mod loader;

use crate::rules::RuleTable;
use crate::{Result, RoutingPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub use loader::{load_yaml_config, load_yaml_file};

/// Environment variable naming a policy file
pub const RULES_ENV_VAR: &str = "SCREENING_RULES";

/// Policy configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Rule table file layered over the built-in tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
    /// Inline rules layered last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleTable>,
}

impl PolicyConfig {
    /// Load a policy configuration file
    ///
    /// A relative `rules_file` is resolved against the configuration file's
    /// directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config: PolicyConfig = load_yaml_config(path)?;

        if let Some(rules_file) = config.rules_file.as_mut() {
            if rules_file.is_relative() {
                if let Some(base_dir) = path.parent() {
                    *rules_file = base_dir.join(&*rules_file);
                }
            }
        }
        Ok(config)
    }

    /// Resolve the layered rule table
    pub fn rule_table(&self) -> Result<RuleTable> {
        let mut table = RuleTable::builtin();

        if let Some(rules_file) = &self.rules_file {
            let file_table: RuleTable = load_yaml_config(rules_file)?;
            info!(path = %rules_file.display(), "Layering rules file");
            table = table.overlay(file_table);
        }
        if let Some(inline) = &self.rules {
            table = table.overlay(inline.clone());
        }
        Ok(table)
    }

    /// Compile the configured policy
    pub fn build(&self) -> Result<RoutingPolicy> {
        RoutingPolicy::new(self.rule_table()?)
    }
}

/// Policy file named by `SCREENING_RULES`, if set and non-empty
pub fn env_rules_path() -> Option<PathBuf> {
    std::env::var(RULES_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

/// Build a policy from an optional configuration file
///
/// Without a file the built-in tables are used.
pub fn load_policy(path: Option<&Path>) -> Result<RoutingPolicy> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading routing policy");
            PolicyConfig::load(path)?.build()
        }
        None => Ok(RoutingPolicy::builtin()),
    }
}
