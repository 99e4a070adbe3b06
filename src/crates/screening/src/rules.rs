//! Pattern tables for routing decisions
//!
//! A [`RuleTable`] is plain ordered data: each [`Category`] owns a list of
//! case-insensitive regex fragments, and the priority classifier has its own
//! `high` and `medium` marker lists. Urgent markers are shared by both
//! decisions. Tables are compiled once into [`CompiledRules`]; after that
//! nothing mutates.

use crate::{Result, ScreeningError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Semantic category of a routing rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Emergency markers, evaluated before anything else
    Urgent,
    /// Speech and language development
    Language,
    /// Gross and fine motor development
    Motor,
    /// Social and emotional development
    Social,
    /// Cognitive and problem-solving development
    Cognitive,
}

impl Category {
    /// Category identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Urgent => "urgent",
            Category::Language => "language",
            Category::Motor => "motor",
            Category::Social => "social",
            Category::Cognitive => "cognitive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Urgent markers match anywhere in the text.
const URGENT_PATTERNS: &[&str] = &[
    "emergency",
    "seizure",
    "unresponsive",
    "breathing",
    "not breathing",
    "choking",
];

// Domain markers are whole words with their common inflections, so
// "walking" hits but "standard" or "pointless" do not.
const LANGUAGE_PATTERNS: &[&str] = &[
    r"\bwords?\b",
    r"\btalk(?:s|ed|ing)?\b",
    r"\bspeak(?:s|ing)?\b",
    r"\bspeech\b",
    r"\b(?:say|says|saying|said)\b",
    r"\bbabbl(?:e|es|ed|ing)\b",
    r"\bpoint(?:s|ed|ing)?\b",
    r"\bsentences?\b",
    r"\bvocabulary\b",
    r"\blanguage\b",
    r"\bgestur(?:e|es|ed|ing)\b",
];

const MOTOR_PATTERNS: &[&str] = &[
    r"\bwalk(?:s|ed|ing)?\b",
    r"\bcrawl(?:s|ed|ing)?\b",
    r"\bclimb(?:s|ed|ing)?\b",
    r"\bjump(?:s|ed|ing)?\b",
    r"\bstand(?:s|ing)?\b",
    r"\bsit(?:s|ting)?\b",
    r"\broll(?:s|ed|ing)?\b",
    r"\bgrasp(?:s|ed|ing)?\b",
    r"\bbalanc(?:e|es|ed|ing)\b",
    r"\bstairs?\b",
    r"\bmotor\b",
];

const SOCIAL_PATTERNS: &[&str] = &[
    r"\beye contact\b",
    r"\bsmil(?:e|es|ed|ing)\b",
    r"\bplay(?:s|ed|ing)?\b",
    r"\bsocial(?:ly)?\b",
    r"\binteract(?:s|ed|ing|ion|ions)?\b",
    r"\bshar(?:e|es|ing)\b",
    r"\bwav(?:e|es|ing)\b",
    r"\bfriends?\b",
    r"\brespond\w* to (?:his|her|their) name\b",
];

const COGNITIVE_PATTERNS: &[&str] = &[
    r"\bpuzzles?\b",
    r"\bproblem[- ]solving\b",
    r"\bmemory\b",
    r"\bremember(?:s|ed|ing)?\b",
    r"\blearn(?:s|ed|ing|t)?\b",
    r"\bcount(?:s|ed|ing)?\b",
    r"\bsort(?:s|ed|ing)?\b",
    r"\bshapes?\b",
    r"\bcolou?rs?\b",
    r"\bcognitive\b",
    r"\battention\b",
];

// Priority markers are whole words: "checkup" is not "check".
const HIGH_PATTERNS: &[&str] = &[
    r"\bdelay(?:s|ed)?\b",
    r"\bconcern(?:ed)?\b",
    r"\bworry\b",
    r"\bworried\b",
    r"\bregression\b",
];

const MEDIUM_PATTERNS: &[&str] = &[
    r"\bmonitor(?:s|ed|ing)?\b",
    r"\bcheck(?:s|ed)?\b",
    r"\bfollow-up\b",
    r"\bfollowup\b",
    r"\brecheck\b",
];

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

/// Patterns for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category these patterns belong to
    pub category: Category,
    /// Case-insensitive regex fragments, any of which matches
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl CategoryRule {
    /// Create a rule from pattern fragments
    pub fn new(category: Category, patterns: Vec<String>) -> Self {
        Self { category, patterns }
    }
}

/// Severity markers for the priority classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityMarkers {
    /// Markers that raise priority to `high`
    #[serde(default)]
    pub high: Vec<String>,
    /// Markers that raise priority to `medium`
    #[serde(default)]
    pub medium: Vec<String>,
}

/// Ordered category and priority pattern tables
///
/// `Default` is an empty table; the shipped tables come from
/// [`RuleTable::builtin`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Category rules, in declaration order
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
    /// Priority markers
    #[serde(default)]
    pub priority: PriorityMarkers,
}

impl RuleTable {
    /// The built-in tables
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                CategoryRule::new(Category::Urgent, owned(URGENT_PATTERNS)),
                CategoryRule::new(Category::Language, owned(LANGUAGE_PATTERNS)),
                CategoryRule::new(Category::Motor, owned(MOTOR_PATTERNS)),
                CategoryRule::new(Category::Social, owned(SOCIAL_PATTERNS)),
                CategoryRule::new(Category::Cognitive, owned(COGNITIVE_PATTERNS)),
            ],
            priority: PriorityMarkers {
                high: owned(HIGH_PATTERNS),
                medium: owned(MEDIUM_PATTERNS),
            },
        }
    }

    /// Patterns declared for a category, if any
    pub fn patterns_for(&self, category: Category) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|rule| rule.category == category)
            .map(|rule| rule.patterns.as_slice())
    }

    /// Layer another table on top of this one
    ///
    /// Categories declared in `other` replace the same category here (keeping
    /// its position); new categories are appended. Non-empty priority marker
    /// lists in `other` replace the corresponding list here.
    pub fn overlay(mut self, other: RuleTable) -> Self {
        for rule in other.categories {
            match self
                .categories
                .iter_mut()
                .find(|existing| existing.category == rule.category)
            {
                Some(existing) => existing.patterns = rule.patterns,
                None => self.categories.push(rule),
            }
        }
        if !other.priority.high.is_empty() {
            self.priority.high = other.priority.high;
        }
        if !other.priority.medium.is_empty() {
            self.priority.medium = other.priority.medium;
        }
        self
    }

    /// Check structural constraints
    ///
    /// Every category may appear once, urgent must be present with at least
    /// one pattern, and no pattern may be blank.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &self.categories {
            if !seen.insert(rule.category) {
                return Err(ScreeningError::DuplicateCategory(rule.category));
            }
            check_blank(rule.category.as_str(), &rule.patterns)?;
        }
        check_blank("high", &self.priority.high)?;
        check_blank("medium", &self.priority.medium)?;

        match self.patterns_for(Category::Urgent) {
            Some(patterns) if !patterns.is_empty() => Ok(()),
            _ => Err(ScreeningError::MissingUrgentRules),
        }
    }

    /// Validate and compile into matchers
    pub fn compile(&self) -> Result<CompiledRules> {
        self.validate()?;

        let mut urgent = None;
        let mut domains = Vec::new();
        for rule in &self.categories {
            let matcher = compile_patterns(rule.category.as_str(), &rule.patterns)?;
            match (rule.category, matcher) {
                (Category::Urgent, matcher) => urgent = matcher,
                (category, Some(matcher)) => domains.push((category, matcher)),
                (category, None) => {
                    warn!(category = %category, "Category has no patterns and will never match");
                }
            }
        }

        let urgent = urgent.ok_or(ScreeningError::MissingUrgentRules)?;
        Ok(CompiledRules {
            urgent,
            domains,
            high: compile_patterns("high", &self.priority.high)?,
            medium: compile_patterns("medium", &self.priority.medium)?,
        })
    }
}

fn check_blank(label: &str, patterns: &[String]) -> Result<()> {
    if patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ScreeningError::Config(format!(
            "Blank pattern in {} rules",
            label
        )));
    }
    Ok(())
}

/// Compile a pattern list into one case-insensitive alternation
///
/// Each fragment is checked on its own first so errors name the offending
/// pattern. An empty list compiles to `None`.
fn compile_patterns(label: &str, patterns: &[String]) -> Result<Option<Regex>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    for pattern in patterns {
        Regex::new(pattern).map_err(|source| ScreeningError::InvalidPattern {
            category: label.to_string(),
            pattern: pattern.clone(),
            source,
        })?;
    }

    let alternation = patterns
        .iter()
        .map(|p| format!("(?:{})", p))
        .collect::<Vec<_>>()
        .join("|");

    Regex::new(&format!("(?i){}", alternation))
        .map(Some)
        .map_err(|source| ScreeningError::InvalidPattern {
            category: label.to_string(),
            pattern: alternation,
            source,
        })
}

/// Compiled, immutable matchers
#[derive(Debug, Clone)]
pub struct CompiledRules {
    urgent: Regex,
    domains: Vec<(Category, Regex)>,
    high: Option<Regex>,
    medium: Option<Regex>,
}

impl CompiledRules {
    /// Whether any urgent marker occurs in `text`
    pub fn is_urgent(&self, text: &str) -> bool {
        self.urgent.is_match(text)
    }

    /// Whether any developmental domain matches `text`
    pub fn any_domain(&self, text: &str) -> bool {
        self.domains.iter().any(|(_, regex)| regex.is_match(text))
    }

    /// Domains matching `text`, in declaration order
    pub fn matching_domains(&self, text: &str) -> Vec<Category> {
        self.domains
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(category, _)| *category)
            .collect()
    }

    /// Whether any high-severity marker occurs in `text`
    pub fn is_high(&self, text: &str) -> bool {
        self.high.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// Whether any medium-severity marker occurs in `text`
    pub fn is_medium(&self, text: &str) -> bool {
        self.medium.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// Number of compiled domain matchers
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_declaration_order() {
        let table = RuleTable::builtin();
        let order: Vec<Category> = table.categories.iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                Category::Urgent,
                Category::Language,
                Category::Motor,
                Category::Social,
                Category::Cognitive
            ]
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_builtin_compiles() {
        let rules = RuleTable::builtin().compile().unwrap();
        assert_eq!(rules.domain_count(), 4);
        assert!(rules.is_urgent("not breathing"));
        assert!(rules.is_urgent("seizures overnight"));
        assert!(!rules.is_urgent(""));
    }

    #[test]
    fn test_domain_matching() {
        let rules = RuleTable::builtin().compile().unwrap();
        assert_eq!(rules.matching_domains("says 10 words"), vec![Category::Language]);
        assert_eq!(rules.matching_domains("walking late"), vec![Category::Motor]);
        assert_eq!(
            rules.matching_domains("no eye contact and not walking"),
            vec![Category::Motor, Category::Social]
        );
        assert!(!rules.any_domain("routine 12-month checkup, no concerns"));
    }

    #[test]
    fn test_domain_markers_are_whole_words() {
        let rules = RuleTable::builtin().compile().unwrap();
        for text in ["standard visit", "pointless fuss", "wordless night", "playground bench"] {
            assert!(rules.matching_domains(text).is_empty(), "text: {}", text);
        }
        assert_eq!(rules.matching_domains("standing alone"), vec![Category::Motor]);
        assert_eq!(rules.matching_domains("said two words"), vec![Category::Language]);
    }

    #[test]
    fn test_priority_markers_are_whole_words() {
        let rules = RuleTable::builtin().compile().unwrap();
        assert!(rules.is_high("we are worried"));
        assert!(rules.is_high("speech delay"));
        assert!(!rules.is_high("no concerns"));
        assert!(rules.is_medium("please monitor"));
        assert!(rules.is_medium("book a follow-up"));
        assert!(!rules.is_medium("routine checkup"));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let mut table = RuleTable::builtin();
        table
            .categories
            .push(CategoryRule::new(Category::Motor, vec!["hop".to_string()]));

        match table.validate() {
            Err(ScreeningError::DuplicateCategory(Category::Motor)) => {}
            other => panic!("Expected DuplicateCategory, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_urgent_rejected() {
        let table = RuleTable {
            categories: vec![CategoryRule::new(Category::Motor, vec!["walk".to_string()])],
            priority: PriorityMarkers::default(),
        };
        assert!(matches!(table.compile(), Err(ScreeningError::MissingUrgentRules)));

        let table = RuleTable {
            categories: vec![CategoryRule::new(Category::Urgent, vec![])],
            priority: PriorityMarkers::default(),
        };
        assert!(matches!(table.validate(), Err(ScreeningError::MissingUrgentRules)));
    }

    #[test]
    fn test_invalid_pattern_names_offender() {
        let table = RuleTable {
            categories: vec![
                CategoryRule::new(Category::Urgent, vec!["emergency".to_string()]),
                CategoryRule::new(Category::Social, vec!["smil(".to_string()]),
            ],
            priority: PriorityMarkers::default(),
        };

        match table.compile() {
            Err(ScreeningError::InvalidPattern { category, pattern, .. }) => {
                assert_eq!(category, "social");
                assert_eq!(pattern, "smil(");
            }
            other => panic!("Expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_pattern_rejected() {
        let mut table = RuleTable::builtin();
        table.priority.medium.push("  ".to_string());
        assert!(matches!(table.validate(), Err(ScreeningError::Config(_))));
    }

    #[test]
    fn test_overlay_replaces_in_place() {
        let overlay = RuleTable {
            categories: vec![CategoryRule::new(Category::Motor, vec![r"\bhop".to_string()])],
            priority: PriorityMarkers {
                high: vec![],
                medium: vec![r"\bwatch\b".to_string()],
            },
        };
        let merged = RuleTable::builtin().overlay(overlay);

        assert_eq!(merged.categories[2].category, Category::Motor);
        assert_eq!(merged.patterns_for(Category::Motor).unwrap(), &[r"\bhop".to_string()]);
        assert_eq!(merged.priority.high, RuleTable::builtin().priority.high);
        assert_eq!(merged.priority.medium, vec![r"\bwatch\b".to_string()]);
    }

    #[test]
    fn test_empty_domain_never_matches() {
        let table = RuleTable {
            categories: vec![
                CategoryRule::new(Category::Urgent, vec!["emergency".to_string()]),
                CategoryRule::new(Category::Cognitive, vec![]),
            ],
            priority: PriorityMarkers::default(),
        };
        let rules = table.compile().unwrap();
        assert_eq!(rules.domain_count(), 0);
        assert!(!rules.any_domain("puzzle"));
        assert!(!rules.is_high("worried"));
    }

    #[test]
    fn test_rule_table_yaml() {
        let yaml = r#"
            categories:
              - category: urgent
                patterns: ["emergency", "choking"]
              - category: language
                patterns: ['\bword']
            priority:
              high: ['\bworried\b']
        "#;

        let table: RuleTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.categories.len(), 2);
        assert_eq!(table.categories[1].category, Category::Language);
        assert_eq!(table.priority.high, vec![r"\bworried\b".to_string()]);
        assert!(table.priority.medium.is_empty());
    }
}
