//! # screening
//!
//! Route caregiver observations to screening pipelines from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use screening::config::env_rules_path;
use screening::stage::format_pipeline;
use screening::{load_policy, RoutingPolicy};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "screening")]
#[command(about = "Screening router - pick stage pipelines and priority tiers for observations", long_about = None)]
#[command(version)]
struct Cli {
    /// Policy file (defaults to $SCREENING_RULES, then the built-in rules)
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a single observation
    Route {
        /// Observation text
        text: String,

        /// Child age in months
        #[arg(short, long, default_value_t = 0)]
        age_months: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Route observations from stdin, one per line, writing JSON lines
    Batch {
        /// Child age in months applied to every line
        #[arg(short, long, default_value_t = 0)]
        age_months: u32,
    },

    /// Print the active rule table
    Rules {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: RulesFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum RulesFormat {
    Text,
    Yaml,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rules_path = cli.rules.or_else(env_rules_path);
    let policy = load_policy(rules_path.as_deref()).with_context(|| match &rules_path {
        Some(path) => format!("Failed to load routing policy from {}", path.display()),
        None => "Failed to build built-in routing policy".to_string(),
    })?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Route {
            text,
            age_months,
            format,
        } => route_one(&policy, &text, age_months, format, &mut out)?,
        Commands::Batch { age_months } => {
            let stdin = io::stdin();
            let count = route_batch(&policy, stdin.lock(), age_months, &mut out)?;
            info!(count, "Batch routed");
        }
        Commands::Rules { format } => print_rules(&policy, format, &mut out)?,
    }

    out.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn route_one<W: Write>(
    policy: &RoutingPolicy,
    text: &str,
    age_months: u32,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let decision = policy.route(text, age_months);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &decision)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "pipeline: {}", format_pipeline(&decision.pipeline))?;
            writeln!(out, "priority: {}", decision.priority)?;
            if !decision.matched_categories.is_empty() {
                let categories: Vec<&str> = decision
                    .matched_categories
                    .iter()
                    .map(|c| c.as_str())
                    .collect();
                writeln!(out, "matched:  {}", categories.join(", "))?;
            }
        }
    }
    Ok(())
}

fn route_batch<R: BufRead, W: Write>(
    policy: &RoutingPolicy,
    input: R,
    age_months: u32,
    out: &mut W,
) -> Result<usize> {
    let mut count = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read input line {}", index + 1))?;
        let decision = policy.route(&line, age_months);
        debug!(line = index + 1, priority = %decision.priority, "Routed line");

        serde_json::to_writer(&mut *out, &decision)?;
        writeln!(out)?;
        count += 1;
    }
    Ok(count)
}

fn print_rules<W: Write>(policy: &RoutingPolicy, format: RulesFormat, out: &mut W) -> Result<()> {
    let table = policy.table();

    match format {
        RulesFormat::Yaml => {
            let yaml = serde_yaml::to_string(table).context("Failed to serialize rules")?;
            write!(out, "{}", yaml)?;
        }
        RulesFormat::Text => {
            for rule in &table.categories {
                writeln!(out, "{} ({} patterns)", rule.category, rule.patterns.len())?;
                for pattern in &rule.patterns {
                    writeln!(out, "  {}", pattern)?;
                }
            }
            for (label, patterns) in [("high", &table.priority.high), ("medium", &table.priority.medium)] {
                writeln!(out, "priority {} ({} patterns)", label, patterns.len())?;
                for pattern in patterns {
                    writeln!(out, "  {}", pattern)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use screening::{PriorityTier, RouteDecision, Stage};

    #[test]
    fn test_route_one_text() {
        let policy = RoutingPolicy::builtin();
        let mut out = Vec::new();
        route_one(
            &policy,
            "Parent worried about regression in walking",
            20,
            OutputFormat::Text,
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(
            "pipeline: intake -> embedding -> temporal -> medgemma -> safety -> summarizer"
        ));
        assert!(text.contains("priority: high"));
        assert!(text.contains("matched:  motor"));
    }

    #[test]
    fn test_route_one_json() {
        let policy = RoutingPolicy::builtin();
        let mut out = Vec::new();
        route_one(&policy, "choking", 9, OutputFormat::Json, &mut out).unwrap();

        let decision: RouteDecision = serde_json::from_slice(&out).unwrap();
        assert_eq!(decision.pipeline, vec![Stage::Intake, Stage::Safety]);
        assert_eq!(decision.priority, PriorityTier::Urgent);
        assert_eq!(decision.age_months, 9);
    }

    #[test]
    fn test_route_batch_writes_one_line_per_input() {
        let policy = RoutingPolicy::builtin();
        let input = "Child had a seizure at daycare\n\nplease monitor sleep\n";
        let mut out = Vec::new();

        let count = route_batch(&policy, input.as_bytes(), 18, &mut out).unwrap();
        assert_eq!(count, 3);

        let lines: Vec<RouteDecision> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0].priority, PriorityTier::Urgent);
        assert_eq!(lines[1].pipeline, vec![Stage::Intake, Stage::Medgemma, Stage::Safety]);
        assert_eq!(lines[2].priority, PriorityTier::Medium);
    }

    #[test]
    fn test_print_rules_yaml_round_trips() {
        let policy = RoutingPolicy::builtin();
        let mut out = Vec::new();
        print_rules(&policy, RulesFormat::Yaml, &mut out).unwrap();

        let table: screening::RuleTable = serde_yaml::from_slice(&out).unwrap();
        assert_eq!(&table, policy.table());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from(["screening", "route", "seizure", "-a", "12", "-f", "json"])
            .unwrap();
        match cli.command {
            Commands::Route { age_months, .. } => assert_eq!(age_months, 12),
            _ => panic!("Expected route command"),
        }
    }
}
