//! YAML loader with include and environment variable support
//!
//! - `$include: relative/path.yaml` replaces the enclosing mapping with the
//!   contents of another file, resolved against the including file's directory
//! - `${ENV_VAR:default}` inside string scalars expands from the environment

use crate::{Result, ScreeningError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_yaml::Value as YamlValue;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

const INCLUDE_KEY: &str = "$include";
const MAX_INCLUDE_DEPTH: usize = 16;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").unwrap());

/// Load and parse a YAML file with include support
///
/// # Arguments
///
/// * `path` - Path to the YAML file
///
/// # Returns
///
/// Parsed YAML value with includes resolved and variables expanded, or
/// `ScreeningError::Config` if the file cannot be read or parsed
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<YamlValue> {
    load_with_depth(path.as_ref(), 0)
}

/// Load and deserialize a YAML file into a specific type
///
/// # Arguments
///
/// * `path` - Path to the YAML file
///
/// # Returns
///
/// Deserialized configuration object
pub fn load_yaml_config<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let value = load_yaml_file(path)?;
    serde_yaml::from_value(value).map_err(|e| {
        ScreeningError::Config(format!("Failed to deserialize {:?}: {}", path, e))
    })
}

/// Read one file, failing once includes nest deeper than `MAX_INCLUDE_DEPTH`
fn load_with_depth(path: &Path, depth: usize) -> Result<YamlValue> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(ScreeningError::Config(format!(
            "Include depth exceeded {} at {:?}",
            MAX_INCLUDE_DEPTH, path
        )));
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ScreeningError::Config(format!("Failed to read YAML file {:?}: {}", path, e))
    })?;
    let mut value: YamlValue = serde_yaml::from_str(&content).map_err(|e| {
        ScreeningError::Config(format!("Failed to parse YAML file {:?}: {}", path, e))
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    process_includes(&mut value, base_dir, depth)?;
    expand_variables(&mut value);

    debug!(path = %path.display(), depth, "Loaded YAML file");
    Ok(value)
}

/// Process `$include` directives recursively
fn process_includes(value: &mut YamlValue, base_dir: &Path, depth: usize) -> Result<()> {
    match value {
        YamlValue::Mapping(map) => {
            if let Some(YamlValue::String(include)) = map.get(INCLUDE_KEY) {
                let included = load_with_depth(&base_dir.join(include), depth + 1)?;
                *value = included;
                return Ok(());
            }
            for (_, v) in map.iter_mut() {
                process_includes(v, base_dir, depth)?;
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                process_includes(item, base_dir, depth)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Expand environment variables in the format `${ENV_VAR:default}`
fn expand_variables(value: &mut YamlValue) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s) {
                *s = expanded;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item);
            }
        }
        _ => {}
    }
}

/// Expand `${VAR}` and `${VAR:default}` references
///
/// Returns `None` when the string has nothing to expand.
fn expand_env_in_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let expanded = ENV_VAR_REGEX.replace_all(s, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
    });
    Some(expanded.into_owned())
}
