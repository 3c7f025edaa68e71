//! Reading templates, policies and parameters from the outside world

use anyhow::{bail, Context, Result};
use cirrus_core::{Template, Value};
use cirrus_parser::{Parser, ParserConfig, TagRegistry, TemplateParser};
use cirrus_verification::RuleSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn load_template(path: &Path, max_depth: Option<usize>) -> Result<Template> {
    let raw = read_bytes(path)?;
    let mut config = ParserConfig::default();
    if let Some(max_depth) = max_depth {
        config.max_depth = max_depth;
    }
    let parser = TemplateParser::new(TagRegistry::default(), config);
    let template = parser
        .parse(&raw)
        .with_context(|| format!("Failed to load template {}", path.display()))?;
    info!(
        path = %path.display(),
        resources = template.resources.len(),
        "loaded template"
    );
    Ok(template)
}

/// Load a policy; `.json` files are read as JSON, anything else as YAML.
pub fn load_policy(path: &Path) -> Result<RuleSet> {
    let raw = read_bytes(path)?;
    let source = String::from_utf8(raw)
        .with_context(|| format!("Policy {} is not valid UTF-8", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let rules = if is_json {
        RuleSet::from_json(&source)
    } else {
        RuleSet::from_yaml(&source)
    }
    .with_context(|| format!("Failed to load policy {}", path.display()))?;
    debug!(path = %path.display(), rules = rules.len(), "loaded policy");
    Ok(rules)
}

/// Parse a `KEY=VALUE` parameter assignment. The value stays a string;
/// the resolver coerces it to the declared parameter type.
pub fn parse_param(assignment: &str) -> Result<(String, Value)> {
    let Some((key, value)) = assignment.split_once('=') else {
        bail!("Invalid parameter '{}': expected KEY=VALUE", assignment);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid parameter '{}': empty name", assignment);
    }
    Ok((key.to_string(), Value::string(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("Environment=prod").unwrap(),
            ("Environment".to_string(), Value::string("prod"))
        );
        assert_eq!(
            parse_param("Subnets=a,b=c").unwrap(),
            ("Subnets".to_string(), Value::string("a,b=c"))
        );
        assert_eq!(parse_param("Empty=").unwrap().1, Value::string(""));
        assert!(parse_param("Environment").is_err());
        assert!(parse_param("=prod").is_err());
    }
}
