//! The work behind each subcommand, kept free of argument parsing

use crate::config::ProjectConfig;
use crate::loader::{load_policy, load_template};
use crate::output::{render_resolved, summarize, Format};
use anyhow::{Context, Result};
use cirrus_parser::emit;
use cirrus_resolver::Resolver;
use cirrus_verification::{Report, Validator};
use std::path::PathBuf;
use tracing::info;

fn template_path(config: &ProjectConfig) -> Result<&PathBuf> {
    config
        .template
        .as_ref()
        .context("No template given: pass a path, set CIRRUS_TEMPLATE or add `template` to cirrus.toml")
}

/// Parse and build; print a summary, or the canonical YAML form.
pub fn parse(config: &ProjectConfig, canonical: bool) -> Result<String> {
    let template = load_template(template_path(config)?, config.max_depth)?;
    if canonical {
        emit::to_yaml(&template).context("Failed to emit template")
    } else {
        Ok(summarize(&template))
    }
}

pub fn resolve(config: &ProjectConfig, format: Format) -> Result<String> {
    let template = load_template(template_path(config)?, config.max_depth)?;
    let resolver = Resolver::new(config.resolver_config());
    let resolved = resolver
        .resolve(&template, &config.parameters)
        .context("Failed to resolve template")?;
    render_resolved(&resolved, format)
}

pub fn validate(config: &ProjectConfig) -> Result<Report> {
    let template = load_template(template_path(config)?, config.max_depth)?;
    let policy = config
        .policy
        .as_ref()
        .context("No policy given: pass --policy, set CIRRUS_POLICY or add `policy` to cirrus.toml")?;
    let rules = load_policy(policy)?;

    let validator = Validator::new(rules).with_resolver(Resolver::new(config.resolver_config()));
    let report = validator
        .check(&template, &config.parameters)
        .context("Failed to validate template")?;
    info!(success = report.is_success(), "validation complete");
    Ok(report)
}
