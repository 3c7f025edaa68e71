//! Rendering results for the terminal or a file

use anyhow::{Context, Result};
use cirrus_core::{ResolvedTemplate, Template};
use cirrus_verification::Report;
use clap::ValueEnum;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

/// A short listing of what a template declares.
pub fn summarize(template: &Template) -> String {
    let mut out = String::new();
    if let Some(description) = &template.description {
        let _ = writeln!(out, "Description: {}", description);
    }

    let names = |keys: Vec<&String>| {
        keys.iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = writeln!(
        out,
        "Parameters ({}): {}",
        template.parameters.len(),
        names(template.parameters.keys().collect())
    );
    let _ = writeln!(
        out,
        "Mappings ({}): {}",
        template.mappings.len(),
        names(template.mappings.keys().collect())
    );
    let _ = writeln!(
        out,
        "Conditions ({}): {}",
        template.conditions.len(),
        names(template.conditions.keys().collect())
    );

    let _ = writeln!(out, "Resources ({}):", template.resources.len());
    for resource in template.resources.values() {
        let _ = write!(out, "  {} ({})", resource.logical_id, resource.resource_type);
        if let Some(condition) = &resource.condition {
            let _ = write!(out, " if {}", condition);
        }
        if !resource.depends_on.is_empty() {
            let _ = write!(out, " after {}", resource.depends_on.join(", "));
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Outputs ({}): {}",
        template.outputs.len(),
        names(template.outputs.keys().collect())
    );
    out
}

pub fn render_resolved(resolved: &ResolvedTemplate, format: Format) -> Result<String> {
    match format {
        Format::Yaml => resolved.to_yaml().context("Failed to render YAML"),
        Format::Json => resolved.to_json().context("Failed to render JSON"),
    }
}

pub fn render_report(report: &Report, json: bool) -> Result<String> {
    if json {
        report.to_json().context("Failed to render JSON report")
    } else {
        Ok(report.to_markdown())
    }
}

/// Write `contents` to `path`, or print it when no path is given.
pub fn emit(contents: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Report written to: {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::Resource;

    #[test]
    fn test_summary_lists_resources() {
        let mut template = Template::default();
        let mut alarm = Resource::new("Alarm", "AWS::CloudWatch::Alarm");
        alarm.condition = Some("IsProd".into());
        alarm.depends_on = vec!["Cluster".into()];
        template
            .resources
            .insert("Cluster".into(), Resource::new("Cluster", "AWS::ECS::Cluster"));
        template.resources.insert("Alarm".into(), alarm);

        let summary = summarize(&template);
        assert!(summary.contains("Resources (2):\n  Cluster (AWS::ECS::Cluster)\n"));
        assert!(summary.contains("  Alarm (AWS::CloudWatch::Alarm) if IsProd after Cluster\n"));
        assert!(summary.contains("Parameters (0): \n"));
    }
}
