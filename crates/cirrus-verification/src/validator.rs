//! Main validation orchestrator
//!
//! Resolves a template and runs every rule of a set against the result.

use crate::error::Result;
use crate::reporter::Report;
use crate::rule::{Finding, ValidationRule};
use crate::ruleset::RuleSet;
use cirrus_core::{ResolvedTemplate, Template, Value};
use cirrus_resolver::Resolver;
use indexmap::IndexMap;
use tracing::{debug, info, instrument};

/// Evaluate every rule against a resolved template, in rule order.
///
/// A rule that errors or panics yields a failed finding; the remaining rules
/// still run.
#[instrument(skip_all, fields(rules = rules.len()))]
pub fn validate(template: &ResolvedTemplate, rules: &[ValidationRule]) -> Vec<Finding> {
    rules
        .iter()
        .map(|rule| {
            let finding = rule.evaluate(template);
            debug!(rule = %finding.rule_id, passed = finding.passed, "evaluated rule");
            finding
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: RuleSet,
    resolver: Resolver,
}

impl Validator {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            resolver: Resolver::default(),
        }
    }

    /// Use a resolver with a non-default configuration for [`Validator::check`].
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn validate(&self, template: &ResolvedTemplate) -> Report {
        let report = Report::new(validate(template, self.rules.rules()));
        info!(
            passed = report.summary.passed,
            failed = report.summary.failed,
            success = report.summary.success,
            "validation finished"
        );
        report
    }

    /// Resolve `template` against `parameters`, then validate the result.
    pub fn check(&self, template: &Template, parameters: &IndexMap<String, Value>) -> Result<Report> {
        let resolved = self.resolver.resolve(template, parameters)?;
        Ok(self.validate(&resolved))
    }
}
