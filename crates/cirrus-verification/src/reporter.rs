//! Validation report generation
//!
//! Generates human-readable and machine-readable reports.

use crate::rule::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: String,
    pub summary: ReportSummary,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// False when any error-severity rule failed.
    pub success: bool,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Failed rules with error severity.
    pub errors: usize,
}

impl Report {
    pub fn new(findings: Vec<Finding>) -> Self {
        let passed = findings.iter().filter(|f| f.passed).count();
        let errors = findings.iter().filter(|f| f.is_blocking()).count();
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary {
                success: errors == 0,
                total: findings.len(),
                passed,
                failed: findings.len() - passed,
                errors,
            },
            findings,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.summary.success
    }

    /// The first failed finding that fails the report.
    pub fn first_failure(&self) -> Option<&Finding> {
        self.findings.iter().find(|f| f.is_blocking())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed)
    }

    pub fn finding(&self, rule_id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.rule_id == rule_id)
    }

    /// Generate markdown report
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Cirrus Validation Report\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", self.timestamp));

        md.push_str("## Summary\n\n");
        if self.summary.success {
            md.push_str("✅ **PASS** - No error-severity rule failed\n\n");
        } else {
            md.push_str("❌ **FAIL** - Some error-severity rules failed\n\n");
        }

        md.push_str(&format!("- **Rules:** {}\n", self.summary.total));
        md.push_str(&format!("- **Passed:** {}\n", self.summary.passed));
        md.push_str(&format!(
            "- **Failed:** {} ({} blocking)\n\n",
            self.summary.failed, self.summary.errors
        ));

        if self.findings.is_empty() {
            return md;
        }

        md.push_str("## Findings\n\n");
        md.push_str("| Status | Rule | Severity | Message |\n");
        md.push_str("|--------|------|----------|---------|\n");
        for finding in &self.findings {
            let status = match (finding.passed, finding.severity) {
                (true, _) => "✅",
                (false, Severity::Error) => "❌",
                (false, _) => "⚠️",
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                status,
                finding.rule_id,
                finding.severity,
                finding.message.replace('|', "\\|")
            ));
        }
        md.push('\n');

        md
    }

    /// Generate JSON report
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_markdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule_id: &str, passed: bool, severity: Severity) -> Finding {
        Finding {
            rule_id: rule_id.to_string(),
            passed,
            severity,
            message: format!("{} message", rule_id),
        }
    }

    #[test]
    fn test_report_generation() {
        let report = Report::new(vec![
            finding("a", true, Severity::Error),
            finding("b", true, Severity::Warning),
        ]);

        assert!(report.is_success());
        assert_eq!(report.summary.passed, 2);
        let markdown = report.to_markdown();
        assert!(markdown.contains("PASS"));
        assert!(markdown.contains("| ✅ | a | error | a message |"));
    }

    #[test]
    fn test_report_with_failures() {
        let report = Report::new(vec![
            finding("warn", false, Severity::Warning),
            finding("err", false, Severity::Error),
            finding("ok", true, Severity::Error),
        ]);

        assert!(!report.is_success());
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.first_failure().map(|f| f.rule_id.as_str()), Some("err"));
        assert_eq!(report.failures().count(), 2);

        let markdown = report.to_markdown();
        assert!(markdown.contains("FAIL"));
        assert!(markdown.contains("| ⚠️ | warn | warning |"));
    }

    #[test]
    fn test_warnings_alone_do_not_fail() {
        let report = Report::new(vec![finding("warn", false, Severity::Warning)]);
        assert!(report.is_success());
        assert!(report.first_failure().is_none());
    }

    #[test]
    fn test_json_report() {
        let report = Report::new(vec![finding("a", true, Severity::Info)]).with_timestamp("t0");
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["timestamp"], "t0");
        assert_eq!(json["summary"]["total"], 1);
        assert_eq!(json["findings"][0]["severity"], "info");
    }
}
