//! Rules, verdicts and findings

use cirrus_core::ResolvedTemplate;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// How much a failing rule matters. Only `Error` fails a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Outcome of a predicate that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    pub fn check(condition: bool, failure: impl FnOnce() -> String) -> Self {
        if condition {
            Verdict::Pass
        } else {
            Verdict::Fail(failure())
        }
    }
}

/// A predicate that could not reach a verdict.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("{path} is a {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("{0}")]
    Evaluation(String),
}

pub type Predicate =
    Arc<dyn Fn(&ResolvedTemplate) -> Result<Verdict, RuleError> + Send + Sync>;

/// A named check over a resolved template.
#[derive(Clone)]
pub struct ValidationRule {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    predicate: Predicate,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

impl ValidationRule {
    pub fn new<F>(id: impl Into<String>, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ResolvedTemplate) -> Result<Verdict, RuleError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            description: description.into(),
            severity: Severity::default(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Run the predicate. Errors and panics become failing findings.
    pub fn evaluate(&self, template: &ResolvedTemplate) -> Finding {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.predicate)(template)));
        match outcome {
            Ok(Ok(Verdict::Pass)) => Finding::new(self, true, self.description.clone()),
            Ok(Ok(Verdict::Fail(message))) => Finding::new(self, false, message),
            Ok(Err(error)) => Finding::new(self, false, format!("rule error: {}", error)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(rule = %self.id, %message, "rule predicate panicked");
                Finding::new(self, false, format!("rule panicked: {}", message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// One rule's verdict against one resolved template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(rule: &ValidationRule, passed: bool, message: String) -> Self {
        Self {
            rule_id: rule.id.clone(),
            passed,
            severity: rule.severity,
            message,
        }
    }

    /// A failed finding that fails the report.
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }
}
