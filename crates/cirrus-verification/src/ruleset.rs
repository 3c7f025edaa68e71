//! An immutable, shareable collection of rules

use crate::error::{Result, VerificationError};
use crate::rule::ValidationRule;
use std::collections::HashSet;
use std::sync::Arc;

/// Rules with unique ids, in declaration order.
///
/// Cloning is cheap; the rules are shared between clones.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Arc<[ValidationRule]>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = ValidationRule>) -> Result<Self> {
        let rules: Vec<ValidationRule> = rules.into_iter().collect();
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(VerificationError::DuplicateRule {
                    id: rule.id.clone(),
                });
            }
        }
        Ok(Self {
            rules: rules.into(),
        })
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationRule> {
        self.rules.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id.as_str())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: Arc::from(Vec::new()),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a ValidationRule;
    type IntoIter = std::slice::Iter<'a, ValidationRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
