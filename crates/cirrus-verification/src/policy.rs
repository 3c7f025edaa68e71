//! Declarative rule documents
//!
//! A policy is a YAML or JSON document listing rules by id, each with one
//! built-in check:
//!
//! ```yaml
//! rules:
//!   - id: cluster-present
//!     description: the template declares an ECS cluster
//!     severity: error
//!     check:
//!       resource_exists:
//!         resource: Cluster
//!         type: AWS::ECS::Cluster
//! ```

use crate::error::{Result, VerificationError};
use crate::rule::{Severity, ValidationRule};
use crate::rules;
use crate::ruleset::RuleSet;
use cirrus_core::Value;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    pub check: Check,
}

/// The built-in checks, keyed by their snake_case name in a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    ResourceExists {
        resource: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        resource_type: Option<String>,
    },
    ResourceCount {
        #[serde(rename = "type")]
        resource_type: String,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    PropertyEquals {
        resource: String,
        property: String,
        value: Value,
    },
    PropertyIn {
        resource: String,
        property: String,
        values: Vec<Value>,
    },
    PropertyRange {
        resource: String,
        property: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    PropertyContains {
        resource: String,
        property: String,
        value: Value,
    },
    TagPresent {
        resource: String,
        key: String,
    },
    TagEquals {
        resource: String,
        key: String,
        value: Value,
    },
    ExportPresent {
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    OutputExists {
        output: String,
    },
    ParameterAllowedValues {
        parameter: String,
        values: Vec<Value>,
    },
    ParameterDefault {
        parameter: String,
        value: Value,
    },
    ConditionDefined {
        condition: String,
    },
}

impl PolicyDocument {
    /// Parse a YAML policy.
    ///
    /// The document goes through `serde_json::Value` so checks can be written
    /// in the plain `name: {fields}` mapping form.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_yaml::from_str(source)?;
        Ok(serde_json::from_value(raw)?)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn compile(&self) -> Result<RuleSet> {
        let rules = self
            .rules
            .iter()
            .map(RuleSpec::compile)
            .collect::<Result<Vec<_>>>()?;
        debug!(rules = rules.len(), "compiled policy");
        RuleSet::new(rules)
    }
}

impl RuleSpec {
    pub fn compile(&self) -> Result<ValidationRule> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            return Err(VerificationError::Policy {
                rule: self.id.clone(),
                message: "rule id must not be empty".to_string(),
            });
        }
        let invalid = |message: &str| VerificationError::Policy {
            rule: self.id.clone(),
            message: message.to_string(),
        };

        let rule = match &self.check {
            Check::ResourceExists {
                resource,
                resource_type,
            } => rules::resource_exists(id, resource, resource_type.as_deref()),
            Check::ResourceCount {
                resource_type,
                min,
                max,
            } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(invalid("min is greater than max"));
                    }
                }
                rules::resource_count(id, resource_type, *min, *max)
            }
            Check::PropertyEquals {
                resource,
                property,
                value,
            } => rules::property_equals(id, resource, property, value.clone()),
            Check::PropertyIn {
                resource,
                property,
                values,
            } => {
                if values.is_empty() {
                    return Err(invalid("values must not be empty"));
                }
                rules::property_in(id, resource, property, values.clone())
            }
            Check::PropertyRange {
                resource,
                property,
                min,
                max,
            } => {
                match (min, max) {
                    (None, None) => return Err(invalid("a range needs min, max or both")),
                    (Some(min), Some(max)) if min > max => {
                        return Err(invalid("min is greater than max"))
                    }
                    _ => {}
                }
                rules::property_range(id, resource, property, *min, *max)
            }
            Check::PropertyContains {
                resource,
                property,
                value,
            } => rules::property_contains(id, resource, property, value.clone()),
            Check::TagPresent { resource, key } => rules::tag_present(id, resource, key),
            Check::TagEquals {
                resource,
                key,
                value,
            } => rules::tag_equals(id, resource, key, value.clone()),
            Check::ExportPresent { output, name } => {
                rules::export_present(id, output, name.as_deref())
            }
            Check::OutputExists { output } => rules::output_exists(id, output),
            Check::ParameterAllowedValues { parameter, values } => {
                rules::parameter_allowed_values(id, parameter, values.clone())
            }
            Check::ParameterDefault { parameter, value } => {
                rules::parameter_default(id, parameter, value.clone())
            }
            Check::ConditionDefined { condition } => rules::condition_defined(id, condition),
        };

        let rule = rule.with_severity(self.severity);
        Ok(match &self.description {
            Some(description) => rule.with_description(description.clone()),
            None => rule,
        })
    }
}

impl RuleSet {
    /// Compile a YAML policy document.
    pub fn from_yaml(source: &str) -> Result<Self> {
        PolicyDocument::from_yaml(source)?.compile()
    }

    /// Compile a JSON policy document.
    pub fn from_json(source: &str) -> Result<Self> {
        PolicyDocument::from_json(source)?.compile()
    }
}
