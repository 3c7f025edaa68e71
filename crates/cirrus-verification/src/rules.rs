//! Built-in rule constructors
//!
//! Each function returns a [`ValidationRule`] with a generated description;
//! use [`ValidationRule::with_description`] to override it.

use crate::rule::{RuleError, ValidationRule, Verdict};
use cirrus_core::{ResolvedResource, ResolvedTemplate, Value};

fn missing_resource(logical_id: &str) -> Verdict {
    Verdict::Fail(format!("resource '{}' is not present", logical_id))
}

fn with_resource<F>(template: &ResolvedTemplate, logical_id: &str, check: F) -> Result<Verdict, RuleError>
where
    F: FnOnce(&ResolvedResource) -> Result<Verdict, RuleError>,
{
    match template.resource(logical_id) {
        Some(resource) => check(resource),
        None => Ok(missing_resource(logical_id)),
    }
}

pub fn resource_exists(id: &str, logical_id: &str, resource_type: Option<&str>) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let resource_type = resource_type.map(str::to_string);
    let description = match &resource_type {
        Some(ty) => format!("resource {} of type {} is present", logical_id, ty),
        None => format!("resource {} is present", logical_id),
    };
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            Ok(match &resource_type {
                Some(ty) => Verdict::check(&resource.resource_type == ty, || {
                    format!(
                        "resource '{}' has type {}, expected {}",
                        logical_id, resource.resource_type, ty
                    )
                }),
                None => Verdict::Pass,
            })
        })
    })
}

pub fn resource_count(id: &str, resource_type: &str, min: Option<usize>, max: Option<usize>) -> ValidationRule {
    let resource_type = resource_type.to_string();
    let description = format!(
        "number of {} resources is within [{}, {}]",
        resource_type,
        min.map_or("-".to_string(), |m| m.to_string()),
        max.map_or("-".to_string(), |m| m.to_string())
    );
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        let count = template.resources_of_type(&resource_type).count();
        let within = min.map_or(true, |m| count >= m) && max.map_or(true, |m| count <= m);
        Ok(Verdict::check(within, || {
            format!("found {} {} resources", count, resource_type)
        }))
    })
}

pub fn property_equals(id: &str, logical_id: &str, property: &str, expected: Value) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let property = property.to_string();
    let description = format!("{}.{} equals {}", logical_id, property, expected);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            Ok(match resource.property(&property) {
                Some(actual) => Verdict::check(actual == &expected, || {
                    format!("{}.{} is {}, expected {}", logical_id, property, actual, expected)
                }),
                None => Verdict::Fail(format!("{}.{} is not set", logical_id, property)),
            })
        })
    })
}

pub fn property_in(id: &str, logical_id: &str, property: &str, allowed: Vec<Value>) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let property = property.to_string();
    let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
    let description = format!("{}.{} is one of [{}]", logical_id, property, listed.join(", "));
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            Ok(match resource.property(&property) {
                Some(actual) => Verdict::check(allowed.contains(actual), || {
                    format!(
                        "{}.{} is {}, expected one of [{}]",
                        logical_id,
                        property,
                        actual,
                        listed.join(", ")
                    )
                }),
                None => Verdict::Fail(format!("{}.{} is not set", logical_id, property)),
            })
        })
    })
}

pub fn property_range(
    id: &str,
    logical_id: &str,
    property: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let property = property.to_string();
    let description = format!(
        "{}.{} is within [{}, {}]",
        logical_id,
        property,
        min.map_or("-".to_string(), |m| m.to_string()),
        max.map_or("-".to_string(), |m| m.to_string())
    );
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            let Some(actual) = resource.property(&property) else {
                return Ok(Verdict::Fail(format!("{}.{} is not set", logical_id, property)));
            };
            let number = match actual {
                Value::Int(_) | Value::Float(_) | Value::String(_) => actual.as_f64(),
                _ => None,
            }
            .ok_or_else(|| RuleError::TypeMismatch {
                path: format!("{}.{}", logical_id, property),
                expected: "number".to_string(),
                found: actual.type_name().to_string(),
            })?;
            let within = min.map_or(true, |m| number >= m) && max.map_or(true, |m| number <= m);
            Ok(Verdict::check(within, || {
                format!("{}.{} is {}, outside the allowed range", logical_id, property, actual)
            }))
        })
    })
}

/// A list property containing `item`, or a string property containing it as a substring.
pub fn property_contains(id: &str, logical_id: &str, property: &str, item: Value) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let property = property.to_string();
    let description = format!("{}.{} contains {}", logical_id, property, item);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            let contained = match resource.property(&property) {
                None => return Ok(Verdict::Fail(format!("{}.{} is not set", logical_id, property))),
                Some(Value::List(items)) => items.contains(&item),
                Some(Value::String(text)) => text.contains(&item.to_string()),
                Some(other) => {
                    return Err(RuleError::TypeMismatch {
                        path: format!("{}.{}", logical_id, property),
                        expected: "list or string".to_string(),
                        found: other.type_name().to_string(),
                    })
                }
            };
            Ok(Verdict::check(contained, || {
                format!("{}.{} does not contain {}", logical_id, property, item)
            }))
        })
    })
}

pub fn tag_present(id: &str, logical_id: &str, key: &str) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let key = key.to_string();
    let description = format!("{} is tagged with {}", logical_id, key);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            Ok(Verdict::check(resource.tag(&key).is_some(), || {
                format!("{} has no '{}' tag", logical_id, key)
            }))
        })
    })
}

pub fn tag_equals(id: &str, logical_id: &str, key: &str, value: Value) -> ValidationRule {
    let logical_id = logical_id.to_string();
    let key = key.to_string();
    let description = format!("{} tag {} equals {}", logical_id, key, value);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        with_resource(template, &logical_id, |resource| {
            Ok(match resource.tag(&key) {
                Some(actual) => Verdict::check(actual == &value, || {
                    format!("{} tag '{}' is {}, expected {}", logical_id, key, actual, value)
                }),
                None => Verdict::Fail(format!("{} has no '{}' tag", logical_id, key)),
            })
        })
    })
}

/// The output exists and is exported, optionally under a specific name.
pub fn export_present(id: &str, output: &str, name: Option<&str>) -> ValidationRule {
    let output = output.to_string();
    let name = name.map(str::to_string);
    let description = match &name {
        Some(name) => format!("output {} is exported as {}", output, name),
        None => format!("output {} is exported", output),
    };
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        let Some(resolved) = template.outputs.get(&output) else {
            return Ok(Verdict::Fail(format!("output '{}' is not present", output)));
        };
        Ok(match (&resolved.export_name, &name) {
            (None, _) => Verdict::Fail(format!("output '{}' has no export", output)),
            (Some(actual), Some(expected)) => Verdict::check(actual == expected, || {
                format!("output '{}' is exported as {}, expected {}", output, actual, expected)
            }),
            (Some(_), None) => Verdict::Pass,
        })
    })
}

pub fn output_exists(id: &str, output: &str) -> ValidationRule {
    let output = output.to_string();
    let description = format!("output {} is present", output);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        Ok(Verdict::check(template.outputs.contains_key(&output), || {
            format!("output '{}' is not present", output)
        }))
    })
}

/// `AllowedValues` of the parameter equals `values` as a multiset.
pub fn parameter_allowed_values(id: &str, parameter: &str, values: Vec<Value>) -> ValidationRule {
    let parameter = parameter.to_string();
    let listed: Vec<String> = values.iter().map(Value::to_string).collect();
    let description = format!("parameter {} allows exactly [{}]", parameter, listed.join(", "));
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        let Some(spec) = template.parameters.get(&parameter) else {
            return Ok(Verdict::Fail(format!("parameter '{}' is not declared", parameter)));
        };
        let Some(allowed) = &spec.allowed_values else {
            return Ok(Verdict::Fail(format!("parameter '{}' has no AllowedValues", parameter)));
        };
        let count = |list: &[Value], value: &Value| list.iter().filter(|v| *v == value).count();
        let same = allowed.len() == values.len()
            && values.iter().all(|v| count(allowed.as_slice(), v) == count(values.as_slice(), v));
        Ok(Verdict::check(same, || {
            let actual: Vec<String> = allowed.iter().map(Value::to_string).collect();
            format!(
                "parameter '{}' allows [{}], expected [{}]",
                parameter,
                actual.join(", "),
                listed.join(", ")
            )
        }))
    })
}

pub fn parameter_default(id: &str, parameter: &str, value: Value) -> ValidationRule {
    let parameter = parameter.to_string();
    let description = format!("parameter {} defaults to {}", parameter, value);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        let Some(spec) = template.parameters.get(&parameter) else {
            return Ok(Verdict::Fail(format!("parameter '{}' is not declared", parameter)));
        };
        Ok(match &spec.default {
            Some(actual) => Verdict::check(actual == &value, || {
                format!("parameter '{}' defaults to {}, expected {}", parameter, actual, value)
            }),
            None => Verdict::Fail(format!("parameter '{}' has no default", parameter)),
        })
    })
}

pub fn condition_defined(id: &str, condition: &str) -> ValidationRule {
    let condition = condition.to_string();
    let description = format!("condition {} is declared", condition);
    ValidationRule::new(id, description, move |template: &ResolvedTemplate| {
        Ok(Verdict::check(template.conditions.contains_key(&condition), || {
            format!("condition '{}' is not declared", condition)
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_core::{ResolvedOutput, ResolvedParameter, ResolvedTag};
    use indexmap::IndexMap;

    fn template() -> ResolvedTemplate {
        let mut properties = IndexMap::new();
        properties.insert("CapacityProviders".to_string(), Value::list(["FARGATE"]));
        properties.insert("RetentionInDays".to_string(), Value::Int(30));
        properties.insert("Name".to_string(), Value::string("services-dev"));

        let mut template = ResolvedTemplate::default();
        template.resources.insert(
            "Cluster".into(),
            ResolvedResource {
                logical_id: "Cluster".into(),
                resource_type: "AWS::ECS::Cluster".into(),
                properties,
                depends_on: vec![],
                tags: vec![ResolvedTag {
                    key: "Environment".into(),
                    value: Value::string("dev"),
                }],
                condition: None,
                deletion_policy: None,
                update_replace_policy: None,
                metadata: None,
            },
        );
        template.parameters.insert(
            "Environment".into(),
            ResolvedParameter {
                name: "Environment".into(),
                param_type: "String".into(),
                value: Some(Value::string("dev")),
                default: Some(Value::string("dev")),
                allowed_values: Some(vec![
                    Value::string("dev"),
                    Value::string("staging"),
                    Value::string("prod"),
                ]),
                no_echo: false,
            },
        );
        template.outputs.insert(
            "ClusterName".into(),
            ResolvedOutput {
                name: "ClusterName".into(),
                value: Value::string("<resolved:Cluster>"),
                export_name: Some("stack-ClusterName".into()),
                description: None,
            },
        );
        template.conditions.insert("IsProd".into(), Some(false));
        template
    }

    fn passes(rule: ValidationRule) -> bool {
        rule.evaluate(&template()).passed
    }

    #[test]
    fn test_capacity_providers_must_match_exactly() {
        let rule = property_equals(
            "capacity",
            "Cluster",
            "CapacityProviders",
            Value::list(["FARGATE", "FARGATE_SPOT"]),
        );
        let finding = rule.evaluate(&template());
        assert!(!finding.passed);
        assert!(finding.message.contains("expected [\"FARGATE\",\"FARGATE_SPOT\"]"));
    }

    #[test]
    fn test_resource_rules() {
        assert!(passes(resource_exists("r", "Cluster", Some("AWS::ECS::Cluster"))));
        assert!(!passes(resource_exists("r", "Cluster", Some("AWS::S3::Bucket"))));
        assert!(!passes(resource_exists("r", "Missing", None)));
        assert!(passes(resource_count("r", "AWS::ECS::Cluster", Some(1), Some(1))));
        assert!(!passes(resource_count("r", "AWS::ECS::Cluster", Some(2), None)));
    }

    #[test]
    fn test_property_rules() {
        assert!(passes(property_in(
            "p",
            "Cluster",
            "RetentionInDays",
            vec![Value::Int(7), Value::Int(30)]
        )));
        assert!(passes(property_range("p", "Cluster", "RetentionInDays", Some(7.0), Some(90.0))));
        assert!(!passes(property_range("p", "Cluster", "RetentionInDays", Some(60.0), None)));
        assert!(passes(property_contains("p", "Cluster", "CapacityProviders", Value::string("FARGATE"))));
        assert!(passes(property_contains("p", "Cluster", "Name", Value::string("dev"))));
        assert!(!passes(property_contains("p", "Cluster", "Missing", Value::string("x"))));
    }

    #[test]
    fn test_type_mismatch_is_a_rule_error() {
        let finding = property_range("p", "Cluster", "CapacityProviders", Some(0.0), None).evaluate(&template());
        assert!(!finding.passed);
        assert!(finding.message.starts_with("rule error: Cluster.CapacityProviders is a list"));
    }

    #[test]
    fn test_tag_rules() {
        assert!(passes(tag_present("t", "Cluster", "Environment")));
        assert!(!passes(tag_present("t", "Cluster", "Owner")));
        assert!(passes(tag_equals("t", "Cluster", "Environment", Value::string("dev"))));
        assert!(!passes(tag_equals("t", "Cluster", "Environment", Value::string("prod"))));
    }

    #[test]
    fn test_output_and_parameter_rules() {
        assert!(passes(export_present("o", "ClusterName", None)));
        assert!(passes(export_present("o", "ClusterName", Some("stack-ClusterName"))));
        assert!(!passes(export_present("o", "ClusterName", Some("other"))));
        assert!(passes(output_exists("o", "ClusterName")));
        assert!(!passes(output_exists("o", "AlarmName")));

        assert!(passes(parameter_allowed_values(
            "p",
            "Environment",
            vec![Value::string("prod"), Value::string("dev"), Value::string("staging")]
        )));
        assert!(!passes(parameter_allowed_values(
            "p",
            "Environment",
            vec![Value::string("dev"), Value::string("prod")]
        )));
        assert!(passes(parameter_default("p", "Environment", Value::string("dev"))));
        assert!(passes(condition_defined("c", "IsProd")));
        assert!(!passes(condition_defined("c", "IsDev")));
    }

    #[test]
    fn test_allowed_values_count_duplicates() {
        let mut template = template();
        if let Some(spec) = template.parameters.get_mut("Environment") {
            spec.allowed_values = Some(vec![
                Value::string("dev"),
                Value::string("prod"),
                Value::string("prod"),
            ]);
        }
        let check = |values: Vec<&str>| {
            parameter_allowed_values("p", "Environment", values.into_iter().map(Value::string).collect())
                .evaluate(&template)
                .passed
        };
        assert!(check(vec!["prod", "dev", "prod"]));
        assert!(!check(vec!["dev", "dev", "prod"]));
        assert!(!check(vec!["dev", "prod"]));
    }
}
