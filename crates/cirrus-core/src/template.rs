//! Typed, unresolved template model

use crate::error::{Result, TemplateError};
use crate::node::{Node, Scalar};
use crate::path;
use indexmap::IndexMap;

/// A template as written: intrinsic functions are still unevaluated.
///
/// Built once from a document tree and never mutated by resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub format_version: Option<String>,
    pub description: Option<String>,
    pub transform: Option<Node>,
    pub metadata: Option<Node>,
    pub parameters: IndexMap<String, ParameterSpec>,
    /// Map name -> top-level key -> second-level key -> value.
    pub mappings: IndexMap<String, IndexMap<String, IndexMap<String, Node>>>,
    pub conditions: IndexMap<String, Node>,
    pub resources: IndexMap<String, Resource>,
    pub outputs: IndexMap<String, OutputSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: String,
    pub description: Option<String>,
    pub default: Option<Node>,
    pub allowed_values: Option<Vec<Scalar>>,
    pub allowed_pattern: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub no_echo: bool,
    pub constraint_description: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: None,
            default: None,
            allowed_values: None,
            allowed_pattern: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            no_echo: false,
            constraint_description: None,
        }
    }

    /// How values of this parameter are shaped after coercion.
    pub fn kind(&self) -> ParameterKind {
        match self.param_type.as_str() {
            "Number" => ParameterKind::Number,
            "List<Number>" => ParameterKind::NumberList,
            "CommaDelimitedList" => ParameterKind::StringList,
            ty if ty.starts_with("List<") || ty.contains("::List<") => ParameterKind::StringList,
            _ => ParameterKind::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Number,
    StringList,
    NumberList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub key: String,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub logical_id: String,
    pub resource_type: String,
    pub properties: IndexMap<String, Node>,
    /// Ordered and free of duplicates.
    pub depends_on: Vec<String>,
    pub tags: Vec<Tag>,
    pub condition: Option<String>,
    pub deletion_policy: Option<String>,
    pub update_replace_policy: Option<String>,
    pub metadata: Option<Node>,
}

impl Resource {
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            tags: Vec::new(),
            condition: None,
            deletion_policy: None,
            update_replace_policy: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub name: String,
    pub value: Node,
    pub export_name: Option<Node>,
    pub description: Option<String>,
    pub condition: Option<String>,
}

impl Template {
    /// Static cross-reference pass.
    ///
    /// Checks `DependsOn` targets and the condition names attached to
    /// resources and outputs. References made through intrinsic functions
    /// are checked when they are evaluated, so untaken `If` branches never
    /// fail here.
    pub fn check_references(&self) -> Result<()> {
        for (id, resource) in &self.resources {
            let at = path::child("Resources", id);
            for (i, target) in resource.depends_on.iter().enumerate() {
                if !self.resources.contains_key(target) {
                    return Err(TemplateError::undefined(
                        path::item(&path::child(&at, "DependsOn"), i),
                        target,
                    ));
                }
            }
            if let Some(condition) = &resource.condition {
                if !self.conditions.contains_key(condition) {
                    return Err(TemplateError::undefined(
                        path::child(&at, "Condition"),
                        condition,
                    ));
                }
            }
        }

        for (name, output) in &self.outputs {
            if let Some(condition) = &output.condition {
                if !self.conditions.contains_key(condition) {
                    return Err(TemplateError::undefined(
                        path::child(&path::child("Outputs", name), "Condition"),
                        condition,
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_references_reports_missing_dependency() {
        let mut template = Template::default();
        let mut service = Resource::new("Service", "AWS::ECS::Service");
        service.depends_on.push("Cluster".to_string());
        template.resources.insert("Service".to_string(), service);

        let err = template.check_references().unwrap_err();
        assert_eq!(
            err,
            TemplateError::undefined("Resources.Service.DependsOn[0]", "Cluster")
        );
    }

    #[test]
    fn test_check_references_reports_missing_condition() {
        let mut template = Template::default();
        template.outputs.insert(
            "Arn".to_string(),
            OutputSpec {
                name: "Arn".to_string(),
                value: Node::string("x"),
                export_name: None,
                description: None,
                condition: Some("IsProd".to_string()),
            },
        );
        let err = template.check_references().unwrap_err();
        assert_eq!(err.path(), Some("Outputs.Arn.Condition"));
    }

    #[test]
    fn test_parameter_kind() {
        assert_eq!(ParameterSpec::new("a", "Number").kind(), ParameterKind::Number);
        assert_eq!(
            ParameterSpec::new("b", "List<AWS::EC2::Subnet::Id>").kind(),
            ParameterKind::StringList
        );
        assert_eq!(
            ParameterSpec::new("c", "AWS::SSM::Parameter::Value<String>").kind(),
            ParameterKind::String
        );
        assert_eq!(
            ParameterSpec::new("d", "List<Number>").kind(),
            ParameterKind::NumberList
        );
    }
}
