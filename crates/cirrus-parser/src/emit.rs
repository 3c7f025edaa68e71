//! Canonical serialisation of a [`Template`] back to tagged YAML
//!
//! Parsing the emitted text and rebuilding yields an equal template.

use crate::registry::{ArityKind, TagRegistry};
use cirrus_core::{Intrinsic, Node, OutputSpec, ParameterSpec, Resource, Scalar, Template};
use indexmap::IndexMap;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value as Yaml};

/// Lower a template to the document tree it would parse from.
pub fn template_to_node(template: &Template) -> Node {
    let mut root = IndexMap::new();

    if let Some(version) = &template.format_version {
        root.insert("AWSTemplateFormatVersion".to_string(), Node::string(version));
    }
    if let Some(description) = &template.description {
        root.insert("Description".to_string(), Node::string(description));
    }
    if let Some(metadata) = &template.metadata {
        root.insert("Metadata".to_string(), metadata.clone());
    }
    if let Some(transform) = &template.transform {
        root.insert("Transform".to_string(), transform.clone());
    }
    if !template.parameters.is_empty() {
        let params = template
            .parameters
            .iter()
            .map(|(name, spec)| (name.clone(), parameter_node(spec)))
            .collect();
        root.insert("Parameters".to_string(), Node::Mapping(params));
    }
    if !template.mappings.is_empty() {
        let mappings = template
            .mappings
            .iter()
            .map(|(name, tops)| {
                let tops = tops
                    .iter()
                    .map(|(top, entries)| (top.clone(), Node::Mapping(entries.clone())))
                    .collect();
                (name.clone(), Node::Mapping(tops))
            })
            .collect();
        root.insert("Mappings".to_string(), Node::Mapping(mappings));
    }
    if !template.conditions.is_empty() {
        root.insert(
            "Conditions".to_string(),
            Node::Mapping(template.conditions.clone()),
        );
    }
    if !template.resources.is_empty() {
        let resources = template
            .resources
            .iter()
            .map(|(id, resource)| (id.clone(), resource_node(resource)))
            .collect();
        root.insert("Resources".to_string(), Node::Mapping(resources));
    }
    if !template.outputs.is_empty() {
        let outputs = template
            .outputs
            .iter()
            .map(|(name, output)| (name.clone(), output_node(output)))
            .collect();
        root.insert("Outputs".to_string(), Node::Mapping(outputs));
    }

    Node::Mapping(root)
}

fn parameter_node(spec: &ParameterSpec) -> Node {
    let mut body = IndexMap::new();
    body.insert("Type".to_string(), Node::string(&spec.param_type));
    if let Some(description) = &spec.description {
        body.insert("Description".to_string(), Node::string(description));
    }
    if let Some(default) = &spec.default {
        body.insert("Default".to_string(), default.clone());
    }
    if let Some(allowed) = &spec.allowed_values {
        body.insert(
            "AllowedValues".to_string(),
            Node::Sequence(allowed.iter().cloned().map(Node::Scalar).collect()),
        );
    }
    if let Some(pattern) = &spec.allowed_pattern {
        body.insert("AllowedPattern".to_string(), Node::string(pattern));
    }
    if let Some(min) = spec.min_value {
        body.insert("MinValue".to_string(), Node::Scalar(Scalar::Float(min)));
    }
    if let Some(max) = spec.max_value {
        body.insert("MaxValue".to_string(), Node::Scalar(Scalar::Float(max)));
    }
    if let Some(min) = spec.min_length {
        body.insert("MinLength".to_string(), Node::Scalar(Scalar::Int(min as i64)));
    }
    if let Some(max) = spec.max_length {
        body.insert("MaxLength".to_string(), Node::Scalar(Scalar::Int(max as i64)));
    }
    if spec.no_echo {
        body.insert("NoEcho".to_string(), Node::Scalar(Scalar::Bool(true)));
    }
    if let Some(text) = &spec.constraint_description {
        body.insert("ConstraintDescription".to_string(), Node::string(text));
    }
    Node::Mapping(body)
}

fn resource_node(resource: &Resource) -> Node {
    let mut body = IndexMap::new();
    body.insert("Type".to_string(), Node::string(&resource.resource_type));
    if let Some(condition) = &resource.condition {
        body.insert("Condition".to_string(), Node::string(condition));
    }
    if !resource.depends_on.is_empty() {
        body.insert(
            "DependsOn".to_string(),
            Node::Sequence(resource.depends_on.iter().map(Node::string).collect()),
        );
    }
    if let Some(policy) = &resource.deletion_policy {
        body.insert("DeletionPolicy".to_string(), Node::string(policy));
    }
    if let Some(policy) = &resource.update_replace_policy {
        body.insert("UpdateReplacePolicy".to_string(), Node::string(policy));
    }
    if let Some(metadata) = &resource.metadata {
        body.insert("Metadata".to_string(), metadata.clone());
    }
    if !resource.properties.is_empty() {
        body.insert(
            "Properties".to_string(),
            Node::Mapping(resource.properties.clone()),
        );
    }
    Node::Mapping(body)
}

fn output_node(output: &OutputSpec) -> Node {
    let mut body = IndexMap::new();
    if let Some(description) = &output.description {
        body.insert("Description".to_string(), Node::string(description));
    }
    if let Some(condition) = &output.condition {
        body.insert("Condition".to_string(), Node::string(condition));
    }
    body.insert("Value".to_string(), output.value.clone());
    if let Some(name) = &output.export_name {
        let mut export = IndexMap::new();
        export.insert("Name".to_string(), name.clone());
        body.insert("Export".to_string(), Node::Mapping(export));
    }
    Node::Mapping(body)
}

/// Convert a node tree to a `serde_yaml` value, writing intrinsics as short-form tags.
pub fn node_to_yaml(node: &Node, registry: &TagRegistry) -> Yaml {
    match node {
        Node::Scalar(Scalar::Null) => Yaml::Null,
        Node::Scalar(Scalar::Bool(b)) => Yaml::Bool(*b),
        Node::Scalar(Scalar::Int(i)) => Yaml::Number((*i).into()),
        Node::Scalar(Scalar::Float(f)) => Yaml::Number((*f).into()),
        Node::Scalar(Scalar::Str(s)) => Yaml::String(s.clone()),
        Node::Sequence(items) => {
            Yaml::Sequence(items.iter().map(|n| node_to_yaml(n, registry)).collect())
        }
        Node::Mapping(map) => {
            let mut mapping = Mapping::with_capacity(map.len());
            for (key, value) in map {
                mapping.insert(Yaml::String(key.clone()), node_to_yaml(value, registry));
            }
            Yaml::Mapping(mapping)
        }
        Node::Intrinsic(intrinsic) => intrinsic_to_yaml(intrinsic, registry),
    }
}

fn intrinsic_to_yaml(intrinsic: &Intrinsic, registry: &TagRegistry) -> Yaml {
    let tag = intrinsic.kind.tag();
    let single_value = match intrinsic.operands.as_slice() {
        [Node::Sequence(_)] | [Node::Intrinsic(_)] => None,
        [operand] => Some(operand),
        _ => None,
    };

    let value = match single_value {
        Some(operand) if registry.contains(tag, ArityKind::Scalar) => node_to_yaml(operand, registry),
        _ => Yaml::Sequence(
            intrinsic
                .operands
                .iter()
                .map(|n| node_to_yaml(n, registry))
                .collect(),
        ),
    };

    Yaml::Tagged(Box::new(TaggedValue {
        tag: Tag::new(tag),
        value,
    }))
}

/// Serialise a template as YAML using the default registry's tag forms.
pub fn to_yaml(template: &Template) -> Result<String, serde_yaml::Error> {
    to_yaml_with(template, &TagRegistry::with_defaults())
}

pub fn to_yaml_with(template: &Template, registry: &TagRegistry) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&node_to_yaml(&template_to_node(template), registry))
}
