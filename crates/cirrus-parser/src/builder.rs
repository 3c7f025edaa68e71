//! Template model builder
//!
//! Purely structural: walks a [`Node`] tree and produces a typed
//! [`Template`]. Intrinsics stay unevaluated and cross-references are left
//! to [`Template::check_references`] and the resolver.

use cirrus_core::{
    path, Node, OutputSpec, ParameterSpec, Resource, Result, Scalar, Tag, Template,
    TemplateError,
};
use indexmap::IndexMap;
use tracing::{debug, instrument, warn};

const SECTIONS: [&str; 9] = [
    "AWSTemplateFormatVersion",
    "Description",
    "Metadata",
    "Transform",
    "Parameters",
    "Mappings",
    "Conditions",
    "Resources",
    "Outputs",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ModelBuilder;

impl ModelBuilder {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all)]
    pub fn build(&self, root: &Node) -> Result<Template> {
        let root = expect_mapping(root, "")?;
        let mut template = Template::default();

        for key in root.keys() {
            if !SECTIONS.contains(&key.as_str()) {
                warn!(section = %key, "ignoring unrecognised top-level section");
            }
        }

        if let Some(node) = root.get("AWSTemplateFormatVersion") {
            template.format_version = Some(expect_text(node, "AWSTemplateFormatVersion")?);
        }
        if let Some(node) = root.get("Description") {
            template.description = Some(expect_string(node, "Description")?);
        }
        template.metadata = root.get("Metadata").cloned();
        template.transform = root.get("Transform").cloned();

        if let Some(node) = root.get("Parameters") {
            for (name, spec) in expect_mapping(node, "Parameters")? {
                let at = path::child("Parameters", name);
                check_logical_id(name, &at)?;
                template
                    .parameters
                    .insert(name.clone(), build_parameter(name, spec, &at)?);
            }
        }

        if let Some(node) = root.get("Mappings") {
            template.mappings = build_mappings(node)?;
        }

        if let Some(node) = root.get("Conditions") {
            for (name, expr) in expect_mapping(node, "Conditions")? {
                check_logical_id(name, &path::child("Conditions", name))?;
                template.conditions.insert(name.clone(), expr.clone());
            }
        }

        if let Some(node) = root.get("Resources") {
            for (id, body) in expect_mapping(node, "Resources")? {
                let at = path::child("Resources", id);
                check_logical_id(id, &at)?;
                if template.parameters.contains_key(id) {
                    return Err(TemplateError::schema(
                        at,
                        "logical id unique across Parameters and Resources",
                        format!("'{}' is also declared as a parameter", id),
                    ));
                }
                template
                    .resources
                    .insert(id.clone(), build_resource(id, body, &at)?);
            }
        }

        if let Some(node) = root.get("Outputs") {
            for (name, body) in expect_mapping(node, "Outputs")? {
                let at = path::child("Outputs", name);
                check_logical_id(name, &at)?;
                template
                    .outputs
                    .insert(name.clone(), build_output(name, body, &at)?);
            }
        }

        debug!(
            parameters = template.parameters.len(),
            conditions = template.conditions.len(),
            resources = template.resources.len(),
            outputs = template.outputs.len(),
            "built template model"
        );
        Ok(template)
    }
}

/// Build with a default [`ModelBuilder`].
pub fn build(root: &Node) -> Result<Template> {
    ModelBuilder::new().build(root)
}

fn build_parameter(name: &str, node: &Node, at: &str) -> Result<ParameterSpec> {
    let body = expect_mapping(node, at)?;
    let param_type = match body.get("Type") {
        Some(node) => expect_string(node, &path::child(at, "Type"))?,
        None => return Err(TemplateError::schema(path::child(at, "Type"), "string", "nothing")),
    };

    let mut spec = ParameterSpec::new(name, param_type);
    spec.description = optional_string(body, "Description", at)?;
    spec.constraint_description = optional_string(body, "ConstraintDescription", at)?;
    spec.allowed_pattern = optional_string(body, "AllowedPattern", at)?;
    spec.min_value = optional_number(body, "MinValue", at)?;
    spec.max_value = optional_number(body, "MaxValue", at)?;
    spec.min_length = optional_length(body, "MinLength", at)?;
    spec.max_length = optional_length(body, "MaxLength", at)?;

    if let Some(node) = body.get("NoEcho") {
        let at = path::child(at, "NoEcho");
        spec.no_echo = match node {
            Node::Scalar(Scalar::Bool(b)) => *b,
            Node::Scalar(Scalar::Str(s)) if s.eq_ignore_ascii_case("true") => true,
            Node::Scalar(Scalar::Str(s)) if s.eq_ignore_ascii_case("false") => false,
            other => return Err(TemplateError::schema(at, "boolean", other.shape())),
        };
    }

    if let Some(node) = body.get("Default") {
        let at = path::child(at, "Default");
        match node {
            Node::Scalar(_) | Node::Sequence(_) => {
                node.to_literal(&at)?;
            }
            other => return Err(TemplateError::schema(at, "literal scalar or list", other.shape())),
        }
        spec.default = Some(node.clone());
    }

    if let Some(node) = body.get("AllowedValues") {
        let at = path::child(at, "AllowedValues");
        let items = expect_sequence(node, &at)?;
        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Node::Scalar(scalar) => Ok(scalar.clone()),
                other => Err(TemplateError::schema(path::item(&at, i), "scalar", other.shape())),
            })
            .collect::<Result<Vec<_>>>()?;
        spec.allowed_values = Some(values);
    }

    if let Some(pattern) = &spec.allowed_pattern {
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(TemplateError::schema(
                path::child(at, "AllowedPattern"),
                "valid regular expression",
                e.to_string(),
            ));
        }
    }

    check_parameter_invariants(&spec, at)?;
    Ok(spec)
}

fn check_parameter_invariants(spec: &ParameterSpec, at: &str) -> Result<()> {
    if let (Some(min), Some(max)) = (spec.min_value, spec.max_value) {
        if min > max {
            return Err(TemplateError::schema(
                path::child(at, "MinValue"),
                format!("MinValue <= MaxValue ({})", max),
                min.to_string(),
            ));
        }
    }
    if let (Some(min), Some(max)) = (spec.min_length, spec.max_length) {
        if min > max {
            return Err(TemplateError::schema(
                path::child(at, "MinLength"),
                format!("MinLength <= MaxLength ({})", max),
                min.to_string(),
            ));
        }
    }
    if let (Some(allowed), Some(Node::Scalar(default))) = (&spec.allowed_values, &spec.default) {
        let default_text = default.text();
        if !allowed.iter().any(|v| v.text() == default_text) {
            let listed: Vec<String> = allowed.iter().map(Scalar::text).collect();
            return Err(TemplateError::schema(
                path::child(at, "Default"),
                format!("one of [{}]", listed.join(", ")),
                default_text,
            ));
        }
    }
    Ok(())
}

fn build_mappings(
    node: &Node,
) -> Result<IndexMap<String, IndexMap<String, IndexMap<String, Node>>>> {
    let mut mappings = IndexMap::new();
    for (name, table) in expect_mapping(node, "Mappings")? {
        let at = path::child("Mappings", name);
        let mut tops = IndexMap::new();
        for (top, entries) in expect_mapping(table, &at)? {
            let top_at = path::child(&at, top);
            tops.insert(top.clone(), expect_mapping(entries, &top_at)?.clone());
        }
        mappings.insert(name.clone(), tops);
    }
    Ok(mappings)
}

fn build_resource(id: &str, node: &Node, at: &str) -> Result<Resource> {
    let body = expect_mapping(node, at)?;

    let resource_type = match body.get("Type") {
        Some(node) => expect_string(node, &path::child(at, "Type"))?,
        None => return Err(TemplateError::schema(path::child(at, "Type"), "string", "nothing")),
    };
    if !is_type_identifier(&resource_type) {
        return Err(TemplateError::schema(
            path::child(at, "Type"),
            "type identifier such as AWS::ECS::Cluster",
            format!("'{}'", resource_type),
        ));
    }

    let mut resource = Resource::new(id, resource_type);

    if let Some(node) = body.get("Properties") {
        let props_at = path::child(at, "Properties");
        resource.properties = expect_mapping(node, &props_at)?.clone();
        if let Some(tags) = resource.properties.get("Tags") {
            resource.tags = extract_tags(tags, &path::child(&props_at, "Tags"))?;
        }
    }

    if let Some(node) = body.get("DependsOn") {
        let dep_at = path::child(at, "DependsOn");
        let targets = match node {
            Node::Scalar(Scalar::Str(target)) => vec![target.clone()],
            Node::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| expect_string(item, &path::item(&dep_at, i)))
                .collect::<Result<Vec<_>>>()?,
            other => return Err(TemplateError::schema(dep_at, "string or list of strings", other.shape())),
        };
        for target in targets {
            if !resource.depends_on.contains(&target) {
                resource.depends_on.push(target);
            }
        }
    }

    resource.condition = optional_string(body, "Condition", at)?;
    resource.deletion_policy = optional_string(body, "DeletionPolicy", at)?;
    resource.update_replace_policy = optional_string(body, "UpdateReplacePolicy", at)?;
    resource.metadata = body.get("Metadata").cloned();

    Ok(resource)
}

/// Tags written literally as `[{Key, Value}]` or as a plain mapping.
///
/// A `Tags` value computed by an intrinsic is left for the resolver.
fn extract_tags(node: &Node, at: &str) -> Result<Vec<Tag>> {
    match node {
        Node::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let item_at = path::item(at, i);
                let entry = match item {
                    Node::Mapping(entry) => entry,
                    Node::Intrinsic(_) => return Ok(None),
                    other => return Err(TemplateError::schema(item_at, "tag mapping", other.shape())),
                };
                let key = match entry.get("Key") {
                    Some(key) => expect_string(key, &path::child(&item_at, "Key"))?,
                    None => {
                        return Err(TemplateError::schema(
                            path::child(&item_at, "Key"),
                            "string",
                            "nothing",
                        ))
                    }
                };
                let value = entry
                    .get("Value")
                    .cloned()
                    .unwrap_or(Node::Scalar(Scalar::Null));
                Ok(Some(Tag { key, value }))
            })
            .filter_map(|r| r.transpose())
            .collect(),
        Node::Mapping(map) => Ok(map
            .iter()
            .map(|(key, value)| Tag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()),
        Node::Intrinsic(_) => Ok(Vec::new()),
        other => Err(TemplateError::schema(at, "list of tags or mapping", other.shape())),
    }
}

fn build_output(name: &str, node: &Node, at: &str) -> Result<OutputSpec> {
    let body = expect_mapping(node, at)?;
    let value = body
        .get("Value")
        .cloned()
        .ok_or_else(|| TemplateError::schema(path::child(at, "Value"), "value", "nothing"))?;

    let export_name = match body.get("Export") {
        Some(export) => {
            let export_at = path::child(at, "Export");
            let export = expect_mapping(export, &export_at)?;
            Some(export.get("Name").cloned().ok_or_else(|| {
                TemplateError::schema(path::child(&export_at, "Name"), "export name", "nothing")
            })?)
        }
        None => None,
    };

    Ok(OutputSpec {
        name: name.to_string(),
        value,
        export_name,
        description: optional_string(body, "Description", at)?,
        condition: optional_string(body, "Condition", at)?,
    })
}

fn expect_mapping<'a>(node: &'a Node, at: &str) -> Result<&'a IndexMap<String, Node>> {
    node.as_mapping()
        .ok_or_else(|| TemplateError::schema(path::display(at), "mapping", node.shape()))
}

fn expect_sequence<'a>(node: &'a Node, at: &str) -> Result<&'a [Node]> {
    node.as_sequence()
        .ok_or_else(|| TemplateError::schema(path::display(at), "sequence", node.shape()))
}

fn expect_string(node: &Node, at: &str) -> Result<String> {
    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| TemplateError::schema(path::display(at), "string", node.shape()))
}

/// Any non-null scalar, rendered as text.
fn expect_text(node: &Node, at: &str) -> Result<String> {
    match node {
        Node::Scalar(Scalar::Null) => Err(TemplateError::schema(at, "scalar", "null")),
        Node::Scalar(scalar) => Ok(scalar.text()),
        other => Err(TemplateError::schema(at, "scalar", other.shape())),
    }
}

fn optional_string(body: &IndexMap<String, Node>, key: &str, at: &str) -> Result<Option<String>> {
    body.get(key)
        .map(|node| expect_string(node, &path::child(at, key)))
        .transpose()
}

fn optional_number(body: &IndexMap<String, Node>, key: &str, at: &str) -> Result<Option<f64>> {
    body.get(key)
        .map(|node| match node {
            Node::Scalar(scalar) => scalar
                .as_f64()
                .ok_or_else(|| TemplateError::schema(path::child(at, key), "number", scalar.type_name())),
            other => Err(TemplateError::schema(path::child(at, key), "number", other.shape())),
        })
        .transpose()
}

fn optional_length(body: &IndexMap<String, Node>, key: &str, at: &str) -> Result<Option<usize>> {
    optional_number(body, key, at)?
        .map(|n| {
            if n >= 0.0 && n.fract() == 0.0 {
                Ok(n as usize)
            } else {
                Err(TemplateError::schema(
                    path::child(at, key),
                    "non-negative integer",
                    n.to_string(),
                ))
            }
        })
        .transpose()
}

fn check_logical_id(id: &str, at: &str) -> Result<()> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(TemplateError::schema(at, "alphanumeric logical id", format!("'{}'", id)))
    }
}

/// `AWS::ECS::Cluster`, `Custom::Thing` or a dotted `acme.storage.Bucket`.
fn is_type_identifier(ty: &str) -> bool {
    let segments: Vec<&str> = if ty.contains("::") {
        ty.split("::").collect()
    } else {
        ty.split('.').collect()
    };
    segments.len() >= 2
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}
