//! Template resolution against one parameter assignment

use crate::config::ResolverConfig;
use crate::constraints;
use crate::graph::DependencyGraph;
use cirrus_core::{
    path, resolved::tags_from_value, Node, ParameterSpec, ResolvedOutput, ResolvedParameter,
    ResolvedResource, ResolvedTemplate, Result, Template, TemplateError, Value,
};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::{debug, info, instrument, trace, warn};

/// Evaluates a [`Template`] into a [`ResolvedTemplate`].
///
/// A resolver holds only configuration, so one instance can be shared
/// between threads and reused for any number of templates.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[instrument(skip_all, fields(resources = template.resources.len(), supplied = parameters.len()))]
    pub fn resolve(
        &self,
        template: &Template,
        parameters: &IndexMap<String, Value>,
    ) -> Result<ResolvedTemplate> {
        template.check_references()?;

        for name in parameters.keys() {
            if !template.parameters.contains_key(name) {
                warn!(parameter = %name, "value supplied for undeclared parameter");
            }
        }

        let mut eval = Evaluation::new(template, parameters, &self.config);
        let mut resolved = ResolvedTemplate {
            format_version: template.format_version.clone(),
            description: template.description.clone(),
            ..Default::default()
        };

        for (name, spec) in &template.parameters {
            resolved
                .parameters
                .insert(name.clone(), eval.resolved_parameter(spec)?);
        }

        if let Some(metadata) = &template.metadata {
            resolved.metadata = eval.eval(metadata, "Metadata")?;
        }

        let mut graph = DependencyGraph::new();
        for (id, resource) in &template.resources {
            let at = path::child("Resources", id);
            if let Some(condition) = &resource.condition {
                if !eval.condition(condition, &path::child(&at, "Condition"))? {
                    debug!(resource = %id, condition = %condition, "resource omitted by condition");
                    continue;
                }
            }

            for (i, target) in resource.depends_on.iter().enumerate() {
                eval.require_resource(target, &path::item(&path::child(&at, "DependsOn"), i))?;
            }

            eval.current = Some(id.clone());
            let props_at = path::child(&at, "Properties");
            let mut properties = IndexMap::new();
            for (key, node) in &resource.properties {
                if let Some(value) = eval.eval(node, &path::child(&props_at, key))? {
                    properties.insert(key.clone(), value);
                }
            }
            let metadata = match &resource.metadata {
                Some(node) => eval.eval(node, &path::child(&at, "Metadata"))?,
                None => None,
            };
            eval.current = None;

            graph.add_resource(id);
            let tags = properties.get("Tags").map(tags_from_value).unwrap_or_default();
            resolved.resources.insert(
                id.clone(),
                ResolvedResource {
                    logical_id: id.clone(),
                    resource_type: resource.resource_type.clone(),
                    properties,
                    depends_on: resource.depends_on.clone(),
                    tags,
                    condition: resource.condition.clone(),
                    deletion_policy: resource.deletion_policy.clone(),
                    update_replace_policy: resource.update_replace_policy.clone(),
                    metadata,
                },
            );
            debug!(resource = %id, "resolved resource");
        }

        for (id, resource) in &resolved.resources {
            for target in &resource.depends_on {
                graph.add_dependency(id, target);
            }
        }
        for (from, to) in &eval.references {
            graph.add_dependency(from, to);
        }
        resolved.creation_order = graph.creation_order()?;

        for (name, output) in &template.outputs {
            let at = path::child("Outputs", name);
            if let Some(condition) = &output.condition {
                if !eval.condition(condition, &path::child(&at, "Condition"))? {
                    debug!(output = %name, condition = %condition, "output omitted by condition");
                    continue;
                }
            }
            let value = eval.operand(&output.value, &path::child(&at, "Value"))?;
            let export_name = match &output.export_name {
                Some(node) => {
                    let export_at = path::child(&path::child(&at, "Export"), "Name");
                    Some(eval.text_operand(node, &export_at)?)
                }
                None => None,
            };
            resolved.outputs.insert(
                name.clone(),
                ResolvedOutput {
                    name: name.clone(),
                    value,
                    export_name,
                    description: output.description.clone(),
                },
            );
        }

        resolved.conditions = template
            .conditions
            .keys()
            .map(|name| (name.clone(), eval.conditions.get(name).copied()))
            .collect();

        info!(
            resources = resolved.resources.len(),
            outputs = resolved.outputs.len(),
            "resolved template"
        );
        Ok(resolved)
    }
}

/// Resolve with the default configuration.
pub fn resolve(template: &Template, parameters: &IndexMap<String, Value>) -> Result<ResolvedTemplate> {
    Resolver::default().resolve(template, parameters)
}

/// State for a single resolve call.
pub(crate) struct Evaluation<'a> {
    pub(crate) template: &'a Template,
    pub(crate) supplied: &'a IndexMap<String, Value>,
    pub(crate) config: &'a ResolverConfig,
    parameters: HashMap<String, Value>,
    conditions: HashMap<String, bool>,
    /// Conditions currently being evaluated, outermost first.
    visiting: IndexSet<String>,
    depth: usize,
    /// Resource whose properties are being evaluated.
    pub(crate) current: Option<String>,
    /// `(dependent, dependency)` pairs found through Ref, GetAtt and Sub.
    pub(crate) references: Vec<(String, String)>,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(
        template: &'a Template,
        supplied: &'a IndexMap<String, Value>,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            template,
            supplied,
            config,
            parameters: HashMap::new(),
            conditions: HashMap::new(),
            visiting: IndexSet::new(),
            depth: 0,
            current: None,
            references: Vec::new(),
        }
    }

    /// Evaluate a node. `None` stands for `AWS::NoValue`.
    pub(crate) fn eval(&mut self, node: &Node, at: &str) -> Result<Option<Value>> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(TemplateError::DepthExceeded {
                path: path::display(at).to_string(),
                limit: self.config.max_depth,
            });
        }
        let result = self.eval_inner(node, at);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, node: &Node, at: &str) -> Result<Option<Value>> {
        match node {
            Node::Scalar(scalar) => Ok(Some(scalar.clone().into())),
            Node::Sequence(items) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    if let Some(value) = self.eval(item, &path::item(at, i))? {
                        values.push(value);
                    }
                }
                Ok(Some(Value::List(values)))
            }
            Node::Mapping(map) => {
                let mut values = IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    if let Some(value) = self.eval(item, &path::child(at, key))? {
                        values.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Map(values)))
            }
            Node::Intrinsic(intrinsic) => {
                trace!(function = %intrinsic.kind, path = %at, "evaluating intrinsic");
                self.intrinsic(intrinsic, at)
            }
        }
    }

    /// Evaluate a node that must produce a value.
    pub(crate) fn operand(&mut self, node: &Node, at: &str) -> Result<Value> {
        self.eval(node, at)?.ok_or_else(|| {
            TemplateError::type_error(path::display(at), "AWS::NoValue is not allowed here")
        })
    }

    /// Evaluate a node that must produce a scalar, rendered as text.
    pub(crate) fn text_operand(&mut self, node: &Node, at: &str) -> Result<String> {
        let value = self.operand(node, at)?;
        match value {
            Value::Null => Err(TemplateError::type_error(path::display(at), "expected a string, found null")),
            other => other.scalar_text().ok_or_else(|| {
                TemplateError::type_error(
                    path::display(at),
                    format!("expected a string, found {}", other.type_name()),
                )
            }),
        }
    }

    /// Value of a condition, evaluated at most once per resolve call.
    pub(crate) fn condition(&mut self, name: &str, at: &str) -> Result<bool> {
        if let Some(value) = self.conditions.get(name) {
            return Ok(*value);
        }
        let template = self.template;
        let expr = template
            .conditions
            .get(name)
            .ok_or_else(|| TemplateError::undefined(path::display(at), name))?;

        let key = path::child("Conditions", name);
        if let Some(start) = self.visiting.get_index_of(&key) {
            let mut cycle: Vec<String> = self.visiting.iter().skip(start).cloned().collect();
            cycle.push(key.clone());
            return Err(TemplateError::CyclicReference { path: key, cycle });
        }

        self.visiting.insert(key.clone());
        let value = self.operand(expr, &key)?;
        self.visiting.shift_remove(&key);

        let value = value.as_bool().ok_or_else(|| {
            TemplateError::type_error(
                &key,
                format!("condition must evaluate to a boolean, found {}", value.type_name()),
            )
        })?;
        debug!(condition = %name, value, "evaluated condition");
        self.conditions.insert(name.to_string(), value);
        Ok(value)
    }

    /// Effective value of a declared parameter, coerced and checked on first use.
    pub(crate) fn parameter(&mut self, spec: &ParameterSpec, at: &str) -> Result<Value> {
        if let Some(value) = self.parameters.get(&spec.name) {
            return Ok(value.clone());
        }
        let param_at = path::child("Parameters", &spec.name);
        let raw = match (self.supplied.get(&spec.name), &spec.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.to_literal(&path::child(&param_at, "Default"))?,
            (None, None) => {
                return Err(TemplateError::MissingParameter {
                    path: path::display(at).to_string(),
                    name: spec.name.clone(),
                })
            }
        };
        let value = constraints::coerce(spec, &raw, &param_at)?;
        constraints::check(spec, &value, &param_at)?;
        self.parameters.insert(spec.name.clone(), value.clone());
        Ok(value)
    }

    fn resolved_parameter(&mut self, spec: &ParameterSpec) -> Result<ResolvedParameter> {
        let at = path::child("Parameters", &spec.name);
        let has_value = self.supplied.contains_key(&spec.name) || spec.default.is_some();
        let value = if has_value {
            Some(self.parameter(spec, &at)?)
        } else {
            None
        };
        let default = match &spec.default {
            Some(node) => Some(node.to_literal(&path::child(&at, "Default"))?),
            None => None,
        };
        Ok(ResolvedParameter {
            name: spec.name.clone(),
            param_type: spec.param_type.clone(),
            value,
            default,
            allowed_values: spec
                .allowed_values
                .as_ref()
                .map(|values| values.iter().cloned().map(Value::from).collect()),
            no_echo: spec.no_echo,
        })
    }

    /// Check that `target` names a resource that survives its condition, and
    /// record the dependency when evaluating inside a resource.
    pub(crate) fn require_resource(&mut self, target: &str, at: &str) -> Result<()> {
        let template = self.template;
        let resource = template
            .resources
            .get(target)
            .ok_or_else(|| TemplateError::undefined(path::display(at), target))?;
        if let Some(condition) = &resource.condition {
            let condition_at = path::child(&path::child("Resources", target), "Condition");
            if !self.condition(condition, &condition_at)? {
                return Err(TemplateError::undefined(path::display(at), target));
            }
        }
        if let Some(current) = &self.current {
            self.references.push((current.clone(), target.to_string()));
        }
        Ok(())
    }

    /// `Ref` lookup: pseudo parameters, declared parameters, resources, then
    /// undeclared supplied values.
    pub(crate) fn reference(&mut self, name: &str, at: &str) -> Result<Option<Value>> {
        if name == "AWS::NoValue" {
            return Ok(None);
        }
        if let Some(value) = self.config.pseudo.value(name) {
            return Ok(Some(value));
        }
        let template = self.template;
        if let Some(spec) = template.parameters.get(name) {
            return self.parameter(spec, at).map(Some);
        }
        if template.resources.contains_key(name) {
            self.require_resource(name, at)?;
            return Ok(Some(Value::String(format!("<resolved:{}>", name))));
        }
        if let Some(value) = self.supplied.get(name) {
            return Ok(Some(value.clone()));
        }
        Err(TemplateError::undefined(path::display(at), name))
    }
}
