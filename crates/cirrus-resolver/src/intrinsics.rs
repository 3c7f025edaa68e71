//! Evaluation rules for each intrinsic function

use crate::cidr;
use crate::resolver::Evaluation;
use crate::sub::{self, Segment};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cirrus_core::{path, Intrinsic, IntrinsicKind, Node, Result, TemplateError, Value};
use indexmap::IndexMap;

impl Evaluation<'_> {
    pub(crate) fn intrinsic(&mut self, intrinsic: &Intrinsic, at: &str) -> Result<Option<Value>> {
        intrinsic.kind.check_arity(intrinsic.operands.len(), at)?;
        let ops = &intrinsic.operands;
        let value = match intrinsic.kind {
            IntrinsicKind::Ref => {
                let name = self.text_operand(&ops[0], &path::item(at, 0))?;
                return self.reference(&name, at);
            }
            IntrinsicKind::If => {
                let name = self.text_operand(&ops[0], &path::item(at, 0))?;
                let branch = if self.condition(&name, at)? { 1 } else { 2 };
                return self.eval(&ops[branch], &path::item(at, branch));
            }
            IntrinsicKind::GetAtt => {
                let id = self.text_operand(&ops[0], &path::item(at, 0))?;
                let attribute = self.text_operand(&ops[1], &path::item(at, 1))?;
                self.attribute(&id, &attribute, at)?
            }
            IntrinsicKind::Sub => self.substitute(ops, at)?,
            IntrinsicKind::Join => {
                let delimiter = self.text_operand(&ops[0], &path::item(at, 0))?;
                let items = self.list_operand(&ops[1], &path::item(at, 1))?;
                let parts = items
                    .iter()
                    .map(|item| {
                        item.scalar_text().ok_or_else(|| {
                            TemplateError::type_error(
                                path::display(at),
                                format!("Fn::Join cannot join a {}", item.type_name()),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Value::String(parts.join(&delimiter))
            }
            IntrinsicKind::Select => {
                let index_value = self.operand(&ops[0], &path::item(at, 0))?;
                let items = self.list_operand(&ops[1], &path::item(at, 1))?;
                let index = index_value
                    .as_i64()
                    .filter(|i| *i >= 0)
                    .ok_or_else(|| {
                        TemplateError::type_error(
                            path::display(at),
                            format!("Fn::Select index must be a non-negative integer, found '{}'", index_value),
                        )
                    })? as usize;
                let len = items.len();
                items.into_iter().nth(index).ok_or_else(|| {
                    TemplateError::type_error(
                        path::display(at),
                        format!("Fn::Select index {} is out of range for a list of {}", index, len),
                    )
                })?
            }
            IntrinsicKind::Split => {
                let delimiter = self.text_operand(&ops[0], &path::item(at, 0))?;
                let source = self.text_operand(&ops[1], &path::item(at, 1))?;
                if delimiter.is_empty() {
                    return Err(TemplateError::type_error(
                        path::display(at),
                        "Fn::Split delimiter must not be empty",
                    ));
                }
                Value::list(source.split(delimiter.as_str()))
            }
            IntrinsicKind::Equals => {
                let left = self.operand(&ops[0], &path::item(at, 0))?;
                let right = self.operand(&ops[1], &path::item(at, 1))?;
                Value::Bool(values_equal(&left, &right))
            }
            IntrinsicKind::And | IntrinsicKind::Or => {
                let mut values = Vec::with_capacity(ops.len());
                for (i, op) in ops.iter().enumerate() {
                    values.push(self.bool_operand(op, &path::item(at, i), intrinsic.kind)?);
                }
                let result = match intrinsic.kind {
                    IntrinsicKind::And => values.iter().all(|b| *b),
                    _ => values.iter().any(|b| *b),
                };
                Value::Bool(result)
            }
            IntrinsicKind::Not => Value::Bool(!self.bool_operand(&ops[0], &path::item(at, 0), intrinsic.kind)?),
            IntrinsicKind::Condition => {
                let name = self.text_operand(&ops[0], &path::item(at, 0))?;
                Value::Bool(self.condition(&name, at)?)
            }
            IntrinsicKind::FindInMap => return self.find_in_map(ops, at),
            IntrinsicKind::GetAZs => {
                let region = self.text_operand(&ops[0], &path::item(at, 0))?;
                Value::list(self.config.availability_zones(&region))
            }
            IntrinsicKind::ImportValue => {
                let name = self.text_operand(&ops[0], &path::item(at, 0))?;
                match self.config.imports.get(&name) {
                    Some(value) => Value::string(value),
                    None => Value::String(format!("<import:{}>", name)),
                }
            }
            IntrinsicKind::Base64 => {
                let text = self.text_operand(&ops[0], &path::item(at, 0))?;
                Value::String(STANDARD.encode(text.as_bytes()))
            }
            IntrinsicKind::Cidr => {
                let block = self.text_operand(&ops[0], &path::item(at, 0))?;
                let count = self.integer_operand(&ops[1], &path::item(at, 1))?;
                let bits = self.integer_operand(&ops[2], &path::item(at, 2))?;
                Value::list(cidr::subnets(&block, count, bits, at)?)
            }
        };
        Ok(Some(value))
    }

    fn attribute(&mut self, id: &str, attribute: &str, at: &str) -> Result<Value> {
        self.require_resource(id, at)?;
        Ok(Value::String(format!("<resolved:{}.{}>", id, attribute)))
    }

    fn substitute(&mut self, ops: &[Node], at: &str) -> Result<Value> {
        let input = self.text_operand(&ops[0], &path::item(at, 0))?;
        let variables: IndexMap<String, Value> = match ops.get(1) {
            Some(node) => {
                let vars_at = path::item(at, 1);
                match self.operand(node, &vars_at)? {
                    Value::Map(map) => map,
                    other => {
                        return Err(TemplateError::type_error(
                            vars_at,
                            format!("Fn::Sub variables must be a mapping, found {}", other.type_name()),
                        ))
                    }
                }
            }
            None => IndexMap::new(),
        };

        let mut output = String::with_capacity(input.len());
        for segment in sub::segments(&input, at)? {
            match segment {
                Segment::Text(text) => output.push_str(&text),
                Segment::Variable(name) => {
                    let value = match variables.get(&name) {
                        Some(value) => value.clone(),
                        None => self.placeholder(&name, at)?,
                    };
                    let text = value.scalar_text().ok_or_else(|| {
                        TemplateError::type_error(
                            path::display(at),
                            format!("'${{{}}}' resolves to a {}, not a string", name, value.type_name()),
                        )
                    })?;
                    output.push_str(&text);
                }
            }
        }
        Ok(Value::String(output))
    }

    /// A `${...}` name without an explicit variable: a Ref target or `Resource.Attribute`.
    fn placeholder(&mut self, name: &str, at: &str) -> Result<Value> {
        if let Some((id, attribute)) = name.split_once('.') {
            if self.template.resources.contains_key(id) {
                return self.attribute(id, attribute, at);
            }
        }
        self.reference(name, at)?.ok_or_else(|| {
            TemplateError::type_error(
                path::display(at),
                format!("'${{{}}}' resolves to AWS::NoValue", name),
            )
        })
    }

    fn find_in_map(&mut self, ops: &[Node], at: &str) -> Result<Option<Value>> {
        let map_name = self.text_operand(&ops[0], &path::item(at, 0))?;
        let top = self.text_operand(&ops[1], &path::item(at, 1))?;
        let second = self.text_operand(&ops[2], &path::item(at, 2))?;

        let template = self.template;
        let table = template
            .mappings
            .get(&map_name)
            .ok_or_else(|| TemplateError::undefined(path::display(at), map_name.as_str()))?;
        let entries = table.get(&top).ok_or_else(|| {
            TemplateError::undefined(path::display(at), format!("{}.{}", map_name, top))
        })?;
        let node = entries.get(&second).ok_or_else(|| {
            TemplateError::undefined(path::display(at), format!("{}.{}.{}", map_name, top, second))
        })?;

        let entry_at = path::child(&path::child(&path::child("Mappings", &map_name), &top), &second);
        self.eval(node, &entry_at)
    }

    fn list_operand(&mut self, node: &Node, at: &str) -> Result<Vec<Value>> {
        match self.operand(node, at)? {
            Value::List(items) => Ok(items),
            other => Err(TemplateError::type_error(
                path::display(at),
                format!("expected a list, found {}", other.type_name()),
            )),
        }
    }

    fn bool_operand(&mut self, node: &Node, at: &str, function: IntrinsicKind) -> Result<bool> {
        let value = self.operand(node, at)?;
        value.as_bool().ok_or_else(|| {
            TemplateError::type_error(
                path::display(at),
                format!("{} expects a boolean, found {}", function, value.type_name()),
            )
        })
    }

    fn integer_operand(&mut self, node: &Node, at: &str) -> Result<i64> {
        let value = self.operand(node, at)?;
        value.as_i64().ok_or_else(|| {
            TemplateError::type_error(
                path::display(at),
                format!("expected an integer, found '{}'", value),
            )
        })
    }
}

/// `Fn::Equals`: scalars compare by their text form, lists and maps
/// structurally.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.scalar_text(), right.scalar_text()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}
