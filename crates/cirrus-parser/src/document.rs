//! Document parser: raw bytes to a [`Node`] tree
//!
//! YAML is read through `serde_yaml` into an intermediate tree that keeps
//! tags and every mapping entry (duplicates included). A second pass attaches
//! paths, rejects duplicate keys, enforces the nesting limit and asks the
//! [`TagRegistry`] to turn tagged values into intrinsic nodes.

use crate::registry::{ArityKind, TagRegistry};
use cirrus_core::{path, IntrinsicKind, Node, Result, Scalar, TemplateError};
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use std::fmt;
use tracing::{debug, instrument};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Nesting at which `serde_yaml` stops reading a document. Larger
/// `max_depth` settings are capped to this value.
pub const YAML_NESTING_LIMIT: usize = 128;

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Deepest nesting accepted before failing with `DepthExceeded`,
    /// capped at [`YAML_NESTING_LIMIT`].
    pub max_depth: usize,
}

impl ParserConfig {
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(YAML_NESTING_LIMIT)
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Tree exactly as the YAML reader saw it.
#[derive(Debug, Clone)]
enum RawNode {
    Scalar(Scalar),
    Sequence(Vec<RawNode>),
    Mapping(Vec<(RawNode, RawNode)>),
    Tagged(String, Box<RawNode>),
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawNodeVisitor)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = RawNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Null))
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<RawNode, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawNode::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Int(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(match i64::try_from(v) {
            Ok(i) => Scalar::Int(i),
            Err(_) => Scalar::Str(v.to_string()),
        }))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Str(v.to_string())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Scalar(Scalar::Str(v)))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<RawNode, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(RawNode::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<RawNode, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry()? {
            entries.push((key, value));
        }
        Ok(RawNode::Mapping(entries))
    }

    // serde_yaml reports `!Tag value` as an enum whose variant is the tag.
    fn visit_enum<A>(self, data: A) -> std::result::Result<RawNode, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, contents): (String, _) = data.variant()?;
        let value: RawNode = contents.newtype_variant()?;
        Ok(RawNode::Tagged(tag, Box::new(value)))
    }
}

/// Parses documents with a fixed registry and configuration.
#[derive(Debug, Default)]
pub struct DocumentParser {
    registry: TagRegistry,
    config: ParserConfig,
}

impl DocumentParser {
    pub fn new(registry: TagRegistry, config: ParserConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Parse one UTF-8 YAML (or JSON) document into a [`Node`] tree.
    #[instrument(skip_all, fields(bytes = raw.len()))]
    pub fn parse(&self, raw: &[u8]) -> Result<Node> {
        let text = std::str::from_utf8(raw).map_err(|e| {
            let (line, column) = position_of(raw, e.valid_up_to());
            TemplateError::Syntax {
                line,
                column,
                message: format!("document is not valid UTF-8: {}", e),
            }
        })?;

        let raw_tree: RawNode = serde_yaml::from_str(text).map_err(|e| self.read_error(e))?;
        let node = self.convert(raw_tree, "", 0)?;
        debug!(shape = %node.shape(), "parsed document");
        Ok(node)
    }

    fn read_error(&self, error: serde_yaml::Error) -> TemplateError {
        if error.to_string().starts_with("recursion limit exceeded") {
            let (line, column) = error
                .location()
                .map(|loc| (loc.line(), loc.column()))
                .unwrap_or((0, 0));
            debug!(line, column, "document nests deeper than the reader allows");
            return TemplateError::DepthExceeded {
                path: path::display("").to_string(),
                limit: self.config.effective_max_depth(),
            };
        }
        syntax_error(error)
    }

    fn convert(&self, raw: RawNode, at: &str, depth: usize) -> Result<Node> {
        let limit = self.config.effective_max_depth();
        if depth > limit {
            return Err(TemplateError::DepthExceeded {
                path: path::display(at).to_string(),
                limit,
            });
        }

        match raw {
            RawNode::Scalar(scalar) => Ok(Node::Scalar(scalar)),
            RawNode::Sequence(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.convert(item, &path::item(at, i), depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Node::Sequence),
            RawNode::Mapping(entries) => match long_form(entries) {
                Ok((tag, value)) => self.convert_tagged(tag, value, at, depth),
                Err(entries) => self.convert_mapping(entries, at, depth),
            },
            RawNode::Tagged(tag, inner) => self.convert_tagged(&tag, *inner, at, depth),
        }
    }

    fn convert_mapping(&self, entries: Vec<(RawNode, RawNode)>, at: &str, depth: usize) -> Result<Node> {
        let mut map = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let key = mapping_key(key, at)?;
            let child = path::child(at, &key);
            if map.contains_key(&key) {
                return Err(TemplateError::DuplicateKey {
                    path: path::display(at).to_string(),
                    key,
                });
            }
            let value = self.convert(value, &child, depth + 1)?;
            map.insert(key, value);
        }
        Ok(Node::Mapping(map))
    }

    fn convert_tagged(&self, tag: &str, inner: RawNode, at: &str, depth: usize) -> Result<Node> {
        let (kind, operands) = match inner {
            RawNode::Sequence(items) => (
                ArityKind::Sequence,
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.convert(item, &path::item(at, i), depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => (ArityKind::Scalar, vec![self.convert(other, at, depth + 1)?]),
        };
        self.registry.resolve_tag(tag, kind, operands, at)
    }
}

/// Parse with the default registry and limits.
pub fn parse(raw: &[u8]) -> Result<Node> {
    DocumentParser::default().parse(raw)
}

/// A single-entry mapping keyed `Ref` or `Fn::<Name>` is the long form of
/// an intrinsic. Unrecognised `Fn::` keys stay plain mappings.
fn long_form(
    mut entries: Vec<(RawNode, RawNode)>,
) -> std::result::Result<(&'static str, RawNode), Vec<(RawNode, RawNode)>> {
    let tag = match entries.as_slice() {
        [(RawNode::Scalar(Scalar::Str(key)), _)] if key == "Ref" || key.starts_with("Fn::") => {
            key.parse::<IntrinsicKind>().ok().map(IntrinsicKind::tag)
        }
        _ => None,
    };
    match (tag, entries.pop()) {
        (Some(tag), Some((_, value))) => Ok((tag, value)),
        (_, popped) => {
            entries.extend(popped);
            Err(entries)
        }
    }
}

fn mapping_key(key: RawNode, at: &str) -> Result<String> {
    match key {
        RawNode::Scalar(Scalar::Null) => Err(TemplateError::schema(
            path::display(at),
            "string mapping key",
            "null",
        )),
        RawNode::Scalar(scalar) => Ok(scalar.text()),
        RawNode::Sequence(_) => Err(TemplateError::schema(
            path::display(at),
            "string mapping key",
            "sequence",
        )),
        RawNode::Mapping(_) => Err(TemplateError::schema(
            path::display(at),
            "string mapping key",
            "mapping",
        )),
        RawNode::Tagged(tag, _) => Err(TemplateError::schema(
            path::display(at),
            "string mapping key",
            format!("tagged value !{}", tag),
        )),
    }
}

fn syntax_error(error: serde_yaml::Error) -> TemplateError {
    let (line, column) = error
        .location()
        .map(|loc| (loc.line(), loc.column()))
        .unwrap_or((0, 0));
    TemplateError::Syntax {
        line,
        column,
        message: error.to_string(),
    }
}

fn position_of(raw: &[u8], offset: usize) -> (usize, usize) {
    let before = &raw[..offset.min(raw.len())];
    let line = before.iter().filter(|b| **b == b'\n').count() + 1;
    let column = before.iter().rev().take_while(|b| **b != b'\n').count() + 1;
    (line, column)
}
