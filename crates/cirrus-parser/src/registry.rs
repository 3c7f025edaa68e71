//! Extension-tag registry
//!
//! Maps a custom document tag, together with the form it was written in, to
//! a constructor producing an intrinsic node. `!GetAtt Cluster.Arn` and
//! `!GetAtt [Cluster, Arn]` parse differently and are registered separately.

use cirrus_core::{path, Intrinsic, IntrinsicKind, Node, Result, TemplateError};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// How a tag was applied in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArityKind {
    /// A single value: `!Ref Environment`.
    Scalar,
    /// A bracketed list: `!Join ["-", [a, b]]`.
    Sequence,
}

impl fmt::Display for ArityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArityKind::Scalar => write!(f, "scalar"),
            ArityKind::Sequence => write!(f, "sequence"),
        }
    }
}

/// Builds an intrinsic from the already-parsed operands and the node path.
pub type TagConstructor = Box<dyn Fn(Vec<Node>, &str) -> Result<Intrinsic> + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tag '!{tag}' is already registered in {kind} form")]
    DuplicateRegistration { tag: String, kind: ArityKind },
}

/// Lookup table from `(tag, form)` to constructor.
///
/// Populated at startup and read-only afterwards; share it behind an `Arc`
/// to parse on several threads.
pub struct TagRegistry {
    entries: HashMap<(String, ArityKind), TagConstructor>,
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .map(|(tag, kind)| format!("!{} ({})", tag, kind))
            .collect();
        keys.sort();
        f.debug_struct("TagRegistry").field("tags", &keys).finish()
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TagRegistry {
    /// A registry with no tags; every custom tag is rejected.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The standard short-form intrinsic tags.
    pub fn with_defaults() -> Self {
        use IntrinsicKind::*;

        let mut registry = Self::empty();

        for kind in [Ref, Sub, Condition, GetAZs, ImportValue, Base64] {
            registry.insert(kind.tag(), ArityKind::Scalar, Box::new(construct(kind)));
        }
        registry.insert(GetAtt.tag(), ArityKind::Scalar, Box::new(get_att_scalar));

        for kind in [
            Sub, GetAtt, Join, Select, Split, If, Equals, And, Or, Not, FindInMap, Cidr, GetAZs,
            ImportValue, Base64,
        ] {
            registry.insert(kind.tag(), ArityKind::Sequence, Box::new(construct(kind)));
        }

        registry
    }

    fn insert(&mut self, tag: &str, kind: ArityKind, constructor: TagConstructor) {
        self.entries.insert((tag.to_string(), kind), constructor);
    }

    /// Add a tag. Fails if `(tag, kind)` is already present.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        kind: ArityKind,
        constructor: TagConstructor,
    ) -> std::result::Result<&mut Self, RegistryError> {
        let tag = tag.into();
        let key = (tag.clone(), kind);
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateRegistration { tag, kind });
        }
        self.entries.insert(key, constructor);
        Ok(self)
    }

    pub fn contains(&self, tag: &str, kind: ArityKind) -> bool {
        self.entries.contains_key(&(tag.to_string(), kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Construct the intrinsic for a tagged node.
    ///
    /// For [`ArityKind::Scalar`] `operands` holds the single tagged value;
    /// for [`ArityKind::Sequence`] it holds the list elements.
    pub fn resolve_tag(
        &self,
        tag: &str,
        kind: ArityKind,
        operands: Vec<Node>,
        at: &str,
    ) -> Result<Node> {
        let tag = tag.trim_start_matches('!');
        let constructor = self
            .entries
            .get(&(tag.to_string(), kind))
            .ok_or_else(|| TemplateError::UnknownTag {
                path: path::display(at).to_string(),
                tag: tag.to_string(),
                kind: kind.to_string(),
            })?;
        constructor(operands, at).map(Node::Intrinsic)
    }
}

fn construct(kind: IntrinsicKind) -> impl Fn(Vec<Node>, &str) -> Result<Intrinsic> {
    move |operands: Vec<Node>, at: &str| Intrinsic::new(kind, operands, at)
}

/// `!GetAtt Resource.Attribute` splits at the first dot; attribute names
/// may themselves contain dots (`Endpoint.Address`).
fn get_att_scalar(operands: Vec<Node>, at: &str) -> Result<Intrinsic> {
    let text = match operands.as_slice() {
        [node] => node.as_str().ok_or_else(|| {
            TemplateError::type_error(
                path::display(at),
                format!("!GetAtt expects a string, found {}", node.shape()),
            )
        })?,
        _ => return Intrinsic::new(IntrinsicKind::GetAtt, operands, at),
    };

    let parts: Vec<Node> = match text.split_once('.') {
        Some((resource, attribute)) => vec![Node::string(resource), Node::string(attribute)],
        None => vec![Node::string(text)],
    };
    Intrinsic::new(IntrinsicKind::GetAtt, parts, at)
}
