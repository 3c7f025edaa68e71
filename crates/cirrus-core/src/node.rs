//! Generic document tree
//!
//! The parser produces [`Node`] trees; intrinsic functions appear as
//! [`Node::Intrinsic`] only where the source carried a custom tag.

use crate::error::{Result, TemplateError};
use crate::path;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// A plain scalar, typed by its content.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Textual form as used by string-typed parameters and `AllowedValues`.
    pub fn text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Str(s) => s.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "number",
            Scalar::Str(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Int(i),
            Scalar::Float(f) => Value::Float(f),
            Scalar::Str(s) => Value::String(s),
        }
    }
}

/// The built-in intrinsic functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntrinsicKind {
    Ref,
    Sub,
    GetAtt,
    Join,
    Select,
    Split,
    If,
    Equals,
    And,
    Or,
    Not,
    Condition,
    FindInMap,
    GetAZs,
    ImportValue,
    Base64,
    Cidr,
}

impl IntrinsicKind {
    pub const ALL: [IntrinsicKind; 17] = [
        IntrinsicKind::Ref,
        IntrinsicKind::Sub,
        IntrinsicKind::GetAtt,
        IntrinsicKind::Join,
        IntrinsicKind::Select,
        IntrinsicKind::Split,
        IntrinsicKind::If,
        IntrinsicKind::Equals,
        IntrinsicKind::And,
        IntrinsicKind::Or,
        IntrinsicKind::Not,
        IntrinsicKind::Condition,
        IntrinsicKind::FindInMap,
        IntrinsicKind::GetAZs,
        IntrinsicKind::ImportValue,
        IntrinsicKind::Base64,
        IntrinsicKind::Cidr,
    ];

    /// Tag name as written in documents, without the leading `!`.
    pub fn tag(self) -> &'static str {
        match self {
            IntrinsicKind::Ref => "Ref",
            IntrinsicKind::Sub => "Sub",
            IntrinsicKind::GetAtt => "GetAtt",
            IntrinsicKind::Join => "Join",
            IntrinsicKind::Select => "Select",
            IntrinsicKind::Split => "Split",
            IntrinsicKind::If => "If",
            IntrinsicKind::Equals => "Equals",
            IntrinsicKind::And => "And",
            IntrinsicKind::Or => "Or",
            IntrinsicKind::Not => "Not",
            IntrinsicKind::Condition => "Condition",
            IntrinsicKind::FindInMap => "FindInMap",
            IntrinsicKind::GetAZs => "GetAZs",
            IntrinsicKind::ImportValue => "ImportValue",
            IntrinsicKind::Base64 => "Base64",
            IntrinsicKind::Cidr => "Cidr",
        }
    }

    /// Inclusive bounds on the operand count.
    pub fn arity(self) -> (usize, usize) {
        match self {
            IntrinsicKind::Ref
            | IntrinsicKind::Not
            | IntrinsicKind::Condition
            | IntrinsicKind::GetAZs
            | IntrinsicKind::ImportValue
            | IntrinsicKind::Base64 => (1, 1),
            IntrinsicKind::Sub => (1, 2),
            IntrinsicKind::GetAtt
            | IntrinsicKind::Join
            | IntrinsicKind::Select
            | IntrinsicKind::Split
            | IntrinsicKind::Equals => (2, 2),
            IntrinsicKind::If | IntrinsicKind::FindInMap | IntrinsicKind::Cidr => (3, 3),
            IntrinsicKind::And | IntrinsicKind::Or => (2, 10),
        }
    }

    fn expected_arity(self) -> String {
        match self.arity() {
            (min, max) if min == max => min.to_string(),
            (min, max) => format!("{} to {}", min, max),
        }
    }

    /// Fail with `IntrinsicArity` unless `found` operands are acceptable.
    pub fn check_arity(self, found: usize, at: &str) -> Result<()> {
        let (min, max) = self.arity();
        if found < min || found > max {
            return Err(TemplateError::IntrinsicArity {
                path: path::display(at).to_string(),
                function: self.to_string(),
                expected: self.expected_arity(),
                found,
            });
        }
        Ok(())
    }
}

impl fmt::Display for IntrinsicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fn::{}", self.tag())
    }
}

impl FromStr for IntrinsicKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim_start_matches('!').trim_start_matches("Fn::");
        IntrinsicKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag() == name)
            .ok_or_else(|| format!("unknown intrinsic function '{}'", s))
    }
}

/// An intrinsic function application with arity already checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsic {
    pub kind: IntrinsicKind,
    pub operands: Vec<Node>,
}

impl Intrinsic {
    pub fn new(kind: IntrinsicKind, operands: Vec<Node>, at: &str) -> Result<Self> {
        kind.check_arity(operands.len(), at)?;
        Ok(Self { kind, operands })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(IndexMap<String, Node>),
    Intrinsic(Intrinsic),
}

impl Node {
    pub fn string(s: impl Into<String>) -> Self {
        Node::Scalar(Scalar::Str(s.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_intrinsic(&self) -> Option<&Intrinsic> {
        match self {
            Node::Intrinsic(intrinsic) => Some(intrinsic),
            _ => None,
        }
    }

    /// Short description of the node's shape for schema diagnostics.
    pub fn shape(&self) -> String {
        match self {
            Node::Scalar(scalar) => scalar.type_name().to_string(),
            Node::Sequence(_) => "sequence".to_string(),
            Node::Mapping(_) => "mapping".to_string(),
            Node::Intrinsic(intrinsic) => format!("intrinsic {}", intrinsic.kind),
        }
    }

    /// Convert an intrinsic-free node into a concrete value.
    pub fn to_literal(&self, at: &str) -> Result<Value> {
        match self {
            Node::Scalar(scalar) => Ok(scalar.clone().into()),
            Node::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| item.to_literal(&path::item(at, i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Node::Mapping(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.to_literal(&path::child(at, k))?)))
                .collect::<Result<IndexMap<_, _>>>()
                .map(Value::Map),
            Node::Intrinsic(intrinsic) => Err(TemplateError::type_error(
                path::display(at),
                format!("{} is not allowed in a literal value", intrinsic.kind),
            )),
        }
    }

    /// Visit every intrinsic in the tree, outermost first.
    pub fn walk_intrinsics<'a>(&'a self, visit: &mut dyn FnMut(&'a Intrinsic)) {
        match self {
            Node::Scalar(_) => {}
            Node::Sequence(items) => items.iter().for_each(|n| n.walk_intrinsics(visit)),
            Node::Mapping(map) => map.values().for_each(|n| n.walk_intrinsics(visit)),
            Node::Intrinsic(intrinsic) => {
                visit(intrinsic);
                intrinsic
                    .operands
                    .iter()
                    .for_each(|n| n.walk_intrinsics(visit));
            }
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Int(i) => Node::Scalar(Scalar::Int(i)),
            Value::Float(f) => Node::Scalar(Scalar::Float(f)),
            Value::String(s) => Node::Scalar(Scalar::Str(s)),
            Value::List(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Map(map) => {
                Node::Mapping(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arity_checked_on_construction() {
        let err = Intrinsic::new(
            IntrinsicKind::Select,
            vec![Node::Scalar(Scalar::Int(0))],
            "Resources.Subnet.Properties.AvailabilityZone",
        )
        .unwrap_err();

        match err {
            TemplateError::IntrinsicArity {
                function, found, ..
            } => {
                assert_eq!(function, "Fn::Select");
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_variadic_arity() {
        let operand = Node::Scalar(Scalar::Bool(true));
        assert!(Intrinsic::new(IntrinsicKind::And, vec![operand.clone(); 10], "x").is_ok());
        assert!(Intrinsic::new(IntrinsicKind::And, vec![operand.clone(); 11], "x").is_err());
        assert!(Intrinsic::new(IntrinsicKind::Or, vec![operand], "x").is_err());
    }

    #[test]
    fn test_kind_from_str_accepts_long_names() {
        assert_eq!("Fn::GetAZs".parse::<IntrinsicKind>(), Ok(IntrinsicKind::GetAZs));
        assert_eq!("!Sub".parse::<IntrinsicKind>(), Ok(IntrinsicKind::Sub));
        assert!("Fn::Transform".parse::<IntrinsicKind>().is_err());
    }

    #[test]
    fn test_literal_rejects_intrinsics() {
        let node = Node::Sequence(vec![
            Node::string("a"),
            Node::Intrinsic(Intrinsic {
                kind: IntrinsicKind::Ref,
                operands: vec![Node::string("Env")],
            }),
        ]);
        let err = node.to_literal("Parameters.Env.Default").unwrap_err();
        assert_eq!(err.path(), Some("Parameters.Env.Default[1]"));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Scalar::Int(5).text(), "5");
        assert_eq!(Scalar::Bool(false).text(), "false");
        assert_eq!(Scalar::Str("5".into()).as_f64(), Some(5.0));
    }
}
