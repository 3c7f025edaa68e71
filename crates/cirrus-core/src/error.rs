use thiserror::Error;

pub type Result<T> = std::result::Result<T, TemplateError>;

/// Every failure the engine can report.
///
/// All variants except [`TemplateError::Syntax`] carry the dotted location
/// inside the template (for example `Resources.Cluster.Properties.Tags[0]`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("unknown tag '!{tag}' used in {kind} form at {path}")]
    UnknownTag {
        path: String,
        tag: String,
        kind: String,
    },

    #[error("duplicate key '{key}' at {path}")]
    DuplicateKey { path: String, key: String },

    #[error("schema error at {path}: expected {expected}, found {found}")]
    Schema {
        path: String,
        expected: String,
        found: String,
    },

    #[error("undefined reference '{name}' at {path}")]
    UndefinedReference { path: String, name: String },

    #[error("no value supplied for parameter '{name}' (referenced at {path}) and it has no default")]
    MissingParameter { path: String, name: String },

    #[error("cyclic reference at {path}: {}", cycle.join(" -> "))]
    CyclicReference { path: String, cycle: Vec<String> },

    #[error("{function} at {path} expects {expected} operand(s), found {found}")]
    IntrinsicArity {
        path: String,
        function: String,
        expected: String,
        found: usize,
    },

    #[error("type error at {path}: {message}")]
    Type { path: String, message: String },

    #[error("maximum nesting depth {limit} exceeded at {path}")]
    DepthExceeded { path: String, limit: usize },

    #[error("parameter '{name}' value '{value}' is invalid at {path}: {message}")]
    ParameterConstraint {
        path: String,
        name: String,
        value: String,
        message: String,
    },
}

impl TemplateError {
    pub fn schema(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Schema {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn type_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Type {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn undefined(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UndefinedReference {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Stable name of the failure class, used in reports and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SyntaxError",
            Self::UnknownTag { .. } => "UnknownTagError",
            Self::DuplicateKey { .. } => "DuplicateKeyError",
            Self::Schema { .. } => "SchemaError",
            Self::UndefinedReference { .. } => "UndefinedReferenceError",
            Self::MissingParameter { .. } => "MissingParameterError",
            Self::CyclicReference { .. } => "CyclicReferenceError",
            Self::IntrinsicArity { .. } => "IntrinsicArityError",
            Self::Type { .. } => "TypeError",
            Self::DepthExceeded { .. } => "DepthExceededError",
            Self::ParameterConstraint { .. } => "ParameterConstraintError",
        }
    }

    /// Location of the failure inside the template, if it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Syntax { .. } => None,
            Self::UnknownTag { path, .. }
            | Self::DuplicateKey { path, .. }
            | Self::Schema { path, .. }
            | Self::UndefinedReference { path, .. }
            | Self::MissingParameter { path, .. }
            | Self::CyclicReference { path, .. }
            | Self::IntrinsicArity { path, .. }
            | Self::Type { path, .. }
            | Self::DepthExceeded { path, .. }
            | Self::ParameterConstraint { path, .. } => Some(path),
        }
    }
}
