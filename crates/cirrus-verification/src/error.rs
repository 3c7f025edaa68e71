//! Error types for verification

use cirrus_core::TemplateError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerificationError>;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Rule id '{id}' is declared more than once")]
    DuplicateRule { id: String },

    #[error("Invalid policy rule '{rule}': {message}")]
    Policy { rule: String, message: String },

    #[error("Template could not be resolved: {0}")]
    Template(#[from] TemplateError),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}
