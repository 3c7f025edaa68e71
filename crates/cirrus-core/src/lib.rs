//! Core document tree, template model and error taxonomy for cirrus
//!
//! Data flows through the workspace as
//! bytes -> [`Node`] -> [`Template`] -> [`ResolvedTemplate`] -> findings.
//! This crate owns the types shared by every stage.

pub mod error;
pub mod node;
pub mod path;
pub mod resolved;
pub mod template;
pub mod value;

pub use error::{Result, TemplateError};
pub use node::{Intrinsic, IntrinsicKind, Node, Scalar};
pub use resolved::{ResolvedOutput, ResolvedParameter, ResolvedResource, ResolvedTag, ResolvedTemplate};
pub use template::{OutputSpec, ParameterKind, ParameterSpec, Resource, Tag, Template};
pub use value::Value;
