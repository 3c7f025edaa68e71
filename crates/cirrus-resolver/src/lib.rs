//! Intrinsic function resolution for cirrus templates
//!
//! [`Resolver::resolve`] takes a parsed [`cirrus_core::Template`] and one
//! parameter assignment and produces a [`cirrus_core::ResolvedTemplate`]:
//!
//! - parameters are defaulted, coerced to their declared type and checked
//!   against their constraints on first use,
//! - conditions are evaluated lazily and at most once, with a visiting set
//!   guarding against cycles,
//! - only the taken branch of `Fn::If` is evaluated,
//! - resources and outputs behind a false condition are dropped,
//! - resources are ordered by a dependency graph built from `DependsOn` and
//!   the references found while evaluating their properties.
//!
//! Resolution is pure: the template is never modified and the same inputs
//! always give the same output.

pub mod cidr;
pub mod config;
pub mod constraints;
pub mod graph;
mod intrinsics;
pub mod resolver;
pub mod sub;

pub use config::{PseudoParameters, ResolverConfig, DEFAULT_MAX_DEPTH};
pub use graph::DependencyGraph;
pub use resolver::{resolve, Resolver};
