//! Cirrus verification
//!
//! Rule checks over resolved templates, and the reports they produce.
//!
//! Rules come either from the built-in constructors in [`rules`] or from a
//! declarative [`policy`] document. A failing rule with `error` severity
//! fails the report; warnings and infos are reported but never block.
//!
//! # Example
//!
//! ```no_run
//! use cirrus_verification::prelude::*;
//!
//! # fn run(template: &cirrus_core::Template) -> cirrus_verification::Result<()> {
//! let rules = RuleSet::from_yaml(&std::fs::read_to_string("policy.yaml").unwrap())?;
//! let report = Validator::new(rules).check(template, &Default::default())?;
//!
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod policy;
pub mod reporter;
pub mod rule;
pub mod rules;
pub mod ruleset;

mod error;
mod validator;

pub use error::{Result, VerificationError};
pub use reporter::{Report, ReportSummary};
pub use rule::{Finding, RuleError, Severity, ValidationRule, Verdict};
pub use ruleset::RuleSet;
pub use validator::{validate, Validator};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::policy::{Check, PolicyDocument, RuleSpec};
    pub use crate::reporter::Report;
    pub use crate::rule::{Finding, Severity, ValidationRule, Verdict};
    pub use crate::rules;
    pub use crate::ruleset::RuleSet;
    pub use crate::validator::{validate, Validator};
    pub use crate::{Result, VerificationError};
}
