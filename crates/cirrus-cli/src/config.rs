//! Project configuration from `cirrus.toml`
//!
//! ```toml
//! template = "templates/cluster.yaml"
//! policy = "policy.yaml"
//! region = "eu-west-1"
//! stack-name = "services"
//! max-depth = 32
//!
//! [parameters]
//! Environment = "prod"
//! FargateWeight = 2
//!
//! [imports]
//! shared-artifacts-bucket = "artifacts-eu"
//! ```
//!
//! Relative paths are taken relative to the file's directory. Values given
//! on the command line win over values from the file.

use anyhow::{Context, Result};
use cirrus_core::Value;
use cirrus_resolver::ResolverConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PROJECT_FILE: &str = "cirrus.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectConfig {
    pub template: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub stack_name: Option<String>,
    pub max_depth: Option<usize>,
    pub availability_zones: Option<Vec<String>>,
    pub parameters: IndexMap<String, Value>,
    pub imports: IndexMap<String, String>,
}

/// Values from the command line that take precedence over the project file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub template: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    pub region: Option<String>,
    pub stack_name: Option<String>,
    pub max_depth: Option<usize>,
    pub parameters: Vec<(String, Value)>,
}

impl ProjectConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("Invalid project configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file {}", path.display()))?;
        let mut config = Self::from_toml(&source)
            .with_context(|| format!("Failed to parse project file {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        debug!(path = %path.display(), "loaded project configuration");
        Ok(config)
    }

    /// Load `cirrus.toml` from `dir` when present.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(PROJECT_FILE);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.template, &mut self.policy].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        self.template = overrides.template.or(self.template);
        self.policy = overrides.policy.or(self.policy);
        self.region = overrides.region.or(self.region);
        self.stack_name = overrides.stack_name.or(self.stack_name);
        self.max_depth = overrides.max_depth.or(self.max_depth);
        for (name, value) in overrides.parameters {
            self.parameters.insert(name, value);
        }
        self
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        let mut config = ResolverConfig::default();
        if let Some(region) = &self.region {
            config = config.with_region(region.clone());
        }
        if let Some(account_id) = &self.account_id {
            config = config.with_account_id(account_id.clone());
        }
        if let Some(stack_name) = &self.stack_name {
            config = config.with_stack_name(stack_name.clone());
        }
        if let Some(max_depth) = self.max_depth {
            config = config.with_max_depth(max_depth);
        }
        if let Some(zones) = &self.availability_zones {
            config = config.with_availability_zones(zones.iter().cloned());
        }
        for (name, value) in &self.imports {
            config = config.with_import(name.clone(), value.clone());
        }
        config
    }
}
