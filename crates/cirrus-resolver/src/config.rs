//! Resolver configuration and pseudo parameters

use cirrus_core::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Values for the `AWS::*` pseudo parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PseudoParameters {
    pub region: String,
    pub account_id: String,
    pub stack_name: String,
    /// Derived from the other fields when unset.
    pub stack_id: Option<String>,
    pub notification_arns: Vec<String>,
}

impl Default for PseudoParameters {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
            stack_name: "cirrus-stack".to_string(),
            stack_id: None,
            notification_arns: Vec::new(),
        }
    }
}

impl PseudoParameters {
    pub fn partition(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "aws-cn"
        } else if self.region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }

    pub fn url_suffix(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        }
    }

    pub fn stack_id(&self) -> String {
        match &self.stack_id {
            Some(id) => id.clone(),
            None => format!(
                "arn:{}:cloudformation:{}:{}:stack/{}/00000000-0000-0000-0000-000000000000",
                self.partition(),
                self.region,
                self.account_id,
                self.stack_name
            ),
        }
    }

    /// Value of a pseudo parameter by its full name.
    ///
    /// `AWS::NoValue` is not a value and is handled by the evaluator.
    pub fn value(&self, name: &str) -> Option<Value> {
        let value = match name {
            "AWS::Region" => Value::string(&self.region),
            "AWS::AccountId" => Value::string(&self.account_id),
            "AWS::StackName" => Value::string(&self.stack_name),
            "AWS::StackId" => Value::string(self.stack_id()),
            "AWS::Partition" => Value::string(self.partition()),
            "AWS::URLSuffix" => Value::string(self.url_suffix()),
            "AWS::NotificationARNs" => Value::list(self.notification_arns.iter().cloned()),
            _ => return None,
        };
        Some(value)
    }
}

/// Settings for one [`crate::Resolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum evaluation depth before `DepthExceeded` is reported.
    pub max_depth: usize,
    pub pseudo: PseudoParameters,
    /// Result of `Fn::GetAZs`; `{region}a`, `b` and `c` when unset.
    pub availability_zones: Option<Vec<String>>,
    /// Values returned by `Fn::ImportValue`, keyed by export name.
    pub imports: IndexMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            pseudo: PseudoParameters::default(),
            availability_zones: None,
            imports: IndexMap::new(),
        }
    }
}

impl ResolverConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.pseudo.region = region.into();
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.pseudo.account_id = account_id.into();
        self
    }

    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.pseudo.stack_name = stack_name.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_availability_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.availability_zones = Some(zones.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_import(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.imports.insert(name.into(), value.into());
        self
    }

    /// Zones for `region`, or for the configured region when `region` is empty.
    pub fn availability_zones(&self, region: &str) -> Vec<String> {
        let region = if region.is_empty() {
            self.pseudo.region.as_str()
        } else {
            region
        };
        match &self.availability_zones {
            Some(zones) if region == self.pseudo.region => zones.clone(),
            _ => ["a", "b", "c"]
                .iter()
                .map(|suffix| format!("{}{}", region, suffix))
                .collect(),
        }
    }
}
