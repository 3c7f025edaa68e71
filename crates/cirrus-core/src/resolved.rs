//! Templates after resolution against one parameter assignment

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A template with every intrinsic replaced by a concrete value.
///
/// Produced fresh by each resolution; resources and outputs gated off by a
/// false condition are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub parameters: IndexMap<String, ResolvedParameter>,
    /// Every declared condition; `None` when this resolution never needed it.
    pub conditions: IndexMap<String, Option<bool>>,
    pub resources: IndexMap<String, ResolvedResource>,
    pub outputs: IndexMap<String, ResolvedOutput>,
    /// Resources in an order that satisfies every dependency.
    pub creation_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedParameter {
    pub name: String,
    #[serde(rename = "Type")]
    pub param_type: String,
    /// `None` when the parameter has neither a supplied value nor a default.
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default)]
    pub no_echo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedResource {
    pub logical_id: String,
    #[serde(rename = "Type")]
    pub resource_type: String,
    pub properties: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<ResolvedTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ResolvedResource {
    /// Property lookup by dotted path, e.g. `ClusterSettings.0.Value`.
    pub fn property(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, rest),
            None => (path, ""),
        };
        self.properties.get(head).and_then(|v| v.lookup(rest))
    }

    pub fn tag(&self, key: &str) -> Option<&Value> {
        self.tags.iter().find(|t| t.key == key).map(|t| &t.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedOutput {
    pub name: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Extract a tag list from a resolved `Tags` property.
///
/// Accepts both the `[{Key, Value}]` list shape and a plain mapping.
/// Entries that are not shaped like tags are skipped.
pub fn tags_from_value(tags: &Value) -> Vec<ResolvedTag> {
    match tags {
        Value::List(items) => items
            .iter()
            .filter_map(|item| {
                let map = item.as_map()?;
                let key = map.get("Key")?.as_str()?;
                let value = map.get("Value").cloned().unwrap_or(Value::Null);
                Some(ResolvedTag {
                    key: key.to_string(),
                    value,
                })
            })
            .collect(),
        Value::Map(map) => map
            .iter()
            .map(|(key, value)| ResolvedTag {
                key: key.clone(),
                value: value.clone(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl ResolvedTemplate {
    pub fn resource(&self, logical_id: &str) -> Option<&ResolvedResource> {
        self.resources.get(logical_id)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResolvedResource> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Effective value of a parameter, if it had one.
    pub fn parameter_value(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name).and_then(|p| p.value.as_ref())
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .values()
            .filter_map(|o| o.export_name.as_deref())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
