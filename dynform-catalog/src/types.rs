//! API request and response types for the plugin catalog.

use dynform_fields::{FieldConfig, PluginDescriptor, ValidationRule};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response from `GET /dynamic/plugins`.
///
/// The service answers either with a bare array (one unpaginated page) or a
/// standard `{records, total}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PluginPage {
    Page {
        records: Vec<PluginDescriptor>,
        #[serde(default)]
        total: Option<u64>,
    },
    List(Vec<PluginDescriptor>),
}

impl PluginPage {
    /// Records plus the total count. A bare array is its own total.
    pub fn into_parts(self) -> (Vec<PluginDescriptor>, u64) {
        match self {
            PluginPage::Page { records, total } => {
                let total = total.unwrap_or(records.len() as u64);
                (records, total)
            }
            PluginPage::List(records) => {
                let total = records.len() as u64;
                (records, total)
            }
        }
    }
}

/// Paging and filter parameters for the list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub current: u32,
    pub size: u32,
    pub filters: IndexMap<String, String>,
}

impl ListQuery {
    pub fn new(current: u32, size: u32) -> Self {
        Self {
            current,
            size,
            filters: IndexMap::new(),
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// `current=..&size=..&key=value...`, URL-encoded.
    ///
    /// A filter named `current` or `size` replaces the paging value in place.
    /// Filters with an empty value are not sent, so a cleared search input
    /// does not filter on the empty string.
    pub fn to_query_string(&self) -> String {
        let mut params: IndexMap<&str, String> = IndexMap::from([
            ("current", self.current.to_string()),
            ("size", self.size.to_string()),
        ]);
        for (key, value) in &self.filters {
            if !value.is_empty() {
                params.insert(key.as_str(), value.clone());
            }
        }
        params
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Request body for `POST /dynamic/plugins/validate`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidateRequest {
    #[serde(rename = "type")]
    pub type_: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Which way a value is being converted by `process`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessDirection {
    /// Stored form to display form.
    Input,
    /// Display form to stored form.
    Output,
}

/// Request body for `POST /dynamic/plugins/process`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcessRequest {
    #[serde(rename = "type")]
    pub type_: String,
    pub value: Value,
    pub direction: ProcessDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Response from `POST /dynamic/plugins/process`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessResponse {
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Request body for `POST /dynamic/plugins/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginRegisterDto {
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub config: FieldConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
}

impl From<&PluginDescriptor> for PluginRegisterDto {
    fn from(plugin: &PluginDescriptor) -> Self {
        Self {
            type_: plugin.type_.clone(),
            name: plugin.name.clone(),
            version: plugin.version.clone(),
            schema: plugin.schema.clone(),
            config: plugin.config.clone(),
            validation: plugin.validation.clone(),
        }
    }
}
