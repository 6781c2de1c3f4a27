//! Response Schema Types
//!
//! A small JSON-schema subset in the shape the Gemini `responseSchema` field
//! accepts. Type names are the upper-case OpenAPI variants (`OBJECT`, `STRING`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema node for structured model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, ParameterSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Field order hint; Gemini otherwise emits properties alphabetically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_ordering: Option<Vec<String>>,
}

impl ParameterSchema {
    fn leaf(schema_type: &str, description: Option<&str>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            description: description.map(|s| s.to_string()),
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            nullable: None,
            property_ordering: None,
        }
    }

    /// Create a string schema
    pub fn string(description: Option<&str>) -> Self {
        Self::leaf("STRING", description)
    }

    /// Create a number schema
    pub fn number(description: Option<&str>) -> Self {
        Self::leaf("NUMBER", description)
    }

    /// Create a string schema restricted to the given values
    pub fn enumeration(description: Option<&str>, values: &[&str]) -> Self {
        Self {
            enum_values: Some(values.iter().map(|v| v.to_string()).collect()),
            ..Self::leaf("STRING", description)
        }
    }

    /// Create an object schema. `properties` order is kept as the ordering hint.
    pub fn object(
        description: Option<&str>,
        properties: Vec<(&str, ParameterSchema)>,
        required: &[&str],
    ) -> Self {
        let ordering = properties.iter().map(|(k, _)| k.to_string()).collect();
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            properties: Some(properties),
            required: Some(required.iter().map(|r| r.to_string()).collect()),
            property_ordering: Some(ordering),
            ..Self::leaf("OBJECT", description)
        }
    }

    /// Create an array schema
    pub fn array(description: Option<&str>, items: ParameterSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::leaf("ARRAY", description)
        }
    }

    /// Mark this node as nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    /// Look up a direct child property
    pub fn property(&self, name: &str) -> Option<&ParameterSchema> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }
}
