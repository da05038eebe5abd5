//! # Meta-Schema Projection
//!
//! Reduces a full JSON Schema (as generated by `schemars`) to the compact
//! `field -> type(s) (+ description)` shape that is embedded in system prompts.

use super::ExtractionSchema;
use crate::errors::ExtractError;
use schemars::schema_for;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// The accepted type name(s) of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldType {
    Single(String),
    Union(Vec<String>),
}

impl FieldType {
    fn from_names(names: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let mut names: Vec<String> = names
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();
        if names.len() == 1 {
            FieldType::Single(names.remove(0))
        } else {
            FieldType::Union(names)
        }
    }

    /// All accepted type names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            FieldType::Single(name) => vec![name.as_str()],
            FieldType::Union(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Field name to accepted type(s) and optional description.
///
/// Backed by a `BTreeMap`, so the serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetaSchema(BTreeMap<String, FieldSpec>);

impl MetaSchema {
    pub fn get(&self, field: &str) -> Option<&FieldSpec> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON rendering, as embedded in system prompts.
    pub fn to_json(&self) -> Result<String, ExtractError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Projects the meta-schema of `S` from its generated JSON Schema.
pub fn project_meta_schema<S: ExtractionSchema>() -> Result<MetaSchema, ExtractError> {
    let root = serde_json::to_value(schema_for!(S))?;
    project_json_schema(&root)
}

/// Projects a meta-schema from any JSON Schema object with top-level `properties`.
pub fn project_json_schema(root: &Value) -> Result<MetaSchema, ExtractError> {
    let properties = root
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ExtractError::InvalidSchema("schema has no top-level properties".to_string())
        })?;

    let fields = properties
        .iter()
        .map(|(name, property)| {
            let spec = FieldSpec {
                field_type: FieldType::from_names(type_names(property)),
                description: property
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
            (name.clone(), spec)
        })
        .collect();

    Ok(MetaSchema(fields))
}

fn type_names(property: &Value) -> Vec<String> {
    let Some(object) = property.as_object() else {
        // `true` schemas accept anything.
        return vec!["any".to_string()];
    };

    match object.get("type") {
        Some(Value::String(name)) => return vec![name.clone()],
        Some(Value::Array(names)) => {
            return names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        }
        _ => {}
    }

    if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
        return vec![ref_name(reference)];
    }

    for key in ["anyOf", "oneOf", "allOf"] {
        if let Some(variants) = object.get(key).and_then(Value::as_array) {
            return variants.iter().flat_map(type_names).collect();
        }
    }

    if is_enum_of_strings(object) {
        return vec!["string".to_string()];
    }

    vec!["any".to_string()]
}

fn ref_name(reference: &str) -> String {
    reference
        .rsplit('/')
        .next()
        .unwrap_or(reference)
        .to_string()
}

fn is_enum_of_strings(object: &Map<String, Value>) -> bool {
    object
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|values| values.iter().all(Value::is_string))
}
