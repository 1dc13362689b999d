//! Schema node data model.
//!
//! Only the keywords the compiler looks at are modeled; everything else in the
//! document is ignored by serde. Property order is the document order
//! (`IndexMap`), which is also the order of the compiled Group's children.
//!
//! Decoding is lenient below the root: a keyword of the wrong JSON type reads
//! as absent and a sub-schema that is not an object (`true`, `false`, `3`)
//! reads as an empty schema, which the classifier leaves unclassified.
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;

/// One JSON-Schema-shaped node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub type_: Option<TypeDecl>,

    // ---- literal keywords (null is a meaningful value here) ----
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "const", default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub const_: Option<Value>,
    #[serde(rename = "enum", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<Value>>,

    // ---- string ----
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    // ---- numeric ----
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    // ---- object ----
    #[serde(default, deserialize_with = "lenient_properties", skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<IndexMap<String, Dependency>>,

    // ---- conditional ----
    #[serde(rename = "if", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub if_: Option<Box<Schema>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<Schema>>,
    #[serde(rename = "else", default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub else_: Option<Box<Schema>>,

    // ---- array ----
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,

    // ---- combinators (recognized, not interpreted) ----
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Value>,
}

/// `"type": "string"` or `"type": ["string", "null"]`.
///
/// Names are kept as strings so unknown type names decode fine and are
/// rejected later by the classifier instead of failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    Single(String),
    Many(Vec<String>),
}

/// One entry of the `dependencies` keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    /// `"y": ["z"]` - when `y` is present, `z` is required.
    Properties(Vec<String>),
    /// Schema-form dependency. Recognized only.
    Schema(Value),
}

/// `items` as a single schema or a tuple of schemas. Only existence matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<Value>),
    Single(Value),
}

/// Reads a keyword of the wrong JSON type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(error) => {
            debug!(%error, "schema keyword ignored");
            Ok(None)
        }
    }
}

/// `properties` entries that are not schema objects become empty schemas,
/// so the compiler drops them like any other unclassifiable node.
fn lenient_properties<'de, D>(deserializer: D) -> Result<Option<IndexMap<String, Schema>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    let properties = entries
        .into_iter()
        .map(|(name, node)| (name, Schema::from_node(node)))
        .collect();
    Ok(Some(properties))
}

/// Keeps `null` as `Some(Value::Null)` instead of collapsing it into `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Schema {
    /// Decodes a document. A root that is not an object (`true`, `[]`) yields
    /// the empty schema.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        if !value.is_object() {
            debug!("schema root is not an object");
            return Ok(Schema::default());
        }
        crate::path_de::from_value_with_path(value)
    }

    fn from_node(node: Value) -> Schema {
        match serde_json::from_value(node) {
            Ok(schema) => schema,
            Err(error) => {
                debug!(%error, "sub-schema is not an object");
                Schema::default()
            }
        }
    }

    /// Fails only on text that is not JSON.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(src: &str) -> Result<Self, SchemaError> {
        let value: Value = crate::path_de::from_str_with_path(src)?;
        Self::from_value(value)
    }

    /// The single declared type name, if there is exactly one.
    pub fn single_type(&self) -> Option<&str> {
        match self.type_.as_ref()? {
            TypeDecl::Single(name) => Some(name.as_str()),
            TypeDecl::Many(names) if names.len() == 1 => Some(names[0].as_str()),
            TypeDecl::Many(_) => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties.as_ref()?.get(name)
    }

    pub fn required_names(&self) -> &[String] {
        self.required.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_literals_survive_decoding() {
        let schema = Schema::from_value(json!({ "const": null, "default": null })).unwrap();
        assert_eq!(schema.const_, Some(Value::Null));
        assert_eq!(schema.default, Some(Value::Null));

        let schema = Schema::from_value(json!({})).unwrap();
        assert_eq!(schema.const_, None);
        assert_eq!(schema.default, None);
    }

    #[test]
    fn properties_keep_document_order() {
        let schema = Schema::from_str(r#"{ "properties": { "b": {}, "a": {}, "c": {} } }"#).unwrap();
        let names: Vec<&str> = schema.properties.as_ref().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn dependencies_decode_both_forms() {
        let schema = Schema::from_value(json!({
            "dependencies": {
                "y": ["z"],
                "w": { "properties": { "v": { "type": "string" } } }
            }
        }))
        .unwrap();
        let deps = schema.dependencies.unwrap();
        assert_eq!(deps["y"], Dependency::Properties(vec!["z".into()]));
        assert!(matches!(deps["w"], Dependency::Schema(_)));
    }

    #[test]
    fn type_arrays_with_one_entry_are_single() {
        let schema = Schema::from_value(json!({ "type": ["integer"] })).unwrap();
        assert_eq!(schema.single_type(), Some("integer"));
        let schema = Schema::from_value(json!({ "type": ["integer", "null"] })).unwrap();
        assert_eq!(schema.single_type(), None);
    }

    #[test]
    fn boolean_sub_schemas_decode_as_empty() {
        let schema = Schema::from_value(json!({
            "properties": { "a": true, "b": { "type": "string" }, "c": 3 },
            "if": true,
            "then": false
        }))
        .unwrap();
        let properties = schema.properties.as_ref().unwrap();
        assert_eq!(properties["a"], Schema::default());
        assert_eq!(properties["c"], Schema::default());
        assert_eq!(properties["b"].single_type(), Some("string"));
        assert!(schema.if_.is_none());
        assert!(schema.then.is_none());
    }

    #[test]
    fn wrong_typed_keywords_read_as_absent() {
        let schema = Schema::from_value(json!({
            "required": "b",
            "enum": "a",
            "minimum": "3",
            "maximum": 10,
            "type": 5,
            "properties": { "nested": { "pattern": ["x"], "format": "date" } },
            "dependencies": "y"
        }))
        .unwrap();
        assert!(schema.required.is_none());
        assert!(schema.enum_.is_none());
        assert!(schema.minimum.is_none());
        assert_eq!(schema.maximum, Some(10.0));
        assert!(schema.type_.is_none());
        assert!(schema.dependencies.is_none());
        let nested = schema.property("nested").unwrap();
        assert!(nested.pattern.is_none());
        assert_eq!(nested.format.as_deref(), Some("date"));
    }

    #[test]
    fn non_object_roots_are_empty_schemas() {
        assert_eq!(Schema::from_value(json!(true)).unwrap(), Schema::default());
        assert_eq!(Schema::from_str("[1, 2]").unwrap(), Schema::default());
        assert!(matches!(Schema::from_str("{ nope"), Err(SchemaError::Decode { .. })));
    }
}
