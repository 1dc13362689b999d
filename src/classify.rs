//! Schema classifier.
//!
//! Decides what a schema node *is* before anything gets built. Resolution is
//! ordered and total:
//!
//! 1. a node carrying `$ref` is a [`Kind::Reference`] (never resolved);
//! 2. a single concrete `type` wins;
//! 3. otherwise infer from structure: `properties` ⇒ object, string-only
//!    keywords or a string `default`/`const` ⇒ string;
//! 4. anything else is [`Kind::Unclassifiable`].
//!
//! All shape predicates used by the compiler and the conditional engine live
//! here so keyword interpretation is not re-checked elsewhere.
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Object,
    Array,
    Reference,
    Unclassifiable,
}

impl Kind {
    pub fn from_type_name(name: &str) -> Option<Kind> {
        match name {
            "string" => Some(Kind::String),
            "number" => Some(Kind::Number),
            "integer" => Some(Kind::Integer),
            "boolean" => Some(Kind::Boolean),
            "null" => Some(Kind::Null),
            "object" => Some(Kind::Object),
            "array" => Some(Kind::Array),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Integer => "integer",
            Kind::Boolean => "boolean",
            Kind::Null => "null",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::Reference => "reference",
            Kind::Unclassifiable => "unclassifiable",
        }
    }

    /// Whether the compiler can produce a control for this kind at all.
    pub fn is_concrete(self) -> bool {
        !matches!(self, Kind::Reference | Kind::Unclassifiable)
    }
}

/// Keywords that only make sense on strings.
fn has_string_only_keyword(schema: &Schema) -> bool {
    schema.pattern.is_some()
        || schema.format.is_some()
        || schema.min_length.is_some()
        || schema.max_length.is_some()
}

pub fn classify(schema: &Schema) -> Kind {
    if is_reference(schema) {
        return Kind::Reference;
    }
    if schema.type_.is_some() {
        // Declared but not a single known name: do not fall through to
        // inference, the author said something we cannot honor.
        return schema
            .single_type()
            .and_then(Kind::from_type_name)
            .unwrap_or(Kind::Unclassifiable);
    }
    if is_object(schema) {
        return Kind::Object;
    }
    if is_string(schema) {
        return Kind::String;
    }
    Kind::Unclassifiable
}

// ------------------------------ Predicates -------------------------------- //

pub fn is_reference(schema: &Schema) -> bool {
    schema.reference.is_some()
}

pub fn is_object(schema: &Schema) -> bool {
    !is_reference(schema) && (schema.properties.is_some() || schema.single_type() == Some("object"))
}

/// Object schema with an explicit `properties` map.
pub fn is_explicit_object(schema: &Schema) -> bool {
    is_object(schema) && schema.properties.is_some()
}

pub fn is_string(schema: &Schema) -> bool {
    if schema.single_type() == Some("string") {
        return true;
    }
    if has_string_only_keyword(schema) {
        return true;
    }
    matches!(schema.default, Some(serde_json::Value::String(_)))
        || matches!(schema.const_, Some(serde_json::Value::String(_)))
}

pub fn is_const(schema: &Schema) -> bool {
    schema.const_.is_some()
}

pub fn is_enum(schema: &Schema) -> bool {
    schema.enum_.is_some()
}

pub fn is_pattern(schema: &Schema) -> bool {
    schema.pattern.is_some()
}

pub fn is_conditional(schema: &Schema) -> bool {
    schema.if_.is_some() && schema.then.is_some()
}

pub fn has_requirements(schema: &Schema) -> bool {
    !schema.required_names().is_empty()
}

pub fn has_dependencies(schema: &Schema) -> bool {
    schema.dependencies.is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateTimeFormat {
    DateTime,
    Date,
    Time,
}

impl DateTimeFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "date-time" => Some(Self::DateTime),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
        }
    }
}

pub fn date_time_format(schema: &Schema) -> Option<DateTimeFormat> {
    schema.format.as_deref().and_then(DateTimeFormat::from_name)
}

/// Composition keywords the compiler recognizes but does not interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    AnyOf,
    OneOf,
    AllOf,
    Not,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::AnyOf => "anyOf",
            Combinator::OneOf => "oneOf",
            Combinator::AllOf => "allOf",
            Combinator::Not => "not",
        }
    }
}

pub fn combinator(schema: &Schema) -> Option<Combinator> {
    if schema.any_of.is_some() {
        Some(Combinator::AnyOf)
    } else if schema.one_of.is_some() {
        Some(Combinator::OneOf)
    } else if schema.all_of.is_some() {
        Some(Combinator::AllOf)
    } else if schema.not.is_some() {
        Some(Combinator::Not)
    } else {
        None
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind_of(v: serde_json::Value) -> Kind {
        classify(&Schema::from_value(v).unwrap())
    }

    #[test]
    fn explicit_type_wins() {
        assert_eq!(kind_of(json!({ "type": "integer" })), Kind::Integer);
        assert_eq!(kind_of(json!({ "type": "null" })), Kind::Null);
        // explicit type beats structural inference
        assert_eq!(kind_of(json!({ "type": "string", "properties": {} })), Kind::String);
    }

    #[test]
    fn references_are_never_classified_further() {
        assert_eq!(kind_of(json!({ "$ref": "#/definitions/x", "type": "string" })), Kind::Reference);
        assert!(!Kind::Reference.is_concrete());
    }

    #[test]
    fn inference_from_structure() {
        assert_eq!(kind_of(json!({ "properties": {} })), Kind::Object);
        assert_eq!(kind_of(json!({ "pattern": "^a$" })), Kind::String);
        assert_eq!(kind_of(json!({ "format": "date" })), Kind::String);
        assert_eq!(kind_of(json!({ "maxLength": 3 })), Kind::String);
        assert_eq!(kind_of(json!({ "default": "" })), Kind::String);
        assert_eq!(kind_of(json!({ "const": "xc" })), Kind::String);
    }

    #[test]
    fn unclassifiable_shapes() {
        assert_eq!(kind_of(json!({})), Kind::Unclassifiable);
        assert_eq!(kind_of(json!({ "default": 3 })), Kind::Unclassifiable);
        assert_eq!(kind_of(json!({ "anyOf": [{ "type": "string" }] })), Kind::Unclassifiable);
        assert_eq!(kind_of(json!({ "type": ["string", "null"] })), Kind::Unclassifiable);
        assert_eq!(kind_of(json!({ "type": "date" })), Kind::Unclassifiable);
    }

    #[test]
    fn shape_predicates() {
        let schema = Schema::from_value(json!({
            "properties": { "x": {} },
            "if": { "properties": { "x": { "const": 1 } } },
            "then": { "required": ["x"] },
            "required": ["x"],
            "oneOf": []
        }))
        .unwrap();
        assert!(is_explicit_object(&schema));
        assert!(is_conditional(&schema));
        assert!(has_requirements(&schema));
        assert!(!has_dependencies(&schema));
        assert_eq!(combinator(&schema), Some(Combinator::OneOf));

        let ts = Schema::from_value(json!({ "format": "time" })).unwrap();
        assert_eq!(date_time_format(&ts), Some(DateTimeFormat::Time));
        let email = Schema::from_value(json!({ "format": "email" })).unwrap();
        assert_eq!(date_time_format(&email), None);
    }
}
