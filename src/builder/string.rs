use serde_json::Value;
use tracing::warn;

use super::Compiler;
use crate::classify::date_time_format;
use crate::control::Control;
use crate::schema::Schema;
use crate::validate::{Pattern, Validator, ValidatorSet};

impl Compiler {
    /// Leaf seeded with a string `default`, checked by `pattern`, the
    /// date/time `format` pattern and `const`.
    pub(crate) fn build_string(&self, schema: &Schema) -> Control {
        let value = match &schema.default {
            Some(Value::String(s)) => Value::String(s.clone()),
            _ => Value::Null,
        };

        let mut validators = ValidatorSet::new();
        if let Some(source) = &schema.pattern {
            match Pattern::new(source) {
                Ok(pattern) => {
                    validators.insert(Validator::Pattern(pattern));
                }
                Err(error) => warn!(%error, "skipping pattern validator"),
            }
        }
        // unknown formats (email, uri, ...) carry no validator
        if let Some(pattern) = date_time_format(schema).and_then(|f| self.format_pattern(f)) {
            validators.insert(Validator::Pattern(pattern.clone()));
        }
        if let Some(expected) = &schema.const_ {
            validators.insert(Validator::Const(expected.clone()));
        }

        Control::leaf_with(value, validators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(v: Value) -> Control {
        Compiler::default().build_string(&Schema::from_value(v).unwrap())
    }

    #[test]
    fn seeds_string_defaults_only() {
        assert_eq!(build(json!({ "default": "something" })).value(), json!("something"));
        assert_eq!(build(json!({ "type": "string", "default": 4 })).value(), Value::Null);
    }

    #[test]
    fn date_time_formats() {
        let dt = build(json!({ "format": "date-time" }));
        assert!(dt.is_valid());
        dt.set_value(json!("2020/02/04-11:10PM"));
        assert!(!dt.is_valid());
        dt.set_value(json!("2020-02-04T11:10:23Z"));
        assert!(dt.is_valid());
        dt.set_value(json!("2020-02-04T11:10:23+05:00"));
        assert!(dt.is_valid());
        dt.set_value(json!("0020-02-04T11:10:23Z"));
        assert!(!dt.is_valid());

        let time = build(json!({ "format": "time" }));
        time.set_value(json!("11:10:23Z"));
        assert!(time.is_valid());
        time.set_value(json!("11:10"));
        assert!(!time.is_valid());

        let date = build(json!({ "format": "date" }));
        date.set_value(json!("2020-02-04"));
        assert!(date.is_valid());
        date.set_value(json!("20-02-04"));
        assert!(!date.is_valid());
    }

    #[test]
    fn unknown_format_attaches_nothing() {
        assert!(build(json!({ "format": "email" })).validators().is_empty());
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let leaf = build(json!({ "pattern": "([", "const": "a" }));
        assert_eq!(leaf.validators().len(), 1);
    }

    #[test]
    fn const_makes_other_values_invalid() {
        let leaf = build(json!({ "const": "fixed" }));
        assert!(!leaf.is_valid());
        leaf.set_value(json!("fixed"));
        assert!(leaf.is_valid());
    }
}
