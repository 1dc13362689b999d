use serde_json::Value;

use super::Compiler;
use crate::classify::Kind;
use crate::control::Control;
use crate::schema::Schema;
use crate::validate::{decimal_pattern, integer_pattern, Validator, ValidatorSet};

impl Compiler {
    /// Leaf for `number` / `integer` with range and text-format checks.
    ///
    /// NOTE: with the default [`crate::config::ZeroBoundPolicy::Ignore`] a
    /// bound of exactly `0` is treated as absent, unlike JSON Schema.
    pub(crate) fn build_numeric(&self, schema: &Schema, kind: Kind) -> Control {
        let config = self.config();
        let mut validators = ValidatorSet::new();
        if let Some(max) = config.effective_bound(schema.maximum) {
            validators.insert(Validator::Max(max));
        }
        if let Some(min) = config.effective_bound(schema.minimum) {
            validators.insert(Validator::Min(min));
        }
        if config.numeric_format_validators {
            match kind {
                Kind::Integer => {
                    validators.insert(Validator::Pattern(integer_pattern()));
                }
                Kind::Number => {
                    validators.insert(Validator::Pattern(decimal_pattern()));
                }
                _ => {}
            }
        }
        Control::leaf_with(Value::Null, validators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuilderConfig, ZeroBoundPolicy};
    use serde_json::json;

    fn build_with(compiler: &Compiler, v: Value) -> Control {
        let schema = Schema::from_value(v).unwrap();
        let kind = crate::classify::classify(&schema);
        compiler.build_numeric(&schema, kind)
    }

    #[test]
    fn range_validators() {
        let leaf = build_with(&Compiler::default(), json!({ "type": "number", "minimum": 1.5, "maximum": 10 }));
        assert!(leaf.is_valid());
        leaf.set_value(json!(11));
        assert_eq!(leaf.errors().unwrap().keys().collect::<Vec<_>>(), ["max"]);
        leaf.set_value(json!(1));
        assert_eq!(leaf.errors().unwrap().keys().collect::<Vec<_>>(), ["min"]);
        leaf.set_value(json!(2.5));
        assert!(leaf.is_valid());
    }

    #[test]
    fn integer_rejects_fractions() {
        let leaf = build_with(&Compiler::default(), json!({ "type": "integer" }));
        leaf.set_value(json!("12"));
        assert!(leaf.is_valid());
        leaf.set_value(json!("1.2"));
        assert!(!leaf.is_valid());
    }

    #[test]
    fn zero_bounds_are_ignored_by_default() {
        let v = json!({ "type": "integer", "minimum": 0, "maximum": 0 });
        let leaf = build_with(&Compiler::default(), v.clone());
        leaf.set_value(json!(-5));
        assert!(leaf.is_valid());

        let honoring = Compiler::new(BuilderConfig { zero_bounds: ZeroBoundPolicy::Honor, ..BuilderConfig::default() });
        let leaf = build_with(&honoring, v);
        leaf.set_value(json!(-5));
        assert!(!leaf.is_valid());
    }
}
