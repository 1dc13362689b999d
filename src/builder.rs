//! Schema compiler: Schema → Control tree.
//!
//! One exhaustive match over [`Kind`] picks the per-kind builder; objects
//! recurse back into [`Compiler::compile_node`] for every property, so
//! nesting depth is bounded only by the schema itself.
//!
//! The compiler is permissive: references, unclassifiable nodes and `null`
//! properties produce no control.
pub mod array;
pub mod number;
pub mod object;
pub mod string;

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::classify::{classify, combinator, Combinator, DateTimeFormat, Kind};
use crate::config::BuilderConfig;
use crate::control::Control;
use crate::schema::Schema;
use crate::validate::Pattern;

pub struct Compiler {
    config: BuilderConfig,
    formats: BTreeMap<DateTimeFormat, Pattern>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(BuilderConfig::default())
    }
}

impl Compiler {
    pub fn new(config: BuilderConfig) -> Self {
        let mut formats = BTreeMap::new();
        for format in [DateTimeFormat::DateTime, DateTimeFormat::Date, DateTimeFormat::Time] {
            let Some(source) = config.format_pattern(format) else {
                continue;
            };
            match Pattern::new(source) {
                Ok(pattern) => {
                    formats.insert(format, pattern);
                }
                Err(error) => warn!(format = format.name(), %error, "ignoring configured format pattern"),
            }
        }
        Self { config, formats }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Compiles a root object schema. The result is always a Group (empty if
    /// the schema has no usable properties) and has already settled once, so
    /// conditionals reflect the initial values.
    pub fn from_schema(&self, schema: &Schema) -> Control {
        let root = self.build_object(schema);
        root.update_value_and_validity();
        root
    }

    /// Compiles any schema node. `None` is the regular outcome for shapes
    /// that have no control: references, `null` and unclassifiable nodes.
    pub fn compile_node(&self, schema: &Schema) -> Option<Control> {
        let kind = classify(schema);
        match kind {
            Kind::String => Some(self.build_string(schema)),
            Kind::Number | Kind::Integer => Some(self.build_numeric(schema, kind)),
            Kind::Boolean => Some(Control::leaf(serde_json::Value::Null)),
            Kind::Null => None,
            Kind::Object => Some(self.build_object(schema)),
            Kind::Array => Some(self.build_array(schema)),
            Kind::Reference | Kind::Unclassifiable => {
                let composition = combinator(schema).map(Combinator::keyword);
                debug!(kind = kind.as_str(), combinator = composition, "no control for schema node");
                None
            }
        }
    }

    pub(crate) fn format_pattern(&self, format: DateTimeFormat) -> Option<&Pattern> {
        self.formats.get(&format)
    }
}

/// Compiles with the default configuration.
pub fn compile(schema: &Schema) -> Option<Control> {
    Compiler::default().compile_node(schema)
}

/// Compiles a root object schema with the default configuration.
pub fn from_schema(schema: &Schema) -> Control {
    Compiler::default().from_schema(schema)
}
