use tracing::debug;

use super::Compiler;
use crate::control::Control;
use crate::schema::Schema;

impl Compiler {
    /// Always an empty Collection; items are added by the host, e.g. with
    /// controls from [`Compiler::compile_node`].
    pub(crate) fn build_array(&self, schema: &Schema) -> Control {
        if schema.items.is_some() {
            debug!("array items schema recognized, not pre-populated");
        }
        Control::collection()
    }
}
