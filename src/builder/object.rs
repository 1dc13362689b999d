use tracing::debug;

use super::Compiler;
use crate::classify::{has_dependencies, has_requirements, is_conditional};
use crate::control::Control;
use crate::schema::Schema;
use crate::{conditional, dependency};

impl Compiler {
    /// Group with one child per compilable property, in declaration order.
    ///
    /// The conditional engine is wired first so the static requirements
    /// (`required`, `dependencies`) also reach controls a branch introduces.
    /// Branches never toggle a name the schema requires unconditionally.
    pub(crate) fn build_object(&self, schema: &Schema) -> Control {
        let group = Control::group();
        let Some(properties) = &schema.properties else {
            return group;
        };

        for (name, property) in properties {
            match self.compile_node(property) {
                Some(child) => {
                    group.add_control(name, child);
                }
                None => debug!(property = %name, "property dropped from group"),
            }
        }

        if is_conditional(schema) {
            conditional::attach(self, &group, schema);
        }
        if has_requirements(schema) {
            dependency::apply_required(&group, schema.required_names());
        }
        if has_dependencies(schema) {
            if let Some(dependencies) = &schema.dependencies {
                dependency::apply_dependencies(&group, dependencies);
            }
        }

        group
    }
}
