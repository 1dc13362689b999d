//! `required` and `dependencies` → Required validators on sibling controls.
use indexmap::IndexMap;
use tracing::debug;

use crate::control::Control;
use crate::schema::{Dependency, Schema};
use crate::validate::Validator;

/// Marks every named child of `group` as required. Names without a control
/// are skipped. Each touched child re-evaluates its validity.
pub fn apply_required<S: AsRef<str>>(group: &Control, names: &[S]) {
    for name in names {
        let name = name.as_ref();
        match group.get(name) {
            Some(child) => {
                child.add_validator(Validator::Required);
            }
            None => debug!(property = name, "required name has no control"),
        }
    }
}

/// Applies the property-list form of `dependencies` (`"y": ["z"]`). The
/// listed names become required regardless of the trigger's value; the
/// schema form is recognized but not interpreted.
pub fn apply_dependencies(group: &Control, dependencies: &IndexMap<String, Dependency>) {
    for (trigger, dependency) in dependencies {
        match dependency {
            Dependency::Properties(names) => apply_required(group, names),
            Dependency::Schema(_) => debug!(property = %trigger, "schema dependency not interpreted"),
        }
    }
}

/// Names `required` and the property-list `dependencies` of `schema` mark as
/// required regardless of any conditional.
pub fn statically_required(schema: &Schema) -> Vec<&str> {
    let mut names: Vec<&str> = schema.required_names().iter().map(String::as_str).collect();
    for dependency in schema.dependencies.iter().flat_map(|deps| deps.values()) {
        if let Dependency::Properties(targets) = dependency {
            names.extend(targets.iter().map(String::as_str));
        }
    }
    names
}
