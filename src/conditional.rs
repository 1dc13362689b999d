//! Conditional engine for `if` / `then` / `else` on object schemas.
//!
//! Activation requires an `if` whose `properties` name existing sibling
//! controls, each with a resolvable matcher (`const`, `enum` or `pattern`,
//! in that priority; `$ref` resolves to a matcher that never holds). If any
//! of that fails the group keeps its static behavior.
//!
//! Branch setup runs once: `then`/`else` properties that are not in the group
//! yet are compiled, added disabled and become the branch's *introduced*
//! controls; the branch's `required` names plus any redeclared existing
//! properties become its *required* controls (minus those that are already
//! required unconditionally).
//!
//! At runtime the engine is a two-state machine (Unmet → Met → Unmet ...)
//! driven by the group's settled value. It is edge-triggered: only a change
//! of the condition's truth value acts, and evaluations stay silent until the
//! condition holds for the first time.
//!
//! A conditional nested inside `else` is not activated.
use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::builder::Compiler;
use crate::classify::{has_requirements, is_conditional, is_const, is_enum, is_explicit_object, is_pattern, is_reference};
use crate::control::Control;
use crate::dependency::statically_required;
use crate::schema::Schema;
use crate::validate::{stringify, strict_eq, Pattern, Validator};

// ------------------------------- Matchers --------------------------------- //

/// Test applied to one `if` property's current value.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Const(Value),
    Enum(Vec<Value>),
    Pattern(Pattern),
    /// A `$ref` in the condition. Never holds.
    Reference,
}

impl Matcher {
    /// `None` when the schema carries nothing usable as a matcher.
    pub fn resolve(schema: &Schema) -> Option<Matcher> {
        if is_reference(schema) {
            return Some(Matcher::Reference);
        }
        if is_const(schema) {
            return schema.const_.clone().map(Matcher::Const);
        }
        if is_enum(schema) {
            return schema.enum_.clone().map(Matcher::Enum);
        }
        if is_pattern(schema) {
            let source = schema.pattern.as_deref()?;
            return match Pattern::new(source) {
                Ok(pattern) => Some(Matcher::Pattern(pattern)),
                Err(error) => {
                    debug!(%error, "condition pattern unusable");
                    None
                }
            };
        }
        None
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Const(expected) => strict_eq(value, expected),
            Matcher::Enum(options) => options.iter().any(|option| strict_eq(value, option)),
            Matcher::Pattern(pattern) => !value.is_null() && pattern.is_full_match(&stringify(value)),
            Matcher::Reference => false,
        }
    }
}

/// Conjunction of per-property matchers over a group value.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    matchers: Vec<(String, Matcher)>,
}

impl Condition {
    /// Resolves the `if` clause against the group's current children.
    pub fn resolve(if_schema: &Schema, group: &Control) -> Option<Condition> {
        if !is_explicit_object(if_schema) {
            return None;
        }
        let properties = if_schema.properties.as_ref()?;
        if properties.is_empty() {
            return None;
        }
        let mut matchers = Vec::with_capacity(properties.len());
        for (name, property) in properties {
            if !group.contains(name) {
                debug!(property = %name, "condition names a property the group does not have");
                return None;
            }
            let Some(matcher) = Matcher::resolve(property) else {
                debug!(property = %name, "condition property has no matcher");
                return None;
            };
            matchers.push((name.clone(), matcher));
        }
        Some(Condition { matchers })
    }

    pub fn holds(&self, group_value: &Value) -> bool {
        self.matchers.iter().all(|(name, matcher)| {
            let value = group_value.get(name).unwrap_or(&Value::Null);
            matcher.matches(value)
        })
    }
}

// ------------------------------- Branches --------------------------------- //

#[derive(Debug, Default)]
struct Branch {
    /// Controls this branch added to the group.
    introduced: Vec<Control>,
    /// Controls that are required only while this branch is active.
    required: Vec<Control>,
}

impl Branch {
    /// `existing` holds the group's names from before any branch was set up;
    /// only those count as redeclared. `fixed` holds the names the schema
    /// requires unconditionally, which a branch never toggles.
    fn setup(compiler: &Compiler, group: &Control, schema: &Schema, existing: &[String], fixed: &[&str]) -> Branch {
        let mut branch = Branch::default();
        let mut required_names: Vec<&str> = Vec::new();

        if let Some(properties) = &schema.properties {
            for (name, property) in properties {
                if existing.contains(name) {
                    required_names.push(name);
                    continue;
                }
                // declared by the other branch as well: share its control
                if let Some(control) = group.get(name) {
                    branch.introduced.push(control);
                    continue;
                }
                if let Some(control) = compiler.compile_node(property) {
                    control.disable();
                    group.add_control(name, control.clone());
                    branch.introduced.push(control);
                }
            }
        }
        required_names.extend(schema.required_names().iter().map(String::as_str));

        for name in required_names {
            if fixed.contains(&name) {
                continue;
            }
            let Some(control) = group.get(name) else {
                continue;
            };
            if !branch.required.iter().any(|c| c.ptr_eq(&control)) {
                branch.required.push(control);
            }
        }
        branch
    }

    fn activate(&self) {
        for control in &self.required {
            control.add_validator(Validator::Required);
        }
        for control in &self.introduced {
            control.enable();
        }
    }

    fn deactivate(&self) {
        for control in &self.required {
            control.remove_validators(Validator::Required.key());
        }
        for control in &self.introduced {
            control.disable();
        }
    }
}

fn is_branch_schema(schema: &Schema) -> bool {
    schema.properties.is_some() || has_requirements(schema)
}

// ----------------------------- State machine ------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionState {
    Unmet,
    Met,
}

/// Turns a stream of truth values into state transitions: repeats are
/// dropped, and nothing fires before the first `true`.
#[derive(Debug, Default)]
pub struct EdgeTrigger {
    last: Cell<Option<bool>>,
    armed: Cell<bool>,
}

impl EdgeTrigger {
    pub fn observe(&self, truth: bool) -> Option<ConditionState> {
        if self.last.get() == Some(truth) {
            return None;
        }
        self.last.set(Some(truth));
        if !self.armed.get() {
            if !truth {
                return None;
            }
            self.armed.set(true);
        }
        Some(if truth { ConditionState::Met } else { ConditionState::Unmet })
    }
}

struct Engine {
    condition: Condition,
    then: Branch,
    otherwise: Branch,
    trigger: EdgeTrigger,
}

impl Engine {
    fn evaluate(&self, group_value: &Value) {
        let Some(state) = self.trigger.observe(self.condition.holds(group_value)) else {
            return;
        };
        debug!(?state, "condition transition");
        match state {
            // leave the old branch before entering the new one, so controls
            // both branches declare end up in the state of the active one
            ConditionState::Met => {
                self.otherwise.deactivate();
                self.then.activate();
            }
            ConditionState::Unmet => {
                self.then.deactivate();
                self.otherwise.activate();
            }
        }
    }
}

/// Wires the conditional of `schema` onto `group`, or does nothing when the
/// conditional cannot be resolved.
pub(crate) fn attach(compiler: &Compiler, group: &Control, schema: &Schema) {
    let (Some(if_schema), Some(then_schema)) = (schema.if_.as_deref(), schema.then.as_deref()) else {
        return;
    };
    let Some(condition) = Condition::resolve(if_schema, group) else {
        debug!("conditional not activated: unresolvable `if`");
        return;
    };
    if !is_branch_schema(then_schema) {
        debug!("conditional not activated: `then` has no properties or requirements");
        return;
    }

    let existing = group.names();
    let fixed = statically_required(schema);
    let then = Branch::setup(compiler, group, then_schema, &existing, &fixed);
    let otherwise = match schema.else_.as_deref() {
        Some(else_schema) => {
            if is_conditional(else_schema) {
                debug!("nested conditional in `else` is not activated");
            }
            if is_branch_schema(else_schema) {
                Branch::setup(compiler, group, else_schema, &existing, &fixed)
            } else {
                Branch::default()
            }
        }
        None => Branch::default(),
    };

    let engine = Rc::new(Engine { condition, then, otherwise, trigger: EdgeTrigger::default() });
    group.add_rule(Rc::new(move |value: &Value| engine.evaluate(value)));
}

// ------------------------------- Tests ------------------------------------ //
