//! Control model: the live, mutable tree the compiler produces.
//!
//! - [`ControlKind::Leaf`] holds a scalar value.
//! - [`ControlKind::Group`] holds named children in schema order.
//! - [`ControlKind::Collection`] holds an ordered list of children.
//!
//! Every control carries a validator set, an enabled flag and an optional
//! enable-if predicate evaluated against its parent's aggregate value.
//!
//! Notifications are synchronous and push-based. A write on a leaf notifies
//! the leaf's listeners and then walks up through the ancestors. Each ancestor
//! *settles* before telling anyone: it runs its internal rules (enable-if
//! predicates, conditional branches) until no rule mutates it anymore, and
//! only then delivers one event with the final aggregate value to external
//! listeners. Mutations made by a rule while its owner is settling are folded
//! into the current settling pass instead of re-entering it.
//!
//! The tree is single-threaded (`Rc`/`RefCell`); parents are held weakly so
//! dropping the root drops everything, subscriptions included.
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::validate::{ValidationErrors, Validator, ValidatorSet};

// ------------------------------- Policy ----------------------------------- //

/// Upper bound on rule passes per settle; rules that keep flipping each other
/// are cut off here instead of looping forever.
const MAX_SETTLE_PASSES: usize = 32;

// -------------------------------- Types ----------------------------------- //

/// Receives the control's aggregate value after every settled change.
pub type Listener = Rc<dyn Fn(&Value)>;

/// Decides from the parent's aggregate value whether a control is enabled.
pub type EnablePredicate = Rc<dyn Fn(&Value) -> bool>;

/// Internal reaction run while the owning control settles.
pub(crate) type Rule = Rc<dyn Fn(&Value)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Leaf,
    Group,
    Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Valid,
    Invalid,
    Disabled,
}

/// Handle returned by [`Control::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Shared handle to one node of the control tree. Cloning is cheap and yields
/// another handle to the same node.
#[derive(Clone)]
pub struct Control {
    node: Rc<RefCell<Node>>,
}

struct Node {
    body: Body,
    enabled: bool,
    validators: ValidatorSet,
    enable_if: Option<EnablePredicate>,
    parent: Weak<RefCell<Node>>,
    rules: Vec<Rule>,
    listeners: Vec<(u64, Listener)>,
    next_subscription: u64,
    settling: bool,
    dirty: bool,
}

enum Body {
    Leaf(Value),
    Group(IndexMap<String, Control>),
    Collection(Vec<Control>),
}

// ---------------------------- Construction -------------------------------- //

impl Control {
    fn from_body(body: Body, validators: ValidatorSet) -> Self {
        Control {
            node: Rc::new(RefCell::new(Node {
                body,
                enabled: true,
                validators,
                enable_if: None,
                parent: Weak::new(),
                rules: Vec::new(),
                listeners: Vec::new(),
                next_subscription: 0,
                settling: false,
                dirty: false,
            })),
        }
    }

    pub fn leaf(value: Value) -> Self {
        Self::from_body(Body::Leaf(value), ValidatorSet::new())
    }

    pub fn leaf_with(value: Value, validators: ValidatorSet) -> Self {
        Self::from_body(Body::Leaf(value), validators)
    }

    pub fn group() -> Self {
        Self::from_body(Body::Group(IndexMap::new()), ValidatorSet::new())
    }

    pub fn collection() -> Self {
        Self::from_body(Body::Collection(Vec::new()), ValidatorSet::new())
    }
}

// ------------------------------- Reading ---------------------------------- //

impl Control {
    pub fn kind(&self) -> ControlKind {
        match self.node.borrow().body {
            Body::Leaf(_) => ControlKind::Leaf,
            Body::Group(_) => ControlKind::Group,
            Body::Collection(_) => ControlKind::Collection,
        }
    }

    pub fn ptr_eq(&self, other: &Control) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub fn parent(&self) -> Option<Control> {
        self.node.borrow().parent.upgrade().map(|node| Control { node })
    }

    /// Aggregate value: disabled descendants are left out.
    pub fn value(&self) -> Value {
        self.read_value(false)
    }

    /// Like [`Control::value`] but including disabled descendants.
    pub fn raw_value(&self) -> Value {
        self.read_value(true)
    }

    fn read_value(&self, include_disabled: bool) -> Value {
        let node = self.node.borrow();
        match &node.body {
            Body::Leaf(value) => value.clone(),
            Body::Group(children) => {
                let mut out = Map::new();
                for (name, child) in children {
                    if include_disabled || child.is_enabled() {
                        out.insert(name.clone(), child.read_value(include_disabled));
                    }
                }
                Value::Object(out)
            }
            Body::Collection(items) => Value::Array(
                items
                    .iter()
                    .filter(|item| include_disabled || item.is_enabled())
                    .map(|item| item.read_value(include_disabled))
                    .collect(),
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.node.borrow().enabled
    }

    pub fn is_disabled(&self) -> bool {
        !self.is_enabled()
    }

    pub fn validators(&self) -> ValidatorSet {
        self.node.borrow().validators.clone()
    }

    pub fn is_required(&self) -> bool {
        self.node.borrow().validators.is_required()
    }

    /// Own validator failures; `None` when valid or disabled.
    pub fn errors(&self) -> Option<ValidationErrors> {
        if self.is_disabled() {
            return None;
        }
        let value = self.value();
        self.node.borrow().validators.validate(&value)
    }

    pub fn status(&self) -> Status {
        if self.is_disabled() {
            return Status::Disabled;
        }
        if self.errors().is_some() {
            return Status::Invalid;
        }
        let any_invalid = self.children().iter().any(|child| child.status() == Status::Invalid);
        if any_invalid { Status::Invalid } else { Status::Valid }
    }

    /// Conjunction of every enabled control's validity, recursively.
    pub fn is_valid(&self) -> bool {
        self.status() == Status::Valid
    }

    /// Failures of every enabled control, keyed by dotted path from here.
    /// The control's own failures use the empty path.
    pub fn error_report(&self) -> IndexMap<String, ValidationErrors> {
        let mut out = IndexMap::new();
        self.collect_errors("", &mut out);
        out
    }

    fn collect_errors(&self, path: &str, out: &mut IndexMap<String, ValidationErrors>) {
        if self.is_disabled() {
            return;
        }
        if let Some(errors) = self.errors() {
            out.insert(path.to_string(), errors);
        }
        for (segment, child) in self.named_children() {
            let child_path = if path.is_empty() { segment } else { format!("{path}.{segment}") };
            child.collect_errors(&child_path, out);
        }
    }

    /// Direct children (group members or collection items), in order.
    pub fn children(&self) -> Vec<Control> {
        self.named_children().into_iter().map(|(_, child)| child).collect()
    }

    /// Direct children with their path segment (name or index).
    pub fn named_children(&self) -> Vec<(String, Control)> {
        match &self.node.borrow().body {
            Body::Leaf(_) => Vec::new(),
            Body::Group(children) => children.iter().map(|(k, c)| (k.clone(), c.clone())).collect(),
            Body::Collection(items) => items.iter().enumerate().map(|(i, c)| (i.to_string(), c.clone())).collect(),
        }
    }
}

// ------------------------------- Groups ----------------------------------- //

impl Control {
    /// Child by name (groups) or index (collections).
    pub fn get(&self, segment: &str) -> Option<Control> {
        match &self.node.borrow().body {
            Body::Leaf(_) => None,
            Body::Group(children) => children.get(segment).cloned(),
            Body::Collection(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        }
    }

    /// Resolves a dotted path such as `address.street` or `tags.0`.
    pub fn get_path(&self, path: &str) -> Option<Control> {
        let mut current = self.clone();
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        match &self.node.borrow().body {
            Body::Group(children) => children.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Adds a named child to a group. An existing child of the same name is
    /// kept and `false` is returned.
    pub fn add_control(&self, name: &str, child: Control) -> bool {
        {
            let mut node = self.node.borrow_mut();
            let Body::Group(children) = &mut node.body else {
                return false;
            };
            if children.contains_key(name) {
                return false;
            }
            child.node.borrow_mut().parent = Rc::downgrade(&self.node);
            children.insert(name.to_string(), child);
        }
        self.notify();
        true
    }
}

// ----------------------------- Collections -------------------------------- //

impl Control {
    pub fn len(&self) -> usize {
        match &self.node.borrow().body {
            Body::Leaf(_) => 0,
            Body::Group(children) => children.len(),
            Body::Collection(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&self, item: Control) -> bool {
        let len = self.len();
        self.insert(len, item)
    }

    /// Inserts into a collection; out-of-range indices append.
    pub fn insert(&self, index: usize, item: Control) -> bool {
        {
            let mut node = self.node.borrow_mut();
            let Body::Collection(items) = &mut node.body else {
                return false;
            };
            item.node.borrow_mut().parent = Rc::downgrade(&self.node);
            let index = index.min(items.len());
            items.insert(index, item);
        }
        self.notify();
        true
    }

    pub fn remove(&self, index: usize) -> Option<Control> {
        let removed = {
            let mut node = self.node.borrow_mut();
            let Body::Collection(items) = &mut node.body else {
                return None;
            };
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        removed.node.borrow_mut().parent = Weak::new();
        self.notify();
        Some(removed)
    }
}

// ------------------------------- Writing ---------------------------------- //

impl Control {
    /// Writes a value. Leaves take it as is; groups patch their children by
    /// name and collections by index, settling once at the end.
    pub fn set_value(&self, value: Value) {
        match self.kind() {
            ControlKind::Leaf => {
                if let Body::Leaf(slot) = &mut self.node.borrow_mut().body {
                    *slot = value;
                }
                self.notify();
            }
            ControlKind::Group | ControlKind::Collection => self.patch_value(&value),
        }
    }

    /// Writes the matching parts of `value` into the children. Unknown names,
    /// missing indices and shape mismatches are ignored.
    pub fn patch_value(&self, value: &Value) {
        let targets: Vec<(Control, Value)> = match value {
            Value::Object(map) => map
                .iter()
                .filter_map(|(k, v)| self.group_child(k).map(|c| (c, v.clone())))
                .collect(),
            Value::Array(xs) if self.kind() == ControlKind::Collection => xs
                .iter()
                .enumerate()
                .filter_map(|(i, v)| self.get(&i.to_string()).map(|c| (c, v.clone())))
                .collect(),
            _ => return,
        };
        self.batch(|| {
            for (child, v) in targets {
                child.set_value(v);
            }
        });
    }

    fn group_child(&self, name: &str) -> Option<Control> {
        match &self.node.borrow().body {
            Body::Group(children) => children.get(name).cloned(),
            _ => None,
        }
    }

    /// Runs `f` with this control's notifications held back, then settles and
    /// notifies once.
    pub fn batch(&self, f: impl FnOnce()) {
        let was_settling = std::mem::replace(&mut self.node.borrow_mut().settling, true);
        f();
        if was_settling {
            self.node.borrow_mut().dirty = true;
            return;
        }
        self.node.borrow_mut().settling = false;
        self.notify();
    }

    pub fn enable(&self) -> bool {
        self.set_enabled(true)
    }

    pub fn disable(&self) -> bool {
        self.set_enabled(false)
    }

    /// Returns whether the flag changed. Changes notify the parent, whose
    /// aggregate value now includes or omits this control.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        {
            let mut node = self.node.borrow_mut();
            if node.enabled == enabled {
                return false;
            }
            node.enabled = enabled;
        }
        if let Some(parent) = self.parent() {
            parent.notify();
        }
        true
    }

    /// Installs (or clears) the enable-if predicate and lets the parent
    /// re-evaluate it right away.
    pub fn set_enable_if(&self, predicate: Option<EnablePredicate>) {
        self.node.borrow_mut().enable_if = predicate;
        if let Some(parent) = self.parent() {
            parent.notify();
        }
    }

    /// Returns whether the validator was new.
    pub fn add_validator(&self, validator: Validator) -> bool {
        let added = self.node.borrow_mut().validators.insert(validator);
        if added {
            self.notify();
        }
        added
    }

    pub fn remove_validators(&self, key: &str) -> bool {
        let removed = self.node.borrow_mut().validators.remove_key(key);
        if removed {
            self.notify();
        }
        removed
    }
}

// ---------------------------- Notification -------------------------------- //

impl Control {
    pub fn subscribe(&self, listener: impl Fn(&Value) + 'static) -> Subscription {
        let mut node = self.node.borrow_mut();
        let id = node.next_subscription;
        node.next_subscription += 1;
        node.listeners.push((id, Rc::new(listener)));
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut node = self.node.borrow_mut();
        let before = node.listeners.len();
        node.listeners.retain(|(id, _)| *id != subscription.0);
        node.listeners.len() != before
    }

    /// Registers an internal rule and settles immediately so the rule sees
    /// the current value once.
    pub(crate) fn add_rule(&self, rule: Rule) {
        self.node.borrow_mut().rules.push(rule);
        self.notify();
    }

    /// Re-runs rules and notifies listeners and ancestors, as if a value had
    /// changed.
    pub fn update_value_and_validity(&self) {
        self.notify();
    }

    fn notify(&self) {
        {
            let mut node = self.node.borrow_mut();
            if node.settling {
                node.dirty = true;
                return;
            }
            node.settling = true;
        }
        self.settle();
        self.node.borrow_mut().settling = false;

        let value = self.value();
        trace!(kind = ?self.kind(), "value change");
        let listeners: Vec<Listener> = self.node.borrow().listeners.iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(&value);
        }
        if let Some(parent) = self.parent() {
            parent.notify();
        }
    }

    fn settle(&self) {
        for _ in 0..MAX_SETTLE_PASSES {
            self.node.borrow_mut().dirty = false;
            self.apply_enable_if();
            let value = self.value();
            let rules: Vec<Rule> = self.node.borrow().rules.clone();
            for rule in rules {
                rule(&value);
            }
            if !self.node.borrow().dirty {
                return;
            }
        }
        warn!(passes = MAX_SETTLE_PASSES, "control did not settle; rules keep mutating each other");
    }

    fn apply_enable_if(&self) {
        let gated: Vec<(Control, EnablePredicate)> = self
            .children()
            .into_iter()
            .filter_map(|child| {
                let predicate = child.node.borrow().enable_if.clone()?;
                Some((child, predicate))
            })
            .collect();
        if gated.is_empty() {
            return;
        }
        let value = self.value();
        for (child, predicate) in gated {
            child.set_enabled(predicate(&value));
        }
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("kind", &self.kind())
            .field("enabled", &self.is_enabled())
            .field("value", &self.raw_value())
            .finish()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn group_of(names: &[&str]) -> Control {
        let group = Control::group();
        for name in names {
            group.add_control(name, Control::leaf(Value::Null));
        }
        group
    }

    #[test]
    fn group_value_omits_disabled_children() {
        let group = group_of(&["x", "y"]);
        group.get("x").unwrap().set_value(json!("a"));
        group.get("y").unwrap().disable();
        assert_eq!(group.value(), json!({ "x": "a" }));
        assert_eq!(group.raw_value(), json!({ "x": "a", "y": null }));
    }

    #[test]
    fn validity_ignores_disabled_controls() {
        let group = group_of(&["x", "y"]);
        let y = group.get("y").unwrap();
        y.add_validator(Validator::Required);
        assert!(!group.is_valid());
        y.disable();
        assert_eq!(y.status(), Status::Disabled);
        assert!(y.errors().is_none());
        assert!(group.is_valid());
    }

    #[test]
    fn leaf_write_notifies_every_ancestor_once() {
        let root = Control::group();
        let inner = group_of(&["street"]);
        root.add_control("address", inner.clone());

        let root_events = Rc::new(Cell::new(0));
        let inner_events = Rc::new(Cell::new(0));
        let r = root_events.clone();
        root.subscribe(move |_| r.set(r.get() + 1));
        let i = inner_events.clone();
        inner.subscribe(move |_| i.set(i.get() + 1));

        root.get_path("address.street").unwrap().set_value(json!("Main"));
        assert_eq!(root_events.get(), 1);
        assert_eq!(inner_events.get(), 1);
        assert_eq!(root.value(), json!({ "address": { "street": "Main" } }));
    }

    #[test]
    fn rule_mutations_settle_into_one_event() {
        let group = group_of(&["x", "y"]);
        let y = group.get("y").unwrap();
        let rule_y = y.clone();
        group.add_rule(Rc::new(move |value: &Value| {
            rule_y.set_enabled(value["x"] == json!("on"));
        }));
        assert!(y.is_disabled());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        group.subscribe(move |v| s.borrow_mut().push(v.clone()));

        group.get("x").unwrap().set_value(json!("on"));
        assert_eq!(*seen.borrow(), vec![json!({ "x": "on", "y": null })]);
    }

    #[test]
    fn enable_if_tracks_parent_value() {
        let group = group_of(&["x", "y"]);
        let y = group.get("y").unwrap();
        y.set_enable_if(Some(Rc::new(|value: &Value| value["x"] == json!("x"))));
        assert!(y.is_disabled());
        group.get("x").unwrap().set_value(json!("x"));
        assert!(y.is_enabled());
        group.get("x").unwrap().set_value(json!("other"));
        assert!(y.is_disabled());
    }

    #[test]
    fn patch_value_writes_matching_children_and_settles_once() {
        let group = group_of(&["x", "y"]);
        let events = Rc::new(Cell::new(0));
        let e = events.clone();
        group.subscribe(move |_| e.set(e.get() + 1));
        group.patch_value(&json!({ "x": 1, "y": 2, "unknown": 3 }));
        assert_eq!(events.get(), 1);
        assert_eq!(group.value(), json!({ "x": 1, "y": 2 }));
    }

    #[test]
    fn collections_hold_ordered_items() {
        let list = Control::collection();
        assert!(list.is_empty());
        list.push(Control::leaf(json!("a")));
        list.push(Control::leaf(json!("c")));
        list.insert(1, Control::leaf(json!("b")));
        assert_eq!(list.value(), json!(["a", "b", "c"]));
        assert_eq!(list.get_path("1").unwrap().value(), json!("b"));
        let removed = list.remove(0).unwrap();
        assert!(removed.parent().is_none());
        assert_eq!(list.value(), json!(["b", "c"]));
        assert!(list.remove(5).is_none());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let leaf = Control::leaf(Value::Null);
        let events = Rc::new(Cell::new(0));
        let e = events.clone();
        let sub = leaf.subscribe(move |_| e.set(e.get() + 1));
        leaf.set_value(json!(1));
        assert!(leaf.unsubscribe(sub));
        leaf.set_value(json!(2));
        assert_eq!(events.get(), 1);
    }

    #[test]
    fn error_report_uses_dotted_paths() {
        let root = Control::group();
        let inner = group_of(&["street"]);
        root.add_control("address", inner);
        root.get_path("address.street").unwrap().add_validator(Validator::Required);
        let report = root.error_report();
        assert_eq!(report.keys().collect::<Vec<_>>(), ["address.street"]);
        assert_eq!(report["address.street"]["required"], json!(true));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let group = group_of(&["x"]);
        assert!(!group.add_control("x", Control::leaf(json!(1))));
        assert_eq!(group.value(), json!({ "x": null }));
    }
}
