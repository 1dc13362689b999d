//! Validator library.
//!
//! A validator looks at one control value and either passes or yields a named
//! failure reason. A control keeps its validators as a set: adding the same
//! validator twice is a no-op, so repeated conditional transitions never stack
//! duplicate checks.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::SchemaError;

/// Failure reason key → description. Empty means valid.
pub type ValidationErrors = IndexMap<String, Value>;

// ------------------------------- Patterns --------------------------------- //

/// A regular expression with full-string match semantics.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, SchemaError> {
        let anchored = Regex::new(&format!("^(?:{source})$")).map_err(|source_err| {
            SchemaError::InvalidPattern { pattern: source.to_string(), source: source_err }
        })?;
        Ok(Self { source: source.to_string(), anchored })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

pub const INTEGER_PATTERN: &str = r"-?\d+";
pub const DECIMAL_PATTERN: &str = r"-?(\d+(\.\d+)?|\d*\.\d+)";

static INTEGER: Lazy<Pattern> = Lazy::new(|| builtin(INTEGER_PATTERN));
static DECIMAL: Lazy<Pattern> = Lazy::new(|| builtin(DECIMAL_PATTERN));

fn builtin(source: &str) -> Pattern {
    // built-in sources are fixed literals above
    Pattern::new(source).unwrap_or_else(|err| unreachable!("built-in pattern: {err}"))
}

pub fn integer_pattern() -> Pattern {
    INTEGER.clone()
}

pub fn decimal_pattern() -> Pattern {
    DECIMAL.clone()
}

// ------------------------------ Validators -------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Fails on null, empty string and empty array.
    Required,
    /// Fails when the stringified value does not fully match. Empty values pass.
    Pattern(Pattern),
    /// Fails unless the value strictly equals the given one.
    Const(Value),
    /// Fails when a numeric value is below the bound. Empty values pass.
    Min(f64),
    /// Fails when a numeric value is above the bound. Empty values pass.
    Max(f64),
}

impl Validator {
    pub fn key(&self) -> &'static str {
        match self {
            Validator::Required => "required",
            Validator::Pattern(_) => "pattern",
            Validator::Const(_) => "const",
            Validator::Min(_) => "min",
            Validator::Max(_) => "max",
        }
    }

    /// `None` when the value passes.
    pub fn check(&self, value: &Value) -> Option<Value> {
        match self {
            Validator::Required => is_empty_input(value).then(|| Value::Bool(true)),
            Validator::Pattern(pattern) => {
                if is_empty_input(value) {
                    return None;
                }
                let text = stringify(value);
                (!pattern.is_full_match(&text)).then(|| {
                    json!({ "requiredPattern": pattern.source(), "actualValue": value })
                })
            }
            Validator::Const(expected) => {
                (!strict_eq(value, expected)).then(|| Value::String(format!("Must be {}", stringify(expected))))
            }
            Validator::Min(min) => {
                let actual = numeric(value)?;
                (actual < *min).then(|| json!({ "min": min, "actual": value }))
            }
            Validator::Max(max) => {
                let actual = numeric(value)?;
                (actual > *max).then(|| json!({ "max": max, "actual": value }))
            }
        }
    }
}

/// Ordered set of validators attached to one control.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatorSet {
    items: Vec<Validator>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when an equal validator was already present.
    pub fn insert(&mut self, validator: Validator) -> bool {
        if self.items.contains(&validator) {
            return false;
        }
        self.items.push(validator);
        true
    }

    /// Removes every validator with the given failure key.
    pub fn remove_key(&mut self, key: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|v| v.key() != key);
        self.items.len() != before
    }

    pub fn contains(&self, validator: &Validator) -> bool {
        self.items.contains(validator)
    }

    pub fn is_required(&self) -> bool {
        self.contains(&Validator::Required)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.items.iter()
    }

    /// Evaluates every validator independently. `None` means valid.
    pub fn validate(&self, value: &Value) -> Option<ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for validator in &self.items {
            if let Some(reason) = validator.check(value) {
                errors.insert(validator.key().to_string(), reason);
            }
        }
        if errors.is_empty() { None } else { Some(errors) }
    }
}

impl FromIterator<Validator> for ValidatorSet {
    fn from_iter<I: IntoIterator<Item = Validator>>(iter: I) -> Self {
        let mut set = ValidatorSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

// ------------------------------- Helpers ---------------------------------- //

pub fn is_empty_input(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(xs) => xs.is_empty(),
        _ => false,
    }
}

/// Text form used for pattern matching.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers compare by numeric value (`1` == `1.0`), everything else structurally.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
        _ => None,
    }
}

// ------------------------------- Tests ------------------------------------ //
