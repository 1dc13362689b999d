//! Compile a JSON Schema object description into a live form model.
//!
//! ```text
//! Schema ──classify──▶ per-kind builders ──▶ Control tree
//!                                              │
//!                      required / dependencies ┤ (static Required validators)
//!                      if / then / else        ┘ (reactive branch rules)
//! ```
//!
//! The host owns the returned root [`Control`]: it writes leaf values, reads
//! the aggregate value and validity, and subscribes to settled value changes.
pub mod builder;
pub mod classify;
pub mod conditional;
pub mod config;
pub mod control;
pub mod dependency;
pub mod error;
pub mod path_de;
pub mod schema;
pub mod validate;

pub use builder::{compile, from_schema, Compiler};
pub use classify::{classify, Kind};
pub use config::{BuilderConfig, ZeroBoundPolicy};
pub use control::{Control, ControlKind, EnablePredicate, Status, Subscription};
pub use error::SchemaError;
pub use schema::Schema;
pub use validate::{ValidationErrors, Validator, ValidatorSet};
