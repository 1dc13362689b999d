//! Minimal CLI: schema → (control outline | checked documents)
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use schema_form::{BuilderConfig, Compiler, Control, ControlKind, Schema, Validator};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a JSON Schema into a form model and inspect it or check documents against it
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the compiled control tree (kinds, enabled flags, validators)
    Inspect(InspectOut),
    /// fill documents into the form and report value, status and failures
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema file (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// JSON Pointer to the object schema inside the file (e.g. /definitions/Order)
    #[arg(long)]
    json_pointer: Option<String>,

    /// builder configuration file (JSON); defaults apply for missing keys
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// One or more documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    value: Vec<String>,

    /// print one JSON report per document instead of the human summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<(Compiler, Schema)> {
        let config = match self.config.as_ref() {
            None => BuilderConfig::default(),
            Some(path) => {
                let source = read(path)?;
                schema_form::path_de::from_str_with_path::<BuilderConfig>(&source)
                    .with_context(|| format!("invalid config file ({})", path.display()))?
            }
        };

        let source = read(&self.schema)?;
        let document = serde_json::from_str::<Value>(&source)
            .with_context(|| format!("failed to parse JSON schema file ({})", self.schema.display()))?;
        let document = match self.json_pointer.as_deref() {
            None => document,
            Some(pointer) => document
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} matches nothing in {}", self.schema.display()))?,
        };
        let schema = Schema::from_value(document)
            .with_context(|| format!("unusable schema ({})", self.schema.display()))?;
        Ok((Compiler::new(config), schema))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns `false` when a checked document was invalid.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Inspect(target) => {
                let (compiler, schema) = target.schema_settings.load()?;
                let form = compiler.from_schema(&schema);
                let outline_src = serde_json::to_string_pretty(&outline(&form))?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create {}", parent.display()))?;
                    }
                    std::fs::write(out, &outline_src).with_context(|| format!("failed to write {}", out.display()))?;
                    info!(out = %out.display(), "outline written");
                } else {
                    println!("{outline_src}");
                }
                Ok(true)
            }
            Command::Check(target) => {
                let (compiler, schema) = target.schema_settings.load()?;
                let document_paths = resolve_file_path_patterns(&target.value)?;
                let mut all_valid = true;
                for document_path in document_paths {
                    let source = read(&document_path)?;
                    let document = serde_json::from_str::<Value>(&source)
                        .with_context(|| format!("failed to parse JSON document ({})", document_path.display()))?;

                    // fresh form per document: a tree is never reused across inputs
                    let form = compiler.from_schema(&schema);
                    form.patch_value(&document);
                    debug!(document = %document_path.display(), status = ?form.status(), "checked");
                    all_valid &= form.is_valid();

                    if target.json {
                        println!("{}", serde_json::to_string_pretty(&report(&document_path, &form))?);
                    } else {
                        print_summary(&document_path, &form);
                    }
                }
                Ok(all_valid)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn kind_name(kind: ControlKind) -> &'static str {
    match kind {
        ControlKind::Leaf => "leaf",
        ControlKind::Group => "group",
        ControlKind::Collection => "collection",
    }
}

fn describe(validator: &Validator) -> Value {
    match validator {
        Validator::Required => json!("required"),
        Validator::Pattern(pattern) => json!({ "pattern": pattern.source() }),
        Validator::Const(expected) => json!({ "const": expected }),
        Validator::Min(min) => json!({ "min": min }),
        Validator::Max(max) => json!({ "max": max }),
    }
}

fn outline(control: &Control) -> Value {
    let mut o = json!({
        "kind": kind_name(control.kind()),
        "enabled": control.is_enabled(),
    });
    let validators = control.validators();
    if !validators.is_empty() {
        o["validators"] = Value::Array(validators.iter().map(describe).collect());
    }
    match control.kind() {
        ControlKind::Leaf => {
            o["value"] = control.raw_value();
        }
        ControlKind::Group => {
            let children: Map<String, Value> = control
                .named_children()
                .into_iter()
                .map(|(name, child)| (name, outline(&child)))
                .collect();
            o["children"] = Value::Object(children);
        }
        ControlKind::Collection => {
            o["items"] = Value::Array(control.children().iter().map(outline).collect());
        }
    }
    o
}

fn report(document_path: &Path, form: &Control) -> Value {
    let errors: Map<String, Value> = form
        .error_report()
        .into_iter()
        .map(|(path, errors)| (path, Value::Object(errors.into_iter().collect())))
        .collect();
    json!({
        "document": document_path.display().to_string(),
        "valid": form.is_valid(),
        "value": form.value(),
        "errors": errors,
    })
}

fn print_summary(document_path: &Path, form: &Control) {
    let name = document_path.display();
    if form.is_valid() {
        println!("{} {name}", "valid".green().bold());
        return;
    }
    println!("{} {name}", "invalid".red().bold());
    for (path, errors) in form.error_report() {
        let path = if path.is_empty() { "(root)".to_string() } else { path };
        for (key, reason) in errors {
            println!("  {} {key}: {reason}", path.yellow());
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_lists_kinds_and_validators() {
        let schema = Schema::from_value(json!({
            "properties": {
                "name": { "type": "string", "pattern": "[a-z]+" },
                "tags": { "type": "array" }
            },
            "required": ["name"]
        }))
        .unwrap();
        let form = Compiler::default().from_schema(&schema);
        let o = outline(&form);
        assert_eq!(o["kind"], "group");
        assert_eq!(o["children"]["name"]["validators"], json!([{ "pattern": "[a-z]+" }, "required"]));
        assert_eq!(o["children"]["tags"]["kind"], "collection");
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "b/c.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("b/c.json")]);
    }
}
