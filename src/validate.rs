//! Validation boundary.
//!
//! The engine never validates JSON itself. Everything it needs from a
//! validator fits in [`SchemaValidator`]: validate a value against a
//! schema, look a schema up by reference, and accept schema registrations.
//! [`DraftValidator`] backs the trait with the `jsonschema` crate;
//! [`PermissiveValidator`] keeps reference lookup but reports every value
//! as valid.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::warn;

use crate::path::TreePath;
use crate::schema::SchemaNode;

/// One failed validation keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Pointer into the schema naming the keyword that failed.
    pub schema_path: String,
    pub message: String,
    /// Pointer into the data, usable as a tree path.
    pub data_path: TreePath,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    /// References the validator could not resolve while compiling.
    pub missing: Vec<String>,
}

impl ValidationReport {
    pub fn passing() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            missing: Vec::new(),
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// What the engine requires from a validator backend.
pub trait SchemaValidator: fmt::Debug {
    fn validate(&self, data: &Value, schema: &SchemaNode) -> ValidationReport;

    /// Resolves a `$ref` string to a schema, if the validator knows it.
    fn schema_ref(&self, reference: &str) -> Option<SchemaNode>;

    /// Registers a schema under an id for later `$ref` resolution. The ids
    /// `""` and `"#"` also install the schema as the root document, the
    /// base for fragment pointers.
    fn add_schema(&mut self, id: &str, schema: &SchemaNode);
}

fn lookup_reference(
    registry: &HashMap<String, SchemaNode>,
    root: Option<&Value>,
    reference: &str,
) -> Option<SchemaNode> {
    if let Some(found) = registry.get(reference) {
        return Some(found.clone());
    }
    let fragment = reference.strip_prefix('#')?;
    let decoded = percent_decode_str(fragment).decode_utf8().ok()?;
    let root = root?;
    let target = if decoded.is_empty() {
        root
    } else {
        root.pointer(&decoded)?
    };
    SchemaNode::from_value(target).ok()
}

fn install(
    registry: &mut HashMap<String, SchemaNode>,
    root: &mut Option<Value>,
    id: &str,
    schema: &SchemaNode,
) {
    if id.is_empty() || id == "#" {
        *root = schema.to_value();
    }
    registry.insert(id.to_string(), schema.clone());
}

/// [`SchemaValidator`] backed by the `jsonschema` crate. Compiled
/// validators are cached per schema document; schemas that fail to compile
/// degrade to a permissive report rather than blocking the editor.
pub struct DraftValidator {
    root: Option<Value>,
    registry: HashMap<String, SchemaNode>,
    compiled: RefCell<HashMap<String, jsonschema::Validator>>,
}

impl DraftValidator {
    pub fn new() -> Self {
        Self {
            root: None,
            registry: HashMap::new(),
            compiled: RefCell::new(HashMap::new()),
        }
    }

    /// Builds a validator whose fragment pointers resolve against
    /// `document`.
    pub fn for_document(document: Value) -> Self {
        Self {
            root: Some(document),
            registry: HashMap::new(),
            compiled: RefCell::new(HashMap::new()),
        }
    }

    /// Serializes a schema for compilation. Sub-schemas extracted from a
    /// larger document keep their interior pointer refs working because the
    /// root document's definition banks are grafted in.
    fn compilable_document(&self, schema: &SchemaNode) -> Option<Value> {
        let mut document = schema.to_value()?;
        if let Some(root) = &self.root {
            if let Some(target) = document.as_object_mut() {
                for bank in ["definitions", "$defs"] {
                    if target.contains_key(bank) {
                        continue;
                    }
                    if let Some(definitions) = root.get(bank) {
                        target.insert(bank.to_string(), definitions.clone());
                    }
                }
            }
        }
        Some(document)
    }

    fn unresolved_references(&self, document: &Value) -> Vec<String> {
        let mut missing = Vec::new();
        collect_unresolved(document, &self.registry, self.root.as_ref(), &mut missing);
        missing
    }
}

impl Default for DraftValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DraftValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftValidator")
            .field("has_root", &self.root.is_some())
            .field("registered", &self.registry.len())
            .field("compiled", &self.compiled.borrow().len())
            .finish()
    }
}

impl SchemaValidator for DraftValidator {
    fn validate(&self, data: &Value, schema: &SchemaNode) -> ValidationReport {
        let Some(document) = self.compilable_document(schema) else {
            warn!("schema is not serializable, reporting permissive result");
            return ValidationReport::passing();
        };
        let key = document.to_string();
        let mut cache = self.compiled.borrow_mut();
        let validator = match cache.entry(key) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => match jsonschema::validator_for(&document) {
                Ok(compiled) => slot.insert(compiled),
                Err(error) => {
                    let missing = self.unresolved_references(&document);
                    warn!(%error, "schema failed to compile, reporting permissive result");
                    return ValidationReport {
                        valid: true,
                        errors: Vec::new(),
                        missing,
                    };
                }
            },
        };
        if validator.is_valid(data) {
            return ValidationReport::passing();
        }
        let errors = validator
            .iter_errors(data)
            .map(|error| ValidationIssue {
                schema_path: error.schema_path.to_string(),
                message: error.to_string(),
                data_path: TreePath::new(error.instance_path.to_string()),
            })
            .collect();
        ValidationReport {
            valid: false,
            errors,
            missing: Vec::new(),
        }
    }

    fn schema_ref(&self, reference: &str) -> Option<SchemaNode> {
        lookup_reference(&self.registry, self.root.as_ref(), reference)
    }

    fn add_schema(&mut self, id: &str, schema: &SchemaNode) {
        install(&mut self.registry, &mut self.root, id, schema);
    }
}

fn collect_unresolved(
    value: &Value,
    registry: &HashMap<String, SchemaNode>,
    root: Option<&Value>,
    missing: &mut Vec<String>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if lookup_reference(registry, root, reference).is_none()
                    && !missing.contains(reference)
                {
                    missing.push(reference.clone());
                }
            }
            for child in map.values() {
                collect_unresolved(child, registry, root, missing);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_unresolved(child, registry, root, missing);
            }
        }
        _ => {}
    }
}

/// Validator that accepts everything. Reference lookup still works, so
/// schemas with `$ref` stay navigable without a real backend.
#[derive(Debug, Default)]
pub struct PermissiveValidator {
    root: Option<Value>,
    registry: HashMap<String, SchemaNode>,
}

impl PermissiveValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchemaValidator for PermissiveValidator {
    fn validate(&self, _data: &Value, _schema: &SchemaNode) -> ValidationReport {
        ValidationReport::passing()
    }

    fn schema_ref(&self, reference: &str) -> Option<SchemaNode> {
        lookup_reference(&self.registry, self.root.as_ref(), reference)
    }

    fn add_schema(&mut self, id: &str, schema: &SchemaNode) {
        install(&mut self.registry, &mut self.root, id, schema);
    }
}
