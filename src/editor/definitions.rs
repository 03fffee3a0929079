use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::schema::{SchemaType, WorkingSchema};

/// Raised when edit input cannot be coerced into a value of the
/// definition's type.
#[derive(Debug, Clone)]
pub struct EditRejection {
    pub message: String,
}

impl EditRejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn not_a(kind: &str, input: &str) -> Self {
        Self {
            message: format!("'{input}' is not a valid {kind}"),
        }
    }

    pub fn unsupported(kind: &str) -> Self {
        Self {
            message: format!("{kind} values are not edited inline"),
        }
    }
}

impl fmt::Display for EditRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EditRejection {}

/// Per-type display and editing behavior. Hosts register their own
/// definitions under a type name or a `format` value to override the
/// builtins.
pub trait TypeDefinition: TypeDefinitionClone + fmt::Debug {
    fn id(&self) -> &str;

    fn display(&self, data: &Value, schema: &WorkingSchema) -> String;

    fn editable(&self) -> bool {
        false
    }

    /// Whether long display text should be cut down to a single line.
    fn shortened(&self) -> bool {
        false
    }

    /// Seed for the edit buffer when editing begins.
    fn edit_seed(&self, data: &Value, schema: &WorkingSchema) -> Value {
        let _ = schema;
        data.clone()
    }

    /// Coerces raw text from the host's edit control into a value.
    fn parse_edit(&self, input: &str, schema: &WorkingSchema) -> Result<Value, EditRejection> {
        let _ = (input, schema);
        Err(EditRejection::unsupported(self.id()))
    }
}

pub trait TypeDefinitionClone {
    fn clone_box(&self) -> Box<dyn TypeDefinition>;
}

impl<T> TypeDefinitionClone for T
where
    T: 'static + TypeDefinition + Clone,
{
    fn clone_box(&self) -> Box<dyn TypeDefinition> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn TypeDefinition> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub(crate) const SHORTENED_WIDTH: usize = 80;

pub(crate) fn truncate_display(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut shortened = String::new();
    let mut used = 0;
    let budget = max_width.saturating_sub(1);
    for ch in text.chars() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > budget {
            break;
        }
        shortened.push(ch);
        used += width;
    }
    shortened.push('…');
    shortened
}

#[derive(Debug, Clone)]
struct StringDefinition;

impl TypeDefinition for StringDefinition {
    fn id(&self) -> &str {
        "string"
    }

    fn display(&self, data: &Value, _schema: &WorkingSchema) -> String {
        match data.as_str() {
            Some(text) => text.to_string(),
            None => data.to_string(),
        }
    }

    fn editable(&self) -> bool {
        true
    }

    fn shortened(&self) -> bool {
        true
    }

    fn parse_edit(&self, input: &str, _schema: &WorkingSchema) -> Result<Value, EditRejection> {
        Ok(Value::String(input.to_string()))
    }
}

#[derive(Debug, Clone)]
struct NumberDefinition;

impl TypeDefinition for NumberDefinition {
    fn id(&self) -> &str {
        "number"
    }

    fn display(&self, data: &Value, _schema: &WorkingSchema) -> String {
        data.to_string()
    }

    fn editable(&self) -> bool {
        true
    }

    fn parse_edit(&self, input: &str, _schema: &WorkingSchema) -> Result<Value, EditRejection> {
        let trimmed = input.trim();
        if let Ok(integer) = trimmed.parse::<i64>() {
            return Ok(Value::from(integer));
        }
        trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| EditRejection::not_a("number", input))
    }
}

#[derive(Debug, Clone)]
struct IntegerDefinition;

impl TypeDefinition for IntegerDefinition {
    fn id(&self) -> &str {
        "integer"
    }

    fn display(&self, data: &Value, _schema: &WorkingSchema) -> String {
        data.to_string()
    }

    fn editable(&self) -> bool {
        true
    }

    fn parse_edit(&self, input: &str, _schema: &WorkingSchema) -> Result<Value, EditRejection> {
        input
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| EditRejection::not_a("integer", input))
    }
}

#[derive(Debug, Clone)]
struct BooleanDefinition;

impl TypeDefinition for BooleanDefinition {
    fn id(&self) -> &str {
        "boolean"
    }

    fn display(&self, data: &Value, _schema: &WorkingSchema) -> String {
        data.to_string()
    }

    fn editable(&self) -> bool {
        true
    }

    fn parse_edit(&self, input: &str, _schema: &WorkingSchema) -> Result<Value, EditRejection> {
        match input.trim().to_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(EditRejection::not_a("boolean", input)),
        }
    }
}

#[derive(Debug, Clone)]
struct NullDefinition;

impl TypeDefinition for NullDefinition {
    fn id(&self) -> &str {
        "null"
    }

    fn display(&self, _data: &Value, _schema: &WorkingSchema) -> String {
        "null".to_string()
    }
}

#[derive(Debug, Clone)]
struct ArrayDefinition;

impl TypeDefinition for ArrayDefinition {
    fn id(&self) -> &str {
        "array"
    }

    fn display(&self, data: &Value, _schema: &WorkingSchema) -> String {
        match data.as_array().map(Vec::len) {
            Some(0) | None => "empty".to_string(),
            Some(1) => "1 item".to_string(),
            Some(count) => format!("{count} items"),
        }
    }

    fn shortened(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct ObjectDefinition;

impl TypeDefinition for ObjectDefinition {
    fn id(&self) -> &str {
        "object"
    }

    fn display(&self, data: &Value, schema: &WorkingSchema) -> String {
        if let Some(title) = &schema.title {
            return title.clone();
        }
        match data.as_object().map(serde_json::Map::len) {
            Some(0) | None => "empty".to_string(),
            Some(1) => "1 property".to_string(),
            Some(count) => format!("{count} properties"),
        }
    }

    fn shortened(&self) -> bool {
        true
    }
}

/// Definition lookup table. The id is matched against, in order: the
/// data's runtime type when it disagrees with the schema, the schema's
/// `format`, then the schema's declared type. A schema typed `integer`
/// over a whole number counts as agreement.
#[derive(Debug, Clone)]
pub struct DefinitionRegistry {
    by_id: HashMap<String, Box<dyn TypeDefinition>>,
}

impl DefinitionRegistry {
    pub fn empty() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(StringDefinition));
        registry.register(Box::new(NumberDefinition));
        registry.register(Box::new(IntegerDefinition));
        registry.register(Box::new(BooleanDefinition));
        registry.register(Box::new(NullDefinition));
        registry.register(Box::new(ArrayDefinition));
        registry.register(Box::new(ObjectDefinition));
        registry
    }

    pub fn register(&mut self, definition: Box<dyn TypeDefinition>) {
        self.by_id.insert(definition.id().to_string(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&dyn TypeDefinition> {
        self.by_id.get(id).map(Box::as_ref)
    }

    pub fn lookup(&self, data: &Value, schema: &WorkingSchema) -> Option<&dyn TypeDefinition> {
        if !type_agrees(data, schema.schema_type()) {
            return self.get(SchemaType::of_value(data).name());
        }
        if let Some(format) = &schema.format {
            if let Some(found) = self.get(format) {
                return Some(found);
            }
        }
        self.get(schema.schema_type().name())
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn type_agrees(data: &Value, declared: SchemaType) -> bool {
    let runtime = SchemaType::of_value(data);
    if runtime == declared {
        return true;
    }
    declared == SchemaType::Integer
        && runtime == SchemaType::Number
        && data
            .as_number()
            .is_some_and(|number| number.is_i64() || number.is_u64())
}
