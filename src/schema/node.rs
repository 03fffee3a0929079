use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The seven base types a schema may declare. Runtime values only ever
/// report six of them: a JSON number is `Number` whether or not it is
/// integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    String,
    Integer,
}

impl SchemaType {
    /// Fan-out order used when a schema declares no `type` at all.
    /// `integer` is deliberately absent: it is a specialization of number
    /// and spreading it alongside would double-count numeric data.
    pub const SPREAD: [SchemaType; 6] = [
        SchemaType::String,
        SchemaType::Boolean,
        SchemaType::Number,
        SchemaType::Array,
        SchemaType::Object,
        SchemaType::Null,
    ];

    pub fn of_value(value: &Value) -> SchemaType {
        match value {
            Value::Null => SchemaType::Null,
            Value::Bool(_) => SchemaType::Boolean,
            Value::Number(_) => SchemaType::Number,
            Value::String(_) => SchemaType::String,
            Value::Array(_) => SchemaType::Array,
            Value::Object(_) => SchemaType::Object,
        }
    }

    /// Canonical empty value for this type, used when nothing supplies a
    /// default.
    pub fn empty_value(self) -> Value {
        match self {
            SchemaType::Null => Value::Null,
            SchemaType::Boolean => Value::Bool(false),
            SchemaType::Number | SchemaType::Integer => Value::from(0),
            SchemaType::String => Value::String(String::new()),
            SchemaType::Array => Value::Array(Vec::new()),
            SchemaType::Object => Value::Object(Map::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SchemaType::Null => "null",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::Number => "number",
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `type` keyword: one base type or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    One(SchemaType),
    Many(Vec<SchemaType>),
}

/// `items` keyword: a schema for every element or a positional tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemsSchema {
    One(Box<SchemaNode>),
    Tuple(Vec<SchemaNode>),
}

/// Keywords like `additionalProperties` that accept either a boolean toggle
/// or a full schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoolOrSchema {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

impl BoolOrSchema {
    pub fn as_schema(&self) -> Option<&SchemaNode> {
        match self {
            BoolOrSchema::Schema(node) => Some(node),
            BoolOrSchema::Allowed(_) => None,
        }
    }

    pub fn forbids(&self) -> bool {
        matches!(self, BoolOrSchema::Allowed(false))
    }
}

/// One node of a schema document: the keywords the engine interprets as
/// typed fields, everything else carried through `extra` untouched so the
/// validator still sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeSet>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub pattern_properties: IndexMap<String, SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<BoolOrSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<BoolOrSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,
    // `default: null` is meaningful, so present-null must survive as
    // `Some(Null)` instead of collapsing into the absent case.
    #[serde(
        deserialize_with = "explicit_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn explicit_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl SchemaNode {
    /// Schema that matches anything; also what an unresolvable `$ref`
    /// degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).context("value is not a usable schema node")
    }

    /// Serializes back to JSON for a validator backend. Returns `None` only
    /// if serialization itself fails, which no recognized keyword can cause.
    pub fn to_value(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }

    pub fn single_type(&self) -> Option<SchemaType> {
        match &self.schema_type {
            Some(TypeSet::One(ty)) => Some(*ty),
            _ => None,
        }
    }

    pub fn has_combinators(&self) -> bool {
        !self.all_of.is_empty() || !self.any_of.is_empty() || !self.one_of.is_empty()
    }

    pub fn is_hidden(&self) -> bool {
        self.format.as_deref() == Some("hidden")
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }

    /// Key lookup into an object-valued `default`.
    pub fn default_entry(&self, key: &str) -> Option<&Value> {
        self.default.as_ref()?.as_object()?.get(key)
    }
}

/// Bridges a schema derived with `schemars` into the engine's model. The
/// generated `definitions` ride along in the passthrough bag, so pointer
/// references into them resolve against the root document.
pub fn from_schemars(root: &schemars::schema::RootSchema) -> Result<SchemaNode> {
    let value = serde_json::to_value(root).context("schema generation produced unusable JSON")?;
    SchemaNode::from_value(&value)
}
