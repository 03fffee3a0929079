use serde_json::{Value, json};

use crate::path::TreePath;
use crate::schema::{SchemaNode, SchemaType, walk, walk_from};
use crate::validate::PermissiveValidator;

fn schema(raw: Value) -> SchemaNode {
    SchemaNode::from_value(&raw).expect("valid schema fixture")
}

#[test]
fn visits_every_location_in_preorder() {
    let validator = PermissiveValidator::new();
    let data = json!({"a": {"b": 1}, "c": [true, false]});
    let mut visited = Vec::new();
    walk(&data, &SchemaNode::empty(), &validator, &mut |entry| {
        visited.push(entry.path.to_string());
        None
    });
    assert_eq!(visited, vec!["", "/a", "/a/b", "/c", "/c/0", "/c/1"]);
}

#[test]
fn scalars_do_not_recurse() {
    let validator = PermissiveValidator::new();
    let mut count = 0;
    walk(&json!("leaf"), &SchemaNode::empty(), &validator, &mut |_| {
        count += 1;
        None
    });
    assert_eq!(count, 1);
}

#[test]
fn chosen_schema_reflects_the_runtime_type() {
    let validator = PermissiveValidator::new();
    let data = json!({"flag": true});
    let mut types = Vec::new();
    walk(&data, &SchemaNode::empty(), &validator, &mut |entry| {
        assert_eq!(entry.candidates.len(), 6);
        types.push((entry.path.to_string(), entry.schema.schema_type()));
        None
    });
    assert_eq!(
        types,
        vec![
            ("".to_string(), SchemaType::Object),
            ("/flag".to_string(), SchemaType::Boolean),
        ]
    );
}

#[test]
fn child_schemas_derive_from_the_chosen_parent() {
    let validator = PermissiveValidator::new();
    let raw = schema(json!({
        "type": "object",
        "properties": {
            "items": {"type": "array", "items": {"type": "integer"}}
        }
    }));
    let data = json!({"items": [1, 2]});
    let mut leaf_types = Vec::new();
    walk(&data, &raw, &validator, &mut |entry| {
        if entry.data.is_number() {
            leaf_types.push(entry.schema.schema_type());
        }
        None
    });
    assert_eq!(leaf_types, vec![SchemaType::Integer, SchemaType::Integer]);
}

#[test]
fn override_pins_the_branch_used_for_children() {
    let validator = PermissiveValidator::new();
    let raw = schema(json!({
        "oneOf": [
            {"type": "object", "properties": {"value": {"type": "string"}}},
            {"type": "object", "properties": {"value": {"type": "number"}}}
        ]
    }));
    let data = json!({"value": 3});
    let mut child_types = Vec::new();
    // Without an override the first branch wins under a permissive
    // validator and supplies the string child schema.
    walk(&data, &raw, &validator, &mut |entry| {
        if entry.path.as_str() == "/value" {
            child_types.push(entry.schema.schema_type());
        }
        None
    });
    // Overriding the root pins the second branch for child derivation.
    walk(&data, &raw, &validator, &mut |entry| {
        if entry.path.is_root() {
            return Some(entry.candidates[1].clone());
        }
        if entry.path.as_str() == "/value" {
            child_types.push(entry.schema.schema_type());
        }
        None
    });
    assert_eq!(child_types, vec![SchemaType::String, SchemaType::Number]);
}

#[test]
fn walk_from_prefixes_emitted_paths() {
    let validator = PermissiveValidator::new();
    let mut paths = Vec::new();
    walk_from(
        TreePath::new("/config"),
        &json!({"debug": true}),
        &SchemaNode::empty(),
        &validator,
        &mut |entry| {
            paths.push(entry.path.to_string());
            None
        },
    );
    assert_eq!(paths, vec!["/config", "/config/debug"]);
}
