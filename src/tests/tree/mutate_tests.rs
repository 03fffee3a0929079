use serde_json::{Value, json};

use crate::path::TreePath;
use crate::schema::{ChildKey, SchemaNode, build_working_schemas};
use crate::tree::{delete_data_at_path, fresh_child_value, populate_requireds, set_data_at_path};
use crate::validate::PermissiveValidator;

fn schema(raw: Value) -> SchemaNode {
    SchemaNode::from_value(&raw).expect("valid schema fixture")
}

fn path(raw: &str) -> TreePath {
    TreePath::new(raw)
}

#[test]
fn sets_nested_values_and_replaces_the_root() {
    let tree = json!({"a": {"b": 1}});
    let tree = set_data_at_path(tree, &path("/a/b"), json!(2));
    assert_eq!(tree, json!({"a": {"b": 2}}));
    let tree = set_data_at_path(tree, &TreePath::root(), json!([1]));
    assert_eq!(tree, json!([1]));
}

#[test]
fn creates_missing_object_segments_along_the_way() {
    let tree = set_data_at_path(json!({}), &path("/outer/inner/leaf"), json!(true));
    assert_eq!(tree, json!({"outer": {"inner": {"leaf": true}}}));
}

#[test]
fn array_writes_append_at_the_end_but_reject_gaps() {
    let tree = json!([1, 2]);
    let tree = set_data_at_path(tree, &path("/2"), json!(3));
    assert_eq!(tree, json!([1, 2, 3]));
    let tree = set_data_at_path(tree, &path("/9"), json!(9));
    assert_eq!(tree, json!([1, 2, 3]), "past-the-gap writes leave the tree unchanged");
    let tree = set_data_at_path(tree, &path("/0/way/off"), json!(0));
    assert_eq!(tree, json!([1, 2, 3]), "scalars never grow children");
}

#[test]
fn untouched_siblings_keep_their_allocations() {
    let tree = json!({"a": {"foo": "bar"}, "b": [{}, {}]});
    let before = tree
        .get("b")
        .and_then(Value::as_array)
        .expect("array sibling")
        .as_ptr();
    let tree = set_data_at_path(tree, &path("/a/foo"), json!("baz"));
    let after = tree
        .get("b")
        .and_then(Value::as_array)
        .expect("array sibling")
        .as_ptr();
    assert_eq!(before, after, "the sibling subtree moved without copying");
    assert_eq!(tree, json!({"a": {"foo": "baz"}, "b": [{}, {}]}));
}

#[test]
fn deleting_object_keys_keeps_the_rest_intact() {
    let tree = json!({"a": {"foo": "bar"}, "b": [{}, {}]});
    let tree = delete_data_at_path(tree, &path("/a/foo"));
    assert_eq!(tree, json!({"a": {}, "b": [{}, {}]}));
}

#[test]
fn deleting_preserves_sibling_key_order() {
    let tree = json!({"one": 1, "two": 2, "three": 3});
    let tree = delete_data_at_path(tree, &path("/two"));
    let keys: Vec<&str> = tree
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["one", "three"]);
}

#[test]
fn deleting_array_indices_shifts_later_items_down() {
    let tree = delete_data_at_path(json!(["first", "second"]), &path("/0"));
    assert_eq!(tree, json!(["second"]));
}

#[test]
fn deleting_the_root_yields_null() {
    assert_eq!(delete_data_at_path(json!({"a": 1}), &TreePath::root()), Value::Null);
}

#[test]
fn deleting_missing_targets_changes_nothing() {
    let tree = json!({"a": 1});
    let tree = delete_data_at_path(tree, &path("/b/c"));
    assert_eq!(tree, json!({"a": 1}));
    let tree = delete_data_at_path(tree, &path("/a/0"));
    assert_eq!(tree, json!({"a": 1}));
}

#[test]
fn fresh_values_prefer_parent_defaults_over_child_schemas() {
    let validator = PermissiveValidator::new();
    let parent = build_working_schemas(
        &schema(json!({
            "type": "object",
            "default": {"mode": "auto"},
            "properties": {
                "mode": {"type": "string", "default": "manual"},
                "level": {"type": "integer", "default": 3},
                "name": {"type": "string"}
            }
        })),
        &validator,
    )
    .remove(0);
    assert_eq!(
        fresh_child_value(ChildKey::Property("mode"), &parent, &validator),
        json!("auto")
    );
    assert_eq!(
        fresh_child_value(ChildKey::Property("level"), &parent, &validator),
        json!(3)
    );
    assert_eq!(
        fresh_child_value(ChildKey::Property("name"), &parent, &validator),
        json!("")
    );
}

#[test]
fn fresh_array_items_use_the_item_schema() {
    let validator = PermissiveValidator::new();
    let parent = build_working_schemas(
        &schema(json!({"type": "array", "items": {"type": "number", "default": 7}})),
        &validator,
    )
    .remove(0);
    assert_eq!(fresh_child_value(ChildKey::Index(0), &parent, &validator), json!(7));
    let untyped = build_working_schemas(&schema(json!({"type": "array"})), &validator).remove(0);
    assert_eq!(
        fresh_child_value(ChildKey::Index(0), &untyped, &validator),
        json!(""),
        "an open child schema seeds with its first candidate's empty value"
    );
}

#[test]
fn required_keys_fill_from_parent_defaults_first() {
    let validator = PermissiveValidator::new();
    let root = schema(json!({
        "type": "object",
        "required": ["mode", "level", "name"],
        "default": {"mode": "auto"},
        "properties": {
            "level": {"type": "integer", "default": 3},
            "name": {"type": "string"}
        }
    }));
    let populated = populate_requireds(json!({}), &root, &validator);
    assert_eq!(populated, json!({"mode": "auto", "level": 3, "name": ""}));
}

#[test]
fn nested_requireds_populate_in_the_same_pass() {
    let validator = PermissiveValidator::new();
    let root = schema(json!({
        "type": "object",
        "required": ["server"],
        "properties": {
            "server": {
                "type": "object",
                "required": ["host"],
                "properties": {"host": {"type": "string", "default": "localhost"}}
            }
        }
    }));
    let populated = populate_requireds(json!({}), &root, &validator);
    assert_eq!(populated, json!({"server": {"host": "localhost"}}));
}

#[test]
fn population_is_idempotent_and_keeps_extras() {
    let validator = PermissiveValidator::new();
    let root = schema(json!({
        "type": "object",
        "required": ["a", "b"],
        "properties": {
            "a": {"type": "number"},
            "b": {
                "type": "object",
                "required": ["c"],
                "properties": {"c": {"type": "boolean"}}
            }
        }
    }));
    let once = populate_requireds(json!({"extra": true}), &root, &validator);
    assert_eq!(once, json!({"extra": true, "a": 0, "b": {"c": false}}));
    let twice = populate_requireds(once.clone(), &root, &validator);
    assert_eq!(once, twice);
}

#[test]
fn population_leaves_scalars_and_mismatched_shapes_alone() {
    let validator = PermissiveValidator::new();
    let root = schema(json!({"type": "object", "required": ["a"]}));
    assert_eq!(populate_requireds(json!("scalar"), &root, &validator), json!("scalar"));
    assert_eq!(populate_requireds(json!([1]), &root, &validator), json!([1]));
}
