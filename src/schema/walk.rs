use serde_json::Value;

use super::node::SchemaNode;
use super::working::{
    ChildKey, WorkingSchema, build_working_schemas, child_schema, choose_working_schema,
};
use crate::path::TreePath;
use crate::validate::SchemaValidator;

/// One visited location during a schema-synchronized walk.
#[derive(Debug)]
pub struct WalkEntry<'a> {
    pub path: &'a TreePath,
    pub data: &'a Value,
    /// The working schema the chooser picked for this location.
    pub schema: &'a WorkingSchema,
    /// Every candidate the location's raw schema expanded to.
    pub candidates: &'a [WorkingSchema],
}

/// Walks `data` and `schema` together in depth-first pre-order, deriving a
/// child schema for every data child. The callback may return a replacement
/// working schema; children are then derived from the replacement instead
/// of the chooser's pick.
pub fn walk<F>(data: &Value, schema: &SchemaNode, validator: &dyn SchemaValidator, visit: &mut F)
where
    F: FnMut(WalkEntry<'_>) -> Option<WorkingSchema>,
{
    walk_from(TreePath::root(), data, schema, validator, visit);
}

/// Same as [`walk`], rooted at an arbitrary path. Emitted paths are
/// prefixed with `origin`.
pub fn walk_from<F>(
    origin: TreePath,
    data: &Value,
    schema: &SchemaNode,
    validator: &dyn SchemaValidator,
    visit: &mut F,
) where
    F: FnMut(WalkEntry<'_>) -> Option<WorkingSchema>,
{
    let candidates = build_working_schemas(schema, validator);
    let chosen = choose_working_schema(data, &candidates, validator);
    let replacement = visit(WalkEntry {
        path: &origin,
        data,
        schema: &candidates[chosen],
        candidates: &candidates,
    });
    let effective = replacement.as_ref().unwrap_or(&candidates[chosen]);

    match data {
        Value::Object(map) => {
            for (key, child) in map {
                let child_node = child_schema(ChildKey::Property(key), effective);
                walk_from(origin.join(key), child, &child_node, validator, visit);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let child_node = child_schema(ChildKey::Index(index), effective);
                walk_from(origin.join(index), child, &child_node, validator, visit);
            }
        }
        _ => {}
    }
}
