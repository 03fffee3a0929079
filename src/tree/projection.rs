use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use crate::path::TreePath;
use crate::schema::{BoolOrSchema, SchemaNode, SchemaType, WorkingSchema, walk};
use crate::validate::SchemaValidator;

/// Sticky per-path candidate overrides, keyed by real-data paths. Paths
/// that only exist through schema defaults are never consulted here.
pub type SchemaChoices = HashMap<TreePath, usize>;

/// One navigable location: its data, the working schema currently in
/// effect, and every candidate the raw schema offered.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionEntry {
    pub data: Value,
    pub schema: WorkingSchema,
    pub candidates: Vec<WorkingSchema>,
    /// True when this location exists only through a schema default whose
    /// immediate parent was already present beforehand.
    pub default_root: bool,
}

/// The full map of navigable locations for one data/schema pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    entries: IndexMap<TreePath, ProjectionEntry>,
}

/// Builds the projection: every real data location, then every location
/// reachable by recursively walking object-typed schema defaults. Real
/// entries honor `choices`; default walks always take the chooser's pick.
pub fn project(
    data: &Value,
    schema: &SchemaNode,
    validator: &dyn SchemaValidator,
    choices: &SchemaChoices,
) -> Projection {
    let mut entries: IndexMap<TreePath, ProjectionEntry> = IndexMap::new();
    let mut pending: Vec<TreePath> = Vec::new();
    let mut queued: HashSet<TreePath> = HashSet::new();

    walk(data, schema, validator, &mut |entry| {
        let mut chosen = entry.schema.clone();
        if let Some(&index) = choices.get(entry.path) {
            if index < entry.candidates.len() {
                chosen = entry.candidates[index].clone();
            } else {
                warn!(path = %entry.path, index, "schema choice out of range, ignoring");
            }
        }
        if carries_default_object(&chosen) && queued.insert(entry.path.clone()) {
            pending.push(entry.path.clone());
        }
        entries.insert(
            entry.path.clone(),
            ProjectionEntry {
                data: entry.data.clone(),
                schema: chosen.clone(),
                candidates: entry.candidates.to_vec(),
                default_root: false,
            },
        );
        Some(chosen)
    });

    // Walk each collected default. The worklist grows as walks uncover
    // deeper defaults; entries recorded before a walk started mark which
    // parents "already existed" for its ghost flags.
    let mut cursor = 0;
    while cursor < pending.len() {
        let origin = pending[cursor].clone();
        cursor += 1;
        let Some(origin_entry) = entries.get(&origin) else {
            continue;
        };
        let origin_schema = origin_entry.schema.node().clone();
        let Some(default_value @ Value::Object(_)) = origin_schema.default.clone() else {
            continue;
        };
        let snapshot: HashSet<TreePath> = entries.keys().cloned().collect();

        walk(&default_value, &origin_schema, validator, &mut |entry| {
            // The origin itself already exists in real data.
            if entry.path.is_root() {
                return None;
            }
            let full = origin.concat(entry.path);
            match entries.get_mut(&full) {
                Some(existing) => {
                    merge_walked_default(existing, entry.data, entry.schema);
                    if carries_default_object(&existing.schema) && queued.insert(full.clone()) {
                        pending.push(full);
                    }
                }
                None => {
                    let ghost = full
                        .parent()
                        .is_some_and(|parent| snapshot.contains(&parent));
                    if carries_default_object(entry.schema) && queued.insert(full.clone()) {
                        pending.push(full.clone());
                    }
                    entries.insert(
                        full,
                        ProjectionEntry {
                            data: entry.data.clone(),
                            schema: entry.schema.clone(),
                            candidates: entry.candidates.to_vec(),
                            default_root: ghost,
                        },
                    );
                }
            }
            None
        });
    }

    Projection { entries }
}

fn carries_default_object(schema: &WorkingSchema) -> bool {
    schema.schema_type() == SchemaType::Object
        && matches!(schema.default, Some(Value::Object(_)))
}

/// Folds a default walk's view of an already-real location into that
/// location's schema default, so the key listing surfaces keys the
/// ancestor default supplies. Existing default keys win; the ancestor's
/// data fragment wins over the walked schema's own default.
fn merge_walked_default(
    existing: &mut ProjectionEntry,
    walked_data: &Value,
    walked_schema: &WorkingSchema,
) {
    let mut incoming = Map::new();
    if let Some(Value::Object(own)) = &walked_schema.node().default {
        for (key, value) in own {
            incoming.insert(key.clone(), value.clone());
        }
    }
    if let Value::Object(fragment) = walked_data {
        for (key, value) in fragment {
            incoming.insert(key.clone(), value.clone());
        }
    }
    if incoming.is_empty() {
        return;
    }
    match &mut existing.schema.node_mut().default {
        Some(Value::Object(target)) => {
            for (key, value) in incoming {
                if !target.contains_key(&key) {
                    target.insert(key, value);
                }
            }
        }
        slot @ None => *slot = Some(Value::Object(incoming)),
        Some(_) => {}
    }
}

impl Projection {
    pub fn entry(&self, path: &TreePath) -> Option<&ProjectionEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &TreePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &TreePath> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn data(&self, path: &TreePath) -> Option<&Value> {
        self.entry(path).map(|entry| &entry.data)
    }

    pub fn schema(&self, path: &TreePath) -> Option<&WorkingSchema> {
        self.entry(path).map(|entry| &entry.schema)
    }

    pub fn candidates(&self, path: &TreePath) -> Option<&[WorkingSchema]> {
        self.entry(path).map(|entry| entry.candidates.as_slice())
    }

    pub fn is_default_root(&self, path: &TreePath) -> bool {
        self.entry(path).is_some_and(|entry| entry.default_root)
    }

    /// Whether the location holds a collection, regardless of emptiness.
    pub fn is_collection(&self, path: &TreePath) -> bool {
        self.data(path)
            .is_some_and(|data| data.is_object() || data.is_array())
    }

    /// Schema properties the location's object could still gain: not
    /// present in the data, not hidden, not read-only. Alphabetical.
    pub fn addable_properties(&self, path: &TreePath) -> Vec<String> {
        let Some(entry) = self.entry(path) else {
            return Vec::new();
        };
        let Value::Object(map) = &entry.data else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entry
            .schema
            .properties
            .iter()
            .filter(|(key, child)| {
                !map.contains_key(*key) && !child.is_hidden() && !child.is_read_only()
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Whether the collection at `path` accepts another child.
    pub fn can_add_child(&self, path: &TreePath) -> bool {
        let Some(entry) = self.entry(path) else {
            return false;
        };
        match &entry.data {
            Value::Array(items) => entry
                .schema
                .max_items
                .is_none_or(|max| (items.len() as u64) < max),
            Value::Object(_) => {
                let closed_world = entry
                    .schema
                    .additional_properties
                    .as_ref()
                    .is_some_and(BoolOrSchema::forbids);
                !self.addable_properties(path).is_empty()
                    || !closed_world
                    || !entry.schema.pattern_properties.is_empty()
            }
            _ => false,
        }
    }
}
