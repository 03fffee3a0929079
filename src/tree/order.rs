use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use super::projection::Projection;
use crate::path::{OrderEntry, TreePath};
use crate::schema::WorkingSchema;

/// Row filter. Text and pattern filters look at scalar values only;
/// matching rows keep their ancestors so the tree stays connected.
#[derive(Clone)]
pub enum TreeFilter {
    Text(String),
    Pattern(Regex),
    Predicate(FilterPredicate),
}

pub type FilterPredicate = Arc<dyn Fn(&Value, &WorkingSchema, &TreePath) -> bool>;

impl TreeFilter {
    pub fn text(needle: impl Into<String>) -> Self {
        TreeFilter::Text(needle.into())
    }

    pub fn pattern(regex: Regex) -> Self {
        TreeFilter::Pattern(regex)
    }

    pub fn predicate(
        predicate: impl Fn(&Value, &WorkingSchema, &TreePath) -> bool + 'static,
    ) -> Self {
        TreeFilter::Predicate(Arc::new(predicate))
    }

    fn matches(&self, data: &Value, schema: &WorkingSchema, path: &TreePath) -> bool {
        match self {
            TreeFilter::Text(needle) => scalar_text(data)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            TreeFilter::Pattern(regex) => {
                scalar_text(data).is_some_and(|text| regex.is_match(&text))
            }
            TreeFilter::Predicate(predicate) => predicate(data, schema, path),
        }
    }
}

impl fmt::Debug for TreeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeFilter::Text(needle) => f.debug_tuple("Text").field(needle).finish(),
            TreeFilter::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            TreeFilter::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

fn scalar_text(data: &Value) -> Option<String> {
    match data {
        Value::String(text) => Some(text.clone()),
        Value::Null | Value::Bool(_) | Value::Number(_) => Some(data.to_string()),
        _ => None,
    }
}

/// Flattened navigation order plus the per-collection child listing.
#[derive(Debug, Clone)]
pub struct OrderInfo {
    path_order: Vec<OrderEntry>,
    children: IndexMap<TreePath, Vec<TreePath>>,
}

impl OrderInfo {
    pub fn entries(&self) -> &[OrderEntry] {
        &self.path_order
    }

    pub fn len(&self) -> usize {
        self.path_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_order.is_empty()
    }

    pub fn first(&self) -> Option<&OrderEntry> {
        self.path_order.first()
    }

    pub fn last(&self) -> Option<&OrderEntry> {
        self.path_order.last()
    }

    pub fn position(&self, entry: &OrderEntry) -> Option<usize> {
        self.path_order.iter().position(|candidate| candidate == entry)
    }

    pub fn contains(&self, entry: &OrderEntry) -> bool {
        self.position(entry).is_some()
    }

    /// Child paths of a collection in display order, closed or not.
    pub fn children_of(&self, path: &TreePath) -> &[TreePath] {
        self.children
            .get(path)
            .map_or(&[], |children| children.as_slice())
    }
}

/// Flattens a projection into display order. Parents precede children;
/// each open, addable collection gets an add placeholder after its last
/// child, so the innermost placeholder comes first. Hidden schemas prune
/// their subtree, closed paths keep their row but hide the subtree.
pub fn order_info(
    projection: &Projection,
    closed: &BTreeSet<TreePath>,
    filter: Option<&TreeFilter>,
) -> OrderInfo {
    let mut queue: VecDeque<OrderEntry> = VecDeque::new();
    queue.push_back(OrderEntry::Node(TreePath::root()));
    let mut path_order: Vec<OrderEntry> = Vec::new();
    let mut children: IndexMap<TreePath, Vec<TreePath>> = IndexMap::new();

    while let Some(entry) = queue.pop_front() {
        let path = match entry {
            OrderEntry::AddSlot(_) => {
                path_order.push(entry);
                continue;
            }
            OrderEntry::Node(ref path) => path.clone(),
        };
        let Some(node) = projection.entry(&path) else {
            warn!(%path, "no projection entry for ordered path, skipping row");
            continue;
        };
        if node.schema.is_hidden() {
            continue;
        }
        path_order.push(OrderEntry::Node(path.clone()));

        let child_paths: Vec<TreePath> = match &node.data {
            Value::Array(items) => (0..items.len()).map(|index| path.join(index)).collect(),
            Value::Object(map) => object_child_keys(map, &node.schema)
                .into_iter()
                .map(|key| path.join(key))
                .collect(),
            _ => continue,
        };
        queue_children(
            &mut queue,
            projection,
            &path,
            &child_paths,
            closed.contains(&path),
        );
        children.insert(path, child_paths);
    }

    let path_order = match filter {
        Some(filter) => apply_filter(path_order, projection, filter),
        None => path_order,
    };
    OrderInfo {
        path_order,
        children,
    }
}

fn queue_children(
    queue: &mut VecDeque<OrderEntry>,
    projection: &Projection,
    path: &TreePath,
    child_paths: &[TreePath],
    is_closed: bool,
) {
    if is_closed {
        return;
    }
    if projection.can_add_child(path) {
        queue.push_front(OrderEntry::AddSlot(path.clone()));
    }
    for child in child_paths.iter().rev() {
        queue.push_front(OrderEntry::Node(child.clone()));
    }
}

/// Display order for object children: schema-declared properties backed by
/// data or a default first, then remaining data keys, then remaining
/// default keys.
fn object_child_keys(map: &Map<String, Value>, schema: &WorkingSchema) -> Vec<String> {
    let mut keys: IndexSet<String> = IndexSet::new();
    let defaults = schema.default.as_ref().and_then(Value::as_object);
    for key in schema.properties.keys() {
        if map.contains_key(key) || defaults.is_some_and(|bank| bank.contains_key(key)) {
            keys.insert(key.clone());
        }
    }
    for key in map.keys() {
        keys.insert(key.clone());
    }
    if let Some(bank) = defaults {
        for key in bank.keys() {
            keys.insert(key.clone());
        }
    }
    keys.into_iter().collect()
}

fn apply_filter(
    order: Vec<OrderEntry>,
    projection: &Projection,
    filter: &TreeFilter,
) -> Vec<OrderEntry> {
    let mut kept: HashSet<TreePath> = HashSet::new();
    for entry in &order {
        let OrderEntry::Node(path) = entry else {
            continue;
        };
        let Some(node) = projection.entry(path) else {
            continue;
        };
        if filter.matches(&node.data, &node.schema, path) {
            let mut cursor = Some(path.clone());
            while let Some(current) = cursor {
                cursor = current.parent();
                if !kept.insert(current) {
                    break;
                }
            }
        }
    }
    order
        .into_iter()
        .filter(|entry| kept.contains(entry.path()))
        .collect()
}
