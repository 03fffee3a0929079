use std::fmt;
use std::ops::Deref;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::node::{ItemsSchema, SchemaNode, SchemaType, TypeSet};
use crate::validate::SchemaValidator;

/// Reference chains longer than this are treated as unresolvable.
const MAX_REF_HOPS: usize = 16;

/// A schema view with exactly one concrete type and no top-level reference
/// or combinator keywords. Several working schemas may describe the same
/// data location; the engine always picks one as current but keeps the full
/// candidate list for callers.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingSchema {
    ty: SchemaType,
    node: SchemaNode,
}

impl WorkingSchema {
    fn assemble(ty: SchemaType, mut node: SchemaNode) -> Self {
        node.schema_type = Some(TypeSet::One(ty));
        Self { ty, node }
    }

    pub fn schema_type(&self) -> SchemaType {
        self.ty
    }

    pub fn node(&self) -> &SchemaNode {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut SchemaNode {
        &mut self.node
    }

    pub fn into_node(self) -> SchemaNode {
        self.node
    }
}

impl Deref for WorkingSchema {
    type Target = SchemaNode;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl fmt::Display for WorkingSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node.title {
            Some(title) => write!(f, "{title} ({})", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// Follows `$ref` chains through the validator's lookup capability. An
/// unresolvable or cyclic reference degrades to the empty schema so the
/// subtree stays navigable, just unconstrained.
fn resolve_reference(schema: &SchemaNode, validator: &dyn SchemaValidator) -> SchemaNode {
    if schema.reference.is_none() {
        return schema.clone();
    }
    let mut current = schema.clone();
    let mut hops = 0;
    while let Some(reference) = current.reference.take() {
        hops += 1;
        if hops > MAX_REF_HOPS {
            warn!(%reference, "reference chain too deep, treating as empty schema");
            return SchemaNode::empty();
        }
        match validator.schema_ref(&reference) {
            Some(target) => current = target,
            None => {
                warn!(%reference, "unresolved schema reference, treating as empty schema");
                return SchemaNode::empty();
            }
        }
    }
    current
}

/// Expands a raw schema into its working-schema candidates: references
/// resolved, `allOf` folded into the base, each `anyOf`/`oneOf` member
/// layered on a fresh base, multi-valued or missing `type` fanned out.
/// Candidate order is declaration order (`anyOf` before `oneOf`), which the
/// chooser relies on.
pub fn build_working_schemas(
    schema: &SchemaNode,
    validator: &dyn SchemaValidator,
) -> Vec<WorkingSchema> {
    let resolved = resolve_reference(schema, validator);
    if !resolved.has_combinators() {
        return spread_types(resolved);
    }

    let mut base = resolved;
    let all_of = std::mem::take(&mut base.all_of);
    let any_of = std::mem::take(&mut base.any_of);
    let one_of = std::mem::take(&mut base.one_of);

    for member in &all_of {
        base = combine_schemas(base, resolve_reference(member, validator));
    }

    let mut members = any_of.iter().chain(one_of.iter()).peekable();
    if members.peek().is_none() {
        return spread_types(base);
    }

    let mut candidates = Vec::new();
    for member in members {
        let layered = combine_schemas(base.clone(), resolve_reference(member, validator));
        candidates.extend(spread_types(layered));
    }
    candidates
}

fn spread_types(node: SchemaNode) -> Vec<WorkingSchema> {
    match node.schema_type.clone() {
        Some(TypeSet::One(ty)) => vec![WorkingSchema::assemble(ty, node)],
        Some(TypeSet::Many(types)) if !types.is_empty() => types
            .into_iter()
            .map(|ty| WorkingSchema::assemble(ty, node.clone()))
            .collect(),
        // No usable type: one candidate per base type. `integer` stays out
        // of the fan-out.
        _ => SchemaType::SPREAD
            .into_iter()
            .map(|ty| WorkingSchema::assemble(ty, node.clone()))
            .collect(),
    }
}

/// Layers `overlay` on top of `base`. Scalar keywords are last-writer-wins;
/// `properties` merge per key, recursing where both sides define one;
/// `required` lists concatenate without deduplication.
pub fn combine_schemas(mut base: SchemaNode, overlay: SchemaNode) -> SchemaNode {
    if overlay.schema_type.is_some() {
        base.schema_type = overlay.schema_type;
    }
    if overlay.reference.is_some() {
        base.reference = overlay.reference;
    }
    for (key, overlay_property) in overlay.properties {
        match base.properties.entry(key) {
            indexmap::map::Entry::Occupied(mut slot) => {
                let merged = combine_schemas(std::mem::take(slot.get_mut()), overlay_property);
                *slot.get_mut() = merged;
            }
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(overlay_property);
            }
        }
    }
    if !overlay.pattern_properties.is_empty() {
        base.pattern_properties = overlay.pattern_properties;
    }
    if overlay.additional_properties.is_some() {
        base.additional_properties = overlay.additional_properties;
    }
    if overlay.items.is_some() {
        base.items = overlay.items;
    }
    if overlay.additional_items.is_some() {
        base.additional_items = overlay.additional_items;
    }
    if !overlay.all_of.is_empty() {
        base.all_of = overlay.all_of;
    }
    if !overlay.any_of.is_empty() {
        base.any_of = overlay.any_of;
    }
    if !overlay.one_of.is_empty() {
        base.one_of = overlay.one_of;
    }
    if overlay.default.is_some() {
        base.default = overlay.default;
    }
    base.required.extend(overlay.required);
    if overlay.enum_values.is_some() {
        base.enum_values = overlay.enum_values;
    }
    if overlay.title.is_some() {
        base.title = overlay.title;
    }
    if overlay.description.is_some() {
        base.description = overlay.description;
    }
    if overlay.format.is_some() {
        base.format = overlay.format;
    }
    if overlay.read_only.is_some() {
        base.read_only = overlay.read_only;
    }
    if overlay.max_items.is_some() {
        base.max_items = overlay.max_items;
    }
    for (key, value) in overlay.extra {
        base.extra.insert(key, value);
    }
    base
}

/// Picks the current working schema for `data` out of `candidates` and
/// returns its index. The first candidate that validates and whose type is
/// the data's runtime type wins outright; otherwise the first candidate
/// with the fewest validation errors. A schema typed `integer` never equals
/// the runtime type of a number, so it can only win through the
/// fewest-errors fallback.
pub fn choose_working_schema(
    data: &Value,
    candidates: &[WorkingSchema],
    validator: &dyn SchemaValidator,
) -> usize {
    debug_assert!(!candidates.is_empty(), "no working schema candidates");
    if candidates.len() <= 1 {
        return 0;
    }
    let runtime = SchemaType::of_value(data);
    let mut best = 0;
    let mut best_errors = usize::MAX;
    for (index, candidate) in candidates.iter().enumerate() {
        let report = validator.validate(data, candidate.node());
        if report.valid && candidate.schema_type() == runtime {
            return index;
        }
        let errors = report.errors.len();
        if errors < best_errors {
            best_errors = errors;
            best = index;
        }
    }
    best
}

/// A child location under some container schema: an object property name or
/// an array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKey<'a> {
    Property(&'a str),
    Index(usize),
}

impl fmt::Display for ChildKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKey::Property(key) => f.write_str(key),
            ChildKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Looks up the raw schema governing one child of `schema`. Properties win
/// over pattern properties, which win over a schema-valued
/// `additionalProperties`; tuple items fall back to `additionalItems` when
/// the index runs past the tuple. Anything unmatched is the empty schema.
pub fn child_schema(key: ChildKey<'_>, schema: &SchemaNode) -> SchemaNode {
    match key {
        ChildKey::Property(name) => {
            if let Some(found) = schema.properties.get(name) {
                return found.clone();
            }
            for (pattern, candidate) in &schema.pattern_properties {
                match Regex::new(pattern) {
                    Ok(regex) if regex.is_match(name) => return candidate.clone(),
                    Ok(_) => {}
                    Err(error) => {
                        warn!(%pattern, %error, "skipping unparseable property pattern");
                    }
                }
            }
            if let Some(additional) = schema
                .additional_properties
                .as_ref()
                .and_then(|extra| extra.as_schema())
            {
                return additional.clone();
            }
            SchemaNode::empty()
        }
        ChildKey::Index(index) => match &schema.items {
            Some(ItemsSchema::One(item)) => (**item).clone(),
            Some(ItemsSchema::Tuple(tuple)) => match tuple.get(index) {
                Some(found) => found.clone(),
                None => schema
                    .additional_items
                    .as_ref()
                    .and_then(|extra| extra.as_schema())
                    .cloned()
                    .unwrap_or_else(SchemaNode::empty),
            },
            None => SchemaNode::empty(),
        },
    }
}
