use std::cell::OnceCell;
use std::collections::BTreeSet;

use anyhow::Result;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::error;

use super::actions::EditorCommand;
use super::definitions::{DefinitionRegistry, EditRejection, SHORTENED_WIDTH, truncate_display};
use super::events::EditorEvents;
use super::options::EditorOptions;
use crate::path::{OrderEntry, TreePath};
use crate::schema::{ChildKey, SchemaNode, from_schemars};
use crate::tree::{
    OrderInfo, Projection, SchemaChoices, TreeFilter, delete_data_at_path, fresh_child_value,
    order_info, populate_requireds, project, slot_at_path,
};
use crate::validate::{DraftValidator, PermissiveValidator, SchemaValidator, ValidationIssue};

/// What the editor is in the middle of, if anything. At most one
/// interaction is live at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Idle,
    /// A value edit: `buffer` holds the in-progress value for `path`.
    Editing { path: TreePath, buffer: Value },
    /// A property-name entry for a pending object add.
    AddingKey { parent: TreePath, buffer: String },
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }
}

/// Validation state of the whole document, grouped by data path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    by_path: IndexMap<TreePath, Vec<ValidationIssue>>,
    missing: Vec<String>,
}

impl Diagnostics {
    fn collect(report: crate::validate::ValidationReport) -> Self {
        let mut by_path: IndexMap<TreePath, Vec<ValidationIssue>> = IndexMap::new();
        for issue in report.errors {
            by_path.entry(issue.data_path.clone()).or_default().push(issue);
        }
        Self {
            by_path,
            missing: report.missing,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn total(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    pub fn at(&self, path: &TreePath) -> &[ValidationIssue] {
        self.by_path.get(path).map_or(&[], |issues| issues.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = &TreePath> {
        self.by_path.keys()
    }

    /// References the validator could not resolve, if any.
    pub fn missing_references(&self) -> &[String] {
        &self.missing
    }
}

/// One renderable line of the flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub entry: OrderEntry,
    pub depth: usize,
    /// Last path segment, `None` at the root and for add placeholders.
    pub key: Option<String>,
    pub display: String,
    pub editable: bool,
    pub open: bool,
    pub selected: bool,
    /// True for rows that exist only through a schema default.
    pub default_root: bool,
}

#[derive(Debug, Default)]
struct DerivedViews {
    projection: OnceCell<Projection>,
    order: OnceCell<OrderInfo>,
    diagnostics: OnceCell<Diagnostics>,
}

impl DerivedViews {
    fn clear_all(&mut self) {
        self.projection.take();
        self.order.take();
        self.diagnostics.take();
    }

    fn clear_order(&mut self) {
        self.order.take();
    }
}

/// The editor: owns the data tree and raw schema, derives projection,
/// navigation order, and diagnostics on demand, and advances through
/// [`EditorCommand`]s. Commands either apply fully or leave the state
/// untouched.
#[derive(Debug)]
pub struct TreeEditor {
    data: Value,
    schema: SchemaNode,
    validator: Box<dyn SchemaValidator>,
    definitions: DefinitionRegistry,
    read_only: bool,
    choices: SchemaChoices,
    closed: BTreeSet<TreePath>,
    filter: Option<TreeFilter>,
    selected: Option<OrderEntry>,
    selection: Vec<OrderEntry>,
    interaction: Interaction,
    views: DerivedViews,
}

impl TreeEditor {
    pub fn new(
        data: Value,
        schema: SchemaNode,
        validator: Box<dyn SchemaValidator>,
        definitions: DefinitionRegistry,
        options: EditorOptions,
    ) -> Self {
        let mut editor = Self {
            data,
            schema,
            validator,
            definitions,
            read_only: options.read_only,
            choices: SchemaChoices::new(),
            closed: BTreeSet::new(),
            filter: options.filter,
            selected: None,
            selection: Vec::new(),
            interaction: Interaction::Idle,
            views: DerivedViews::default(),
        };
        if let Some(depth) = options.open_depth {
            editor.close_below(depth);
        }
        editor
    }

    /// Editor without a validator backend: everything validates, `$ref`
    /// lookups only see schemas registered later.
    pub fn with_defaults(data: Value, schema: SchemaNode) -> Self {
        Self::new(
            data,
            schema,
            Box::new(PermissiveValidator::new()),
            DefinitionRegistry::with_builtins(),
            EditorOptions::default(),
        )
    }

    /// Editor over a plain JSON schema document, validated by the
    /// `jsonschema` backend with `$ref` pointers resolving against the
    /// document itself.
    pub fn from_document(data: Value, schema_document: &Value) -> Result<Self> {
        let schema = SchemaNode::from_value(schema_document)?;
        let validator = DraftValidator::for_document(schema_document.clone());
        Ok(Self::new(
            data,
            schema,
            Box::new(validator),
            DefinitionRegistry::with_builtins(),
            EditorOptions::default(),
        ))
    }

    /// Editor over a schema generated with `schemars`.
    pub fn from_root_schema(data: Value, root: &schemars::schema::RootSchema) -> Result<Self> {
        let schema = from_schemars(root)?;
        let document = serde_json::to_value(root)?;
        let validator = DraftValidator::for_document(document);
        Ok(Self::new(
            data,
            schema,
            Box::new(validator),
            DefinitionRegistry::with_builtins(),
            EditorOptions::default(),
        ))
    }

    /// Editor for data described by a `JsonSchema` type.
    pub fn for_type<T: schemars::JsonSchema>(data: Value) -> Result<Self> {
        let root = schemars::schema_for!(T);
        Self::from_root_schema(data, &root)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn selected(&self) -> Option<&OrderEntry> {
        self.selected.as_ref()
    }

    pub fn selection(&self) -> &[OrderEntry] {
        &self.selection
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn definitions_mut(&mut self) -> &mut DefinitionRegistry {
        &mut self.definitions
    }

    pub fn validator_mut(&mut self) -> &mut dyn SchemaValidator {
        self.views.clear_all();
        self.validator.as_mut()
    }

    pub fn projection(&self) -> &Projection {
        self.views.projection.get_or_init(|| {
            project(
                &self.data,
                &self.schema,
                self.validator.as_ref(),
                &self.choices,
            )
        })
    }

    pub fn order(&self) -> &OrderInfo {
        self.views
            .order
            .get_or_init(|| order_info(self.projection(), &self.closed, self.filter.as_ref()))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.views
            .diagnostics
            .get_or_init(|| Diagnostics::collect(self.validator.validate(&self.data, &self.schema)))
    }

    pub fn is_open(&self, path: &TreePath) -> bool {
        !self.closed.contains(path)
    }

    pub fn can_edit(&self, path: &TreePath) -> bool {
        if self.read_only {
            return false;
        }
        let Some(node) = self.projection().entry(path) else {
            return false;
        };
        if node.schema.is_read_only() {
            return false;
        }
        self.definitions
            .lookup(&node.data, &node.schema)
            .is_some_and(|definition| definition.editable())
    }

    /// Replaces the row filter. The order refreshes lazily; the selection
    /// is clamped to the surviving rows.
    pub fn set_filter(&mut self, filter: Option<TreeFilter>) {
        self.filter = filter;
        self.invalidate_order();
        self.clamp_selection();
    }

    /// Coerces host input text through the definition of the location
    /// being edited.
    pub fn parse_input(&self, input: &str) -> Result<Value, EditRejection> {
        let Interaction::Editing { path, .. } = &self.interaction else {
            return Err(EditRejection::new("no edit in progress"));
        };
        let Some(node) = self.projection().entry(path) else {
            return Err(EditRejection::new("edited location no longer exists"));
        };
        match self.definitions.lookup(&node.data, &node.schema) {
            Some(definition) => definition.parse_edit(input, &node.schema),
            None => Err(EditRejection::new("no definition for edited location")),
        }
    }

    /// Flattens the current order into render rows.
    pub fn rows(&self) -> Vec<Row> {
        self.order()
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                OrderEntry::Node(path) => {
                    let node = self.projection().entry(path)?;
                    let display = match self.definitions.lookup(&node.data, &node.schema) {
                        Some(definition) => {
                            let text = definition.display(&node.data, &node.schema);
                            if definition.shortened() {
                                truncate_display(&text, SHORTENED_WIDTH)
                            } else {
                                text
                            }
                        }
                        None => node.data.to_string(),
                    };
                    Some(Row {
                        entry: entry.clone(),
                        depth: path.depth(),
                        key: path.last_segment().map(str::to_string),
                        display,
                        editable: self.can_edit(path),
                        open: self.is_open(path),
                        selected: self.selected.as_ref() == Some(entry),
                        default_root: node.default_root,
                    })
                }
                OrderEntry::AddSlot(path) => {
                    let label = match self.projection().data(path) {
                        Some(Value::Array(_)) => "add item",
                        _ => "add property",
                    };
                    Some(Row {
                        entry: entry.clone(),
                        depth: path.depth() + 1,
                        key: None,
                        display: label.to_string(),
                        editable: false,
                        open: false,
                        selected: self.selected.as_ref() == Some(entry),
                        default_root: false,
                    })
                }
            })
            .collect()
    }

    /// Applies one command and fires events for whatever actually changed.
    pub fn dispatch(&mut self, command: EditorCommand, events: &mut dyn EditorEvents) {
        let previous = self.selected.clone();
        let data_changed = self.apply(command);
        if self.selected != previous {
            events.on_selection_changed(self.selected.as_ref(), &self.selection);
        }
        if data_changed {
            events.on_data_changed(&self.data);
        }
    }

    fn apply(&mut self, command: EditorCommand) -> bool {
        match command {
            EditorCommand::Select(entry) => {
                self.select(entry);
                false
            }
            EditorCommand::SelectNext => {
                self.select_step(1);
                false
            }
            EditorCommand::SelectPrev => {
                self.select_step(-1);
                false
            }
            EditorCommand::ExtendSelection(entry) => {
                self.extend_selection(entry);
                false
            }
            EditorCommand::ClearSelection => {
                self.selected = None;
                self.selection.clear();
                false
            }
            EditorCommand::ToggleOpen(path) => {
                let reopen = self.closed.contains(&path);
                self.set_open(path, reopen);
                false
            }
            EditorCommand::Open(path) => {
                self.set_open(path, true);
                false
            }
            EditorCommand::Close(path) => {
                self.set_open(path, false);
                false
            }
            EditorCommand::BeginEdit => {
                self.begin_edit();
                false
            }
            EditorCommand::EditBuffer(value) => {
                self.edit_buffer(value);
                false
            }
            EditorCommand::CommitEdit => self.commit_edit(),
            EditorCommand::CancelEdit => {
                self.cancel_edit();
                false
            }
            EditorCommand::BeginAdd => self.begin_add(),
            EditorCommand::KeyBuffer(text) => {
                self.key_buffer(text);
                false
            }
            EditorCommand::CommitAdd => self.commit_add(),
            EditorCommand::CancelAdd => {
                self.cancel_add();
                false
            }
            EditorCommand::SetValue { path, value } => self.set_value(&path, value),
            EditorCommand::Delete(path) => self.delete(&path),
            EditorCommand::DeleteSelection => self.delete_selection(),
            EditorCommand::ChooseSchema { path, index } => {
                self.choose_schema(path, index);
                false
            }
            EditorCommand::SetFilter(filter) => {
                self.set_filter(filter);
                false
            }
        }
    }

    fn invalidate_projection(&mut self) {
        self.views.clear_all();
    }

    fn invalidate_order(&mut self) {
        self.views.clear_order();
    }

    fn close_below(&mut self, depth: usize) {
        let to_close: Vec<TreePath> = {
            let projection = self.projection();
            projection
                .paths()
                .filter(|path| path.depth() > depth && projection.is_collection(path))
                .cloned()
                .collect()
        };
        if !to_close.is_empty() {
            self.closed.extend(to_close);
            self.invalidate_order();
        }
    }

    fn select(&mut self, entry: OrderEntry) {
        if !self.order().contains(&entry) {
            error!(%entry, "selection target is not in the navigation order");
            return;
        }
        self.selected = Some(entry.clone());
        self.selection = vec![entry];
    }

    fn select_step(&mut self, delta: isize) {
        let next = {
            let order = self.order();
            if order.is_empty() {
                None
            } else {
                match self
                    .selected
                    .as_ref()
                    .and_then(|current| order.position(current))
                {
                    Some(position) => {
                        let last = order.len() - 1;
                        let target = position.saturating_add_signed(delta).min(last);
                        order.entries().get(target).cloned()
                    }
                    None if delta >= 0 => order.first().cloned(),
                    None => order.last().cloned(),
                }
            }
        };
        if let Some(entry) = next {
            self.selected = Some(entry.clone());
            self.selection = vec![entry];
        }
    }

    fn extend_selection(&mut self, entry: OrderEntry) {
        if !self.order().contains(&entry) {
            error!(%entry, "selection target is not in the navigation order");
            return;
        }
        if !self.selection.contains(&entry) {
            self.selection.push(entry.clone());
        }
        self.selected = Some(entry);
    }

    fn set_open(&mut self, path: TreePath, open: bool) {
        if !self.projection().is_collection(&path) {
            error!(%path, "cannot open or close a non-collection");
            return;
        }
        let changed = if open {
            self.closed.remove(&path)
        } else {
            self.closed.insert(path)
        };
        if changed {
            self.invalidate_order();
            self.clamp_selection();
        }
    }

    fn begin_edit(&mut self) {
        if !self.interaction.is_idle() {
            error!("an interaction is already in progress");
            return;
        }
        let Some(OrderEntry::Node(path)) = self.selected.clone() else {
            error!("no value row selected");
            return;
        };
        if self.read_only {
            error!("editor is read-only");
            return;
        }
        let buffer = {
            let Some(node) = self.projection().entry(&path) else {
                error!(%path, "selected location is not in the projection");
                return;
            };
            if node.schema.is_read_only() {
                error!(%path, "location is read-only");
                return;
            }
            let Some(definition) = self.definitions.lookup(&node.data, &node.schema) else {
                error!(%path, "no definition for location");
                return;
            };
            if !definition.editable() {
                error!(%path, "location is not editable");
                return;
            }
            definition.edit_seed(&node.data, &node.schema)
        };
        self.interaction = Interaction::Editing { path, buffer };
    }

    fn edit_buffer(&mut self, value: Value) {
        match &mut self.interaction {
            Interaction::Editing { buffer, .. } => *buffer = value,
            _ => error!("no edit in progress"),
        }
    }

    fn commit_edit(&mut self) -> bool {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Editing { path, buffer } => self.write_value(&path, buffer),
            other => {
                self.interaction = other;
                error!("no edit in progress");
                false
            }
        }
    }

    fn cancel_edit(&mut self) {
        if matches!(self.interaction, Interaction::Editing { .. }) {
            self.interaction = Interaction::Idle;
        } else {
            error!("no edit in progress");
        }
    }

    fn begin_add(&mut self) -> bool {
        if self.read_only {
            error!("editor is read-only");
            return false;
        }
        if !self.interaction.is_idle() {
            error!("an interaction is already in progress");
            return false;
        }
        let target = match &self.selected {
            Some(OrderEntry::AddSlot(path)) => path.clone(),
            Some(OrderEntry::Node(path)) if self.projection().can_add_child(path) => path.clone(),
            _ => {
                error!("selection does not accept new children");
                return false;
            }
        };

        enum Target {
            Array(usize),
            Object,
        }
        let kind = match self.projection().data(&target) {
            Some(Value::Array(items)) => Target::Array(items.len()),
            Some(Value::Object(_)) => Target::Object,
            _ => {
                error!(%target, "cannot add into a non-collection");
                return false;
            }
        };
        match kind {
            Target::Array(length) => {
                let seed = {
                    let Some(node) = self.projection().entry(&target) else {
                        return false;
                    };
                    fresh_child_value(
                        ChildKey::Index(length),
                        &node.schema,
                        self.validator.as_ref(),
                    )
                };
                let child = target.join(length);
                let changed = self.write_value(&child, seed);
                if changed {
                    self.select(OrderEntry::Node(child.clone()));
                    self.auto_edit(&child);
                }
                changed
            }
            Target::Object => {
                self.interaction = Interaction::AddingKey {
                    parent: target,
                    buffer: String::new(),
                };
                false
            }
        }
    }

    fn key_buffer(&mut self, text: String) {
        match &mut self.interaction {
            Interaction::AddingKey { buffer, .. } => *buffer = text,
            _ => error!("no key entry in progress"),
        }
    }

    fn commit_add(&mut self) -> bool {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::AddingKey { parent, buffer } => {
                // An empty buffer cancels the add.
                if buffer.is_empty() {
                    return false;
                }
                let child = parent.join(&buffer);
                let exists = self
                    .projection()
                    .data(&parent)
                    .and_then(Value::as_object)
                    .is_some_and(|map| map.contains_key(&buffer));
                if exists {
                    self.select(OrderEntry::Node(child));
                    return false;
                }
                let seed = {
                    let Some(node) = self.projection().entry(&parent) else {
                        error!(%parent, "target collection is not in the projection");
                        return false;
                    };
                    fresh_child_value(
                        ChildKey::Property(&buffer),
                        &node.schema,
                        self.validator.as_ref(),
                    )
                };
                let changed = self.write_value(&child, seed);
                if changed {
                    self.select(OrderEntry::Node(child.clone()));
                    self.auto_edit(&child);
                }
                changed
            }
            other => {
                self.interaction = other;
                error!("no key entry in progress");
                false
            }
        }
    }

    fn cancel_add(&mut self) {
        if matches!(self.interaction, Interaction::AddingKey { .. }) {
            self.interaction = Interaction::Idle;
        } else {
            error!("no key entry in progress");
        }
    }

    fn set_value(&mut self, path: &TreePath, value: Value) -> bool {
        if self.read_only {
            error!("editor is read-only");
            return false;
        }
        self.write_value(path, value)
    }

    fn delete(&mut self, path: &TreePath) -> bool {
        if self.read_only {
            error!("editor is read-only");
            return false;
        }
        if !self.projection().contains(path) {
            error!(%path, "no such location");
            return false;
        }
        self.remove_paths(vec![path.clone()])
    }

    fn delete_selection(&mut self) -> bool {
        if self.read_only {
            error!("editor is read-only");
            return false;
        }
        let mut paths: Vec<TreePath> = self
            .selection
            .iter()
            .filter_map(|entry| match entry {
                OrderEntry::Node(path) => Some(path.clone()),
                OrderEntry::AddSlot(_) => None,
            })
            .collect();
        if paths.is_empty() {
            return false;
        }
        // Deepest-first, highest index first, so earlier removals cannot
        // shift what later ones point at.
        paths.sort_by(|a, b| b.structural_cmp(a));
        paths.dedup();
        self.remove_paths(paths)
    }

    fn remove_paths(&mut self, paths: Vec<TreePath>) -> bool {
        let mut tree = std::mem::take(&mut self.data);
        for path in &paths {
            tree = delete_data_at_path(tree, path);
        }
        self.data = tree;
        for path in &paths {
            self.choices
                .retain(|candidate, _| candidate != path && !path.is_ancestor_of(candidate));
            self.closed
                .retain(|candidate| candidate != path && !path.is_ancestor_of(candidate));
        }
        if let Interaction::Editing { path: live, .. } | Interaction::AddingKey { parent: live, .. } =
            &self.interaction
        {
            if paths.iter().any(|path| path == live || path.is_ancestor_of(live)) {
                self.interaction = Interaction::Idle;
            }
        }
        self.invalidate_projection();
        self.clamp_selection();
        true
    }

    fn choose_schema(&mut self, path: TreePath, index: usize) {
        let valid = self
            .projection()
            .candidates(&path)
            .is_some_and(|candidates| index < candidates.len());
        if !valid {
            error!(%path, index, "no such schema candidate");
            return;
        }
        self.choices.insert(path, index);
        self.invalidate_projection();
        self.clamp_selection();
    }

    fn write_value(&mut self, path: &TreePath, value: Value) -> bool {
        let mut tree = std::mem::take(&mut self.data);
        match slot_at_path(&mut tree, path) {
            Some(slot) => {
                *slot = value;
                self.data = populate_requireds(tree, &self.schema, self.validator.as_ref());
                self.invalidate_projection();
                self.clamp_selection();
                true
            }
            None => {
                error!(%path, "value does not fit at path, data unchanged");
                self.data = tree;
                false
            }
        }
    }

    fn auto_edit(&mut self, path: &TreePath) {
        if !self.interaction.is_idle() || self.read_only {
            return;
        }
        let buffer = {
            let Some(node) = self.projection().entry(path) else {
                return;
            };
            if node.schema.is_read_only() {
                return;
            }
            let Some(definition) = self.definitions.lookup(&node.data, &node.schema) else {
                return;
            };
            if !definition.editable() {
                return;
            }
            definition.edit_seed(&node.data, &node.schema)
        };
        self.interaction = Interaction::Editing {
            path: path.clone(),
            buffer,
        };
    }

    /// Re-anchors the selection after a structural change: vanished entries
    /// fall back to their nearest surviving ancestor row.
    fn clamp_selection(&mut self) {
        let next = {
            let order = self.order();
            match &self.selected {
                None => None,
                Some(entry) if order.contains(entry) => Some(entry.clone()),
                Some(entry) => {
                    let mut cursor = Some(entry.path().clone());
                    let mut found = None;
                    while let Some(path) = cursor {
                        let candidate = OrderEntry::Node(path.clone());
                        if order.contains(&candidate) {
                            found = Some(candidate);
                            break;
                        }
                        cursor = path.parent();
                    }
                    found
                }
            }
        };
        let retained: Vec<OrderEntry> = {
            let order = self.order();
            self.selection
                .iter()
                .filter(|entry| order.contains(entry))
                .cloned()
                .collect()
        };
        self.selected = next;
        self.selection = retained;
        if let Some(entry) = &self.selected {
            if !self.selection.contains(entry) {
                self.selection.push(entry.clone());
            }
        }
    }
}
