#![deny(rust_2018_idioms)]

//! Schema-driven state and navigation engine for interactive JSON tree
//! editors. Given a data tree and a JSON-Schema-like description, the crate
//! resolves a single working schema for every location, derives the full
//! navigable row order including schema-implied defaults and "add new"
//! slots, and applies point mutations back into the tree. Rendering, the
//! event loop, and the validation backend stay with the host.

mod editor;
mod path;
mod schema;
mod tree;
mod validate;


pub use editor::{
    DefinitionRegistry, Diagnostics, EditRejection, EditorCommand, EditorEvents, EditorOptions,
    Interaction, NullEvents, Row, TreeEditor, TypeDefinition, TypeDefinitionClone,
};
pub use path::{OrderEntry, TreePath};
pub use schema::{
    BoolOrSchema, ChildKey, ItemsSchema, SchemaNode, SchemaType, TypeSet, WalkEntry,
    WorkingSchema, build_working_schemas, child_schema, choose_working_schema, combine_schemas,
    from_schemars, walk, walk_from,
};
pub use tree::{
    FilterPredicate, OrderInfo, Projection, ProjectionEntry, SchemaChoices, TreeFilter,
    delete_data_at_path, fresh_child_value, order_info, populate_requireds, project,
    set_data_at_path,
};
pub use validate::{
    DraftValidator, PermissiveValidator, SchemaValidator, ValidationIssue, ValidationReport,
};

pub mod prelude {
    pub use super::{
        DefinitionRegistry, DraftValidator, EditorCommand, EditorEvents, EditorOptions,
        NullEvents, OrderEntry, PermissiveValidator, SchemaNode, SchemaValidator, TreeEditor,
        TreeFilter, TreePath, TypeDefinition,
    };
}
