//! Schema model and working-schema resolution.
//!
//! Raw schemas carry references, combinators, and multi-valued types. The
//! engine never navigates those directly: [`build_working_schemas`] expands
//! a raw schema into single-type candidates, [`choose_working_schema`]
//! picks the one that currently fits the data, and [`child_schema`] derives
//! the raw schema for a child location. [`walk`] drives all three across a
//! whole document.

mod node;
mod walk;
mod working;

pub use node::{BoolOrSchema, ItemsSchema, SchemaNode, SchemaType, TypeSet, from_schemars};
pub use walk::{WalkEntry, walk, walk_from};
pub use working::{
    ChildKey, WorkingSchema, build_working_schemas, child_schema, choose_working_schema,
    combine_schemas,
};
