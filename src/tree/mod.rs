//! Data-side engine: the projection of navigable locations, the flattened
//! navigation order, and the mutation primitives that produce new trees.

mod mutate;
mod order;
mod projection;

pub use mutate::{
    delete_data_at_path, fresh_child_value, populate_requireds, set_data_at_path,
};
pub use order::{FilterPredicate, OrderInfo, TreeFilter, order_info};
pub use projection::{Projection, ProjectionEntry, SchemaChoices, project};

pub(crate) use mutate::slot_at_path;
