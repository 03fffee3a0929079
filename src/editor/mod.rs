//! The host-facing editor surface.
//!
//! [`TreeEditor`] owns a data tree and its schema, derives the projection
//! and navigation order on demand, and advances through [`EditorCommand`]s
//! dispatched by the host's event loop. Rendering stays outside: hosts read
//! [`TreeEditor::rows`] and draw however they like, plugging custom
//! [`TypeDefinition`]s into the registry for their own formats.

mod actions;
mod definitions;
mod events;
mod options;
mod state;

pub use actions::EditorCommand;
pub use definitions::{DefinitionRegistry, EditRejection, TypeDefinition, TypeDefinitionClone};
pub use events::{EditorEvents, NullEvents};
pub use options::EditorOptions;
pub use state::{Diagnostics, Interaction, Row, TreeEditor};

#[cfg(test)]
pub(crate) use definitions::truncate_display;
