use serde_json::Value;

use crate::path::{OrderEntry, TreePath};
use crate::tree::TreeFilter;

/// Everything a host can ask the editor to do. Commands that make no sense
/// in the current state are logged and dropped; the editor never ends up
/// half-transitioned.
#[derive(Debug, Clone)]
pub enum EditorCommand {
    Select(OrderEntry),
    SelectNext,
    SelectPrev,
    ExtendSelection(OrderEntry),
    ClearSelection,
    ToggleOpen(TreePath),
    Open(TreePath),
    Close(TreePath),
    BeginEdit,
    EditBuffer(Value),
    CommitEdit,
    CancelEdit,
    BeginAdd,
    KeyBuffer(String),
    CommitAdd,
    CancelAdd,
    SetValue { path: TreePath, value: Value },
    Delete(TreePath),
    DeleteSelection,
    ChooseSchema { path: TreePath, index: usize },
    SetFilter(Option<TreeFilter>),
}
