use serde_json::Value;

use crate::path::OrderEntry;

/// Observer for editor state transitions. Selection changes fire only when
/// the selected entry actually changed; data changes fire once per
/// dispatched command, after the mutation settled.
pub trait EditorEvents {
    fn on_selection_changed(&mut self, selected: Option<&OrderEntry>, selection: &[OrderEntry]) {
        let _ = (selected, selection);
    }

    fn on_data_changed(&mut self, data: &Value) {
        let _ = data;
    }
}

/// Sink for hosts that do not care about events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl EditorEvents for NullEvents {}
