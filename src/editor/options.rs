use crate::tree::TreeFilter;

/// Construction-time knobs for [`TreeEditor`](super::TreeEditor).
#[derive(Debug, Default)]
pub struct EditorOptions {
    /// Collections deeper than this start closed. `None` opens everything.
    pub open_depth: Option<usize>,
    /// Blocks every mutating command, not just edits of read-only schemas.
    pub read_only: bool,
    pub filter: Option<TreeFilter>,
}

impl EditorOptions {
    pub fn with_open_depth(mut self, depth: usize) -> Self {
        self.open_depth = Some(depth);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_filter(mut self, filter: TreeFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}
