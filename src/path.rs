use std::cmp::Ordering;
use std::fmt;

/// Slash-delimited location pointer from the data root. The empty string is
/// the root; children append `/segment` with object keys or array indices as
/// segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath(String);

impl TreePath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn join(&self, segment: impl fmt::Display) -> Self {
        Self(format!("{}/{}", self.0, segment))
    }

    /// Appends a root-relative path wholesale, used when re-prefixing paths
    /// walked inside a schema default back onto the tree they hang from.
    pub fn concat(&self, relative: &TreePath) -> Self {
        Self(format!("{}{}", self.0, relative.0))
    }

    pub fn parent(&self) -> Option<TreePath> {
        if self.is_root() {
            return None;
        }
        let cut = self.0.rfind('/').unwrap_or(0);
        Some(Self(self.0[..cut].to_string()))
    }

    pub fn last_segment(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        let cut = self.0.rfind('/').unwrap_or(0);
        Some(&self.0[cut + 1..])
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        // The root has no leading separator, so the skipped head is the
        // empty prefix in both cases.
        self.0.split('/').skip(1)
    }

    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.bytes().filter(|b| *b == b'/').count()
        }
    }

    /// True when `other` lives strictly below this path.
    pub fn is_ancestor_of(&self, other: &TreePath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == b'/'
    }

    /// Segment-wise order: ancestors before descendants, array indices by
    /// value rather than by digits. Reversing this order makes batched
    /// removals safe, since deleting a later sibling or a descendant never
    /// shifts an earlier target.
    pub fn structural_cmp(&self, other: &TreePath) -> Ordering {
        let mut left = self.segments();
        let mut right = other.segments();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ordering = match (a.parse::<usize>(), b.parse::<usize>()) {
                        (Ok(left_index), Ok(right_index)) => left_index.cmp(&right_index),
                        _ => a.cmp(b),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
            }
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreePath {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for TreePath {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for TreePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One row of the flattened navigation order: either a real (or
/// default-implied) node, or the synthetic insertion slot trailing an open,
/// addable collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderEntry {
    Node(TreePath),
    AddSlot(TreePath),
}

impl OrderEntry {
    pub fn path(&self) -> &TreePath {
        match self {
            OrderEntry::Node(path) | OrderEntry::AddSlot(path) => path,
        }
    }

    pub fn is_add_slot(&self) -> bool {
        matches!(self, OrderEntry::AddSlot(_))
    }
}

impl fmt::Display for OrderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEntry::Node(path) => f.write_str(path.as_str()),
            OrderEntry::AddSlot(path) => write!(f, "addTo:{path}"),
        }
    }
}
