use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a placed form element. Unique within a document for its
/// whole lifetime; never reused after deletion.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Identity of an item list (the root list or a tab's list).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub u32);

impl ListId {
    /// The top-level list of a freshly created document.
    pub const ROOT: ListId = ListId(0);
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list:{}", self.0)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list:{}", self.0)
    }
}

/// Monotonic counter shared by node ids and list ids.
///
/// One allocator belongs to one editor session. Values start above zero
/// (zero is the root list of a fresh document) and are never handed out
/// twice, even after the node or list they named is gone.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering strictly above `floor`. Never moves backwards.
    pub fn starting_above(floor: u32) -> Self {
        Self { last: floor }
    }

    fn bump(&mut self) -> u32 {
        self.last += 1;
        self.last
    }

    pub fn next_node_id(&mut self) -> NodeId {
        NodeId(self.bump())
    }

    pub fn next_list_id(&mut self) -> ListId {
        ListId(self.bump())
    }

    /// Make sure future ids land above `seen`.
    pub fn observe(&mut self, seen: u32) {
        self.last = self.last.max(seen);
    }

    /// The most recently issued value (0 if nothing was issued yet).
    pub fn last_issued(&self) -> u32 {
        self.last
    }
}
