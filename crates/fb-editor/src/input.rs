//! Gesture abstraction layer.
//!
//! The UI hit-tests pointer input against the palette, placed elements,
//! drop gaps and tab headers, and reports the result as a `GestureEvent`
//! consumed by the drag resolver.

use fb_core::id::{ListId, NodeId};
use fb_core::model::ElementKind;

/// Where a released pointer landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Gap `index` of list `list_id`: before the item currently at
    /// `index`, or the end of the list when `index == len`.
    Gap { list_id: ListId, index: usize },
    /// Header of tab `tab` of tabs node `tabs`: append to that tab.
    TabHeader { tabs: NodeId, tab: usize },
    /// Empty canvas area: append to the root list.
    Canvas,
}

/// A normalized drag-and-drop gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// Pointer pressed on a palette entry.
    GrabPalette { kind: ElementKind },

    /// Pointer pressed on a placed element.
    GrabNode { id: NodeId },

    /// Pointer moved while holding something.
    PointerMove { x: f32, y: f32 },

    /// Pointer released over a valid drop target.
    Drop { target: DropTarget },

    /// Pointer released anywhere else, or a dialog took over the release.
    Cancel,
}

impl GestureEvent {
    pub fn drop_at(list_id: ListId, index: usize) -> Self {
        Self::Drop {
            target: DropTarget::Gap { list_id, index },
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerMove { x, y } => Some((*x, *y)),
            _ => None,
        }
    }
}
