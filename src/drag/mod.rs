//! Dragging: turning pointer input into drags, and tracking one drag at a time.
//!
//! The [`DragListener`] only classifies gestures. The [`crate::LayoutManager`] owns the
//! listener, detaches the dragged item when a drag starts, hit-tests drop areas while it
//! moves and commits (or undoes) the move on release.

mod listener;
mod payload;
pub(crate) mod policy;
mod session;

pub use listener::{
    DEFAULT_DRAG_DISTANCE, DEFAULT_DRAG_HOLD_DELAY, DragEvent, DragListener, ListenerState,
    nearest_draggable,
};
pub use payload::{DRAG_DATA_MIME_TYPE, DragPayload, WindowDragTracker};
pub use session::DragOrigin;
pub(crate) use session::DragSession;

/// Identifies an external drag source registered with
/// [`crate::LayoutManager::add_drag_source`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DragSourceId(pub(crate) u64);

/// What a press can start dragging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragHandle {
    /// The tab of a component.
    Tab(crate::tree::ItemId),

    /// An external drag source.
    Source(DragSourceId),
}
