use serde::{Deserialize, Serialize};

use crate::config::ItemConfig;
use crate::error::LayoutError;

/// Data type under which [`DragPayload`] travels in native drag-and-drop.
pub const DRAG_DATA_MIME_TYPE: &str = "application/x-dock-layout-item";

/// What a drag carries across windows: the dragged item, serialised.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    /// Window id of the layout the drag started in.
    pub source_window: String,
    pub config: ItemConfig,
}

impl DragPayload {
    pub fn to_json(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Tells real window entries and exits apart from the enter/leave pairs that nested
/// elements fire while the pointer moves between them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowDragTracker {
    depth: u32,
}

impl WindowDragTracker {
    /// Returns `true` when the drag just entered the window.
    pub fn enter(&mut self) -> bool {
        self.depth = self.depth.saturating_add(1);
        self.depth == 1
    }

    /// Returns `true` when the drag just left the window.
    pub fn leave(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        self.depth == 0
    }

    pub fn is_inside(&self) -> bool {
        self.depth > 0
    }

    pub fn reset(&mut self) {
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_enter_leave_pairs_do_not_count_as_exits() {
        let mut tracker = WindowDragTracker::default();
        assert!(tracker.enter()); // window
        assert!(!tracker.enter()); // child element
        assert!(!tracker.leave()); // left the child
        assert!(tracker.is_inside());
        assert!(tracker.leave()); // left the window
        assert!(!tracker.leave());
        assert!(!tracker.is_inside());
    }

    #[test]
    fn payload_survives_json() {
        let payload = DragPayload {
            source_window: "main".to_owned(),
            config: ItemConfig::component("editor").with_title("Editor"),
        };
        let json = payload.to_json().unwrap();
        assert!(json.contains("sourceWindow"));
        assert_eq!(DragPayload::from_json(&json).unwrap(), payload);
    }
}
