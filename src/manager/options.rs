use std::time::Duration;

use egui::Vec2;

use crate::drag::{DEFAULT_DRAG_DISTANCE, DEFAULT_DRAG_HOLD_DELAY};

/// Runtime options for [`super::LayoutManager`]. Not persisted with the layout.
#[derive(Clone, Debug)]
pub struct LayoutManagerOptions {
    /// Bursts of resize notifications closer together than this become one resize.
    pub resize_debounce_interval: Duration,

    /// If true, every notification pushes the pending resize back (a sliding window)
    /// instead of letting the first deadline stand.
    pub resize_debounce_extended_when_possible: bool,

    /// Pointer travel (in points, on either axis) that starts a drag.
    pub drag_distance: f32,

    /// Holding the pointer down this long starts a drag without moving.
    pub drag_hold_delay: Duration,

    /// How often open popout windows are checked for having been closed.
    pub popout_reconcile_interval: Duration,

    /// Window size for popouts of items that have not been laid out.
    pub default_popout_size: Vec2,

    /// Maximum number of undrained events; the oldest are dropped first.
    pub event_queue_capacity: usize,

    /// Identifies this layout's window in cross-window drags.
    pub window_id: String,

    /// If true, check tree integrity after every drop and panic on issues.
    pub check_integrity: bool,
}

impl Default for LayoutManagerOptions {
    fn default() -> Self {
        Self {
            resize_debounce_interval: Duration::from_millis(100),
            resize_debounce_extended_when_possible: true,
            drag_distance: DEFAULT_DRAG_DISTANCE,
            drag_hold_delay: DEFAULT_DRAG_HOLD_DELAY,
            popout_reconcile_interval: Duration::from_millis(1000),
            default_popout_size: Vec2::new(480.0, 360.0),
            event_queue_capacity: 256,
            window_id: "main".to_owned(),
            check_integrity: cfg!(debug_assertions),
        }
    }
}
