use std::time::{Duration, Instant};

use egui::Rect;

use super::{LayoutManager, ManagerState};
use crate::error::LayoutError;
use crate::event::LayoutEvent;
use crate::timer::SingleShotTimer;
use crate::tree::ItemId;

/// Collapses bursts of container resizes into one.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ResizeDebouncer {
    timer: SingleShotTimer,
    pending: Option<Rect>,
}

impl ResizeDebouncer {
    /// With `extend`, each notification restarts the wait; otherwise the first one's
    /// deadline stands.
    pub(crate) fn notify(&mut self, rect: Rect, now: Instant, interval: Duration, extend: bool) {
        self.pending = Some(rect);
        if extend {
            self.timer.schedule(now, interval);
        } else {
            self.timer.schedule_if_idle(now, interval);
        }
    }

    pub(crate) fn poll(&mut self, now: Instant) -> Option<Rect> {
        if self.timer.poll(now) {
            self.pending.take()
        } else {
            None
        }
    }

    pub(crate) fn cancel(&mut self) {
        self.timer.cancel();
        self.pending = None;
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }
}

impl LayoutManager {
    /// Size the layout to `rect` right away.
    ///
    /// Allowed before [`Self::init`]; the size is used once the layout is built.
    pub fn set_size(&mut self, rect: Rect) -> Result<(), LayoutError> {
        if self.state == ManagerState::Destroyed {
            return Err(LayoutError::invalid_state("set_size on a destroyed layout manager"));
        }
        self.resize.cancel();
        self.container_rect = rect;
        self.update_root_size();
        Ok(())
    }

    /// Lay the whole tree out again in the current container rectangle.
    pub fn update_root_size(&mut self) {
        if self.state != ManagerState::Initialised {
            return;
        }
        self.relayout();
        self.emit(LayoutEvent::StateChanged);
    }

    /// The container is being resized; the layout follows once the burst settles
    /// (on a later [`Self::tick`]).
    pub fn notify_resize(&mut self, rect: Rect, now: Instant) {
        self.resize.notify(
            rect,
            now,
            self.options.resize_debounce_interval,
            self.options.resize_debounce_extended_when_possible,
        );
    }

    /// Advance timers: debounced resizes, drag hold delays and popout reconciliation.
    pub fn tick(&mut self, now: Instant) {
        if self.state == ManagerState::Destroyed {
            return;
        }
        if let Some(rect) = self.resize.poll(now) {
            log::trace!("debounced resize to {rect:?}");
            self.container_rect = rect;
            self.update_root_size();
        }
        if let Some(event) = self.listener.poll(now) {
            self.handle_drag_event(event);
        }
        self.tick_popouts(now);
    }

    /// When [`Self::tick`] next has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.resize.deadline(),
            self.listener.hold_deadline(),
            self.reconcile_timer.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Move the splitter after child `splitter_index` of `container` by `delta` pixels.
    pub fn drag_splitter(
        &mut self,
        container: ItemId,
        splitter_index: usize,
        delta: f32,
    ) -> Result<(), LayoutError> {
        self.ensure_live("drag_splitter")?;
        self.tree
            .drag_splitter(container, splitter_index, delta, &self.metrics)?;
        self.refresh_tab_strips();
        self.emit(LayoutEvent::StateChanged);
        Ok(())
    }
}
