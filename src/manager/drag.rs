use std::time::Instant;

use egui::Pos2;

use super::LayoutManager;
use crate::config::{ItemConfig, ItemType};
use crate::drag::policy::{ReleaseOutcome, constrain_to_container, release_outcome};
use crate::drag::{DragEvent, DragHandle, DragOrigin, DragPayload, DragSourceId};
use crate::error::{ConfigError, LayoutError};
use crate::event::LayoutEvent;
use crate::tree::{DropIndicator, ItemId, get_area, validate_config};

impl LayoutManager {
    // ------------------------------------------------------------------------------------
    // Drag sources

    /// Make something outside the layout draggable into it. `make_config` builds the
    /// component each time a drag starts.
    pub fn add_drag_source(
        &mut self,
        make_config: impl FnMut() -> ItemConfig + 'static,
    ) -> DragSourceId {
        let id = DragSourceId(self.next_drag_source);
        self.next_drag_source += 1;
        self.drag_sources.insert(id, Box::new(make_config));
        id
    }

    pub fn remove_drag_source(&mut self, id: DragSourceId) -> bool {
        self.drag_sources.remove(&id).is_some()
    }

    // ------------------------------------------------------------------------------------
    // Pointer input

    pub fn is_dragging(&self) -> bool {
        self.drag.is_active()
    }

    /// The component being dragged. It is detached from the tree until the drop.
    pub fn dragged_item(&self) -> Option<ItemId> {
        self.drag.active().map(|d| d.item)
    }

    /// Where the current drag would land.
    pub fn drop_indicator(&self) -> Option<DropIndicator> {
        self.drag.active().and_then(|d| d.indicator)
    }

    /// A press at `pos` over `handle` (or over nothing draggable).
    ///
    /// Returns `true` if the press is being tracked as a possible drag.
    pub fn pointer_down(&mut self, handle: Option<DragHandle>, pos: Pos2, now: Instant) -> bool {
        if !self.is_initialised() {
            return false;
        }
        let handle = handle.filter(|&h| self.can_drag(h));
        self.listener.pointer_down(handle, pos, now)
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        if let Some(event) = self.listener.pointer_move(pos) {
            self.handle_drag_event(event);
        }
    }

    /// Returns `true` if the release ended a drag (rather than a click).
    pub fn pointer_up(&mut self, pos: Pos2) -> bool {
        match self.listener.pointer_up(pos) {
            Some(event) => {
                self.handle_drag_event(event);
                true
            }
            None => false,
        }
    }

    /// Abort the current drag; the item goes back where it came from.
    pub fn cancel_drag(&mut self) {
        match self.listener.cancel() {
            Some(event) => self.handle_drag_event(event),
            None => self.finish_drag(true),
        }
    }

    fn can_drag(&self, handle: DragHandle) -> bool {
        match handle {
            DragHandle::Tab(component) => {
                self.config.settings.reorder_enabled
                    && self.tree.is_attached(component)
                    && self
                        .tree
                        .component(component)
                        .is_some_and(|c| c.reorder_enabled)
            }
            DragHandle::Source(source) => self.drag_sources.contains_key(&source),
        }
    }

    pub(crate) fn handle_drag_event(&mut self, event: DragEvent<DragHandle>) {
        match event {
            DragEvent::DragStart { target, pos, .. } => match self.start_drag(target, pos) {
                Ok(()) => self.drag_to(pos),
                Err(err) => {
                    log::warn!("could not start dragging {target:?}: {err}");
                    self.listener.cancel();
                }
            },
            DragEvent::Drag { pos, .. } => self.drag_to(pos),
            DragEvent::DragStop { pos, .. } => {
                self.drag_to(pos);
                self.finish_drag(false);
            }
            DragEvent::Cancelled { .. } => self.finish_drag(true),
        }
    }

    fn start_drag(&mut self, handle: DragHandle, pos: Pos2) -> Result<(), LayoutError> {
        let (item, origin) = match handle {
            DragHandle::Tab(component) => {
                let Some(location) = self.tree.detach(component, true) else {
                    return Err(LayoutError::invalid_state(format!("{component} is not attached")));
                };
                // The source tab stays until the drag ends, then goes unless the
                // component came back to the same stack.
                let origin_stack = location.parent;
                self.deferred.push(Box::new(move |manager, cancelled| {
                    if manager.tree.parent_of(component) != Some(origin_stack) {
                        if let Some(stack) = manager.tree.stack_mut(origin_stack) {
                            stack.tabs.remove_tab(component);
                        }
                    } else {
                        log::trace!("{component} returned to {origin_stack} (cancelled={cancelled})");
                    }
                    Ok(())
                }));
                if let Some(active) = self.tree.stack(origin_stack).and_then(|s| s.active) {
                    self.emit(LayoutEvent::ActiveComponentChanged {
                        stack: origin_stack,
                        component: active,
                    });
                }
                (component, DragOrigin::Tab(location))
            }
            DragHandle::Source(source) => {
                let Some(make_config) = self.drag_sources.get_mut(&source) else {
                    return Err(LayoutError::invalid_state(format!("{source:?} was removed")));
                };
                let config = make_config();
                let item = self.build_detached_component(&config)?;
                (item, DragOrigin::Source(source))
            }
        };

        self.relayout();
        let areas = self.tree.calculate_item_areas();
        self.drag.begin(item, origin, areas, pos);
        self.emit(LayoutEvent::DragStarted(item));
        Ok(())
    }

    /// Build and bind a component that is not attached anywhere yet.
    fn build_detached_component(&mut self, config: &ItemConfig) -> Result<ItemId, LayoutError> {
        if config.item_type != ItemType::Component {
            return Err(ConfigError::UnexpectedItem(config.item_type.name()).into());
        }
        validate_config(config, ItemType::Stack)?;
        self.registry
            .check_all(config.component_type.as_ref())?;
        let item = self.tree.build_item(config, ItemType::Stack)?;
        self.bind_subtree(item);
        Ok(item)
    }

    fn drag_to(&mut self, pos: Pos2) {
        let pos = constrain_to_container(
            pos,
            self.container_rect,
            self.config.settings.constrain_drag_to_container,
        );
        if let Some(change) = self.drag.hover(&self.tree, pos, &self.metrics) {
            self.emit(LayoutEvent::DropIndicatorChanged(change));
        }
    }

    /// End the drag: drop, pop out or restore, then replay what was deferred.
    pub(crate) fn finish_drag(&mut self, cancelled: bool) {
        let Some(active) = self.drag.end(!cancelled) else {
            return;
        };
        let item = active.item;

        let outcome = if cancelled {
            ReleaseOutcome::Restore
        } else {
            release_outcome(active.indicator, self.config.settings.popout_on_drop)
        };
        let committed = match outcome {
            ReleaseOutcome::Drop(plan) => match self.tree.apply_drop(item, &plan) {
                Ok(stack) => {
                    self.emit(LayoutEvent::ActiveComponentChanged {
                        stack,
                        component: item,
                    });
                    true
                }
                Err(err) => {
                    log::warn!("drop of {item} failed, restoring it: {err}");
                    false
                }
            },
            ReleaseOutcome::Popout => {
                let origin = match active.origin {
                    DragOrigin::Tab(location) => Some(location),
                    DragOrigin::Source(_) | DragOrigin::OtherWindow => None,
                };
                match self.pop_out_detached(item, origin, active.last_pos) {
                    Ok(opened) => opened.is_some(),
                    Err(err) => {
                        log::warn!("could not pop out {item}, restoring it: {err}");
                        false
                    }
                }
            }
            ReleaseOutcome::Restore => false,
        };
        if !committed {
            self.restore_dragged(item, active.origin);
        }

        if active.indicator.is_some() {
            self.emit(LayoutEvent::DropIndicatorChanged(None));
        }
        self.emit(LayoutEvent::DragStopped { item, committed });
        self.replay_deferred(cancelled);
        self.settle();
        self.check_integrity("drag");
    }

    /// Put a dragged item back where it came from, or drop it if it never had a place.
    fn restore_dragged(&mut self, item: ItemId, origin: DragOrigin) {
        if !self.tree.contains(item) || self.tree.parent_of(item).is_some() {
            return;
        }
        match origin {
            DragOrigin::Tab(location)
                if self.tree.stack(location.parent).is_some()
                    && self.tree.is_attached(location.parent) =>
            {
                self.tree.attach(location.parent, item, Some(location.index));
                self.activate(item);
            }
            DragOrigin::Tab(location) => {
                log::warn!("origin {} of {item} is gone, discarding it", location.parent);
                self.remove_and_discard(item);
            }
            DragOrigin::Source(_) | DragOrigin::OtherWindow => self.remove_and_discard(item),
        }
    }

    // ------------------------------------------------------------------------------------
    // Cross-window drags

    /// What the current drag carries to other windows.
    pub fn drag_payload(&self) -> Option<DragPayload> {
        let item = self.drag.active()?.item;
        Some(DragPayload {
            source_window: self.options.window_id.clone(),
            config: self.tree.to_config(item)?,
        })
    }

    /// A native drag entered this window or one of its elements.
    ///
    /// Returns `true` only when it crossed into the window.
    pub fn native_drag_enter(&mut self) -> bool {
        let entered = self.window_drag.enter();
        if entered && self.is_initialised() {
            self.relayout();
        }
        entered
    }

    /// A native drag left this window or one of its elements.
    ///
    /// Returns `true` only when it really left the window.
    pub fn native_drag_leave(&mut self) -> bool {
        let left = self.window_drag.leave();
        if left {
            if let Some(active) = self.drag.active_mut() {
                if active.indicator.take().is_some() {
                    self.emit(LayoutEvent::DropIndicatorChanged(None));
                }
            }
        }
        left
    }

    /// Where a native drag hovering at `pos` would land in this layout.
    pub fn native_drag_over(&self, pos: Pos2) -> Option<DropIndicator> {
        if !self.is_initialised() {
            return None;
        }
        let areas = self.tree.calculate_item_areas();
        get_area(&areas, pos).map(|area| self.tree.drop_indicator(area, pos, &self.metrics))
    }

    /// Drop a drag from another window at `pos`.
    ///
    /// Returns the new component, or `None` if nothing accepts a drop there (the source
    /// then keeps its item).
    pub fn native_drop(
        &mut self,
        payload: &DragPayload,
        pos: Pos2,
    ) -> Result<Option<ItemId>, LayoutError> {
        self.ensure_live("native_drop")?;
        self.window_drag.reset();
        if payload.source_window == self.options.window_id && self.drag.is_active() {
            // Our own drag; the pointer release handles it.
            return Ok(None);
        }
        let Some(indicator) = self.native_drag_over(pos) else {
            return Ok(None);
        };

        let item = self.build_detached_component(&payload.config)?;
        match self.tree.apply_drop(item, &indicator.plan) {
            Ok(_) => {
                log::debug!("dropped {item} from window {}", payload.source_window);
                self.settle();
                self.check_integrity("native drop");
                Ok(Some(item))
            }
            Err(err) => {
                self.remove_and_discard(item);
                Err(err)
            }
        }
    }

    /// The current drag was dropped into another window: its item now lives there.
    pub fn dropped_in_other_window(&mut self) {
        self.listener.cancel();
        let Some(active) = self.drag.end(true) else {
            return;
        };
        let item = active.item;
        self.remove_and_discard(item);
        if active.indicator.is_some() {
            self.emit(LayoutEvent::DropIndicatorChanged(None));
        }
        self.emit(LayoutEvent::DragStopped {
            item,
            committed: true,
        });
        self.replay_deferred(false);
        self.settle();
        self.check_integrity("drop in other window");
    }
}
