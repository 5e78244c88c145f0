use egui::{Pos2, Rect};

use crate::tree::{Area, DropIndicator, ItemId, ItemLocation, LayoutTree, Metrics, get_area};

/// Where a dragged item came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOrigin {
    /// A tab of this layout. The item is restored to `location` if the drop fails.
    Tab(ItemLocation),

    /// An external drag source; the item was created for the drag.
    Source(super::DragSourceId),

    /// Another window; the item was built from a [`super::DragPayload`].
    OtherWindow,
}

#[derive(Debug)]
pub(crate) struct ActiveDrag {
    pub(crate) id: u64,

    /// The detached component being dragged.
    pub(crate) item: ItemId,
    pub(crate) origin: DragOrigin,

    /// Drop areas of the tree as it was when the drag started.
    pub(crate) areas: Vec<Area>,
    pub(crate) indicator: Option<DropIndicator>,
    pub(crate) last_pos: Pos2,
}

/// At most one drag at a time, each with its own id.
#[derive(Debug, Default)]
pub(crate) struct DragSession {
    next_id: u64,
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub(crate) fn begin(
        &mut self,
        item: ItemId,
        origin: DragOrigin,
        areas: Vec<Area>,
        pos: Pos2,
    ) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id.saturating_add(1);
        if let Some(previous) = self.active.take() {
            log::warn!(
                "drag session {} replaced before it ended (item {})",
                previous.id,
                previous.item
            );
        }
        log::debug!(
            "drag session START id={id} item={item} origin={origin:?} areas={}",
            areas.len()
        );
        self.active = Some(ActiveDrag {
            id,
            item,
            origin,
            areas,
            indicator: None,
            last_pos: pos,
        });
        id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn active(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut ActiveDrag> {
        self.active.as_mut()
    }

    /// Hit-test `pos` and update the indicator.
    ///
    /// Returns the new indicator rectangle if it changed.
    pub(crate) fn hover(
        &mut self,
        tree: &LayoutTree,
        pos: Pos2,
        metrics: &Metrics,
    ) -> Option<Option<Rect>> {
        let active = self.active.as_mut()?;
        active.last_pos = pos;
        let indicator = get_area(&active.areas, pos).map(|area| tree.drop_indicator(area, pos, metrics));
        if indicator == active.indicator {
            return None;
        }
        active.indicator = indicator;
        Some(indicator.map(|i| i.rect))
    }

    /// Recompute the areas after the tree changed under an ongoing drag.
    pub(crate) fn refresh_areas(&mut self, tree: &LayoutTree) {
        if let Some(active) = &mut self.active {
            active.areas = tree.calculate_item_areas();
            active.indicator = None;
        }
    }

    /// End the session. Returns the drag exactly once.
    pub(crate) fn end(&mut self, committed: bool) -> Option<ActiveDrag> {
        let ended = self.active.take()?;
        log::debug!(
            "drag session END id={} item={} committed={committed}",
            ended.id,
            ended.item
        );
        Some(ended)
    }
}
