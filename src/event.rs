use std::collections::VecDeque;

use egui::Rect;

use crate::popout::PopoutId;
use crate::tree::ItemId;

/// Something the host may want to react to, drained with
/// [`crate::LayoutManager::take_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutEvent {
    Initialised,
    Destroyed,

    /// The tree changed shape; the host should re-render.
    StateChanged,

    ItemCreated(ItemId),
    ItemDestroyed(ItemId),

    ActiveComponentChanged {
        stack: ItemId,
        component: ItemId,
    },
    Focus(ItemId),
    Blur(ItemId),

    StackMaximised(ItemId),
    StackMinimised(ItemId),

    TabDropdownToggled {
        stack: ItemId,
        dropdown_active: bool,
    },

    DragStarted(ItemId),
    DragStopped {
        item: ItemId,
        committed: bool,
    },

    /// The drop indicator moved, or disappeared (`None`).
    DropIndicatorChanged(Option<Rect>),

    PopoutOpened(PopoutId),
    PopoutClosed(PopoutId),
}

/// Bounded queue: once full, the oldest events are dropped.
#[derive(Clone, Debug)]
pub(crate) struct EventQueue {
    events: VecDeque<LayoutEvent>,
    capacity: usize,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.clamp(1, 100_000),
        }
    }

    pub(crate) fn push(&mut self, event: LayoutEvent) {
        while self.events.len() >= self.capacity {
            if let Some(dropped) = self.events.pop_front() {
                log::trace!("event queue full, dropping {dropped:?}");
            }
        }
        self.events.push_back(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<LayoutEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_events_are_dropped_when_full() {
        let mut queue = EventQueue::new(2);
        queue.push(LayoutEvent::Initialised);
        queue.push(LayoutEvent::StateChanged);
        queue.push(LayoutEvent::Destroyed);
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(),
            vec![LayoutEvent::StateChanged, LayoutEvent::Destroyed]
        );
        assert_eq!(queue.len(), 0);
    }
}
