use std::time::{Duration, Instant};

use egui::{Pos2, Vec2};

use crate::timer::SingleShotTimer;

/// Pointer travel (on either axis) that turns a press into a drag.
pub const DEFAULT_DRAG_DISTANCE: f32 = 10.0;

/// Holding the pointer down this long starts a drag without moving.
pub const DEFAULT_DRAG_HOLD_DELAY: Duration = Duration::from_millis(1800);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Idle,

    /// The pointer is down over a draggable target but has not moved far enough yet.
    Tracking,

    Dragging,
}

/// What a [`DragListener`] reports back to its owner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragEvent<T> {
    /// A press became a drag. `origin` is where the pointer went down.
    DragStart { target: T, origin: Pos2, pos: Pos2 },

    /// The pointer moved during a drag. `offset` is relative to the origin.
    Drag { target: T, pos: Pos2, offset: Vec2 },

    /// The pointer was released during a drag.
    DragStop { target: T, pos: Pos2 },

    /// The drag was cancelled before the pointer was released.
    Cancelled { target: T },
}

#[derive(Clone, Copy, Debug)]
struct Press<T> {
    target: T,
    origin: Pos2,
    last: Pos2,
}

/// Classifies press/move/release sequences into drags.
///
/// `Idle -> Tracking` on a press over a target. `Tracking -> Dragging` once the pointer
/// travels more than the distance threshold on either axis, or the hold delay elapses
/// ([`Self::poll`]). Releasing while tracking is a click and goes back to `Idle`.
#[derive(Clone, Debug)]
pub struct DragListener<T> {
    pub distance: f32,
    pub hold_delay: Duration,

    state: ListenerState,
    press: Option<Press<T>>,
    hold_timer: SingleShotTimer,
}

impl<T> Default for DragListener<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_DISTANCE, DEFAULT_DRAG_HOLD_DELAY)
    }
}

impl<T: Copy + std::fmt::Debug> DragListener<T> {
    pub fn target(&self) -> Option<T> {
        self.press.map(|p| p.target)
    }

    pub fn is_dragging(&self) -> bool {
        self.state == ListenerState::Dragging
    }

    /// Start tracking a press. Ignored when `target` is `None` (not draggable) or a
    /// press is already being tracked.
    pub fn pointer_down(&mut self, target: Option<T>, pos: Pos2, now: Instant) -> bool {
        let Some(target) = target else {
            return false;
        };
        if self.state != ListenerState::Idle {
            return false;
        }
        self.press = Some(Press {
            target,
            origin: pos,
            last: pos,
        });
        self.state = ListenerState::Tracking;
        self.hold_timer.schedule(now, self.hold_delay);
        log::trace!("drag listener tracking {target:?} at {pos:?}");
        true
    }

    /// Feed a pointer move.
    ///
    /// Crossing the threshold yields [`DragEvent::DragStart`]; the owner should treat
    /// `pos` of that event as the first drag position too.
    pub fn pointer_move(&mut self, pos: Pos2) -> Option<DragEvent<T>> {
        let press = self.press.as_mut()?;
        press.last = pos;
        let press = *press;
        let offset = pos - press.origin;

        match self.state {
            ListenerState::Idle => None,
            ListenerState::Tracking => {
                if offset.x.abs() > self.distance || offset.y.abs() > self.distance {
                    Some(self.start_drag(press))
                } else {
                    None
                }
            }
            ListenerState::Dragging => Some(DragEvent::Drag {
                target: press.target,
                pos,
                offset,
            }),
        }
    }

    /// Fire the hold delay if it has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<DragEvent<T>> {
        if self.state != ListenerState::Tracking || !self.hold_timer.poll(now) {
            return None;
        }
        let press = self.press?;
        Some(self.start_drag(press))
    }

    pub fn pointer_up(&mut self, pos: Pos2) -> Option<DragEvent<T>> {
        self.hold_timer.cancel();
        let press = self.press.take()?;
        let was = std::mem::replace(&mut self.state, ListenerState::Idle);
        (was == ListenerState::Dragging).then_some(DragEvent::DragStop {
            target: press.target,
            pos,
        })
    }

    pub fn cancel(&mut self) -> Option<DragEvent<T>> {
        self.hold_timer.cancel();
        let press = self.press.take()?;
        let was = std::mem::replace(&mut self.state, ListenerState::Idle);
        (was == ListenerState::Dragging).then_some(DragEvent::Cancelled {
            target: press.target,
        })
    }

    /// When the hold delay fires next, if a press is being tracked.
    pub fn hold_deadline(&self) -> Option<Instant> {
        self.hold_timer.deadline()
    }

    fn start_drag(&mut self, press: Press<T>) -> DragEvent<T> {
        self.hold_timer.cancel();
        self.state = ListenerState::Dragging;
        log::trace!("drag listener started dragging {:?}", press.target);
        DragEvent::DragStart {
            target: press.target,
            origin: press.origin,
            pos: press.last,
        }
    }
}

impl<T> DragListener<T> {
    pub fn new(distance: f32, hold_delay: Duration) -> Self {
        Self {
            distance,
            hold_delay,
            state: ListenerState::Idle,
            press: None,
            hold_timer: SingleShotTimer::default(),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }
}

/// The draggable element a press lands on.
///
/// `path` runs from the innermost element outwards, each with its drag marker:
/// `Some(true)` is draggable, `Some(false)` opts out (and stops the search), `None`
/// defers to the parent.
pub fn nearest_draggable<T>(path: impl IntoIterator<Item = (T, Option<bool>)>) -> Option<T> {
    for (element, marker) in path {
        match marker {
            Some(true) => return Some(element),
            Some(false) => return None,
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use egui::pos2;

    use super::*;

    fn listener() -> DragListener<u32> {
        DragListener::new(10.0, Duration::from_millis(1800))
    }

    #[test]
    fn small_moves_stay_a_click() {
        let now = Instant::now();
        let mut l = listener();
        assert!(l.pointer_down(Some(1), pos2(100.0, 100.0), now));
        assert_eq!(l.pointer_move(pos2(110.0, 90.0)), None);
        assert_eq!(l.state(), ListenerState::Tracking);
        assert_eq!(l.pointer_up(pos2(110.0, 90.0)), None);
        assert_eq!(l.state(), ListenerState::Idle);
        assert_eq!(l.hold_deadline(), None);
    }

    #[test]
    fn crossing_the_distance_starts_a_drag() {
        let now = Instant::now();
        let mut l = listener();
        l.pointer_down(Some(1), pos2(0.0, 0.0), now);
        assert_eq!(
            l.pointer_move(pos2(0.0, 11.0)),
            Some(DragEvent::DragStart {
                target: 1,
                origin: pos2(0.0, 0.0),
                pos: pos2(0.0, 11.0)
            })
        );
        assert_eq!(
            l.pointer_move(pos2(5.0, 20.0)),
            Some(DragEvent::Drag {
                target: 1,
                pos: pos2(5.0, 20.0),
                offset: egui::vec2(5.0, 20.0)
            })
        );
        assert_eq!(
            l.pointer_up(pos2(5.0, 20.0)),
            Some(DragEvent::DragStop {
                target: 1,
                pos: pos2(5.0, 20.0)
            })
        );
        assert!(!l.is_dragging());
    }

    #[test]
    fn holding_still_starts_a_drag_after_the_delay() {
        let now = Instant::now();
        let mut l = listener();
        l.pointer_down(Some(7), pos2(3.0, 4.0), now);
        assert_eq!(l.poll(now + Duration::from_millis(1000)), None);
        assert!(matches!(
            l.poll(now + Duration::from_millis(1800)),
            Some(DragEvent::DragStart { target: 7, .. })
        ));
        assert!(l.is_dragging());
        assert_eq!(l.poll(now + Duration::from_millis(5000)), None);
    }

    #[test]
    fn press_without_target_is_ignored() {
        let mut l = listener();
        assert!(!l.pointer_down(None, pos2(0.0, 0.0), Instant::now()));
        assert_eq!(l.state(), ListenerState::Idle);
    }

    #[test]
    fn cancel_reports_only_real_drags() {
        let now = Instant::now();
        let mut l = listener();
        l.pointer_down(Some(1), pos2(0.0, 0.0), now);
        assert_eq!(l.cancel(), None);

        l.pointer_down(Some(2), pos2(0.0, 0.0), now);
        l.pointer_move(pos2(50.0, 0.0));
        assert_eq!(l.cancel(), Some(DragEvent::Cancelled { target: 2 }));
        assert_eq!(l.state(), ListenerState::Idle);
    }

    #[test]
    fn nearest_marker_decides() {
        assert_eq!(nearest_draggable([(1, None), (2, Some(true))]), Some(2));
        assert_eq!(nearest_draggable([(1, Some(false)), (2, Some(true))]), None);
        assert_eq!(nearest_draggable::<u8>([]), None);
    }
}
