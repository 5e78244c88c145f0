use egui::{Pos2, Rect};

use crate::tree::{DropIndicator, DropPlan};

/// What releasing a drag does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReleaseOutcome {
    Drop(DropPlan),

    /// Nothing under the pointer, and dropping outside opens a popout.
    Popout,

    /// Put the item back where it came from (a no-op move).
    Restore,
}

/// A small, testable policy helper: what does a release with this indicator do?
pub(crate) fn release_outcome(
    indicator: Option<DropIndicator>,
    popout_on_drop: bool,
) -> ReleaseOutcome {
    match indicator {
        Some(indicator) => ReleaseOutcome::Drop(indicator.plan),
        None if popout_on_drop => ReleaseOutcome::Popout,
        None => ReleaseOutcome::Restore,
    }
}

/// Keep the pointer inside `container` when dragging is constrained to it.
pub(crate) fn constrain_to_container(pos: Pos2, container: Rect, constrain: bool) -> Pos2 {
    if constrain && container.is_positive() {
        container.clamp(pos)
    } else {
        pos
    }
}

#[cfg(test)]
mod tests {
    use egui::pos2;

    use super::*;
    use crate::tree::ItemId;

    #[test]
    fn indicator_wins_over_popout() {
        let indicator = DropIndicator {
            rect: Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            plan: DropPlan::AddTab {
                stack: ItemId::from_u64(1),
                index: 0,
            },
        };
        assert!(matches!(
            release_outcome(Some(indicator), true),
            ReleaseOutcome::Drop(DropPlan::AddTab { .. })
        ));
        assert_eq!(release_outcome(None, true), ReleaseOutcome::Popout);
        assert_eq!(release_outcome(None, false), ReleaseOutcome::Restore);
    }

    #[test]
    fn constrained_pointer_is_clamped() {
        let container = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 50.0));
        assert_eq!(
            constrain_to_container(pos2(150.0, -5.0), container, true),
            pos2(100.0, 0.0)
        );
        assert_eq!(
            constrain_to_container(pos2(150.0, -5.0), container, false),
            pos2(150.0, -5.0)
        );
    }
}
