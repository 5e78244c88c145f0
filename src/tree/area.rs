//! Drop areas: where a dragged component can land, and what landing there does.

use egui::{Pos2, Rect, pos2};

use super::{Axis, ContentItem, ItemId, ItemKind, LayoutTree, Metrics};
use crate::config::{HeaderShow, ItemType, Side};
use crate::error::LayoutError;
use crate::size::SizeWithUnit;

/// Width of the bands along the layout's edges that wrap the whole root.
pub const GROUND_SIDE_BAND: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AreaKind {
    /// The whole layout, when it is empty.
    GroundEmpty,

    /// An edge band of the layout.
    GroundSide(Side),

    /// A stack's tab strip.
    StackHeader,

    /// The body of an empty stack.
    StackBody,

    /// One of the four segments of a non-empty stack's body.
    StackSide(Side),
}

/// A rectangle that accepts drops, and the item it belongs to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Area {
    pub rect: Rect,
    pub target: ItemId,
    pub kind: AreaKind,
}

impl Area {
    pub fn surface(&self) -> f32 {
        self.rect.width() * self.rect.height()
    }

    /// Strict containment: points on the edge belong to no area.
    pub fn contains(&self, pos: Pos2) -> bool {
        pos.x > self.rect.min.x
            && pos.x < self.rect.max.x
            && pos.y > self.rect.min.y
            && pos.y < self.rect.max.y
    }
}

/// The smallest area containing `pos`. On ties the earliest area wins, which is the
/// one higher up in the tree.
pub fn get_area(areas: &[Area], pos: Pos2) -> Option<&Area> {
    areas
        .iter()
        .filter(|area| area.contains(pos))
        .min_by(|a, b| a.surface().total_cmp(&b.surface()))
}

/// The tree mutation a drop performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropPlan {
    /// The layout is empty: the item becomes the root, in a new stack.
    SetRoot,

    /// Put the item in a new stack beside the whole root.
    WrapRoot(Side),

    /// Add the item as a tab of `stack` at `index`.
    AddTab { stack: ItemId, index: usize },

    /// Put the item in a new stack on `side` of `stack`.
    SplitStack { stack: ItemId, side: Side },
}

/// What the drop indicator shows for a hovered area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropIndicator {
    pub rect: Rect,
    pub plan: DropPlan,
}

fn side_band(rect: Rect, side: Side, size: f32) -> Rect {
    match side {
        Side::Left => Rect::from_min_max(rect.min, pos2(rect.min.x + size, rect.max.y)),
        Side::Right => Rect::from_min_max(pos2(rect.max.x - size, rect.min.y), rect.max),
        Side::Top => Rect::from_min_max(rect.min, pos2(rect.max.x, rect.min.y + size)),
        Side::Bottom => Rect::from_min_max(pos2(rect.min.x, rect.max.y - size), rect.max),
    }
}

fn half(rect: Rect, side: Side) -> Rect {
    let size = match side {
        Side::Left | Side::Right => rect.width() * 0.5,
        Side::Top | Side::Bottom => rect.height() * 0.5,
    };
    side_band(rect, side, size)
}

/// Left and right get the outer quarters; top and bottom split the centre strip.
fn stack_segment(content: Rect, side: Side) -> Rect {
    let w = content.width();
    let centre = Rect::from_min_max(
        pos2(content.min.x + w * 0.25, content.min.y),
        pos2(content.min.x + w * 0.75, content.max.y),
    );
    match side {
        Side::Left | Side::Right => side_band(content, side, w * 0.25),
        Side::Top | Side::Bottom => half(centre, side),
    }
}

const SIDES: [Side; 4] = [Side::Top, Side::Left, Side::Right, Side::Bottom];

impl LayoutTree {
    /// Every drop area of the laid-out tree, in pre-order.
    ///
    /// While a stack is maximised only that stack offers areas.
    pub fn calculate_item_areas(&self) -> Vec<Area> {
        let mut areas = Vec::new();
        let ground = self.ground();
        let ground_rect = self.get(ground).map_or(Rect::NOTHING, ContentItem::rect);

        if let Some(maximised) = self.maximised_stack() {
            self.push_stack_areas(maximised, &mut areas);
            return areas;
        }

        match self.root() {
            None => areas.push(Area {
                rect: ground_rect,
                target: ground,
                kind: AreaKind::GroundEmpty,
            }),
            Some(root) if self.item_type(root) != Some(ItemType::Stack) => {
                for side in SIDES {
                    areas.push(Area {
                        rect: side_band(ground_rect, side, GROUND_SIDE_BAND),
                        target: ground,
                        kind: AreaKind::GroundSide(side),
                    });
                }
            }
            Some(_) => {}
        }

        for id in self.dfs() {
            if self.item_type(id) == Some(ItemType::Stack) {
                self.push_stack_areas(id, &mut areas);
            }
        }
        areas
    }

    fn push_stack_areas(&self, id: ItemId, areas: &mut Vec<Area>) {
        let Some(stack) = self.stack(id) else {
            return;
        };
        if let Some(header) = stack.header_rect {
            areas.push(Area {
                rect: header,
                target: id,
                kind: AreaKind::StackHeader,
            });
        }
        if stack.children.is_empty() {
            areas.push(Area {
                rect: stack.content_rect,
                target: id,
                kind: AreaKind::StackBody,
            });
        } else {
            for side in SIDES {
                areas.push(Area {
                    rect: stack_segment(stack.content_rect, side),
                    target: id,
                    kind: AreaKind::StackSide(side),
                });
            }
        }
    }

    /// The plan and indicator rectangle for a drop on `area` with the pointer at
    /// `pointer`.
    pub fn drop_indicator(&self, area: &Area, pointer: Pos2, metrics: &Metrics) -> DropIndicator {
        match area.kind {
            AreaKind::GroundEmpty => DropIndicator {
                rect: area.rect,
                plan: DropPlan::SetRoot,
            },
            AreaKind::GroundSide(side) => {
                let ground_rect = self.get(self.ground()).map_or(area.rect, ContentItem::rect);
                DropIndicator {
                    rect: half(ground_rect, side),
                    plan: DropPlan::WrapRoot(side),
                }
            }
            AreaKind::StackBody => DropIndicator {
                rect: area.rect,
                plan: DropPlan::AddTab {
                    stack: area.target,
                    index: 0,
                },
            },
            AreaKind::StackSide(side) => {
                let content = self.stack(area.target).map_or(area.rect, |s| s.content_rect);
                DropIndicator {
                    rect: half(content, side),
                    plan: DropPlan::SplitStack {
                        stack: area.target,
                        side,
                    },
                }
            }
            AreaKind::StackHeader => self.tab_drop_indicator(area, pointer, metrics),
        }
    }

    fn tab_drop_indicator(&self, area: &Area, pointer: Pos2, metrics: &Metrics) -> DropIndicator {
        let stack_id = area.target;
        let vertical = matches!(
            self.stack_header_show(stack_id, metrics),
            HeaderShow::Side(Side::Left | Side::Right)
        );
        let header = area.rect;
        let offset = if vertical {
            pointer.y - header.min.y
        } else {
            pointer.x - header.min.x
        };

        let (index, start) = match self.stack(stack_id) {
            Some(stack) => {
                let slot = stack.tabs.insertion_index_at(offset);
                // A tab being dragged out of this stack keeps its place in the strip
                // but is no longer a child.
                let kept = stack.tabs.tabs()[..slot]
                    .iter()
                    .filter(|tab| !stack.children.contains(&tab.component))
                    .count();
                (slot - kept, stack.tabs.insertion_offset(slot))
            }
            None => (0, 0.0),
        };

        // The placeholder is as long as the header is thick.
        let thickness = metrics.header_height;
        let rect = if vertical {
            let y = (header.min.y + start).min(header.max.y);
            Rect::from_min_max(
                pos2(header.min.x, y),
                pos2(header.max.x, (y + thickness).min(header.max.y)),
            )
        } else {
            let x = (header.min.x + start).min(header.max.x);
            Rect::from_min_max(
                pos2(x, header.min.y),
                pos2((x + thickness).min(header.max.x), header.max.y),
            )
        };

        DropIndicator {
            rect,
            plan: DropPlan::AddTab {
                stack: stack_id,
                index,
            },
        }
    }

    /// Check that `plan` still fits the tree, without changing anything.
    pub(crate) fn validate_drop(&self, plan: &DropPlan) -> Result<(), LayoutError> {
        let ok = match *plan {
            DropPlan::SetRoot => self.is_empty(),
            DropPlan::WrapRoot(_) => self.root().is_some(),
            DropPlan::AddTab { stack, .. } | DropPlan::SplitStack { stack, .. } => {
                self.stack(stack).is_some() && self.is_attached(stack)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(LayoutError::invalid_state(format!(
                "drop target of {plan:?} is gone"
            )))
        }
    }

    /// Insert the detached `component` according to `plan`.
    ///
    /// Returns the stack the component ended up in.
    pub(crate) fn apply_drop(
        &mut self,
        component: ItemId,
        plan: &DropPlan,
    ) -> Result<ItemId, LayoutError> {
        self.validate_drop(plan)?;
        if self.parent_of(component).is_some() {
            return Err(LayoutError::invalid_state(format!(
                "{component} is still attached"
            )));
        }

        match *plan {
            DropPlan::SetRoot => {
                let stack = self.new_stack_with(component);
                self.attach(self.ground(), stack, None);
                Ok(stack)
            }
            DropPlan::WrapRoot(side) => {
                let ground = self.ground();
                let Some(root) = self.root() else {
                    unreachable!("validated above");
                };
                let root_size = self.get(root).map_or(SizeWithUnit::DEFAULT, |r| r.size);
                let stack = self.new_stack_with(component);
                self.detach(root, false);
                let container = self.wrap_pair(Axis::of_side(side), root, stack, side);
                if let Some(item) = self.get_mut(container) {
                    item.size = root_size;
                }
                self.attach(ground, container, None);
                Ok(stack)
            }
            DropPlan::AddTab { stack, index } => {
                self.attach(stack, component, Some(index));
                self.set_active_component(component, false);
                Ok(stack)
            }
            DropPlan::SplitStack { stack: target, side } => {
                let axis = Axis::of_side(side);
                let Some(location) = self.location_of(target) else {
                    unreachable!("validated above");
                };
                let parent_axis = self.get(location.parent).and_then(|p| p.kind.axis());
                let stack = self.new_stack_with(component);

                if parent_axis == Some(axis) {
                    // Share the target's slot in the existing row or column.
                    let mut halved = self.get(target).map_or(SizeWithUnit::DEFAULT, |t| t.size);
                    halved.size *= 0.5;
                    for id in [target, stack] {
                        if let Some(item) = self.get_mut(id) {
                            item.size = halved;
                        }
                    }
                    let index = if side.is_leading() {
                        location.index
                    } else {
                        location.index + 1
                    };
                    self.attach(location.parent, stack, Some(index));
                } else {
                    let target_size = self.get(target).map_or(SizeWithUnit::DEFAULT, |t| t.size);
                    self.detach(target, false);
                    let container = self.wrap_pair(axis, target, stack, side);
                    if let Some(item) = self.get_mut(container) {
                        item.size = target_size;
                    }
                    self.attach(location.parent, container, Some(location.index));
                }
                Ok(stack)
            }
        }
    }

    /// A new row or column holding `existing` and `new` at 50% each, `new` on `side`.
    pub(crate) fn wrap_pair(&mut self, axis: Axis, existing: ItemId, new: ItemId, side: Side) -> ItemId {
        let container = self.insert_item(ContentItem::new(ItemKind::linear(axis, Vec::new())));
        let ordered = if side.is_leading() {
            [new, existing]
        } else {
            [existing, new]
        };
        for child in ordered {
            if let Some(item) = self.get_mut(child) {
                item.size = SizeWithUnit::percent(50.0);
            }
            self.attach(container, child, None);
        }
        container
    }
}
