//! Top-down geometry: every item gets a rectangle from its parent.

use egui::{Rect, pos2, vec2};

use super::{Axis, ItemId, ItemKind, LayoutTree};
use crate::config::{Dimensions, HeaderShow, LayoutConfig, Settings, Side};
use crate::error::LayoutError;
use crate::size::{SizeUnit, SizeWithUnit, distribute_with_min};

/// The pixel dimensions layout works with, resolved from a [`LayoutConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    pub border_width: f32,
    pub header_height: f32,
    pub header: HeaderShow,
    pub min_item_width: f32,
    pub min_item_height: f32,
    pub tab_control_offset: f32,
}

impl Default for Metrics {
    fn default() -> Self {
        let dimensions = Dimensions::default();
        Self {
            border_width: dimensions.border_width,
            header_height: dimensions.header_height,
            header: HeaderShow::default(),
            min_item_width: 10.0,
            min_item_height: 0.0,
            tab_control_offset: Settings::default().tab_control_offset,
        }
    }
}

impl Metrics {
    pub fn from_config(config: &LayoutConfig) -> Result<Self, LayoutError> {
        let dimensions = &config.dimensions;
        let min_width = SizeWithUnit::parse(&dimensions.default_min_item_width, SizeUnit::MIN_SIZE)?;
        let min_height =
            SizeWithUnit::parse(&dimensions.default_min_item_height, SizeUnit::MIN_SIZE)?;
        Ok(Self {
            border_width: dimensions.border_width.max(0.0),
            header_height: dimensions.header_height.max(0.0),
            header: config.header.show,
            min_item_width: min_width.size,
            min_item_height: min_height.size,
            tab_control_offset: config.settings.tab_control_offset,
        })
    }

    fn default_min(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.min_item_width,
            Axis::Vertical => self.min_item_height,
        }
    }
}

/// Split `rect` into a header band on `side` and the remaining content.
pub(crate) fn split_header(rect: Rect, show: HeaderShow, header_height: f32) -> (Option<Rect>, Rect) {
    let HeaderShow::Side(side) = show else {
        return (None, rect);
    };
    let h = match side {
        Side::Top | Side::Bottom => header_height.min(rect.height()),
        Side::Left | Side::Right => header_height.min(rect.width()),
    };
    let (header, content) = match side {
        Side::Top => (
            Rect::from_min_max(rect.min, pos2(rect.max.x, rect.min.y + h)),
            Rect::from_min_max(pos2(rect.min.x, rect.min.y + h), rect.max),
        ),
        Side::Bottom => (
            Rect::from_min_max(pos2(rect.min.x, rect.max.y - h), rect.max),
            Rect::from_min_max(rect.min, pos2(rect.max.x, rect.max.y - h)),
        ),
        Side::Left => (
            Rect::from_min_max(rect.min, pos2(rect.min.x + h, rect.max.y)),
            Rect::from_min_max(pos2(rect.min.x + h, rect.min.y), rect.max),
        ),
        Side::Right => (
            Rect::from_min_max(pos2(rect.max.x - h, rect.min.y), rect.max),
            Rect::from_min_max(rect.min, pos2(rect.max.x - h, rect.max.y)),
        ),
    };
    (Some(header), content)
}

impl LayoutTree {
    /// Lay the whole tree out in `rect`.
    ///
    /// A maximised stack is laid out twice: once in its normal slot, then over the
    /// whole of `rect`.
    pub fn set_size(&mut self, rect: Rect, metrics: &Metrics) {
        let ground = self.ground();
        self.layout_item(ground, rect, metrics);
        if let Some(maximised) = self.maximised_stack() {
            self.layout_item(maximised, rect, metrics);
        }
    }

    /// Lay out `id` and its subtree in `rect`.
    pub(crate) fn layout_item(&mut self, id: ItemId, rect: Rect, metrics: &Metrics) {
        self.set_rect(id, rect);
        let Some(item) = self.get(id) else {
            return;
        };
        match &item.kind {
            ItemKind::Ground { children } => {
                for child in children.clone() {
                    self.layout_item(child, rect, metrics);
                }
            }
            ItemKind::Row { .. } | ItemKind::Column { .. } => {
                let Some(axis) = item.kind.axis() else {
                    return;
                };
                let children = item.children().to_vec();
                let extents = self.child_extents(id, axis, rect, metrics);
                let mut cursor = match axis {
                    Axis::Horizontal => rect.min.x,
                    Axis::Vertical => rect.min.y,
                };
                for (child, extent) in children.into_iter().zip(extents) {
                    let child_rect = match axis {
                        Axis::Horizontal => Rect::from_min_size(
                            pos2(cursor, rect.min.y),
                            vec2(extent, rect.height()),
                        ),
                        Axis::Vertical => Rect::from_min_size(
                            pos2(rect.min.x, cursor),
                            vec2(rect.width(), extent),
                        ),
                    };
                    cursor += extent + metrics.border_width;
                    self.layout_item(child, child_rect, metrics);
                }
            }
            ItemKind::Stack(stack) => {
                let show = stack.header.unwrap_or(metrics.header);
                let children = stack.children.clone();
                let (header_rect, content_rect) = split_header(rect, show, metrics.header_height);
                if let Some(stack) = self.stack_mut(id) {
                    stack.header_rect = header_rect;
                    stack.content_rect = content_rect;
                }
                for child in children {
                    self.set_rect(child, content_rect);
                }
            }
            ItemKind::Component(_) => {}
        }
    }

    /// Pixel extents of a row or column's children along `axis`, splitters excluded.
    fn child_extents(&self, id: ItemId, axis: Axis, rect: Rect, metrics: &Metrics) -> Vec<f32> {
        let children = self.children(id);
        let borders = metrics.border_width * children.len().saturating_sub(1) as f32;
        let available = (axis.extent(rect) - borders).max(0.0);
        let sizes: Vec<SizeWithUnit> = children
            .iter()
            .map(|&c| self.get(c).map_or(SizeWithUnit::DEFAULT, |item| item.size))
            .collect();
        let floors: Vec<f32> = children
            .iter()
            .map(|&c| self.min_extent(c, axis, metrics))
            .collect();
        distribute_with_min(&sizes, &floors, available)
    }

    /// Minimum pixel extent of `id` along its parent's axis.
    pub(crate) fn min_extent(&self, id: ItemId, axis: Axis, metrics: &Metrics) -> f32 {
        self.get(id)
            .and_then(|item| item.min_size)
            .map_or(metrics.default_min(axis), |min| min.size)
    }

    /// The header side a stack currently uses.
    pub fn stack_header_show(&self, stack: ItemId, metrics: &Metrics) -> HeaderShow {
        self.stack(stack)
            .and_then(|s| s.header)
            .unwrap_or(metrics.header)
    }

    /// Length of a stack's tab strip, leaving room for the header controls.
    pub fn available_tab_strip(&self, stack: ItemId, metrics: &Metrics) -> f32 {
        let Some(header) = self.stack(stack).and_then(|s| s.header_rect) else {
            return 0.0;
        };
        let length = match self.stack_header_show(stack, metrics) {
            HeaderShow::Side(Side::Left | Side::Right) => header.height(),
            _ => header.width(),
        };
        (length - metrics.tab_control_offset).max(0.0)
    }

    /// The grab rectangles between the children of a row or column.
    pub fn splitter_rects(&self, container: ItemId, grab_width: f32) -> Vec<Rect> {
        let Some(axis) = self.get(container).and_then(|item| item.kind.axis()) else {
            return Vec::new();
        };
        let children = self.children(container);
        children
            .windows(2)
            .filter_map(|pair| {
                let before = self.get(pair[0])?.rect();
                let after = self.get(pair[1])?.rect();
                Some(match axis {
                    Axis::Horizontal => {
                        let mid = (before.max.x + after.min.x) * 0.5;
                        Rect::from_min_max(
                            pos2(mid - grab_width * 0.5, before.min.y),
                            pos2(mid + grab_width * 0.5, before.max.y),
                        )
                    }
                    Axis::Vertical => {
                        let mid = (before.max.y + after.min.y) * 0.5;
                        Rect::from_min_max(
                            pos2(before.min.x, mid - grab_width * 0.5),
                            pos2(before.max.x, mid + grab_width * 0.5),
                        )
                    }
                })
            })
            .collect()
    }

    /// Move the splitter after child `splitter_index` of a row or column by `delta`
    /// pixels, clamped so neither neighbour drops below its minimum size.
    ///
    /// Both neighbours keep their units; only their magnitudes change.
    pub fn drag_splitter(
        &mut self,
        container: ItemId,
        splitter_index: usize,
        delta: f32,
        metrics: &Metrics,
    ) -> Result<(), LayoutError> {
        let Some(axis) = self.get(container).and_then(|item| item.kind.axis()) else {
            return Err(LayoutError::invalid_state(format!(
                "{container} is not a row or column"
            )));
        };
        let children = self.children(container);
        let (Some(&a), Some(&b)) = (
            children.get(splitter_index),
            children.get(splitter_index + 1),
        ) else {
            return Err(LayoutError::invalid_state(format!(
                "{container} has no splitter {splitter_index}"
            )));
        };

        let extent_of = |id: ItemId| self.get(id).map_or(0.0, |item| axis.extent(item.rect()));
        let (old_a, old_b) = (extent_of(a), extent_of(b));
        let pair = old_a + old_b;
        let (min_a, min_b) = (
            self.min_extent(a, axis, metrics),
            self.min_extent(b, axis, metrics),
        );
        if min_a + min_b > pair {
            return Ok(());
        }
        let new_a = (old_a + delta).clamp(min_a, pair - min_b);
        let new_b = pair - new_a;

        let (Some(size_a), Some(size_b)) = (
            self.get(a).map(|item| item.size),
            self.get(b).map(|item| item.size),
        ) else {
            return Ok(());
        };
        let (size_a, size_b) = resize_pair(size_a, size_b, (old_a, old_b), (new_a, new_b));
        if let Some(item) = self.get_mut(a) {
            item.size = size_a;
        }
        if let Some(item) = self.get_mut(b) {
            item.size = size_b;
        }

        if let Some(rect) = self.get(container).map(|item| item.rect()) {
            self.layout_item(container, rect, metrics);
        }
        Ok(())
    }
}

/// New sizes for two neighbours whose pixel extents go from `old` to `new`.
fn resize_pair(
    a: SizeWithUnit,
    b: SizeWithUnit,
    old: (f32, f32),
    new: (f32, f32),
) -> (SizeWithUnit, SizeWithUnit) {
    if a.unit == b.unit && a.unit != SizeUnit::Pixel {
        // The pair keeps its combined share and splits it anew.
        let combined = a.size + b.size;
        let total = new.0 + new.1;
        if total <= 0.0 {
            return (a, b);
        }
        let a_size = combined * new.0 / total;
        return (
            SizeWithUnit::new(a_size, a.unit),
            SizeWithUnit::new(combined - a_size, a.unit),
        );
    }
    (rescale(a, old.0, new.0), rescale(b, old.1, new.1))
}

fn rescale(size: SizeWithUnit, old: f32, new: f32) -> SizeWithUnit {
    match size.unit {
        SizeUnit::Pixel => SizeWithUnit::pixels(new),
        _ if old > 0.0 => SizeWithUnit::new(size.size * new / old, size.unit),
        _ => size,
    }
}
