use super::LayoutManager;
use crate::config::ItemType;
use crate::tree::{ItemId, ItemLocation};

/// A rule for finding where a new item goes.
///
/// The `Option<usize>` is an index in the found parent (`None` appends), except for
/// [`Self::FocusedItem`] where it is an offset from the focused component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationSelector {
    /// The stack of the focused component, relative to the focused component.
    FocusedItem(Option<usize>),

    /// The stack of the focused component.
    FocusedStack(Option<usize>),

    FirstStack(Option<usize>),

    /// The first row, or the first column if there is no row.
    FirstRowOrColumn(Option<usize>),

    FirstRow(Option<usize>),
    FirstColumn(Option<usize>),

    /// The ground, if the layout is empty.
    Empty,

    /// The ground if the layout is empty, otherwise the root.
    Root(Option<usize>),
}

/// Always finds a location.
pub const DEFAULT_LOCATION_SELECTORS: &[LocationSelector] = &[
    LocationSelector::FocusedStack(None),
    LocationSelector::FirstStack(None),
    LocationSelector::FirstRowOrColumn(None),
    LocationSelector::Root(None),
];

/// Right after the focused component if there is one, otherwise as the default.
pub const AFTER_FOCUSED_ITEM_IF_POSSIBLE: &[LocationSelector] = &[
    LocationSelector::FocusedItem(Some(1)),
    LocationSelector::FirstStack(None),
    LocationSelector::FirstRowOrColumn(None),
    LocationSelector::Root(None),
];

impl LayoutManager {
    /// The first selector that resolves in the current tree.
    pub fn find_location(&self, selectors: &[LocationSelector]) -> Option<ItemLocation> {
        selectors
            .iter()
            .find_map(|&selector| self.resolve_location(selector))
    }

    fn resolve_location(&self, selector: LocationSelector) -> Option<ItemLocation> {
        let tree = &self.tree;
        match selector {
            LocationSelector::FocusedItem(offset) => {
                let focused = self.focused?;
                let stack = tree.parent_of(focused)?;
                let count = tree.children(stack).len();
                let index = match offset {
                    None => count,
                    Some(offset) => tree.index_in_parent(focused)? + offset,
                };
                (index <= count).then_some(ItemLocation {
                    parent: stack,
                    index,
                })
            }
            LocationSelector::FocusedStack(index) => {
                let stack = tree.parent_of(self.focused?)?;
                self.location_in(stack, index)
            }
            LocationSelector::FirstStack(index) => {
                self.location_in(tree.first_of_type(ItemType::Stack)?, index)
            }
            LocationSelector::FirstRowOrColumn(index) => {
                let container = tree
                    .first_of_type(ItemType::Row)
                    .or_else(|| tree.first_of_type(ItemType::Column))?;
                self.location_in(container, index)
            }
            LocationSelector::FirstRow(index) => {
                self.location_in(tree.first_of_type(ItemType::Row)?, index)
            }
            LocationSelector::FirstColumn(index) => {
                self.location_in(tree.first_of_type(ItemType::Column)?, index)
            }
            LocationSelector::Empty => tree.is_empty().then(|| ItemLocation {
                parent: tree.ground(),
                index: 0,
            }),
            LocationSelector::Root(index) => match tree.root() {
                None => Some(ItemLocation {
                    parent: tree.ground(),
                    index: 0,
                }),
                Some(root) => self.location_in(root, index),
            },
        }
    }

    fn location_in(&self, parent: ItemId, index: Option<usize>) -> Option<ItemLocation> {
        let count = self.tree.children(parent).len();
        let index = index.unwrap_or(count);
        (index <= count).then_some(ItemLocation { parent, index })
    }
}
