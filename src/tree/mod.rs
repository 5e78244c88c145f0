//! The live layout tree.
//!
//! Items live in an arena keyed by [`ItemId`]. Ownership flows from parent to child
//! through the `children` lists; the `parent` link on each item is only used for
//! lookup. The [`ItemKind::Ground`] item is created with the tree and is never removed.

mod area;
mod build;
pub mod integrity;
mod simplify;
mod sizing;


use std::fmt;

use egui::Rect;

use crate::binding::ComponentHandle;
use crate::config::{HeaderShow, ItemType, JsonValue};
use crate::size::SizeWithUnit;
use crate::tabs::TabsContainer;

pub use area::{Area, AreaKind, DropIndicator, DropPlan, get_area};
pub use sizing::Metrics;
pub(crate) use build::{active_index_of, component_types, validate_config};

/// Identifies one item of a [`LayoutTree`]. Never reused within a tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    pub const fn from_u64(n: u64) -> Self {
        Self(n)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The layout axis of a row or column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Children side by side (a row).
    Horizontal,

    /// Children on top of each other (a column).
    Vertical,
}

impl Axis {
    pub fn of_side(side: crate::config::Side) -> Self {
        if side.is_horizontal() {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    pub fn item_type(self) -> ItemType {
        match self {
            Self::Horizontal => ItemType::Row,
            Self::Vertical => ItemType::Column,
        }
    }

    pub(crate) fn extent(self, rect: Rect) -> f32 {
        match self {
            Self::Horizontal => rect.width(),
            Self::Vertical => rect.height(),
        }
    }
}

/// A tabbed container whose children are all components.
#[derive(Clone, Debug)]
pub struct Stack {
    pub children: Vec<ItemId>,
    pub active: Option<ItemId>,
    pub maximised: bool,

    /// Overrides the layout-wide header setting.
    pub header: Option<HeaderShow>,

    pub tabs: TabsContainer,

    pub(crate) header_rect: Option<Rect>,
    pub(crate) content_rect: Rect,
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            active: None,
            maximised: false,
            header: None,
            tabs: TabsContainer::default(),
            header_rect: None,
            content_rect: Rect::NOTHING,
        }
    }
}

impl Stack {
    pub fn header_rect(&self) -> Option<Rect> {
        self.header_rect
    }

    /// Where the active component is shown.
    pub fn content_rect(&self) -> Rect {
        self.content_rect
    }
}

/// A leaf hosting one externally rendered widget.
#[derive(Clone, Debug)]
pub struct Component {
    pub component_type: JsonValue,
    pub state: JsonValue,
    pub title: String,
    pub reorder_enabled: bool,

    /// Set while the widget is bound.
    pub(crate) handle: Option<ComponentHandle>,
}

impl Component {
    pub fn handle(&self) -> Option<ComponentHandle> {
        self.handle
    }
}

#[derive(Clone, Debug)]
pub enum ItemKind {
    Ground { children: Vec<ItemId> },
    Row { children: Vec<ItemId> },
    Column { children: Vec<ItemId> },
    Stack(Stack),
    Component(Component),
}

impl ItemKind {
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Ground { .. } => ItemType::Ground,
            Self::Row { .. } => ItemType::Row,
            Self::Column { .. } => ItemType::Column,
            Self::Stack(_) => ItemType::Stack,
            Self::Component(_) => ItemType::Component,
        }
    }

    pub fn axis(&self) -> Option<Axis> {
        match self {
            Self::Row { .. } => Some(Axis::Horizontal),
            Self::Column { .. } => Some(Axis::Vertical),
            _ => None,
        }
    }

    pub(crate) fn linear(axis: Axis, children: Vec<ItemId>) -> Self {
        match axis {
            Axis::Horizontal => Self::Row { children },
            Axis::Vertical => Self::Column { children },
        }
    }

    pub fn children(&self) -> &[ItemId] {
        match self {
            Self::Ground { children } | Self::Row { children } | Self::Column { children } => {
                children
            }
            Self::Stack(stack) => &stack.children,
            Self::Component(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        match self {
            Self::Ground { children } | Self::Row { children } | Self::Column { children } => {
                Some(children)
            }
            Self::Stack(stack) => Some(&mut stack.children),
            Self::Component(_) => None,
        }
    }
}

/// One node of the layout tree.
#[derive(Clone, Debug)]
pub struct ContentItem {
    /// Id from the persisted config, if any.
    pub id: Option<String>,

    /// Size along the parent's axis.
    pub size: SizeWithUnit,

    /// Pixel floor along the parent's axis.
    pub min_size: Option<SizeWithUnit>,

    pub is_closable: bool,
    pub kind: ItemKind,

    parent: Option<ItemId>,
    rect: Rect,
}

impl ContentItem {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            id: None,
            size: SizeWithUnit::DEFAULT,
            min_size: None,
            is_closable: true,
            kind,
            parent: None,
            rect: Rect::NOTHING,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.kind.item_type()
    }

    pub fn children(&self) -> &[ItemId] {
        self.kind.children()
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// The rectangle from the last [`LayoutTree::set_size`].
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn stack(&self) -> Option<&Stack> {
        match &self.kind {
            ItemKind::Stack(stack) => Some(stack),
            _ => None,
        }
    }

    pub fn component(&self) -> Option<&Component> {
        match &self.kind {
            ItemKind::Component(component) => Some(component),
            _ => None,
        }
    }
}

/// Where an item sat before it was detached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemLocation {
    pub parent: ItemId,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct LayoutTree {
    items: ahash::HashMap<ItemId, ContentItem>,
    next_id: u64,
    ground: ItemId,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTree {
    /// An empty layout: a childless ground.
    pub fn new() -> Self {
        let mut tree = Self {
            items: Default::default(),
            next_id: 1,
            ground: ItemId(0),
        };
        tree.ground = tree.insert_item(ContentItem::new(ItemKind::Ground {
            children: Vec::new(),
        }));
        tree
    }

    pub fn ground(&self) -> ItemId {
        self.ground
    }

    /// The single child of ground, if the layout is not empty.
    pub fn root(&self) -> Option<ItemId> {
        self.children(self.ground).first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_none()
    }

    /// Number of items in the arena, ground and detached items included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&ContentItem> {
        self.items.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut ContentItem> {
        self.items.get_mut(&id)
    }

    pub fn item_type(&self, id: ItemId) -> Option<ItemType> {
        self.get(id).map(ContentItem::item_type)
    }

    pub fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        self.get(id).and_then(|item| item.parent)
    }

    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.get(id).map_or(&[], ContentItem::children)
    }

    pub fn index_in_parent(&self, id: ItemId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn location_of(&self, id: ItemId) -> Option<ItemLocation> {
        Some(ItemLocation {
            parent: self.parent_of(id)?,
            index: self.index_in_parent(id)?,
        })
    }

    pub fn stack(&self, id: ItemId) -> Option<&Stack> {
        self.get(id).and_then(ContentItem::stack)
    }

    pub(crate) fn stack_mut(&mut self, id: ItemId) -> Option<&mut Stack> {
        match &mut self.get_mut(id)?.kind {
            ItemKind::Stack(stack) => Some(stack),
            _ => None,
        }
    }

    pub fn component(&self, id: ItemId) -> Option<&Component> {
        self.get(id).and_then(ContentItem::component)
    }

    pub(crate) fn component_mut(&mut self, id: ItemId) -> Option<&mut Component> {
        match &mut self.get_mut(id)?.kind {
            ItemKind::Component(component) => Some(component),
            _ => None,
        }
    }

    /// Pre-order walk of the attached tree, starting at ground.
    pub fn dfs(&self) -> Vec<ItemId> {
        self.descendants(self.ground)
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn is_attached(&self, id: ItemId) -> bool {
        self.ancestors(id).last() == Some(self.ground) || id == self.ground
    }

    /// Parent, grandparent and so on.
    pub fn ancestors(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        std::iter::successors(self.parent_of(id), |&p| self.parent_of(p))
    }

    pub fn is_ancestor_of(&self, ancestor: ItemId, id: ItemId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// The first attached item (pre-order) of the given type.
    pub fn first_of_type(&self, item_type: ItemType) -> Option<ItemId> {
        self.dfs()
            .into_iter()
            .find(|&id| self.item_type(id) == Some(item_type))
    }

    /// All attached items of the given type, in pre-order.
    pub fn all_of_type(&self, item_type: ItemType) -> Vec<ItemId> {
        self.dfs()
            .into_iter()
            .filter(|&id| self.item_type(id) == Some(item_type))
            .collect()
    }

    pub fn find_by_config_id(&self, config_id: &str) -> Option<ItemId> {
        self.dfs()
            .into_iter()
            .find(|&id| self.get(id).and_then(|item| item.id.as_deref()) == Some(config_id))
    }

    pub fn maximised_stack(&self) -> Option<ItemId> {
        self.dfs()
            .into_iter()
            .find(|&id| self.stack(id).is_some_and(|s| s.maximised))
    }

    /// A component is visible when it is its stack's active child and no other stack
    /// is maximised.
    pub fn is_component_visible(&self, id: ItemId) -> bool {
        let Some(stack_id) = self.parent_of(id) else {
            return false;
        };
        let Some(stack) = self.stack(stack_id) else {
            return false;
        };
        if stack.active != Some(id) || !self.is_attached(id) {
            return false;
        }
        match self.maximised_stack() {
            Some(maximised) => maximised == stack_id,
            None => true,
        }
    }

    /// Adds an item to the arena without attaching it anywhere.
    pub(crate) fn insert_item(&mut self, item: ContentItem) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    /// Attach the unattached `child` under `parent` at `index` (clamped; `None` appends).
    ///
    /// Returns the index the child ended up at.
    ///
    /// # Panics
    /// If `child` is already attached or `parent` cannot hold it.
    pub(crate) fn attach(&mut self, parent: ItemId, child: ItemId, index: Option<usize>) -> usize {
        let child_type = self.item_type(child);
        assert!(
            self.parent_of(child).is_none(),
            "attach: {child} already has a parent"
        );
        let (title, closable) = match self.get(child) {
            Some(ContentItem {
                kind: ItemKind::Component(c),
                is_closable,
                ..
            }) => (c.title.clone(), *is_closable),
            _ => (String::new(), true),
        };

        let parent_item = self
            .items
            .get_mut(&parent)
            .unwrap_or_else(|| panic!("attach: parent {parent} missing"));
        let accepts = match &parent_item.kind {
            ItemKind::Stack(_) => child_type == Some(ItemType::Component),
            ItemKind::Ground { children } => {
                children.is_empty()
                    && child_type.is_some_and(|t| t != ItemType::Component && t != ItemType::Ground)
            }
            ItemKind::Row { .. } | ItemKind::Column { .. } => {
                child_type.is_some_and(|t| t != ItemType::Component && t != ItemType::Ground)
            }
            ItemKind::Component(_) => false,
        };
        assert!(
            accepts,
            "attach: {:?} {parent} cannot hold {child_type:?} {child}",
            parent_item.item_type()
        );

        let Some(children) = parent_item.kind.children_mut() else {
            unreachable!("attach target accepted children");
        };
        let index = index.unwrap_or(children.len()).min(children.len());
        children.insert(index, child);

        if let ItemKind::Stack(stack) = &mut parent_item.kind {
            if stack.tabs.tab_index(child).is_some() {
                stack.tabs.move_tab(child, index);
            } else {
                stack.tabs.create_tab(child, title, closable, Some(index));
            }
            if stack.active.is_none() {
                stack.active = Some(child);
                stack.tabs.process_active_component_changed(child, false);
            }
        }

        if let Some(child_item) = self.items.get_mut(&child) {
            child_item.parent = Some(parent);
        }
        index
    }

    /// Unlink `child` from its parent. The item stays in the arena.
    ///
    /// With `keep_tab`, a stack keeps the child's tab; the caller removes it later.
    pub(crate) fn detach(&mut self, child: ItemId, keep_tab: bool) -> Option<ItemLocation> {
        let location = self.location_of(child)?;

        let parent_item = self.items.get_mut(&location.parent)?;
        if let Some(children) = parent_item.kind.children_mut() {
            children.remove(location.index);
        }

        if let ItemKind::Stack(stack) = &mut parent_item.kind {
            if !keep_tab {
                stack.tabs.remove_tab(child);
            }
            if stack.active == Some(child) {
                let next = location.index.saturating_sub(1);
                stack.active = stack.children.get(next).copied();
                if let Some(active) = stack.active {
                    stack.tabs.process_active_component_changed(active, false);
                }
            }
        }

        if let Some(child_item) = self.items.get_mut(&child) {
            child_item.parent = None;
        }
        Some(location)
    }

    /// Detach `id` if needed and drop it and its descendants from the arena.
    ///
    /// Returns the removed items, pre-order, so their widgets can be unbound.
    ///
    /// # Panics
    /// If `id` is the ground.
    pub(crate) fn remove_subtree(&mut self, id: ItemId) -> Vec<(ItemId, ContentItem)> {
        assert!(id != self.ground, "the ground item cannot be removed");
        self.detach(id, false);
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.items.remove(&d).map(|item| (d, item)))
            .collect()
    }

    /// Move an attached item to `new_parent` at `index`.
    pub(crate) fn move_child(&mut self, id: ItemId, new_parent: ItemId, index: Option<usize>) -> usize {
        self.detach(id, false);
        self.attach(new_parent, id, index)
    }

    /// Make `component` the active child of its stack.
    ///
    /// Returns `false` if it was already active.
    pub(crate) fn set_active_component(
        &mut self,
        component: ItemId,
        reorder_on_tab_menu_click: bool,
    ) -> bool {
        let Some(stack_id) = self.parent_of(component) else {
            return false;
        };
        let Some(stack) = self.stack_mut(stack_id) else {
            return false;
        };
        if stack.active == Some(component) {
            return false;
        }
        stack.active = Some(component);
        stack
            .tabs
            .process_active_component_changed(component, reorder_on_tab_menu_click);
        true
    }

    /// Drop everything below ground.
    pub(crate) fn clear(&mut self) -> Vec<(ItemId, ContentItem)> {
        match self.root() {
            Some(root) => self.remove_subtree(root),
            None => Vec::new(),
        }
    }

    /// Items in the arena that are not reachable from ground.
    pub fn detached_items(&self) -> Vec<ItemId> {
        let reachable: ahash::HashSet<ItemId> = self.dfs().into_iter().collect();
        let mut ids: Vec<ItemId> = self
            .items
            .keys()
            .filter(|id| !reachable.contains(id))
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn new_stack_with(&mut self, component: ItemId) -> ItemId {
        let stack = self.insert_item(ContentItem::new(ItemKind::Stack(Stack::default())));
        self.attach(stack, component, None);
        stack
    }

    pub(crate) fn set_rect(&mut self, id: ItemId, rect: Rect) {
        if let Some(item) = self.get_mut(id) {
            item.rect = rect;
        }
    }
}
