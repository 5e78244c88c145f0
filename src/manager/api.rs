use super::{DEFAULT_LOCATION_SELECTORS, LayoutManager, LocationSelector, Mutation};
use crate::config::{
    HeaderConfig, HeaderShow, ItemConfig, ItemType, JsonValue, LayoutConfig, Side,
};
use crate::error::{ConfigError, LayoutError};
use crate::event::LayoutEvent;
use crate::tree::{Axis, ItemId, ItemLocation, active_index_of, validate_config};

fn component_config(
    component_type: JsonValue,
    state: Option<JsonValue>,
    title: Option<&str>,
) -> ItemConfig {
    ItemConfig {
        component_state: state,
        title: title.map(str::to_owned),
        ..ItemConfig::component(component_type)
    }
}

impl LayoutManager {
    // ------------------------------------------------------------------------------------
    // Persistence

    /// Replace the layout with `config`.
    ///
    /// The config is validated (and its component types checked against the registry)
    /// before anything is torn down.
    pub fn load_layout(&mut self, config: LayoutConfig) -> Result<Mutation<()>, LayoutError> {
        self.ensure_live("load_layout")?;
        self.validate_layout(&config)?;
        self.run_or_defer("load_layout", move |manager| manager.apply_layout(config))
    }

    /// The current layout, popouts included.
    ///
    /// Fails with [`LayoutError::InvalidState`] while a drag is in progress: the dragged
    /// item is detached and would be missing from the saved layout.
    pub fn save_layout(&mut self) -> Result<LayoutConfig, LayoutError> {
        self.ensure_live("save_layout")?;
        if self.drag.is_active() {
            return Err(LayoutError::invalid_state("cannot save while dragging"));
        }
        self.reconcile_popout_windows();
        Ok(LayoutConfig {
            root: self.tree.root().and_then(|root| self.tree.to_config(root)),
            open_popouts: self.popouts.values().map(|p| p.to_config()).collect(),
            ..self.config.clone()
        })
    }

    /// Remove everything: an empty layout.
    pub fn clear(&mut self) -> Result<Mutation<()>, LayoutError> {
        self.ensure_live("clear")?;
        self.run_or_defer("clear", |manager| {
            let removed = manager.tree.clear();
            manager.discard_items(removed);
            manager.settle();
            Ok(())
        })
    }

    /// Show one component on its own, without a header.
    ///
    /// Saved and reloaded, this is a stack with its header hidden.
    pub fn load_component_as_root(
        &mut self,
        config: ItemConfig,
    ) -> Result<Mutation<()>, LayoutError> {
        if config.item_type != ItemType::Component {
            return Err(ConfigError::UnexpectedItem(config.item_type.name()).into());
        }
        let root = ItemConfig {
            header: Some(HeaderConfig {
                show: HeaderShow::Hidden,
            }),
            ..ItemConfig::stack(vec![config])
        };
        let layout = LayoutConfig {
            root: Some(root),
            open_popouts: Vec::new(),
            ..self.config.clone()
        };
        self.load_layout(layout)
    }

    // ------------------------------------------------------------------------------------
    // Adding items

    /// Add a component where the default selectors put it.
    pub fn new_component(
        &mut self,
        component_type: impl Into<JsonValue>,
        state: Option<JsonValue>,
        title: Option<&str>,
    ) -> Result<Mutation<ItemId>, LayoutError> {
        self.new_component_at_location(component_type, state, title, DEFAULT_LOCATION_SELECTORS)
    }

    pub fn new_component_at_location(
        &mut self,
        component_type: impl Into<JsonValue>,
        state: Option<JsonValue>,
        title: Option<&str>,
        selectors: &[LocationSelector],
    ) -> Result<Mutation<ItemId>, LayoutError> {
        let config = component_config(component_type.into(), state, title);
        self.new_item_at_location(config, selectors)
    }

    /// Like [`Self::new_component`], returning where the component went.
    pub fn add_component(
        &mut self,
        component_type: impl Into<JsonValue>,
        state: Option<JsonValue>,
        title: Option<&str>,
    ) -> Result<Mutation<ItemLocation>, LayoutError> {
        self.add_component_at_location(component_type, state, title, DEFAULT_LOCATION_SELECTORS)
    }

    pub fn add_component_at_location(
        &mut self,
        component_type: impl Into<JsonValue>,
        state: Option<JsonValue>,
        title: Option<&str>,
        selectors: &[LocationSelector],
    ) -> Result<Mutation<ItemLocation>, LayoutError> {
        let config = component_config(component_type.into(), state, title);
        self.add_item_at_location(config, selectors)
    }

    pub fn new_item(&mut self, config: ItemConfig) -> Result<Mutation<ItemId>, LayoutError> {
        self.new_item_at_location(config, DEFAULT_LOCATION_SELECTORS)
    }

    /// Build `config` at the first location the selectors resolve to.
    ///
    /// Returns the item built from `config` itself (not a stack it got wrapped in).
    /// Fails with [`LayoutError::NoValidLocation`] if no selector resolves.
    pub fn new_item_at_location(
        &mut self,
        config: ItemConfig,
        selectors: &[LocationSelector],
    ) -> Result<Mutation<ItemId>, LayoutError> {
        self.ensure_live("new_item_at_location")?;
        validate_config(&config, ItemType::Row)?;
        self.registry
            .check_all(crate::tree::component_types(&config))?;
        let selectors = selectors.to_vec();
        self.run_or_defer("new_item_at_location", move |manager| {
            let location = manager
                .find_location(&selectors)
                .ok_or(LayoutError::NoValidLocation)?;
            manager.insert_config_at(&config, location)
        })
    }

    pub fn add_item(&mut self, config: ItemConfig) -> Result<Mutation<ItemLocation>, LayoutError> {
        self.add_item_at_location(config, DEFAULT_LOCATION_SELECTORS)
    }

    /// Like [`Self::new_item_at_location`], returning where the new item sits.
    pub fn add_item_at_location(
        &mut self,
        config: ItemConfig,
        selectors: &[LocationSelector],
    ) -> Result<Mutation<ItemLocation>, LayoutError> {
        self.ensure_live("add_item_at_location")?;
        validate_config(&config, ItemType::Row)?;
        self.registry
            .check_all(crate::tree::component_types(&config))?;
        let selectors = selectors.to_vec();
        self.run_or_defer("add_item_at_location", move |manager| {
            let location = manager
                .find_location(&selectors)
                .ok_or(LayoutError::NoValidLocation)?;
            let id = manager.insert_config_at(&config, location)?;
            manager
                .tree
                .location_of(id)
                .ok_or_else(|| LayoutError::invalid_state(format!("{id} was merged away")))
        })
    }

    /// Build a validated `config` and put it at `location`, wrapping or merging as the
    /// parent requires.
    pub(crate) fn insert_config_at(
        &mut self,
        config: &ItemConfig,
        location: ItemLocation,
    ) -> Result<ItemId, LayoutError> {
        let parent_type = self.tree.item_type(location.parent).ok_or_else(|| {
            LayoutError::invalid_state(format!("location parent {} is gone", location.parent))
        })?;

        let result = match (parent_type, config.item_type) {
            (ItemType::Stack, ItemType::Component) => {
                let id = self.tree.build_item(config, ItemType::Stack)?;
                self.tree.attach(location.parent, id, Some(location.index));
                self.bind_subtree(id);
                self.activate(id);
                id
            }
            (ItemType::Stack, ItemType::Stack) => {
                // Merge: the components become tabs of the existing stack. Everything is
                // built before anything is attached, so a failure leaves the tree alone.
                if config.content.is_empty() {
                    return Err(LayoutError::invalid_state("stack config has no components"));
                }
                let mut built = Vec::with_capacity(config.content.len());
                for child in &config.content {
                    match self.tree.build_item(child, ItemType::Stack) {
                        Ok(id) => built.push(id),
                        Err(err) => {
                            for id in built {
                                self.tree.remove_subtree(id);
                            }
                            return Err(err);
                        }
                    }
                }
                for (offset, &id) in built.iter().enumerate() {
                    self.tree
                        .attach(location.parent, id, Some(location.index + offset));
                    self.bind_subtree(id);
                }
                let active = built[active_index_of(config)];
                self.activate(active);
                active
            }
            (ItemType::Stack, _) => {
                // Rows and columns cannot go in a stack: put them beside it.
                let stack = location.parent;
                let Some(stack_location) = self.tree.location_of(stack) else {
                    return Err(LayoutError::invalid_state(format!("{stack} is not attached")));
                };
                let stack_size = self.tree.get(stack).map(|s| s.size);
                let id = self.tree.build_item(config, ItemType::Row)?;
                self.tree.detach(stack, false);
                let side = if location.index == 0 {
                    Side::Left
                } else {
                    Side::Right
                };
                let container = self.tree.wrap_pair(Axis::Horizontal, stack, id, side);
                if let (Some(size), Some(item)) = (stack_size, self.tree.get_mut(container)) {
                    item.size = size;
                }
                self.tree
                    .attach(stack_location.parent, container, Some(stack_location.index));
                self.emit(LayoutEvent::ItemCreated(container));
                self.bind_subtree(id);
                id
            }
            (ItemType::Ground, _) => {
                if !self.tree.is_empty() {
                    return Err(LayoutError::invalid_state("the layout already has a root"));
                }
                let built = self.tree.build_item(config, ItemType::Ground)?;
                self.tree.attach(location.parent, built, None);
                self.bind_subtree(built);
                self.config_item_of(config, built)
            }
            (ItemType::Row | ItemType::Column, _) => {
                let built = self.tree.build_item(config, parent_type)?;
                self.tree
                    .attach(location.parent, built, Some(location.index));
                self.bind_subtree(built);
                self.config_item_of(config, built)
            }
            (ItemType::Component, _) => {
                return Err(LayoutError::invalid_state("a component cannot have children"));
            }
        };

        self.settle();
        Ok(result)
    }

    /// The item built for `config` when [`crate::tree::LayoutTree::build_item`] returned
    /// `built`, which is a wrapping stack for components.
    fn config_item_of(&self, config: &ItemConfig, built: ItemId) -> ItemId {
        if config.item_type == ItemType::Component {
            self.tree.children(built).first().copied().unwrap_or(built)
        } else {
            built
        }
    }

    // ------------------------------------------------------------------------------------
    // Removing and moving

    /// Remove `id` and everything below it.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Mutation<()>, LayoutError> {
        self.ensure_live("remove_item")?;
        self.run_or_defer("remove_item", move |manager| {
            if id == manager.tree.ground() || !manager.tree.is_attached(id) {
                return Err(LayoutError::invalid_state(format!(
                    "{id} is not a removable item of this layout"
                )));
            }
            manager.remove_and_discard(id);
            manager.settle();
            Ok(())
        })
    }

    /// Move `id` under `new_parent` at `index` (counted after `id` left its old place).
    ///
    /// A component moved into a row or column gets a stack of its own.
    pub fn move_item(
        &mut self,
        id: ItemId,
        new_parent: ItemId,
        index: Option<usize>,
    ) -> Result<Mutation<()>, LayoutError> {
        self.ensure_live("move_item")?;
        self.run_or_defer("move_item", move |manager| {
            manager.move_item_now(id, new_parent, index)
        })
    }

    fn move_item_now(
        &mut self,
        id: ItemId,
        new_parent: ItemId,
        index: Option<usize>,
    ) -> Result<(), LayoutError> {
        let tree = &self.tree;
        if id == tree.ground() || !tree.is_attached(id) || !tree.is_attached(new_parent) {
            return Err(LayoutError::invalid_state(format!(
                "cannot move {id} to {new_parent}"
            )));
        }
        if id == new_parent || tree.is_ancestor_of(id, new_parent) {
            return Err(LayoutError::invalid_state(format!(
                "cannot move {id} into itself"
            )));
        }
        let (Some(child_type), Some(parent_type)) =
            (tree.item_type(id), tree.item_type(new_parent))
        else {
            return Err(LayoutError::invalid_state("unknown item"));
        };

        match (parent_type, child_type) {
            (ItemType::Stack, ItemType::Component) => {
                self.tree.move_child(id, new_parent, index);
                self.activate(id);
            }
            (ItemType::Row | ItemType::Column, ItemType::Component) => {
                self.tree.detach(id, false);
                let stack = self.tree.new_stack_with(id);
                self.tree.attach(new_parent, stack, index);
                self.emit(LayoutEvent::ItemCreated(stack));
            }
            (ItemType::Row | ItemType::Column, ItemType::Stack | ItemType::Row | ItemType::Column) => {
                self.tree.move_child(id, new_parent, index);
            }
            _ => {
                return Err(LayoutError::invalid_state(format!(
                    "a {} cannot hold a {}",
                    parent_type.name(),
                    child_type.name()
                )));
            }
        }
        self.settle();
        Ok(())
    }

    /// The first attached component whose config id is `id`.
    pub fn find_first_component_by_id(&self, id: &str) -> Option<ItemId> {
        self.tree.dfs().into_iter().find(|&item| {
            self.tree
                .get(item)
                .is_some_and(|i| i.component().is_some() && i.id.as_deref() == Some(id))
        })
    }

    // ------------------------------------------------------------------------------------
    // Focus and activation

    /// Make `component` the shown tab of its stack.
    pub fn set_active_component(&mut self, component: ItemId) -> Result<(), LayoutError> {
        self.ensure_live("set_active_component")?;
        self.ensure_attached_component(component)?;
        self.activate(component);
        Ok(())
    }

    /// Focus `component`, activating it in its stack. The previous focus is blurred.
    pub fn focus_component(&mut self, component: ItemId) -> Result<(), LayoutError> {
        self.ensure_live("focus_component")?;
        self.ensure_attached_component(component)?;
        self.activate(component);
        if self.focused == Some(component) {
            return Ok(());
        }
        if let Some(previous) = self.focused.take() {
            self.emit(LayoutEvent::Blur(previous));
        }
        self.focused = Some(component);
        self.emit(LayoutEvent::Focus(component));
        Ok(())
    }

    pub fn clear_component_focus(&mut self) {
        if let Some(previous) = self.focused.take() {
            self.emit(LayoutEvent::Blur(previous));
        }
    }

    fn ensure_attached_component(&self, component: ItemId) -> Result<(), LayoutError> {
        if self.tree.component(component).is_some() && self.tree.is_attached(component) {
            Ok(())
        } else {
            Err(LayoutError::invalid_state(format!(
                "{component} is not a component of this layout"
            )))
        }
    }

    /// Activate a component known to be in a stack.
    pub(crate) fn activate(&mut self, component: ItemId) {
        let reorder = self.config.settings.reorder_on_tab_menu_click;
        if !self.tree.set_active_component(component, reorder) {
            return;
        }
        if let Some(stack) = self.tree.parent_of(component) {
            self.emit(LayoutEvent::ActiveComponentChanged { stack, component });
            self.refresh_tab_strip(stack);
        }
    }

    /// Rename a component and its tab.
    pub fn set_component_title(
        &mut self,
        component: ItemId,
        title: impl Into<String>,
    ) -> Result<(), LayoutError> {
        self.ensure_live("set_component_title")?;
        let title = title.into();
        let Some(c) = self.tree.component_mut(component) else {
            return Err(LayoutError::invalid_state(format!("{component} is not a component")));
        };
        c.title.clone_from(&title);
        if let Some(stack_id) = self.tree.parent_of(component) {
            if let Some(stack) = self.tree.stack_mut(stack_id) {
                stack.tabs.set_title(component, title);
            }
            self.refresh_tab_strip(stack_id);
        }
        self.emit(LayoutEvent::StateChanged);
        Ok(())
    }

    // ------------------------------------------------------------------------------------
    // Maximise

    /// Maximise `stack`, restoring any other maximised stack first.
    pub fn maximise_stack(&mut self, stack: ItemId) -> Result<(), LayoutError> {
        self.ensure_live("maximise_stack")?;
        if self.tree.stack(stack).is_none() || !self.tree.is_attached(stack) {
            return Err(LayoutError::invalid_state(format!(
                "{stack} is not a stack of this layout"
            )));
        }
        match self.tree.maximised_stack() {
            Some(current) if current == stack => return Ok(()),
            Some(_) => self.minimise_stack(),
            None => {}
        }
        if let Some(s) = self.tree.stack_mut(stack) {
            s.maximised = true;
        }
        self.emit(LayoutEvent::StackMaximised(stack));
        self.relayout();
        Ok(())
    }

    /// Restore the maximised stack, if any.
    pub fn minimise_stack(&mut self) {
        let Some(stack) = self.tree.maximised_stack() else {
            return;
        };
        if let Some(s) = self.tree.stack_mut(stack) {
            s.maximised = false;
        }
        self.emit(LayoutEvent::StackMinimised(stack));
        self.relayout();
    }

    pub fn toggle_maximise(&mut self, stack: ItemId) -> Result<(), LayoutError> {
        if self.tree.maximised_stack() == Some(stack) {
            self.minimise_stack();
            Ok(())
        } else {
            self.maximise_stack(stack)
        }
    }
}
