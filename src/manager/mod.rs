//! The layout manager: owns the tree and orchestrates everything that changes it.
//!
//! Lifecycle: `Uninitialised -> Initialised -> Destroyed`. Structural mutations requested
//! while a drag is in progress are queued and replayed when the drag ends (see
//! [`Mutation`]).

mod api;
mod drag;
mod location;
mod options;
mod resize;

#[cfg(test)]
mod manager_tests;

use std::collections::BTreeMap;
use std::fmt;

use egui::Rect;

pub use location::{AFTER_FOCUSED_ITEM_IF_POSSIBLE, DEFAULT_LOCATION_SELECTORS, LocationSelector};
pub use options::LayoutManagerOptions;

use crate::binding::ComponentRegistry;
use crate::config::{ItemConfig, ItemType, LayoutConfig, Settings};
use crate::drag::{DragHandle, DragListener, DragSession, DragSourceId, WindowDragTracker};
use crate::error::LayoutError;
use crate::event::{EventQueue, LayoutEvent};
use crate::popout::{BrowserPopout, PopoutContext, PopoutHost, PopoutId};
use crate::tabs::{FixedAdvanceMeasure, TabMeasure};
use crate::timer::SingleShotTimer;
use crate::tree::{ContentItem, ItemId, LayoutTree, Metrics, component_types, validate_config};

use resize::ResizeDebouncer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialised,
    Initialised,
    Destroyed,
}

/// The outcome of a structural mutation.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation<T> {
    Applied(T),

    /// A drag is in progress; the mutation runs when it ends.
    Deferred,
}

impl<T> Mutation<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Deferred => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred)
    }
}

/// Replayed when the current drag ends. The flag is `true` if the drag was cancelled.
pub(crate) type DeferredAction = Box<dyn FnOnce(&mut LayoutManager, bool) -> Result<(), LayoutError>>;

/// Builds the item a drag source drags in.
pub(crate) type DragSourceFn = Box<dyn FnMut() -> ItemConfig>;

/// Owns a layout tree and drives it from host input.
///
/// The host feeds it sizes ([`Self::set_size`]), pointer input ([`Self::pointer_down`]
/// and friends) and time ([`Self::tick`]), renders from [`Self::tree`] and reacts to
/// [`Self::take_events`].
pub struct LayoutManager {
    pub options: LayoutManagerOptions,

    pub(crate) state: ManagerState,

    /// Settings of the loaded layout. `root` and `open_popouts` are only set before
    /// [`Self::init`].
    pub(crate) config: LayoutConfig,
    pub(crate) metrics: Metrics,
    pub(crate) tree: LayoutTree,
    pub(crate) registry: ComponentRegistry,
    pub(crate) tab_measure: Box<dyn TabMeasure>,
    pub(crate) events: EventQueue,
    pub(crate) focused: Option<ItemId>,

    pub(crate) container_rect: Rect,
    pub(crate) resize: ResizeDebouncer,

    pub(crate) drag: DragSession,
    pub(crate) listener: DragListener<DragHandle>,
    pub(crate) drag_sources: BTreeMap<DragSourceId, DragSourceFn>,
    pub(crate) next_drag_source: u64,
    pub(crate) window_drag: WindowDragTracker,
    pub(crate) deferred: Vec<DeferredAction>,

    pub(crate) popouts: BTreeMap<PopoutId, BrowserPopout>,
    pub(crate) popout_host: Option<Box<dyn PopoutHost>>,
    pub(crate) next_popout: u64,
    pub(crate) next_pop_in_parent: u64,
    pub(crate) reconcile_timer: SingleShotTimer,
    pub(crate) popout_context: Option<PopoutContext>,
}

impl fmt::Debug for LayoutManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutManager")
            .field("state", &self.state)
            .field("items", &self.tree.len())
            .field("focused", &self.focused)
            .field("dragging", &self.drag.is_active())
            .field("deferred", &self.deferred.len())
            .field("popouts", &self.popouts.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl LayoutManager {
    /// A manager for `config`. Nothing is built until [`Self::init`].
    pub fn new(
        config: LayoutConfig,
        registry: ComponentRegistry,
        options: LayoutManagerOptions,
    ) -> Self {
        let listener = DragListener::new(options.drag_distance, options.drag_hold_delay);
        let events = EventQueue::new(options.event_queue_capacity);
        Self {
            options,
            state: ManagerState::Uninitialised,
            config,
            metrics: Metrics::default(),
            tree: LayoutTree::new(),
            registry,
            tab_measure: Box::new(FixedAdvanceMeasure::default()),
            events,
            focused: None,
            container_rect: Rect::NOTHING,
            resize: ResizeDebouncer::default(),
            drag: DragSession::default(),
            listener,
            drag_sources: BTreeMap::new(),
            next_drag_source: 1,
            window_drag: WindowDragTracker::default(),
            deferred: Vec::new(),
            popouts: BTreeMap::new(),
            popout_host: None,
            next_popout: 1,
            next_pop_in_parent: 1,
            reconcile_timer: SingleShotTimer::default(),
            popout_context: None,
        }
    }

    #[must_use]
    pub fn with_popout_host(mut self, host: impl PopoutHost + 'static) -> Self {
        self.popout_host = Some(Box::new(host));
        self
    }

    pub fn set_popout_host(&mut self, host: impl PopoutHost + 'static) {
        self.popout_host = Some(Box::new(host));
    }

    /// How tab titles are measured when laying out tab strips.
    pub fn set_tab_measure(&mut self, measure: impl TabMeasure + 'static) {
        self.tab_measure = Box::new(measure);
        self.refresh_tab_strips();
    }

    /// Build the initial layout and open its popouts.
    pub fn init(&mut self) -> Result<(), LayoutError> {
        if self.state != ManagerState::Uninitialised {
            return Err(LayoutError::invalid_state(format!(
                "init called on a {:?} layout manager",
                self.state
            )));
        }
        let config = std::mem::take(&mut self.config);
        self.validate_layout(&config)?;
        self.state = ManagerState::Initialised;
        log::debug!("layout manager initialised (window {})", self.options.window_id);
        self.emit(LayoutEvent::Initialised);
        self.apply_layout(config)
    }

    /// Tear everything down: the drag, popouts and all component bindings.
    ///
    /// Further calls fail with [`LayoutError::InvalidState`]. Destroying twice is a no-op.
    pub fn destroy(&mut self) {
        if self.state == ManagerState::Destroyed {
            return;
        }
        if self.drag.is_active() {
            self.cancel_drag();
        }
        self.deferred.clear();
        self.close_all_open_popouts();
        let removed = self.tree.clear();
        self.discard_items(removed);
        self.drag_sources.clear();
        self.resize.cancel();
        self.reconcile_timer.cancel();
        self.state = ManagerState::Destroyed;
        log::debug!("layout manager destroyed (window {})", self.options.window_id);
        self.emit(LayoutEvent::Destroyed);
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn is_initialised(&self) -> bool {
        self.state == ManagerState::Initialised
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn focused_component(&self) -> Option<ItemId> {
        self.focused
    }

    /// The rectangle the layout was last sized to.
    pub fn container_rect(&self) -> Rect {
        self.container_rect
    }

    /// Everything that happened since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<LayoutEvent> {
        self.events.drain()
    }

    pub(crate) fn emit(&mut self, event: LayoutEvent) {
        log::trace!("event {event:?}");
        self.events.push(event);
    }

    pub(crate) fn ensure_live(&self, operation: &str) -> Result<(), LayoutError> {
        match self.state {
            ManagerState::Initialised => Ok(()),
            state => Err(LayoutError::invalid_state(format!(
                "{operation} on a {state:?} layout manager"
            ))),
        }
    }

    /// Run `op` now, or queue it if a drag is in progress.
    pub(crate) fn run_or_defer<T: 'static>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T, LayoutError> + 'static,
    ) -> Result<Mutation<T>, LayoutError> {
        if self.drag.is_active() {
            log::debug!("deferring {name} until the drag ends");
            self.deferred
                .push(Box::new(move |manager, _cancelled| op(manager).map(drop)));
            Ok(Mutation::Deferred)
        } else {
            op(self).map(Mutation::Applied)
        }
    }

    pub(crate) fn replay_deferred(&mut self, cancelled: bool) {
        while !self.deferred.is_empty() {
            let actions = std::mem::take(&mut self.deferred);
            log::debug!(
                "replaying {} deferred action(s), cancelled={cancelled}",
                actions.len()
            );
            for action in actions {
                if let Err(err) = action(self, cancelled) {
                    log::warn!("deferred action failed: {err}");
                }
            }
        }
    }

    /// Everything [`Self::apply_layout`] needs, checked without touching the tree.
    pub(crate) fn validate_layout(&self, config: &LayoutConfig) -> Result<Metrics, LayoutError> {
        if let Some(root) = &config.root {
            validate_config(root, ItemType::Ground)?;
            self.registry.check_all(component_types(root))?;
        }
        for popout in &config.open_popouts {
            if let Some(root) = &popout.layout.root {
                validate_config(root, ItemType::Ground)?;
            }
        }
        Metrics::from_config(config)
    }

    /// Replace the whole layout with `config`. Validate first.
    pub(crate) fn apply_layout(&mut self, mut config: LayoutConfig) -> Result<(), LayoutError> {
        let metrics = self.validate_layout(&config)?;

        self.close_all_open_popouts();
        let removed = self.tree.clear();
        self.discard_items(removed);
        self.focused = None;
        self.metrics = metrics;

        let root = config.root.take();
        let popouts = std::mem::take(&mut config.open_popouts);
        self.config = config;

        if let Some(root) = root {
            if let Some(root_id) = self.tree.load_root(&root)? {
                self.bind_subtree(root_id);
            }
        }
        self.check_loaded_maximised_stack();
        self.relayout();
        self.emit(LayoutEvent::StateChanged);

        let mut blocked = None;
        for popout in popouts {
            if let Err(err) = self.create_popout_from_config(popout) {
                log::warn!("could not reopen popout: {err}");
                blocked.get_or_insert(err);
            }
        }
        match blocked {
            Some(err) if self.config.settings.blocked_popouts_throw_error => Err(err),
            _ => Ok(()),
        }
    }

    /// At most one stack may come out of a config maximised: the first one wins.
    fn check_loaded_maximised_stack(&mut self) {
        let mut maximised = self
            .tree
            .all_of_type(ItemType::Stack)
            .into_iter()
            .filter(|&id| self.tree.stack(id).is_some_and(|s| s.maximised));
        let Some(first) = maximised.next() else {
            return;
        };
        let extra: Vec<ItemId> = maximised.collect();
        for id in extra {
            log::warn!("layout has more than one maximised stack, restoring {id}");
            if let Some(stack) = self.tree.stack_mut(id) {
                stack.maximised = false;
            }
        }
        self.emit(LayoutEvent::StackMaximised(first));
    }

    /// Bind the widgets of every component under `id`, and announce the new items.
    pub(crate) fn bind_subtree(&mut self, id: ItemId) {
        for item in self.tree.descendants(id) {
            self.emit(LayoutEvent::ItemCreated(item));
            let Some(component) = self.tree.component(item) else {
                continue;
            };
            if component.handle.is_some() {
                continue;
            }
            let (component_type, state) = (component.component_type.clone(), component.state.clone());
            match self.registry.bind(item, &component_type, &state) {
                Ok(handle) => {
                    if let Some(component) = self.tree.component_mut(item) {
                        component.handle = Some(handle);
                    }
                }
                Err(err) => log::warn!("could not bind component {item}: {err}"),
            }
        }
    }

    /// Unbind and announce items dropped from the tree.
    pub(crate) fn discard_items(&mut self, removed: Vec<(ItemId, ContentItem)>) {
        for (id, item) in removed {
            if let Some(component) = item.component() {
                if let Some(handle) = component.handle {
                    self.registry.unbind(id, &component.component_type, handle);
                }
            }
            if item.stack().is_some_and(|s| s.maximised) {
                self.emit(LayoutEvent::StackMinimised(id));
            }
            if self.focused == Some(id) {
                self.focused = None;
                self.emit(LayoutEvent::Blur(id));
            }
            self.emit(LayoutEvent::ItemDestroyed(id));
        }
    }

    /// Remove `id` and its subtree, unbinding its components.
    pub(crate) fn remove_and_discard(&mut self, id: ItemId) {
        let removed = self.tree.remove_subtree(id);
        self.discard_items(removed);
    }

    /// Restore the tree invariants after a mutation, then lay it out again.
    pub(crate) fn settle(&mut self) {
        for id in self.tree.simplify() {
            self.emit(LayoutEvent::ItemDestroyed(id));
        }
        self.relayout();
        self.emit(LayoutEvent::StateChanged);
    }

    /// Lay the tree out in the container and refresh every tab strip.
    pub(crate) fn relayout(&mut self) {
        if self.container_rect.is_positive() {
            self.tree.set_size(self.container_rect, &self.metrics);
        }
        self.refresh_tab_strips();
        if self.drag.is_active() {
            self.drag.refresh_areas(&self.tree);
        }
    }

    pub(crate) fn refresh_tab_strips(&mut self) {
        for stack_id in self.tree.all_of_type(ItemType::Stack) {
            self.refresh_tab_strip(stack_id);
        }
    }

    pub(crate) fn refresh_tab_strip(&mut self, stack_id: ItemId) {
        let available = self.tree.available_tab_strip(stack_id, &self.metrics);
        let allowance = self.config.settings.tab_overlap_allowance;
        let Some(stack) = self.tree.stack_mut(stack_id) else {
            return;
        };
        let active = stack.active;
        if stack
            .tabs
            .update_tab_sizes(available, active, allowance, self.tab_measure.as_mut())
        {
            let dropdown_active = stack.tabs.dropdown_active();
            self.emit(LayoutEvent::TabDropdownToggled {
                stack: stack_id,
                dropdown_active,
            });
        }
    }

    /// Panics on a broken tree when integrity checks are enabled.
    pub(crate) fn check_integrity(&self, context: &str) {
        if !self.options.check_integrity {
            return;
        }
        let issues = crate::tree::integrity::tree_integrity_issues(&self.tree);
        assert!(
            issues.is_empty(),
            "layout integrity broken after {context}:\n{}",
            issues.join("\n")
        );
    }
}
