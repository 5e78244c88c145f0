use std::time::Instant;

use egui::{Pos2, Rect};
use itertools::Itertools as _;

use super::{BrowserPopout, PopoutContext, PopoutId, PopoutMessage};
use crate::binding::ComponentRegistry;
use crate::config::{ItemConfig, ItemType, LayoutConfig, PopoutLayoutConfig, PopoutWindowConfig};
use crate::error::LayoutError;
use crate::event::LayoutEvent;
use crate::manager::{LayoutManager, LayoutManagerOptions, Mutation};
use crate::tree::{ItemId, ItemLocation, component_types, validate_config};

impl LayoutManager {
    // ------------------------------------------------------------------------------------
    // Parent side

    pub fn popouts(&self) -> impl Iterator<Item = &BrowserPopout> {
        self.popouts.values()
    }

    pub fn popout(&self, id: PopoutId) -> Option<&BrowserPopout> {
        self.popouts.get(&id)
    }

    /// Move `item` into a new window.
    ///
    /// With `popout_whole_stack`, popping out a component takes its whole stack.
    /// Returns `None` if the window was blocked and `blocked_popouts_throw_error` is off;
    /// the item then stays where it is.
    pub fn create_popout(
        &mut self,
        item: ItemId,
    ) -> Result<Mutation<Option<PopoutId>>, LayoutError> {
        self.ensure_live("create_popout")?;
        if !self.tree.is_attached(item) || item == self.tree.ground() {
            return Err(LayoutError::invalid_state(format!("cannot pop out {item}")));
        }
        self.run_or_defer("create_popout", move |manager| manager.create_popout_now(item))
    }

    fn create_popout_now(&mut self, item: ItemId) -> Result<Option<PopoutId>, LayoutError> {
        let item = match self.tree.item_type(item) {
            Some(ItemType::Component) if self.config.settings.popout_whole_stack => {
                self.tree.parent_of(item).unwrap_or(item)
            }
            Some(_) => item,
            None => return Err(LayoutError::invalid_state(format!("{item} is gone"))),
        };
        let (Some(location), Some(config)) = (self.tree.location_of(item), self.tree.to_config(item))
        else {
            return Err(LayoutError::invalid_state(format!("{item} is not attached")));
        };
        let rect = self.tree.get(item).map_or(Rect::NOTHING, |i| i.rect());

        let window = self.window_config_for(rect, None);
        let parent_id = self.ensure_config_id(location.parent);
        let popout = self.popout_config(config, window, parent_id, Some(location.index));
        let Some(id) = self.open_popout(popout)? else {
            return Ok(None);
        };

        self.remove_and_discard(item);
        self.settle();
        self.check_integrity("popout");
        Ok(Some(id))
    }

    /// Pop the detached, dragged `item` out at `pos`. It came from `origin`, if anywhere.
    pub(crate) fn pop_out_detached(
        &mut self,
        item: ItemId,
        origin: Option<ItemLocation>,
        pos: Pos2,
    ) -> Result<Option<PopoutId>, LayoutError> {
        let Some(config) = self.tree.to_config(item) else {
            return Err(LayoutError::invalid_state(format!("{item} is gone")));
        };
        let rect = self.tree.get(item).map_or(Rect::NOTHING, |i| i.rect());
        let window = self.window_config_for(rect, Some(pos));
        let parent_id = origin.and_then(|o| self.ensure_config_id(o.parent));
        let index = origin.map(|o| o.index);
        let popout = self.popout_config(config, window, parent_id, index);
        let Some(id) = self.open_popout(popout)? else {
            return Ok(None);
        };
        self.remove_and_discard(item);
        Ok(Some(id))
    }

    /// Open a window for a saved popout, e.g. one from [`LayoutConfig::open_popouts`].
    pub fn create_popout_from_config(
        &mut self,
        config: PopoutLayoutConfig,
    ) -> Result<Option<PopoutId>, LayoutError> {
        self.ensure_live("create_popout_from_config")?;
        if let Some(root) = &config.layout.root {
            validate_config(root, ItemType::Ground)?;
            self.registry.check_all(component_types(root))?;
        }
        self.open_popout(config)
    }

    /// Put popout `id`'s content back into this layout, where it came from if that
    /// place still exists.
    pub fn pop_in(&mut self, id: PopoutId) -> Result<Mutation<Option<ItemId>>, LayoutError> {
        self.ensure_live("pop_in")?;
        if !self.popouts.contains_key(&id) {
            return Err(LayoutError::invalid_state(format!("unknown popout {id}")));
        }
        self.run_or_defer("pop_in", move |manager| {
            let Some(config) = manager.popouts.get(&id).map(BrowserPopout::to_config) else {
                return Ok(None);
            };
            // The window stays open until its content is back in this layout.
            let inserted = manager.insert_popped_in(&config)?;
            if let Some(mut popout) = manager.popouts.remove(&id) {
                popout.close();
            }
            manager.emit(LayoutEvent::PopoutClosed(id));
            Ok(inserted)
        })
    }

    /// A message from a popout's layout, relayed by the host.
    pub fn handle_popout_message(
        &mut self,
        message: PopoutMessage,
    ) -> Result<Mutation<Option<ItemId>>, LayoutError> {
        self.ensure_live("handle_popout_message")?;
        self.run_or_defer("handle_popout_message", move |manager| match message {
            PopoutMessage::PopIn { popout_id, config } => {
                let Some(popout) = manager.popouts.get(&popout_id) else {
                    log::warn!("pop-in from unknown popout {popout_id}");
                    return Ok(None);
                };
                let mut saved = popout.to_config();
                if let Some(root) = config {
                    validate_config(&root, ItemType::Ground)?;
                    saved.layout.root = Some(root);
                }
                match manager.insert_popped_in(&saved) {
                    Ok(inserted) => {
                        manager.popouts.remove(&popout_id);
                        manager.emit(LayoutEvent::PopoutClosed(popout_id));
                        Ok(inserted)
                    }
                    Err(err) => {
                        // The child is gone; its last layout stays with the popout.
                        if let Some(popout) = manager.popouts.get_mut(&popout_id) {
                            popout.remember_root(saved.layout.root);
                        }
                        Err(err)
                    }
                }
            }
            PopoutMessage::Closing { popout_id } => {
                let Some(popout) = manager.popouts.remove(&popout_id) else {
                    return Ok(None);
                };
                manager.emit(LayoutEvent::PopoutClosed(popout_id));
                if manager.config.settings.pop_in_on_close {
                    manager.insert_popped_in(&popout.to_config())
                } else {
                    Ok(None)
                }
            }
        })
    }

    /// Close every popout window without popping anything in.
    pub fn close_all_open_popouts(&mut self) {
        let popouts = std::mem::take(&mut self.popouts);
        for (id, mut popout) in popouts {
            popout.close();
            self.emit(LayoutEvent::PopoutClosed(id));
        }
        self.reconcile_timer.cancel();
    }

    /// Drop popouts whose windows were closed behind our back, popping their content in
    /// if `pop_in_on_close` is set.
    ///
    /// Polling is best effort: a window closed and reopened between two polls goes
    /// unnoticed.
    pub fn reconcile_popout_windows(&mut self) {
        let closed = self
            .popouts
            .iter()
            .filter(|(_, popout)| popout.is_closed())
            .map(|(&id, _)| id)
            .collect_vec();
        for id in closed {
            let Some(popout) = self.popouts.remove(&id) else {
                continue;
            };
            log::debug!("popout {id} window was closed");
            self.emit(LayoutEvent::PopoutClosed(id));
            if self.config.settings.pop_in_on_close && self.is_initialised() {
                if let Err(err) = self.insert_popped_in(&popout.to_config()) {
                    log::warn!("could not pop in closed popout {id}: {err}");
                }
            }
        }
    }

    pub(crate) fn tick_popouts(&mut self, now: Instant) {
        if self.popouts.is_empty() {
            self.reconcile_timer.cancel();
            return;
        }
        // Pop-ins would have to wait for the drag anyway.
        if self.reconcile_timer.poll(now) && !self.drag.is_active() {
            self.reconcile_popout_windows();
        }
        if !self.popouts.is_empty() {
            self.reconcile_timer
                .schedule_if_idle(now, self.options.popout_reconcile_interval);
        }
    }

    fn open_popout(&mut self, config: PopoutLayoutConfig) -> Result<Option<PopoutId>, LayoutError> {
        let id = PopoutId(self.next_popout);
        self.next_popout += 1;
        let window = self
            .popout_host
            .as_mut()
            .and_then(|host| host.open_window(id, &config));
        match window {
            Some(window) => {
                log::debug!("opened popout {id} (parent {:?})", config.parent_id);
                self.popouts.insert(id, BrowserPopout::new(id, config, window));
                self.emit(LayoutEvent::PopoutOpened(id));
                Ok(Some(id))
            }
            None if self.config.settings.blocked_popouts_throw_error => {
                Err(LayoutError::PopoutBlocked)
            }
            None => {
                log::warn!("popout {id} was blocked");
                Ok(None)
            }
        }
    }

    /// The layout a popout window runs: `item` as root, with this layout's settings.
    fn popout_config(
        &self,
        mut item: ItemConfig,
        window: PopoutWindowConfig,
        parent_id: Option<String>,
        index_in_parent: Option<usize>,
    ) -> PopoutLayoutConfig {
        if item.item_type == ItemType::Component {
            item = ItemConfig::stack(vec![item]);
        }
        PopoutLayoutConfig {
            layout: LayoutConfig {
                root: Some(item),
                open_popouts: Vec::new(),
                ..self.config.clone()
            },
            window,
            parent_id,
            index_in_parent,
        }
    }

    fn window_config_for(&self, rect: Rect, at: Option<Pos2>) -> PopoutWindowConfig {
        let size = if rect.is_positive() {
            rect.size()
        } else {
            self.options.default_popout_size
        };
        let min = at.unwrap_or(if rect.is_positive() { rect.min } else { Pos2::ZERO });
        PopoutWindowConfig {
            left: Some(min.x),
            top: Some(min.y),
            width: Some(size.x),
            height: Some(size.y),
        }
    }

    /// The config id of `parent`, making one up if it has none. The ground has none.
    fn ensure_config_id(&mut self, parent: ItemId) -> Option<String> {
        if parent == self.tree.ground() {
            return None;
        }
        let generated = format!("popout-parent-{}", self.next_pop_in_parent);
        let item = self.tree.get_mut(parent)?;
        if let Some(id) = &item.id {
            return Some(id.clone());
        }
        item.id = Some(generated.clone());
        self.next_pop_in_parent += 1;
        Some(generated)
    }

    /// Insert a popout's content at its recorded place: the old parent, else the root,
    /// else the ground.
    fn insert_popped_in(&mut self, config: &PopoutLayoutConfig) -> Result<Option<ItemId>, LayoutError> {
        let Some(root) = &config.layout.root else {
            return Ok(None);
        };
        validate_config(root, ItemType::Ground)?;
        self.registry.check_all(component_types(root))?;

        let tree = &self.tree;
        let location = config
            .parent_id
            .as_deref()
            .and_then(|parent_id| tree.find_by_config_id(parent_id))
            .filter(|&parent| tree.is_attached(parent) && parent != tree.ground())
            .map(|parent| {
                let count = tree.children(parent).len();
                ItemLocation {
                    parent,
                    index: config.index_in_parent.unwrap_or(count).min(count),
                }
            })
            .or_else(|| tree.root().map(|root| ItemLocation { parent: root, index: 0 }))
            .unwrap_or(ItemLocation {
                parent: tree.ground(),
                index: 0,
            });

        let id = self.insert_config_at(root, location)?;
        log::debug!("popped in as {id} at {location:?}");
        Ok(Some(id))
    }

    // ------------------------------------------------------------------------------------
    // Child side

    /// The manager running inside popout window `id`, built from the config the parent
    /// opened the window with.
    pub fn new_popout_child(
        config: PopoutLayoutConfig,
        id: PopoutId,
        registry: ComponentRegistry,
        options: LayoutManagerOptions,
    ) -> Self {
        let mut manager = Self::new(config.layout, registry, options);
        manager.popout_context = Some(PopoutContext { id });
        manager
    }

    /// Which popout this manager runs in, if any.
    pub fn popout_id(&self) -> Option<PopoutId> {
        self.popout_context.as_ref().map(|context| context.id)
    }

    /// Tear this popout's layout down and hand its content back to the parent.
    ///
    /// The host delivers the message to the parent's
    /// [`LayoutManager::handle_popout_message`] and closes the window.
    pub fn request_pop_in(&mut self) -> Result<PopoutMessage, LayoutError> {
        let Some(popout_id) = self.popout_id() else {
            return Err(LayoutError::invalid_state("not running in a popout"));
        };
        self.ensure_live("request_pop_in")?;
        if self.drag.is_active() {
            return Err(LayoutError::invalid_state("cannot pop in while dragging"));
        }
        let config = self.tree.root().and_then(|root| self.tree.to_config(root));
        self.destroy();
        Ok(PopoutMessage::PopIn { popout_id, config })
    }

    /// The message telling the parent this popout's window is closing.
    pub fn closing_message(&self) -> Option<PopoutMessage> {
        self.popout_id()
            .map(|popout_id| PopoutMessage::Closing { popout_id })
    }
}
