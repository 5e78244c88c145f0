//! Converting between [`ItemConfig`] trees and live items.

use itertools::Itertools as _;
use serde_json::Value;

use super::{Component, ContentItem, ItemId, ItemKind, LayoutTree, Stack};
use crate::config::{HeaderConfig, ItemConfig, ItemType, title_for_component_type};
use crate::error::{ConfigError, LayoutError};
use crate::size::{SizeUnit, SizeWithUnit};

/// Check that `config` can be built under a parent of type `parent`, without touching
/// any tree. Components under a non-stack parent are accepted: they get wrapped.
pub(crate) fn validate_config(config: &ItemConfig, parent: ItemType) -> Result<(), LayoutError> {
    if let Some(size) = &config.size {
        SizeWithUnit::parse(size, SizeUnit::ITEM_SIZE)?;
    }
    if let Some(min_size) = &config.min_size {
        SizeWithUnit::parse(min_size, SizeUnit::MIN_SIZE)?;
    }

    match config.item_type {
        ItemType::Ground => return Err(ConfigError::UnexpectedItem("ground").into()),
        ItemType::Component => {
            if !config.content.is_empty() {
                return Err(ConfigError::ComponentWithContent.into());
            }
            if config.component_type.is_none() {
                return Err(ConfigError::MissingComponentType.into());
            }
        }
        ItemType::Stack => {
            if parent == ItemType::Stack {
                return Err(ConfigError::UnexpectedItem("stack").into());
            }
            for child in &config.content {
                if child.item_type != ItemType::Component {
                    return Err(ConfigError::NonComponentInStack {
                        found: child.item_type.name(),
                    }
                    .into());
                }
                validate_config(child, ItemType::Stack)?;
            }
        }
        ItemType::Row | ItemType::Column => {
            if parent == ItemType::Stack {
                return Err(ConfigError::UnexpectedItem(config.item_type.name()).into());
            }
            for child in &config.content {
                validate_config(child, config.item_type)?;
            }
        }
    }
    Ok(())
}

/// Which component of a stack config starts active.
///
/// An index past the last component falls back to the first one, when building and
/// when merging into an existing stack alike.
pub(crate) fn active_index_of(config: &ItemConfig) -> usize {
    match config.active_item_index {
        Some(index) if index < config.content.len() => index,
        Some(index) => {
            log::debug!(
                "active item index {index} is out of range for {} components, using 0",
                config.content.len()
            );
            0
        }
        None => 0,
    }
}

/// Component types found in `config`, pre-order.
pub(crate) fn component_types(config: &ItemConfig) -> Vec<&Value> {
    let mut out = Vec::new();
    collect_component_types(config, &mut out);
    out
}

fn collect_component_types<'a>(config: &'a ItemConfig, out: &mut Vec<&'a Value>) {
    if let Some(component_type) = &config.component_type {
        out.push(component_type);
    }
    for child in &config.content {
        collect_component_types(child, out);
    }
}

impl LayoutTree {
    /// Build `config` as a new unattached item ready to go under a parent of type
    /// `parent`. Validate with [`validate_config`] first.
    ///
    /// A component destined for anything but a stack comes back wrapped in a new stack
    /// that takes over its size.
    pub(crate) fn build_item(
        &mut self,
        config: &ItemConfig,
        parent: ItemType,
    ) -> Result<ItemId, LayoutError> {
        let id = self.build_unwrapped(config)?;
        if config.item_type != ItemType::Component || parent == ItemType::Stack {
            return Ok(id);
        }

        let (size, min_size) = match self.get_mut(id) {
            Some(component) => (
                std::mem::take(&mut component.size),
                component.min_size.take(),
            ),
            None => (SizeWithUnit::DEFAULT, None),
        };
        let stack = self.new_stack_with(id);
        if let Some(stack_item) = self.get_mut(stack) {
            stack_item.size = size;
            stack_item.min_size = min_size;
        }
        Ok(stack)
    }

    fn build_unwrapped(&mut self, config: &ItemConfig) -> Result<ItemId, LayoutError> {
        let kind = match config.item_type {
            ItemType::Ground => return Err(ConfigError::UnexpectedItem("ground").into()),
            ItemType::Row => ItemKind::Row {
                children: Vec::new(),
            },
            ItemType::Column => ItemKind::Column {
                children: Vec::new(),
            },
            ItemType::Stack => ItemKind::Stack(Stack {
                header: config.header.map(|h| h.show),
                ..Stack::default()
            }),
            ItemType::Component => {
                let component_type = config
                    .component_type
                    .clone()
                    .ok_or(ConfigError::MissingComponentType)?;
                let title = config
                    .title
                    .clone()
                    .unwrap_or_else(|| title_for_component_type(&component_type));
                ItemKind::Component(Component {
                    component_type,
                    state: config.component_state.clone().unwrap_or(Value::Null),
                    title,
                    reorder_enabled: config.reorder_enabled.unwrap_or(true),
                    handle: None,
                })
            }
        };

        let mut item = ContentItem::new(kind);
        item.id = config.id.clone();
        item.is_closable = config.is_closable.unwrap_or(true);
        if let Some(size) = &config.size {
            item.size = SizeWithUnit::parse(size, SizeUnit::ITEM_SIZE)?;
        }
        if let Some(min_size) = &config.min_size {
            item.min_size = Some(SizeWithUnit::parse(min_size, SizeUnit::MIN_SIZE)?);
        }
        let id = self.insert_item(item);

        for child in &config.content {
            let child_id = self.build_item(child, config.item_type)?;
            self.attach(id, child_id, None);
        }

        if config.item_type == ItemType::Stack {
            let active = self.children(id).get(active_index_of(config)).copied();
            if let Some(active) = active {
                self.set_active_component(active, false);
            }
            if let Some(stack) = self.stack_mut(id) {
                stack.maximised = config.maximised.unwrap_or(false);
            }
        }
        Ok(id)
    }

    /// Validate and build `config` as the root, replacing whatever was there.
    ///
    /// Nothing changes if the config is invalid. A config that simplifies away entirely
    /// (an empty stack, say) leaves the layout empty.
    pub fn load_root(&mut self, config: &ItemConfig) -> Result<Option<ItemId>, LayoutError> {
        validate_config(config, ItemType::Ground)?;
        let built = self.build_item(config, ItemType::Ground)?;
        self.clear();
        let ground = self.ground();
        self.attach(ground, built, None);
        self.simplify();
        Ok(self.root())
    }

    /// A tree holding `config` as its root.
    pub fn from_root_config(config: &ItemConfig) -> Result<Self, LayoutError> {
        let mut tree = Self::new();
        tree.load_root(config)?;
        Ok(tree)
    }

    /// Serialise `id` and its subtree.
    ///
    /// Sizes and component titles are always written, so a saved config loads back into
    /// the same tree even if the defaults change. Other fields are left out while they
    /// hold their default.
    pub fn to_config(&self, id: ItemId) -> Option<ItemConfig> {
        let item = self.get(id)?;
        let mut config = ItemConfig::new(item.item_type());
        config.id = item.id.clone();
        config.size = Some(item.size.to_string());
        config.min_size = item.min_size.map(|m| m.to_string());
        config.is_closable = (!item.is_closable).then_some(false);
        config.content = item
            .children()
            .iter()
            .filter_map(|&child| self.to_config(child))
            .collect();

        match &item.kind {
            ItemKind::Stack(stack) => {
                config.active_item_index = stack
                    .active
                    .and_then(|active| stack.children.iter().position(|&c| c == active));
                config.maximised = stack.maximised.then_some(true);
                config.header = stack.header.map(|show| HeaderConfig { show });
            }
            ItemKind::Component(component) => {
                config.component_type = Some(component.component_type.clone());
                if !component.state.is_null() {
                    config.component_state = Some(component.state.clone());
                }
                config.title = Some(component.title.clone());
                config.reorder_enabled = (!component.reorder_enabled).then_some(false);
            }
            ItemKind::Ground { .. } | ItemKind::Row { .. } | ItemKind::Column { .. } => {}
        }
        Some(config)
    }

    /// Structural fingerprint of the attached tree, for comparing layouts.
    pub fn shape(&self) -> String {
        fn write(tree: &LayoutTree, id: ItemId, out: &mut String) {
            let Some(item) = tree.get(id) else {
                return;
            };
            out.push_str(item.item_type().name());
            if let Some(component) = item.component() {
                out.push_str(&format!("({})", component.component_type));
            }
            if let Some(stack) = item.stack() {
                let active = stack
                    .active
                    .and_then(|a| stack.children.iter().position(|&c| c == a));
                if let Some(active) = active {
                    out.push_str(&format!("@{active}"));
                }
            }
            if item.parent().is_some_and(|p| tree.item_type(p).is_some_and(ItemType::is_row_or_column)) {
                out.push_str(&format!(":{}", item.size));
            }
            let children = item.children();
            if !children.is_empty() {
                let inner = children
                    .iter()
                    .map(|&child| {
                        let mut s = String::new();
                        write(tree, child, &mut s);
                        s
                    })
                    .join(",");
                out.push_str(&format!("[{inner}]"));
            }
        }

        let mut out = String::new();
        write(self, self.ground, &mut out);
        out
    }
}
