//! Building layout configs from code.

use std::collections::BTreeMap;

use crate::config::ItemConfig;

/// Where a split puts the new *side* node relative to the *main* node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitDirection {
    Left,
    Right,
    Up,
    Down,
}

/// A logical node id used by [`LayoutBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuilderNodeId(u64);

#[derive(Clone, Debug)]
enum Node {
    Stack {
        components: Vec<ItemConfig>,
    },
    Split {
        dir: SplitDirection,
        side_fraction: f32,
        main: BuilderNodeId,
        side: BuilderNodeId,
    },
}

/// Builds an [`ItemConfig`] tree from code: create an empty node, split it, dock
/// components into the leaves, then [`Self::finish`].
///
/// Leaves become stacks. Leaves left empty produce empty stacks, which disappear when
/// the layout is loaded.
#[derive(Clone, Debug)]
pub struct LayoutBuilder {
    next_node_id: u64,
    nodes: BTreeMap<BuilderNodeId, Node>,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self {
            next_node_id: 1,
            nodes: BTreeMap::new(),
        }
    }

    fn alloc_node_id(&mut self) -> BuilderNodeId {
        let id = BuilderNodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);
        id
    }

    /// Create an empty leaf node.
    #[must_use]
    pub fn add_node(&mut self) -> BuilderNodeId {
        let id = self.alloc_node_id();
        self.nodes.insert(
            id,
            Node::Stack {
                components: Vec::new(),
            },
        );
        id
    }

    /// Split an existing node and return `(side, main)`.
    ///
    /// `node` itself becomes the row or column; its previous content moves into `main`,
    /// and `side` gets `side_fraction` of the space.
    #[must_use]
    pub fn split_node(
        &mut self,
        node: BuilderNodeId,
        dir: SplitDirection,
        side_fraction: f32,
    ) -> (BuilderNodeId, BuilderNodeId) {
        debug_assert!(
            (0.0..=1.0).contains(&side_fraction),
            "side_fraction must be in 0.0..=1.0"
        );

        let old = self.nodes.remove(&node).unwrap_or(Node::Stack {
            components: Vec::new(),
        });
        let main = self.alloc_node_id();
        self.nodes.insert(main, old);
        let side = self.add_node();

        self.nodes.insert(
            node,
            Node::Split {
                dir,
                side_fraction,
                main,
                side,
            },
        );
        (side, main)
    }

    /// Dock a component into a leaf node, as its last tab.
    ///
    /// # Panics
    /// If `node` does not exist or has been split.
    pub fn dock_component(&mut self, component: ItemConfig, node: BuilderNodeId) {
        match self.nodes.get_mut(&node) {
            Some(Node::Stack { components }) => components.push(component),
            Some(Node::Split { .. }) => {
                panic!("dock_component: node {node:?} is not a leaf");
            }
            None => {
                panic!("dock_component: node {node:?} does not exist");
            }
        }
    }

    pub fn dock_components(
        &mut self,
        components: impl IntoIterator<Item = ItemConfig>,
        node: BuilderNodeId,
    ) {
        for component in components {
            self.dock_component(component, node);
        }
    }

    /// Produce the config rooted at `root` (usually the first node created).
    pub fn finish(self, root: BuilderNodeId) -> ItemConfig {
        fn build(node_id: BuilderNodeId, nodes: &mut BTreeMap<BuilderNodeId, Node>) -> ItemConfig {
            match nodes.remove(&node_id) {
                Some(Node::Stack { components }) => ItemConfig::stack(components),
                Some(Node::Split {
                    dir,
                    side_fraction,
                    main,
                    side,
                }) => {
                    let side_percent = side_fraction * 100.0;
                    let main_item = build(main, nodes).with_size(format!("{}%", 100.0 - side_percent));
                    let side_item = build(side, nodes).with_size(format!("{side_percent}%"));
                    match dir {
                        SplitDirection::Left => ItemConfig::row(vec![side_item, main_item]),
                        SplitDirection::Right => ItemConfig::row(vec![main_item, side_item]),
                        SplitDirection::Up => ItemConfig::column(vec![side_item, main_item]),
                        SplitDirection::Down => ItemConfig::column(vec![main_item, side_item]),
                    }
                }
                None => ItemConfig::stack(Vec::new()),
            }
        }

        let mut nodes = self.nodes;
        build(root, &mut nodes)
    }
}
