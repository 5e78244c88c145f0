use super::{ItemId, ItemKind, LayoutTree};
use crate::size::{SizeWithUnit, distribute};

/// Resolution used to turn a container's children into shares of it.
const SHARE_RESOLUTION: f32 = 10_000.0;

impl LayoutTree {
    /// Collapse the tree until it is canonical:
    /// - empty stacks, rows and columns are removed,
    /// - a row or column with one child is replaced by that child,
    /// - a row inside a row (or column inside a column) is spliced into its parent.
    ///
    /// Returns the ids of the removed containers.
    pub(crate) fn simplify(&mut self) -> Vec<ItemId> {
        let mut removed = Vec::new();
        loop {
            let mut changed = false;
            // Reverse pre-order visits children before their parents.
            for id in self.dfs().into_iter().rev() {
                if self.contains(id) {
                    changed |= self.simplify_item(id, &mut removed);
                }
            }
            if !changed {
                break;
            }
        }
        removed
    }

    fn simplify_item(&mut self, id: ItemId, removed: &mut Vec<ItemId>) -> bool {
        if id == self.ground() {
            return false;
        }
        let Some(item) = self.get(id) else {
            return false;
        };

        match &item.kind {
            ItemKind::Stack(stack) if stack.children.is_empty() => {
                log::trace!("simplify: removing empty stack {id}");
                self.remove_subtree(id);
                removed.push(id);
                true
            }
            ItemKind::Row { children } | ItemKind::Column { children } => {
                let axis = item.kind.axis();
                match children.len() {
                    0 => {
                        log::trace!("simplify: removing empty {id}");
                        self.remove_subtree(id);
                        removed.push(id);
                        true
                    }
                    1 => {
                        let only = children[0];
                        self.replace_with_child(id, only);
                        removed.push(id);
                        true
                    }
                    _ => {
                        let nested = children
                            .iter()
                            .position(|&c| self.get(c).and_then(|c| c.kind.axis()) == axis);
                        match nested {
                            Some(index) => {
                                let child = children[index];
                                self.splice_child(id, child, index);
                                removed.push(child);
                                true
                            }
                            None => false,
                        }
                    }
                }
            }
            _ => false,
        }
    }

    /// Put `child` in `container`'s slot, inheriting its size, and drop `container`.
    fn replace_with_child(&mut self, container: ItemId, child: ItemId) {
        log::trace!("simplify: replacing {container} by its only child {child}");
        let Some(location) = self.location_of(container) else {
            return;
        };
        let (size, min_size) = match self.get(container) {
            Some(item) => (item.size, item.min_size),
            None => return,
        };

        self.detach(child, false);
        self.remove_subtree(container);
        if let Some(child_item) = self.get_mut(child) {
            child_item.size = size;
            if child_item.min_size.is_none() {
                child_item.min_size = min_size;
            }
        }
        self.attach(location.parent, child, Some(location.index));
    }

    /// Move the children of `child` (same axis as `container`) into `container` at
    /// `index`, keeping their share of the space `child` had.
    fn splice_child(&mut self, container: ItemId, child: ItemId, index: usize) {
        log::trace!("simplify: splicing {child} into {container}");
        let Some(child_size) = self.get(child).map(|item| item.size) else {
            return;
        };
        let grandchildren: Vec<ItemId> = self.children(child).to_vec();
        let sizes: Vec<SizeWithUnit> = grandchildren
            .iter()
            .filter_map(|&g| self.get(g).map(|item| item.size))
            .collect();
        let shares = distribute(&sizes, SHARE_RESOLUTION);

        self.detach(child, false);
        for (offset, (&grandchild, share)) in grandchildren.iter().zip(shares).enumerate() {
            self.detach(grandchild, false);
            if let Some(item) = self.get_mut(grandchild) {
                item.size = SizeWithUnit::new(
                    child_size.size * share / SHARE_RESOLUTION,
                    child_size.unit,
                );
            }
            self.attach(container, grandchild, Some(index + offset));
        }
        self.remove_subtree(child);
    }
}
