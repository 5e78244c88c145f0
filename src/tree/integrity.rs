use std::collections::HashSet;

use super::{ItemId, ItemKind, LayoutTree};
use crate::config::ItemType;

/// Every structural problem of a settled tree, as human-readable lines.
///
/// "Settled" means no drag is in flight: every item is reachable from ground and the
/// tree has been simplified.
pub fn tree_integrity_issues(tree: &LayoutTree) -> Vec<String> {
    let mut issues: Vec<String> = Vec::new();
    let ground = tree.ground();

    if tree.item_type(ground) != Some(ItemType::Ground) {
        issues.push(format!("integrity: ground {ground} missing"));
        return issues;
    }
    if tree.children(ground).len() > 1 {
        issues.push(format!(
            "integrity: ground has {} children",
            tree.children(ground).len()
        ));
    }

    let mut visited: HashSet<ItemId> = HashSet::new();
    let mut stack: Vec<ItemId> = vec![ground];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            issues.push(format!("integrity: {id} reached twice"));
            continue;
        }
        let Some(item) = tree.get(id) else {
            issues.push(format!("integrity: missing item {id} (reachable)"));
            continue;
        };
        let item_type = item.item_type();
        if item_type == ItemType::Ground && id != ground {
            issues.push(format!("integrity: second ground {id}"));
        }

        let children = item.children();
        let mut local_set: HashSet<ItemId> = HashSet::new();
        for &child in children {
            if !local_set.insert(child) {
                issues.push(format!("integrity: parent {id} contains duplicate child {child}"));
            }
            match tree.get(child) {
                None => {
                    issues.push(format!("integrity: parent {id} references missing child {child}"));
                    continue;
                }
                Some(child_item) => {
                    if child_item.parent() != Some(id) {
                        issues.push(format!(
                            "integrity: child {child} of {id} points at parent {:?}",
                            child_item.parent()
                        ));
                    }
                    let child_type = child_item.item_type();
                    let allowed = match item_type {
                        ItemType::Stack => child_type == ItemType::Component,
                        ItemType::Component => false,
                        _ => !matches!(child_type, ItemType::Component | ItemType::Ground),
                    };
                    if !allowed {
                        issues.push(format!(
                            "integrity: {} {id} holds {} {child}",
                            item_type.name(),
                            child_type.name()
                        ));
                    }
                    if item_type.is_row_or_column() && child_type == item_type {
                        issues.push(format!("integrity: {} {child} nested in {id}", child_type.name()));
                    }
                }
            }
            stack.push(child);
        }

        match &item.kind {
            ItemKind::Row { children } | ItemKind::Column { children } if children.len() < 2 => {
                issues.push(format!(
                    "integrity: {} {id} has {} children",
                    item_type.name(),
                    children.len()
                ));
            }
            ItemKind::Stack(s) => {
                if s.children.is_empty() {
                    issues.push(format!("integrity: stack {id} is empty"));
                }
                match s.active {
                    Some(active) if !s.children.contains(&active) => issues.push(format!(
                        "integrity: stack {id} active {active} not in children={:?}",
                        s.children
                    )),
                    None if !s.children.is_empty() => {
                        issues.push(format!("integrity: stack {id} has no active child"));
                    }
                    _ => {}
                }
                let tab_set: HashSet<ItemId> = s.tabs.tabs().iter().map(|t| t.component).collect();
                let child_set: HashSet<ItemId> = s.children.iter().copied().collect();
                if tab_set != child_set || s.tabs.tab_count() != s.children.len() {
                    issues.push(format!(
                        "integrity: stack {id} tabs {:?} do not mirror children {:?}",
                        s.tabs.tabs().iter().map(|t| t.component).collect::<Vec<_>>(),
                        s.children
                    ));
                }
            }
            _ => {}
        }
    }

    let maximised: Vec<ItemId> = visited
        .iter()
        .filter(|&&id| tree.stack(id).is_some_and(|s| s.maximised))
        .copied()
        .collect();
    if maximised.len() > 1 {
        issues.push(format!("integrity: {} stacks maximised", maximised.len()));
    }

    let total = tree.len();
    if visited.len() != total {
        issues.push(format!(
            "integrity: unreachable items {} of {}",
            total.saturating_sub(visited.len()),
            total
        ));
    }

    issues
}
