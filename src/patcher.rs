//! Applies a reconciliation result to the children of a live node.
use crate::diff_engine::difference_dom;
use crate::dom::{Document, KEY_ATTR, NodeId};
use crate::stage::Stage;
use crate::types::{DiffEntry, ItemStatus, Key, Keyed};
use std::collections::{HashMap, HashSet};

/// Keyed children of `parent`. A key shared by several children maps to the
/// last of them.
pub fn keyed_children(document: &Document, parent: NodeId) -> HashMap<Key, NodeId> {
    document
        .children(parent)
        .iter()
        .filter_map(|&child| document.key_of(child).map(|key| (key, child)))
        .collect()
}

/// Detach every child of `parent` reconciliation cannot address: keyless
/// children, and all but the last child of a shared key.
fn prune_unmatchable(stage: &mut Stage, parent: NodeId) {
    let children = stage.document.children(parent);
    let mut seen = HashSet::new();
    let mut stray = Vec::new();
    for &child in children.iter().rev() {
        let Some(key) = stage.document.key_of(child) else {
            log::debug!("apply_list_changes_base: pruning keyless child {:?}", child);
            stray.push(child);
            continue;
        };
        if seen.contains(&key) {
            log::warn!("apply_list_changes_base: pruning child {:?} with duplicate key {}", child, key);
            stray.push(child);
        } else {
            seen.insert(key);
        }
    }
    for child in stray.into_iter().rev() {
        stage.remove_element(child);
    }
}

/// Bring the children of `parent` in line with `new_seq`.
///
/// `create` is called exactly once per created item; the patcher stamps the
/// item's key on the returned node. Created and moved nodes are placed, in
/// target order, directly after the previous surviving node, so unchanged
/// nodes are never touched and the survivors end up in `new_seq` order.
/// Deleted nodes get `destroy` and are detached afterwards, unless
/// `preserve_deleted` is set, in which case they stay where they are for the
/// caller to animate out.
///
/// Returns the diff that was applied.
pub fn apply_list_changes_base<T, F>(
    stage: &mut Stage,
    new_seq: &[T],
    parent: NodeId,
    mut create: F,
    preserve_deleted: bool,
) -> Vec<DiffEntry<T>>
where
    T: Keyed + Clone,
    F: FnMut(&mut Stage, &T) -> NodeId,
{
    prune_unmatchable(stage, parent);
    let child_by_key = keyed_children(&stage.document, parent);
    let diff = difference_dom(new_seq, &stage.document, parent);

    let lookup = |entry: &DiffEntry<T>| entry.key.as_ref().and_then(|key| child_by_key.get(key)).copied();

    let mut anchor: Option<NodeId> = None;
    for entry in &diff {
        match entry.status {
            ItemStatus::Deleted => {}
            ItemStatus::Unchanged => {
                if let Some(node) = lookup(entry) {
                    anchor = Some(node);
                }
            }
            ItemStatus::Created => {
                let Some(item) = entry.item.as_ref() else {
                    continue;
                };
                let node = create(stage, item);
                match &entry.key {
                    Some(key) => stage.document.set_data(node, KEY_ATTR, key.as_str()),
                    None => log::warn!("apply_list_changes_base: created node {:?} has no key", node),
                }
                stage.document.insert_after(parent, node, anchor);
                anchor = Some(node);
            }
            ItemStatus::Moved => match lookup(entry) {
                Some(node) => {
                    stage.document.insert_after(parent, node, anchor);
                    anchor = Some(node);
                }
                None => log::warn!("apply_list_changes_base: no child for moved key {:?}", entry.key),
            },
        }
    }

    if !preserve_deleted {
        for entry in diff.iter().filter(|e| e.status == ItemStatus::Deleted) {
            if let Some(node) = lookup(entry) {
                stage.remove_element(node);
            }
        }
    }

    log::debug!(
        "apply_list_changes_base: {} entries applied to {:?} (preserve_deleted={})",
        diff.len(),
        parent,
        preserve_deleted
    );
    diff
}
