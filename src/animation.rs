//! Animated list patching.
//!
//! Wraps [`apply_list_changes_base`] with FLIP-style motion: positions are
//! captured before the patch, moved elements are offset back to where they
//! were and then released towards zero, deleted elements are pinned in place
//! and flagged so their transition plays before removal, and elements created
//! into an already initialized list fade in.
//!
//! Every delayed step is a scheduler timer. Relocation and removal steps are
//! tied to the element's motion epoch: if a later reconciliation starts a new
//! relocation or removal of the same element, the earlier steps are dropped.
use crate::dom::{BoxSizing, MotionPhase, NodeId, Offset, Position};
use crate::patcher::{apply_list_changes_base, keyed_children};
use crate::stage::{Event, EventType, Stage};
use crate::types::{DiffEntry, ItemStatus, Key, Keyed};
use std::collections::HashMap;

/// Dataset flag set on a parent after its first animated reconciliation.
pub const LIST_INITIALIZED_ATTR: &str = "listInitialized";

/// Reconcile `parent` against `new_seq` and animate the result.
///
/// Returns the diff with shift-corrected statuses: unchanged items that sit
/// after an element still collapsing out of the list are reported as moved.
pub fn apply_list_changes<T, F>(stage: &mut Stage, new_seq: &[T], parent: NodeId, mut create: F) -> Vec<DiffEntry<T>>
where
    T: Keyed + Clone,
    F: FnMut(&mut Stage, &T) -> NodeId,
{
    let offsets_before: HashMap<Key, Offset> = keyed_children(&stage.document, parent)
        .into_iter()
        .map(|(key, node)| (key, stage.document.cumulative_offset(node)))
        .collect();
    let initialized = stage.document.data(parent, LIST_INITIALIZED_ATTR) == Some("true");

    let create_animated = |stage: &mut Stage, item: &T| {
        let node = create(stage, item);
        prepare_created(stage, node, initialized);
        node
    };
    let mut diff = apply_list_changes_base(stage, new_seq, parent, create_animated, true);
    let child_by_key = keyed_children(&stage.document, parent);
    let node_of = |entry: &DiffEntry<T>| entry.key.as_ref().and_then(|key| child_by_key.get(key)).copied();

    // Retained elements caught mid-removal by this reconciliation.
    let revived: Vec<NodeId> = diff
        .iter()
        .filter(|e| e.status.is_retained())
        .filter_map(node_of)
        .filter(|&node| is_leaving(stage, node))
        .collect();

    shift_after_leaving(stage, &mut diff, &node_of);

    for &node in &revived {
        // Cancels any pending removal step.
        stage.document.begin_motion(node, MotionPhase::Settled);
    }

    for entry in &diff {
        let Some(node) = node_of(entry) else {
            continue;
        };
        let old_offset = entry.key.as_ref().and_then(|key| offsets_before.get(key)).copied();
        match entry.status {
            ItemStatus::Created | ItemStatus::Unchanged => {}
            ItemStatus::Moved => {
                if stage.document.has_class(node, &stage.config.classes.dragging) {
                    continue;
                }
                if let Some(old) = old_offset {
                    relocate(stage, node, old);
                }
            }
            ItemStatus::Deleted => {
                let old = old_offset.unwrap_or_else(|| stage.document.cumulative_offset(node));
                leave(stage, node, old);
            }
        }
    }

    let retained: Vec<NodeId> = diff
        .iter()
        .filter(|e| e.status.is_retained())
        .filter_map(node_of)
        .collect();
    let settle_delay = stage.config.timings.settle_delay;
    stage.scheduler.set_timeout(settle_delay, move |stage| settle(stage, &retained, &revived));

    if !initialized {
        stage.document.set_data(parent, LIST_INITIALIZED_ATTR, "true");
    }
    log::debug!(
        "apply_list_changes: {} entries on {:?} (initialized={})",
        diff.len(),
        parent,
        initialized
    );
    diff
}

/// A node is mid-removal once it is flagged deleted or its removal has
/// started and the flag is still pending.
fn is_leaving(stage: &Stage, node: NodeId) -> bool {
    stage.document.has_class(node, &stage.config.classes.deleted)
        || stage.document.motion(node).phase == MotionPhase::Leaving
}

fn prepare_created(stage: &mut Stage, node: NodeId, initialized: bool) {
    let style = stage.document.style_mut(node);
    style.position = Position::Relative;
    style.top = 0.0;
    stage.on(node, EventType::TransitionEnd, move |stage, event| on_transition_end(stage, node, event));
    if initialized {
        let deleted = stage.config.classes.deleted.clone();
        stage.document.add_class(node, &deleted);
        stage.document.set_motion_phase(node, MotionPhase::Entering);
        let delay = stage.config.timings.fade_in_delay;
        // An element that started leaving meanwhile keeps its flag.
        stage.scheduler.set_timeout(delay, move |stage| {
            if stage.document.motion(node).phase == MotionPhase::Entering {
                stage.document.remove_class(node, &deleted);
                stage.document.set_motion_phase(node, MotionPhase::Settled);
            }
        });
    }
}

/// Elements that stay in the list but sit below one that is still collapsing
/// will shift once it goes, so they animate as moved.
fn shift_after_leaving<T>(
    stage: &Stage,
    diff: &mut [DiffEntry<T>],
    node_of: &impl Fn(&DiffEntry<T>) -> Option<NodeId>,
) {
    let mut shift_all_next = false;
    for entry in diff.iter_mut() {
        if !entry.status.is_retained() {
            continue;
        }
        let Some(node) = node_of(entry) else {
            continue;
        };
        if is_leaving(stage, node) {
            shift_all_next = true;
        } else if shift_all_next {
            entry.status = ItemStatus::Moved;
        }
    }
}

/// Offset the element back to its old position, then release it.
fn relocate(stage: &mut Stage, node: NodeId, old: Offset) {
    let new_top = stage.document.cumulative_offset(node).top;
    let current_top = stage.document.style(node).top;
    let offset = old.top - new_top - current_top;

    let moved = stage.config.classes.moved.clone();
    stage.document.remove_class(node, &moved);
    stage.document.style_mut(node).top = offset;
    let epoch = stage.document.begin_motion(node, MotionPhase::Relocating);

    let timings = stage.config.timings.clone();
    stage.scheduler.set_timeout(timings.move_class_delay, move |stage| {
        if stage.document.is_current_motion(node, epoch) {
            stage.document.add_class(node, &moved);
        }
    });
    stage.scheduler.set_timeout(timings.move_reset_delay, move |stage| {
        if stage.document.is_current_motion(node, epoch) {
            stage.document.style_mut(node).top = 0.0;
            stage.document.set_motion_phase(node, MotionPhase::Settled);
        }
    });
}

/// Pin a deleted element where it was and let its transition play, or drop
/// it right away when it has none.
fn leave(stage: &mut Stage, node: NodeId, old: Offset) {
    if !stage.document.has_active_transition(node) {
        stage.remove_element(node);
        return;
    }
    let width = stage.document.bounding_width(node);
    // Absolute tops resolve against the parent, not the page.
    let parent_top = stage
        .document
        .parent(node)
        .map_or(0.0, |parent| stage.document.cumulative_offset(parent).top);
    let moved = stage.config.classes.moved.clone();
    stage.document.remove_class(node, &moved);
    let style = stage.document.style_mut(node);
    style.position = Position::Absolute;
    style.box_sizing = BoxSizing::BorderBox;
    style.width = Some(width);
    style.top = old.top - parent_top;
    let epoch = stage.document.begin_motion(node, MotionPhase::Leaving);

    let deleted = stage.config.classes.deleted.clone();
    let delay = stage.config.timings.leave_class_delay;
    stage.scheduler.set_timeout(delay, move |stage| {
        if stage.document.is_current_motion(node, epoch) {
            stage.document.add_class(node, &deleted);
        }
    });
}

/// Put retained elements that were collapsing back into normal flow.
fn settle(stage: &mut Stage, retained: &[NodeId], revived: &[NodeId]) {
    let classes = stage.config.classes.clone();
    for &node in retained {
        if !stage.document.has_class(node, &classes.deleted) && !revived.contains(&node) {
            continue;
        }
        let style = stage.document.style_mut(node);
        style.position = Position::Relative;
        style.box_sizing = BoxSizing::Unset;
        style.width = None;
        style.top = 0.0;
        stage.document.remove_class(node, &classes.moved);
        stage.document.remove_class(node, &classes.deleted);
        if stage.document.motion(node).phase == MotionPhase::Leaving {
            stage.document.set_motion_phase(node, MotionPhase::Settled);
        }
    }
}

/// Finish a move or a removal once the element's transition is over.
fn on_transition_end(stage: &mut Stage, node: NodeId, event: &Event) {
    let Event::TransitionEnd { property } = event else {
        return;
    };
    let classes = stage.config.classes.clone();
    if property == "top" {
        stage.document.remove_class(node, &classes.moved);
    }
    if stage.document.has_class(node, &classes.deleted) {
        stage.remove_element(node);
    }
}
