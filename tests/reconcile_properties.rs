use list_reconciler::{
    apply_list_changes, apply_list_changes_base, difference, dom::Transition, ItemStatus, Key, NodeId, PatchAction,
    Stage,
};
use proptest::prelude::*;
use std::collections::HashSet;

/// Keep the first occurrence of every key.
fn unique(raw: Vec<u32>) -> Vec<Key> {
    let mut seen = HashSet::new();
    raw.into_iter().filter(|k| seen.insert(*k)).map(Key::from).collect()
}

fn keyed_seq() -> impl Strategy<Value = Vec<Key>> {
    prop::collection::vec(0u32..24, 0..16).prop_map(unique)
}

fn create_li(stage: &mut Stage, _: &Key) -> NodeId {
    let node = stage.document.create_element("li");
    stage.document[node].height = 10.0;
    node
}

fn child_keys(stage: &Stage, parent: NodeId) -> Vec<Key> {
    stage
        .document
        .children(parent)
        .iter()
        .filter_map(|&c| stage.document.key_of(c))
        .collect()
}

fn mounted(old: &[Key]) -> (Stage, NodeId) {
    let mut stage = Stage::new();
    let root = stage.document.root();
    let parent = stage.document.create_element("ul");
    stage.document.append_child(root, parent);
    apply_list_changes_base(&mut stage, old, parent, create_li, false);
    stage.document.take_journal();
    (stage, parent)
}

proptest! {
    #[test]
    fn every_key_of_the_union_appears_once(new in keyed_seq(), old in keyed_seq()) {
        let diff = difference(&new, Some(old.as_slice()));
        let union: HashSet<&Key> = new.iter().chain(old.iter()).collect();
        prop_assert_eq!(diff.len(), union.len());
        let keys: HashSet<Key> = diff.iter().filter_map(|e| e.key.clone()).collect();
        prop_assert_eq!(keys.len(), diff.len());
    }

    #[test]
    fn status_follows_positions(new in keyed_seq(), old in keyed_seq()) {
        let diff = difference(&new, Some(old.as_slice()));
        for entry in &diff {
            let key = entry.key.as_ref().unwrap();
            let old_index = old.iter().position(|k| k == key);
            let new_index = new.iter().position(|k| k == key);
            prop_assert_eq!(entry.status, ItemStatus::classify(old_index, new_index));
        }
    }

    #[test]
    fn identical_sequences_are_all_unchanged(seq in keyed_seq()) {
        let diff = difference(&seq, Some(seq.as_slice()));
        prop_assert!(diff.iter().all(|e| e.status == ItemStatus::Unchanged));
        let keys: Vec<Key> = diff.into_iter().filter_map(|e| e.key).collect();
        prop_assert_eq!(keys, seq);
    }

    #[test]
    fn survivors_come_out_in_new_order(new in keyed_seq(), old in keyed_seq()) {
        let diff = difference(&new, Some(old.as_slice()));
        let survivors: Vec<Key> = diff
            .into_iter()
            .filter(|e| e.status != ItemStatus::Deleted)
            .filter_map(|e| e.key)
            .collect();
        prop_assert_eq!(survivors, new);
    }

    #[test]
    fn base_patch_reproduces_new_order(new in keyed_seq(), old in keyed_seq()) {
        let (mut stage, parent) = mounted(&old);
        let diff = apply_list_changes_base(&mut stage, &new, parent, create_li, false);
        prop_assert_eq!(child_keys(&stage, parent), new);

        let journal = stage.document.take_journal();
        for (action, status) in [
            (PatchAction::Insert, ItemStatus::Created),
            (PatchAction::Move, ItemStatus::Moved),
            (PatchAction::Remove, ItemStatus::Deleted),
        ] {
            let operations = journal.iter().filter(|p| p.action == action).count();
            let entries = diff.iter().filter(|e| e.status == status).count();
            prop_assert_eq!(operations, entries);
        }
        let unchanged: HashSet<&Key> = diff
            .iter()
            .filter(|e| e.status == ItemStatus::Unchanged)
            .filter_map(|e| e.key.as_ref())
            .collect();
        prop_assert!(journal.iter().all(|p| p.key.as_ref().is_none_or(|k| !unchanged.contains(k))));
    }

    #[test]
    fn patching_twice_is_a_no_op(seq in keyed_seq(), old in keyed_seq()) {
        let (mut stage, parent) = mounted(&old);
        apply_list_changes_base(&mut stage, &seq, parent, create_li, false);
        stage.document.take_journal();
        let diff = apply_list_changes_base(&mut stage, &seq, parent, create_li, false);
        prop_assert!(diff.iter().all(|e| e.status == ItemStatus::Unchanged));
        prop_assert!(stage.document.take_journal().is_empty());
    }

    #[test]
    fn animated_patch_settles_into_new_order(
        steps in prop::collection::vec(keyed_seq(), 1..4),
        gaps in prop::collection::vec(0u64..30, 4),
    ) {
        let mut stage = Stage::new();
        let root = stage.document.root();
        let parent = stage.document.create_element("ul");
        stage.document.append_child(root, parent);
        let create = |stage: &mut Stage, key: &Key| {
            let node = create_li(stage, key);
            stage.document.style_mut(node).transition = Some(Transition::new("top", 200));
            node
        };

        for (seq, gap) in steps.iter().zip(&gaps) {
            apply_list_changes(&mut stage, seq, parent, create);
            stage.advance_by(*gap);
        }
        prop_assert!(stage.run_until_idle());
        // Elements still pinned wait for their transition to end.
        let pinned: Vec<NodeId> = stage
            .document
            .children(parent)
            .iter()
            .copied()
            .filter(|&c| stage.document.has_class(c, "deleted-item"))
            .collect();
        for node in pinned {
            stage.end_transition(node, "opacity");
        }
        prop_assert_eq!(child_keys(&stage, parent), steps.last().cloned().unwrap_or_default());
        for &child in stage.document.children(parent) {
            prop_assert_eq!(stage.document.style(child).top, 0.0);
        }
    }
}
