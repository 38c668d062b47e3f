//! Keyed list reconciliation.
//!
//! Both entry points classify every key of the union of two sequences as
//! created, moved, deleted or unchanged, and return the entries sorted by
//! their target position: survivors and new items at their new index,
//! deleted items at their old index. Ties between a deleted item and a
//! survivor keep the order in which the keys were first seen (old sequence
//! first), which puts the deleted item before the survivor that took its
//! slot.
use crate::dom::{Document, NodeId};
use crate::errors::{ReconcilerError, Side};
use crate::types::{DiffEntry, ItemStatus, Key, Keyed};
use indexmap::IndexMap;

/// Map identity of a wrapper. Keyless items are never matched, so each gets
/// an identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    Keyed(Key),
    Orphan(Side, usize),
}

#[derive(Debug)]
struct Wrapper<T> {
    key: Option<Key>,
    old_index: Option<usize>,
    new_index: Option<usize>,
    item: Option<T>,
}

impl<T> Wrapper<T> {
    fn order(&self) -> usize {
        self.new_index.or(self.old_index).unwrap_or_default()
    }

    fn status(&self) -> ItemStatus {
        ItemStatus::classify(self.old_index, self.new_index)
    }
}

/// Whether a matched wrapper takes the item from the new sequence or keeps
/// the one it was created with.
#[derive(Clone, Copy, PartialEq, Eq)]
enum MatchedItem {
    KeepOld,
    TakeNew,
}

struct DiffEngine<T> {
    wrappers: IndexMap<Identity, Wrapper<T>>,
}

impl<T: Keyed + Clone> DiffEngine<T> {
    fn new() -> Self {
        DiffEngine { wrappers: IndexMap::new() }
    }

    fn insert_old(&mut self, index: usize, key: Option<Key>, item: Option<T>) {
        let identity = match &key {
            Some(key) => Identity::Keyed(key.clone()),
            None => {
                log::warn!("DiffEngine: old item at index {} has no key and will be dropped", index);
                Identity::Orphan(Side::Old, index)
            }
        };
        // A repeated key keeps its first map position and the last index.
        self.wrappers.insert(identity, Wrapper { key, old_index: Some(index), new_index: None, item });
    }

    fn insert_new(&mut self, new_seq: &[T], matched: MatchedItem) {
        for (index, item) in new_seq.iter().enumerate() {
            let Some(key) = item.key() else {
                log::warn!("DiffEngine: new item at index {} has no key and can never be matched", index);
                self.wrappers.insert(
                    Identity::Orphan(Side::New, index),
                    Wrapper { key: None, old_index: None, new_index: Some(index), item: Some(item.clone()) },
                );
                continue;
            };
            match self.wrappers.get_mut(&Identity::Keyed(key.clone())) {
                Some(wrapper) => {
                    wrapper.new_index = Some(index);
                    if matched == MatchedItem::TakeNew {
                        wrapper.item = Some(item.clone());
                    }
                }
                None => {
                    self.wrappers.insert(
                        Identity::Keyed(key.clone()),
                        Wrapper { key: Some(key), old_index: None, new_index: Some(index), item: Some(item.clone()) },
                    );
                }
            }
        }
    }

    fn finish(self) -> Vec<DiffEntry<T>> {
        let mut wrappers: Vec<Wrapper<T>> = self.wrappers.into_values().collect();
        // Stable: equal orders keep map insertion order.
        wrappers.sort_by_key(Wrapper::order);
        wrappers
            .into_iter()
            .map(|w| {
                let status = w.status();
                DiffEntry { key: w.key, item: w.item, status }
            })
            .collect()
    }
}

/// Classify every item of `new_seq` against `old_seq` (`None` is empty).
///
/// Matched items keep the instance from `old_seq`; only their position is
/// compared. Keyless items are tolerated: a keyless new item becomes its own
/// `Created` entry and a keyless old item its own `Deleted` entry.
pub fn difference<T: Keyed + Clone>(new_seq: &[T], old_seq: Option<&[T]>) -> Vec<DiffEntry<T>> {
    let mut engine = DiffEngine::new();
    for (index, item) in old_seq.unwrap_or_default().iter().enumerate() {
        engine.insert_old(index, item.key(), Some(item.clone()));
    }
    engine.insert_new(new_seq, MatchedItem::KeepOld);
    let diff = engine.finish();
    log::debug!(
        "difference: {} new / {} old items -> {} entries",
        new_seq.len(),
        old_seq.map_or(0, <[T]>::len),
        diff.len()
    );
    diff
}

/// Like [`difference`], but a keyless item on either side is an error.
pub fn try_difference<T: Keyed + Clone>(
    new_seq: &[T],
    old_seq: Option<&[T]>,
) -> Result<Vec<DiffEntry<T>>, ReconcilerError> {
    check_keys(new_seq, Side::New)?;
    if let Some(old) = old_seq {
        check_keys(old, Side::Old)?;
    }
    Ok(difference(new_seq, old_seq))
}

fn check_keys<T: Keyed>(seq: &[T], side: Side) -> Result<(), ReconcilerError> {
    match seq.iter().position(|item| item.key().is_none()) {
        Some(index) => Err(ReconcilerError::MissingKey { side, index }),
        None => Ok(()),
    }
}

/// Classify `new_seq` against the keyed children of `parent`.
///
/// Children without a `key` dataset attribute are skipped and do not count
/// towards old indices. Entries for children absent from `new_seq` carry no
/// item; matched entries carry the new item.
pub fn difference_dom<T: Keyed + Clone>(new_seq: &[T], document: &Document, parent: NodeId) -> Vec<DiffEntry<T>> {
    let mut engine = DiffEngine::new();
    let keyed = document
        .children(parent)
        .iter()
        .filter_map(|&child| document.key_of(child));
    for (index, key) in keyed.enumerate() {
        engine.insert_old(index, Some(key), None);
    }
    engine.insert_new(new_seq, MatchedItem::TakeNew);
    engine.finish()
}
