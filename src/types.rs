//! Shared value types: keys, item status, diff entries and patch records
use crate::dom::NodeId;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a logical item across reconciliation calls.
///
/// Keys are compared as strings, so `Key::from(7)` and `Key::from("7")`
/// name the same item, matching how keys round-trip through the `key`
/// dataset attribute of a live child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(value: impl Into<String>) -> Self {
        Key(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(value)
    }
}

macro_rules! key_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                Key(value.to_string())
            }
        })*
    };
}

key_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Anything that can take part in a reconciliation.
///
/// Returning `None` marks the item as keyless: it is never matched against
/// the previous sequence.
pub trait Keyed {
    fn key(&self) -> Option<Key>;
}

impl Keyed for Key {
    fn key(&self) -> Option<Key> {
        Some(self.clone())
    }
}

/// JSON objects are keyed by their `"key"` member (string or number).
impl Keyed for serde_json::Value {
    fn key(&self) -> Option<Key> {
        match self.get("key")? {
            serde_json::Value::String(s) => Some(Key::from(s.as_str())),
            serde_json::Value::Number(n) => Some(Key::from(n.to_string())),
            serde_json::Value::Bool(b) => Some(Key::from(b.to_string())),
            _ => None,
        }
    }
}

/// Transition of one item between the old and the new sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Unchanged,
    Moved,
    Created,
    Deleted,
}

impl ItemStatus {
    /// Four-way classification from the item's old and new positions.
    pub fn classify(old_index: Option<usize>, new_index: Option<usize>) -> Self {
        match (old_index, new_index) {
            (None, _) => ItemStatus::Created,
            (Some(_), None) => ItemStatus::Deleted,
            (Some(old), Some(new)) if old != new => ItemStatus::Moved,
            _ => ItemStatus::Unchanged,
        }
    }

    /// Unchanged and moved items both survive into the new sequence.
    pub fn is_retained(self) -> bool {
        matches!(self, ItemStatus::Unchanged | ItemStatus::Moved)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStatus::Unchanged => "Unchanged",
            ItemStatus::Moved => "Moved",
            ItemStatus::Created => "Created",
            ItemStatus::Deleted => "Deleted",
        };
        f.write_str(name)
    }
}

/// One element of a reconciliation result.
///
/// `item` is `None` only for entries that exist solely in a live tree
/// (deleted children), where the node itself stands in for the item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry<T> {
    pub key: Option<Key>,
    pub item: Option<T>,
    pub status: ItemStatus,
}

/// Structural patch action recorded by the patcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchAction {
    Insert,
    Move,
    Remove,
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchAction::Insert => "INSERT",
            PatchAction::Move => "MOVE",
            PatchAction::Remove => "REMOVE",
        };
        f.write_str(name)
    }
}

/// A structural mutation applied to a live tree, as journaled by the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub action: PatchAction,
    pub node: NodeId,
    pub key: Option<Key>,
    /// Requested child index, `None` for removals.
    pub index: Option<usize>,
}

/// Global ID generator (lock-free, atomic)
static ID_COUNTER: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

pub fn next_id() -> u64 {
    ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
