//! Keyed list reconciliation with animated patching and drag-to-reorder.
//!
//! [`difference`] and [`difference_dom`] classify every key of two sequences
//! as created, moved, deleted or unchanged. [`apply_list_changes_base`]
//! applies such a result to the children of a node in a [`Document`], and
//! [`apply_list_changes`] does the same with FLIP-style motion scheduled on
//! the stage's virtual clock. [`start_drag`] and [`drag_on_hold`] reorder a
//! bound vector by dragging one of its rendered elements.
//!
//! With the `python` feature the crate also builds as a Python extension
//! module exposing `difference`.
pub mod animation;
pub mod binding;
pub mod config;
pub mod diff_engine;
pub mod dom;
pub mod drag;
pub mod errors;
pub mod patcher;
pub mod scheduler;
pub mod stage;
pub mod types;

#[cfg(feature = "python")]
mod converters;
#[cfg(feature = "python")]
mod python;

pub use animation::{apply_list_changes, LIST_INITIALIZED_ATTR};
pub use binding::{bind, bind_many, unbind, unbind_on_destroy, Binding, Observable, SubscriptionId};
pub use config::Config;
pub use diff_engine::{difference, difference_dom, try_difference};
pub use dom::{Document, NodeId, KEY_ATTR};
pub use drag::{drag_on_hold, make_drag_on_hold, start_drag, DragOnHold, DragSession, DragStart, HoldPhase};
pub use errors::{ReconcilerError, Side};
pub use patcher::{apply_list_changes_base, keyed_children};
pub use scheduler::{Scheduler, TimerId};
pub use stage::{Event, EventType, PointerEvent, Stage};
pub use types::{DiffEntry, ItemStatus, Key, Keyed, Patch, PatchAction};
