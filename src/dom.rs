//! Retained node tree the patchers operate on.
//!
//! The document is an arena of nodes addressed by [`NodeId`]. Nodes are never
//! freed: a removed node is only detached, so a timer that fires after its
//! node left the tree still has something valid to touch.
//!
//! Layout is a plain vertical block flow. Every attached node that is not
//! absolutely positioned stacks below its preceding in-flow siblings;
//! relative nodes are shifted by their `top` style on top of that; absolute
//! nodes sit at their `top` style inside their parent. This is the subset of
//! geometry the animation and drag code read back.
use crate::errors::ReconcilerError;
use crate::types::{Key, Patch, PatchAction};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::ops::{Index, IndexMut};

/// Dataset attribute carrying an item's key on its live node.
pub const KEY_ATTR: &str = "key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxSizing {
    #[default]
    Unset,
    BorderBox,
}

/// Declared CSS-like transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub property: String,
    pub duration_ms: u64,
}

impl Transition {
    pub fn new(property: impl Into<String>, duration_ms: u64) -> Self {
        Transition { property: property.into(), duration_ms }
    }

    /// `all 0s` is what an element without any transition computes to.
    pub fn is_noop(&self) -> bool {
        self.duration_ms == 0
    }
}

/// Inline style of a node. Only the properties the patchers write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub position: Position,
    pub top: f64,
    pub left: f64,
    /// `None` means unset: the layout width applies.
    pub width: Option<f64>,
    pub box_sizing: BoxSizing,
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPhase {
    #[default]
    Settled,
    /// Created into an initialized list, fading in.
    Entering,
    /// FLIP slide towards the new slot.
    Relocating,
    /// Pinned in place, waiting for its transition to end before removal.
    Leaving,
    Removed,
}

/// Animation bookkeeping of one node.
///
/// `epoch` increases each time a new relocation or removal starts, so steps
/// scheduled for an earlier one can tell they are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Motion {
    pub phase: MotionPhase,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    dataset: IndexMap<String, String>,
    classes: IndexSet<String>,
    pub style: Style,
    /// Intrinsic height, used when the node has no in-flow children.
    pub height: f64,
    /// Layout width.
    pub width: f64,
    /// Visible box height of a scroll container; `None` when the box grows
    /// with its content.
    pub client_height: Option<f64>,
    motion: Motion,
}

impl Node {
    fn new(tag: &str) -> Self {
        Node {
            tag: tag.to_string(),
            parent: None,
            children: Vec::new(),
            dataset: IndexMap::new(),
            classes: IndexSet::new(),
            style: Style::default(),
            height: 0.0,
            width: 0.0,
            client_height: None,
            motion: Motion::default(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self, name: &str) -> Option<&str> {
        self.dataset.get(name).map(String::as_str)
    }

    pub fn key(&self) -> Option<Key> {
        self.data(KEY_ATTR).map(Key::from)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    fn in_flow(&self) -> bool {
        self.style.position != Position::Absolute
    }
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    journal: Vec<Patch>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<NodeId> for Document {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Document {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            nodes: vec![Node::new("body")],
            root: NodeId(0),
            journal: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, ReconcilerError> {
        self.nodes.get(id.0).ok_or(ReconcilerError::UnknownNode(id))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self[id].parent.is_some()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self[id].parent?;
        self[parent].children.iter().position(|&c| c == id)
    }

    // ---------------------------------------------------------------------
    // Attributes and classes
    // ---------------------------------------------------------------------

    pub fn data(&self, id: NodeId, name: &str) -> Option<&str> {
        self[id].data(name)
    }

    pub fn set_data(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self[id].dataset.insert(name.to_string(), value.into());
    }

    pub fn remove_data(&mut self, id: NodeId, name: &str) {
        self[id].dataset.shift_remove(name);
    }

    pub fn key_of(&self, id: NodeId) -> Option<Key> {
        self[id].key()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self[id].has_class(class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        self[id].classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        self[id].classes.shift_remove(class);
    }

    pub fn style(&self, id: NodeId) -> &Style {
        &self[id].style
    }

    pub fn style_mut(&mut self, id: NodeId) -> &mut Style {
        &mut self[id].style
    }

    pub fn has_active_transition(&self, id: NodeId) -> bool {
        self[id]
            .style
            .transition
            .as_ref()
            .is_some_and(|t| !t.is_noop())
    }

    // ---------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self[parent].children.len();
        self.insert_child(parent, child, len);
    }

    /// Insert `child` so it lands at `index` among `parent`'s children.
    ///
    /// An index at or past the end appends; otherwise the child goes before
    /// whatever currently sits at `index`. Inserting a node before itself
    /// leaves it where it is.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let reference = self[parent].children.get(index).copied();
        if reference == Some(child) {
            self.record_placement(parent, child);
            return;
        }
        self.insert_before(parent, child, reference);
    }

    /// Place `child` directly after `anchor`, or first when there is no
    /// anchor. Returns the index the child ends up at.
    pub fn insert_after(&mut self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) -> usize {
        let siblings = &self[parent].children;
        let start = match anchor {
            None => Some(0),
            Some(anchor) => siblings.iter().position(|&c| c == anchor).map(|p| p + 1),
        };
        let reference = start.and_then(|start| siblings[start..].iter().copied().find(|&c| c != child));
        self.insert_before(parent, child, reference)
    }

    /// Insert `child` before `reference`, appending when there is none.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> usize {
        let was_child = self[child].parent == Some(parent);
        self.detach(child);
        let siblings = &mut self[parent].children;
        let index = match reference.and_then(|r| siblings.iter().position(|&c| c == r)) {
            Some(pos) => pos,
            None => siblings.len(),
        };
        siblings.insert(index, child);
        self[child].parent = Some(parent);
        let action = if was_child { PatchAction::Move } else { PatchAction::Insert };
        let key = self.key_of(child);
        self.journal.push(Patch { action, node: child, key, index: Some(index) });
        index
    }

    fn record_placement(&mut self, parent: NodeId, child: NodeId) {
        let index = self[parent].children.iter().position(|&c| c == child);
        let key = self.key_of(child);
        self.journal.push(Patch { action: PatchAction::Move, node: child, key, index });
    }

    /// Detach `id` from its parent. Detached nodes stay addressable.
    pub fn remove(&mut self, id: NodeId) {
        if self.detach(id) {
            let key = self.key_of(id);
            self.journal.push(Patch { action: PatchAction::Remove, node: id, key, index: None });
        }
    }

    fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self[id].parent.take() else {
            return false;
        };
        self[parent].children.retain(|&c| c != id);
        true
    }

    /// Structural mutations since the last call.
    pub fn take_journal(&mut self) -> Vec<Patch> {
        std::mem::take(&mut self.journal)
    }

    // ---------------------------------------------------------------------
    // Animation bookkeeping
    // ---------------------------------------------------------------------

    pub fn motion(&self, id: NodeId) -> Motion {
        self[id].motion
    }

    /// Start a new relocation or removal, invalidating steps of earlier ones.
    pub fn begin_motion(&mut self, id: NodeId, phase: MotionPhase) -> u64 {
        let motion = &mut self[id].motion;
        motion.epoch += 1;
        motion.phase = phase;
        motion.epoch
    }

    pub fn set_motion_phase(&mut self, id: NodeId, phase: MotionPhase) {
        self[id].motion.phase = phase;
    }

    pub fn is_current_motion(&self, id: NodeId, epoch: u64) -> bool {
        self[id].motion.epoch == epoch
    }

    // ---------------------------------------------------------------------
    // Layout queries
    // ---------------------------------------------------------------------

    pub fn offset_height(&self, id: NodeId) -> f64 {
        let node = &self[id];
        let mut flow = node.children.iter().filter(|&&c| self[c].in_flow()).peekable();
        if flow.peek().is_none() {
            return node.height;
        }
        flow.map(|&c| self.offset_height(c)).sum()
    }

    /// Top edge relative to the offset parent, including a relative shift.
    pub fn offset_top(&self, id: NodeId) -> f64 {
        let node = &self[id];
        let Some(parent) = node.parent else {
            return 0.0;
        };
        match node.style.position {
            Position::Absolute => node.style.top,
            position => {
                let flow_top: f64 = self[parent]
                    .children
                    .iter()
                    .take_while(|&&c| c != id)
                    .filter(|&&c| self[c].in_flow())
                    .map(|&c| self.offset_height(c))
                    .sum();
                if position == Position::Relative {
                    flow_top + node.style.top
                } else {
                    flow_top
                }
            }
        }
    }

    pub fn offset_left(&self, id: NodeId) -> f64 {
        let node = &self[id];
        match node.style.position {
            _ if node.parent.is_none() => 0.0,
            Position::Static => 0.0,
            Position::Relative | Position::Absolute => node.style.left,
        }
    }

    /// Top edge ignoring any relative shift: where the flow puts the node.
    pub fn layout_top(&self, id: NodeId) -> f64 {
        let node = &self[id];
        match node.style.position {
            Position::Relative => self.offset_top(id) - node.style.top,
            _ => self.offset_top(id),
        }
    }

    /// Page offset summed through the offset-parent chain.
    pub fn cumulative_offset(&self, id: NodeId) -> Offset {
        let mut offset = Offset::default();
        let mut current = Some(id);
        while let Some(node) = current {
            offset.top += self.offset_top(node);
            offset.left += self.offset_left(node);
            current = self[node].parent;
        }
        offset
    }

    pub fn bounding_width(&self, id: NodeId) -> f64 {
        let node = &self[id];
        node.style.width.unwrap_or(node.width)
    }

    pub fn scroll_height(&self, id: NodeId) -> f64 {
        self.offset_height(id)
    }

    pub fn client_height(&self, id: NodeId) -> f64 {
        self[id].client_height.unwrap_or_else(|| self.offset_height(id))
    }

    /// Nearest node, starting at `id` itself, whose content overflows its box.
    pub fn scrollable_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.scroll_height(node) > self.client_height(node) {
                return Some(node);
            }
            current = self[node].parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(doc: &mut Document, heights: &[f64]) -> (NodeId, Vec<NodeId>) {
        let parent = doc.create_element("ul");
        let root = doc.root();
        doc.append_child(root, parent);
        let items = heights
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                let li = doc.create_element("li");
                doc[li].height = h;
                doc.set_data(li, KEY_ATTR, i.to_string());
                doc.append_child(parent, li);
                li
            })
            .collect();
        (parent, items)
    }

    #[test]
    fn test_insert_child_clamps_and_reorders() {
        let mut doc = Document::new();
        let (parent, items) = list(&mut doc, &[10.0, 10.0, 10.0]);

        doc.insert_child(parent, items[2], 0);
        assert_eq!(doc.children(parent), &[items[2], items[0], items[1]]);

        doc.insert_child(parent, items[2], 99);
        assert_eq!(doc.children(parent), &[items[0], items[1], items[2]]);

        // Inserting before itself is a positional no-op.
        doc.insert_child(parent, items[1], 1);
        assert_eq!(doc.children(parent), &[items[0], items[1], items[2]]);
    }

    #[test]
    fn test_insert_after_anchor() {
        let mut doc = Document::new();
        let (parent, items) = list(&mut doc, &[10.0, 10.0, 10.0]);

        // Moving forwards lands right after the anchor, not before it.
        assert_eq!(doc.insert_after(parent, items[0], Some(items[1])), 1);
        assert_eq!(doc.children(parent), &[items[1], items[0], items[2]]);

        assert_eq!(doc.insert_after(parent, items[2], None), 0);
        assert_eq!(doc.children(parent), &[items[2], items[1], items[0]]);

        // Already in place: stays put.
        assert_eq!(doc.insert_after(parent, items[1], Some(items[2])), 1);
        assert_eq!(doc.children(parent), &[items[2], items[1], items[0]]);

        let fresh = doc.create_element("li");
        assert_eq!(doc.insert_after(parent, fresh, Some(items[0])), 3);
    }

    #[test]
    fn test_journal_distinguishes_insert_move_remove() {
        let mut doc = Document::new();
        let (parent, items) = list(&mut doc, &[10.0, 10.0]);
        doc.take_journal();

        doc.insert_child(parent, items[1], 0);
        doc.remove(items[0]);
        doc.remove(items[0]);
        let journal = doc.take_journal();
        let actions: Vec<_> = journal.iter().map(|p| p.action).collect();
        assert_eq!(actions, vec![PatchAction::Move, PatchAction::Remove]);
        assert_eq!(journal[1].key, Some(Key::from("0")));
    }

    #[test]
    fn test_flow_layout_offsets() {
        let mut doc = Document::new();
        let (parent, items) = list(&mut doc, &[10.0, 20.0, 30.0]);
        assert_eq!(doc.offset_top(items[2]), 30.0);
        assert_eq!(doc.offset_height(parent), 60.0);

        doc.style_mut(items[1]).position = Position::Relative;
        doc.style_mut(items[1]).top = 5.0;
        assert_eq!(doc.offset_top(items[1]), 15.0);
        assert_eq!(doc.layout_top(items[1]), 10.0);
        // A relative shift does not move later siblings.
        assert_eq!(doc.offset_top(items[2]), 30.0);

        doc.style_mut(items[0]).position = Position::Absolute;
        doc.style_mut(items[0]).top = 100.0;
        assert_eq!(doc.offset_top(items[0]), 100.0);
        assert_eq!(doc.offset_top(items[2]), 20.0);
        assert_eq!(doc.offset_height(parent), 50.0);
    }

    #[test]
    fn test_cumulative_offset_walks_parents() {
        let mut doc = Document::new();
        let header = doc.create_element("header");
        doc[header].height = 40.0;
        let root = doc.root();
        doc.append_child(root, header);
        let (_, items) = list(&mut doc, &[10.0, 10.0]);
        assert_eq!(doc.cumulative_offset(items[1]).top, 50.0);

        doc.remove(items[1]);
        assert_eq!(doc.cumulative_offset(items[1]).top, 0.0);
    }

    #[test]
    fn test_scrollable_ancestor_stops_at_root() {
        let mut doc = Document::new();
        let (parent, items) = list(&mut doc, &[100.0, 100.0]);
        assert_eq!(doc.scrollable_ancestor(items[0]), None);

        let root = doc.root();
        doc[root].client_height = Some(150.0);
        assert_eq!(doc.scrollable_ancestor(items[0]), Some(root));

        doc[parent].client_height = Some(50.0);
        assert_eq!(doc.scrollable_ancestor(items[0]), Some(parent));
    }

    #[test]
    fn test_motion_epochs() {
        let mut doc = Document::new();
        let node = doc.create_element("li");
        let first = doc.begin_motion(node, MotionPhase::Relocating);
        let second = doc.begin_motion(node, MotionPhase::Leaving);
        assert!(!doc.is_current_motion(node, first));
        assert!(doc.is_current_motion(node, second));
        assert_eq!(doc.motion(node).phase, MotionPhase::Leaving);
    }
}
