//! Host context shared by the patchers and the drag controller.
//!
//! A `Stage` bundles the live document, the timer queue, the viewport and the
//! event listeners. Listener and timer callbacks receive `&mut Stage`, so any
//! of them can edit the tree, schedule more work or dispatch further events.
use crate::config::Config;
use crate::dom::{Document, MotionPhase, NodeId};
use crate::scheduler::{Due, Scheduler};
use crate::types::next_id;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Destroy,
    TransitionEnd,
    MoveItem,
    DragStart,
    DragEnd,
    PointerDown,
    PointerMove,
    PointerUp,
    PointerLeave,
}

/// Raw pointer input as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    /// Host event type name, e.g. `mousedown`.
    pub kind: String,
    pub target: Option<NodeId>,
    pub client_y: f64,
    pub page_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Destroy,
    TransitionEnd { property: String },
    MoveItem { old_index: usize, new_index: usize },
    DragStart,
    DragEnd,
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    PointerLeave(PointerEvent),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Destroy => EventType::Destroy,
            Event::TransitionEnd { .. } => EventType::TransitionEnd,
            Event::MoveItem { .. } => EventType::MoveItem,
            Event::DragStart => EventType::DragStart,
            Event::DragEnd => EventType::DragEnd,
            Event::PointerDown(_) => EventType::PointerDown,
            Event::PointerMove(_) => EventType::PointerMove,
            Event::PointerUp(_) => EventType::PointerUp,
            Event::PointerLeave(_) => EventType::PointerLeave,
        }
    }
}

pub type Listener = Rc<dyn Fn(&mut Stage, &Event)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub inner_height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { inner_height: 600.0, scroll_x: 0.0, scroll_y: 0.0 }
    }
}

/// Upper bound on virtual time `run_until_idle` will simulate.
const IDLE_HORIZON_MS: u64 = 60_000;

pub struct Stage {
    pub document: Document,
    pub scheduler: Scheduler,
    pub viewport: Viewport,
    pub config: Config,
    node_listeners: HashMap<NodeId, Vec<(ListenerId, EventType, Listener)>>,
    document_listeners: Vec<(ListenerId, EventType, Listener)>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Stage {
            document: Document::new(),
            scheduler: Scheduler::new(),
            viewport: Viewport::default(),
            config,
            node_listeners: HashMap::new(),
            document_listeners: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    pub fn on(
        &mut self,
        node: NodeId,
        event_type: EventType,
        listener: impl Fn(&mut Stage, &Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(next_id());
        self.node_listeners
            .entry(node)
            .or_default()
            .push((id, event_type, Rc::new(listener)));
        id
    }

    /// Document-level listener; receives pointer events for any target.
    pub fn on_document(
        &mut self,
        event_type: EventType,
        listener: impl Fn(&mut Stage, &Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(next_id());
        self.document_listeners.push((id, event_type, Rc::new(listener)));
        id
    }

    pub fn off(&mut self, id: ListenerId) {
        self.document_listeners.retain(|(l, _, _)| *l != id);
        for listeners in self.node_listeners.values_mut() {
            listeners.retain(|(l, _, _)| *l != id);
        }
    }

    pub fn listener_count(&self, node: NodeId, event_type: EventType) -> usize {
        self.node_listeners
            .get(&node)
            .map_or(0, |ls| ls.iter().filter(|(_, t, _)| *t == event_type).count())
    }

    pub fn document_listener_count(&self, event_type: EventType) -> usize {
        self.document_listeners.iter().filter(|(_, t, _)| *t == event_type).count()
    }

    /// Deliver `event` to the listeners of `node`, in registration order.
    pub fn dispatch(&mut self, node: NodeId, event: &Event) {
        let event_type = event.event_type();
        let listeners: Vec<Listener> = self
            .node_listeners
            .get(&node)
            .map(|ls| {
                ls.iter()
                    .filter(|(_, t, _)| *t == event_type)
                    .map(|(_, _, l)| Rc::clone(l))
                    .collect()
            })
            .unwrap_or_default();
        for listener in listeners {
            listener(self, event);
        }
    }

    fn dispatch_document(&mut self, event: &Event) {
        let event_type = event.event_type();
        let listeners: Vec<Listener> = self
            .document_listeners
            .iter()
            .filter(|(_, t, _)| *t == event_type)
            .map(|(_, _, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(self, event);
        }
    }

    // ---------------------------------------------------------------------
    // Host input
    // ---------------------------------------------------------------------

    /// Target listeners first, then document listeners.
    pub fn dispatch_pointer(&mut self, event: Event) {
        let target = match &event {
            Event::PointerDown(p) | Event::PointerMove(p) | Event::PointerUp(p) | Event::PointerLeave(p) => {
                p.target
            }
            _ => None,
        };
        if let Some(target) = target {
            self.dispatch(target, &event);
        }
        self.dispatch_document(&event);
    }

    fn pointer(&self, kind: &str, target: Option<NodeId>, page_y: f64) -> PointerEvent {
        PointerEvent {
            kind: kind.to_string(),
            target,
            client_y: page_y - self.viewport.scroll_y,
            page_y,
        }
    }

    pub fn pointer_down(&mut self, target: NodeId, page_y: f64) {
        let event = self.pointer("mousedown", Some(target), page_y);
        self.dispatch_pointer(Event::PointerDown(event));
    }

    pub fn pointer_move(&mut self, target: Option<NodeId>, page_y: f64) {
        let event = self.pointer("mousemove", target, page_y);
        self.dispatch_pointer(Event::PointerMove(event));
    }

    pub fn pointer_up(&mut self, target: Option<NodeId>, page_y: f64) {
        let event = self.pointer("mouseup", target, page_y);
        self.dispatch_pointer(Event::PointerUp(event));
    }

    pub fn pointer_leave(&mut self, target: NodeId) {
        let event = self.pointer("pointerleave", Some(target), 0.0);
        self.dispatch_pointer(Event::PointerLeave(event));
    }

    /// Report that a transition of `property` finished on `node`.
    pub fn end_transition(&mut self, node: NodeId, property: &str) {
        self.dispatch(node, &Event::TransitionEnd { property: property.to_string() });
    }

    // ---------------------------------------------------------------------
    // Tree helpers
    // ---------------------------------------------------------------------

    /// Fire `destroy` on an attached node, then detach it. Pending motion
    /// steps for the node are dropped.
    pub fn remove_element(&mut self, node: NodeId) {
        if self.document.is_attached(node) {
            self.dispatch(node, &Event::Destroy);
        }
        self.document.remove(node);
        self.document.begin_motion(node, MotionPhase::Removed);
        self.node_listeners.remove(&node);
    }

    /// Scroll the viewport, clamping at zero.
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.viewport.scroll_x = x.max(0.0);
        self.viewport.scroll_y = y.max(0.0);
    }

    // ---------------------------------------------------------------------
    // Time
    // ---------------------------------------------------------------------

    /// Move virtual time forward, running every timer that falls due.
    pub fn advance_by(&mut self, ms: u64) {
        let until = self.scheduler.now() + ms;
        while let Some(due) = self.scheduler.pop_due(until) {
            match due {
                Due::Once(task) => task(self),
                Due::Repeat(task) => task(self),
            }
        }
        self.scheduler.set_now(until);
    }

    /// Run timers until none are left. Returns `false` if timers were still
    /// pending after a minute of virtual time (a running interval).
    pub fn run_until_idle(&mut self) -> bool {
        let horizon = self.scheduler.now() + IDLE_HORIZON_MS;
        while let Some(next) = self.scheduler.next_due() {
            if next > horizon {
                return false;
            }
            let step = next - self.scheduler.now();
            self.advance_by(step);
        }
        true
    }
}
