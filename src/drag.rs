//! Press-and-hold drag to reorder.
//!
//! A drag session follows the pointer with the dragged element, splices the
//! backing vector whenever the pointer enters another sibling's band and
//! scrolls the viewport while the pointer sits near its top or bottom edge.
//! The vector is copy-replaced through its [`Observable`]; the tree itself is
//! only reordered by the next reconciliation.
use crate::binding::Observable;
use crate::dom::{Document, NodeId, Position};
use crate::errors::ReconcilerError;
use crate::scheduler::TimerId;
use crate::stage::{Event, EventType, ListenerId, PointerEvent, Stage};
use phf::phf_set;
use std::cell::RefCell;
use std::rc::Rc;

/// Host event kinds accepted as the start of a drag.
static PRESS_KINDS: phf::Set<&'static str> = phf_set! {
    "mousedown",
    "pointerdown",
    "touchstart",
};

/// How a drag is started: explicit coordinates or the press event itself.
#[derive(Debug, Clone, PartialEq)]
pub enum DragStart {
    Options { client_y: f64, page_y: f64 },
    Event(PointerEvent),
}

impl DragStart {
    /// `(client_y, page_y)` of the press.
    fn coordinates(&self) -> Result<(f64, f64), ReconcilerError> {
        match self {
            DragStart::Options { client_y, page_y } => Ok((*client_y, *page_y)),
            DragStart::Event(event) if PRESS_KINDS.contains(event.kind.as_str()) => Ok((event.client_y, event.page_y)),
            DragStart::Event(event) => Err(ReconcilerError::UnsupportedInteractionKind { kind: event.kind.clone() }),
        }
    }
}

struct DragState<T> {
    items: Rc<Observable<Vec<T>>>,
    element: NodeId,
    grab_offset: f64,
    initial_index: Option<usize>,
    index: Option<usize>,
    element_y: Option<f64>,
    scroll_step: f64,
    scrollable: Option<NodeId>,
    active: bool,
    interval: Option<TimerId>,
    listeners: Vec<ListenerId>,
}

type SharedState<T> = Rc<RefCell<DragState<T>>>;

/// Handle on a running (or finished) drag.
pub struct DragSession<T> {
    state: SharedState<T>,
}

impl<T> Clone for DragSession<T> {
    fn clone(&self) -> Self {
        DragSession { state: Rc::clone(&self.state) }
    }
}

impl<T: Clone + 'static> DragSession<T> {
    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn element(&self) -> NodeId {
        self.state.borrow().element
    }

    /// Distance from the element's top edge to the press point.
    pub fn grab_offset(&self) -> f64 {
        self.state.borrow().grab_offset
    }

    /// Slot the element occupied at the first pointer move.
    pub fn initial_index(&self) -> Option<usize> {
        self.state.borrow().initial_index
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.borrow().index
    }

    /// Scroll applied on every auto-scroll tick; negative scrolls up.
    pub fn scroll_step(&self) -> f64 {
        self.state.borrow().scroll_step
    }

    /// End the drag as a pointer release would. Does nothing once released.
    pub fn release(&self, stage: &mut Stage) {
        release(stage, &self.state);
    }
}

/// Start dragging `element` right away.
///
/// Fails with `UnsupportedInteractionKind` for an event that is not a press,
/// leaving the element and the stage untouched.
pub fn start_drag<T: Clone + 'static>(
    stage: &mut Stage,
    items: Rc<Observable<Vec<T>>>,
    element: NodeId,
    start: DragStart,
) -> Result<DragSession<T>, ReconcilerError> {
    let (client_y, page_y) = start.coordinates()?;
    stage.document.get(element)?;

    let grab_offset = page_y - stage.document.cumulative_offset(element).top;
    let style = stage.document.style_mut(element);
    style.position = Position::Relative;
    style.left = 0.0;
    style.top = 0.0;
    let classes = stage.config.classes.clone();
    stage.document.add_class(element, &classes.dragging);
    stage.document.remove_class(element, &classes.moved);
    stage.dispatch(element, &Event::DragStart);

    let state: SharedState<T> = Rc::new(RefCell::new(DragState {
        items,
        element,
        grab_offset,
        initial_index: None,
        index: None,
        element_y: None,
        scroll_step: 0.0,
        scrollable: stage.document.scrollable_ancestor(element),
        active: true,
        interval: None,
        listeners: Vec::new(),
    }));

    let tick_state = Rc::clone(&state);
    let interval = stage
        .scheduler
        .set_interval(stage.config.timings.scroll_tick, move |stage| auto_scroll_tick(stage, &tick_state));

    let move_state = Rc::clone(&state);
    let on_move = stage.on_document(EventType::PointerMove, move |stage, event| {
        if let Event::PointerMove(pointer) = event {
            on_pointer_move(stage, &move_state, pointer.client_y, pointer.page_y);
        }
    });
    let up_state = Rc::clone(&state);
    let on_up = stage.on_document(EventType::PointerUp, move |stage, _| release(stage, &up_state));

    {
        let mut st = state.borrow_mut();
        st.interval = Some(interval);
        st.listeners = vec![on_move, on_up];
    }
    log::debug!(
        "start_drag: {:?} grabbed at client_y={} page_y={} (offset {})",
        element,
        client_y,
        page_y,
        grab_offset
    );
    Ok(DragSession { state })
}

/// Top of a sibling's band: its page position without any relative shift.
fn band_top(document: &Document, node: NodeId) -> f64 {
    let top = document.cumulative_offset(node).top;
    match document.style(node).position {
        Position::Relative => top - document.style(node).top,
        _ => top,
    }
}

/// Slot whose band contains `page_y`. The first band extends upwards and
/// the last one downwards without limit.
fn band_index(document: &Document, siblings: &[NodeId], page_y: f64) -> Option<usize> {
    let last = siblings.len().checked_sub(1)?;
    siblings.iter().enumerate().position(|(index, &sibling)| {
        let y = band_top(document, sibling);
        let height = document.offset_height(sibling);
        if index == 0 {
            page_y < y + height
        } else if index == last {
            page_y > y
        } else {
            page_y > y && page_y < y + height
        }
    })
}

fn on_pointer_move<T: Clone + 'static>(stage: &mut Stage, state: &SharedState<T>, client_y: f64, page_y: f64) {
    let (element, items, grab_offset) = {
        let st = state.borrow();
        if !st.active {
            return;
        }
        (st.element, Rc::clone(&st.items), st.grab_offset)
    };
    let Some(parent) = stage.document.parent(element) else {
        log::warn!("drag: {:?} left the tree mid-drag", element);
        return;
    };
    let siblings = stage.document.children(parent).to_vec();
    let current = {
        let mut st = state.borrow_mut();
        if st.index.is_none() {
            let own = siblings.iter().position(|&s| s == element);
            st.initial_index = own;
            st.index = own;
        }
        st.index
    };

    if let (Some(current), Some(target)) = (current, band_index(&stage.document, &siblings, page_y)) {
        if target != current {
            let snapshot = items.get();
            if current < snapshot.len() && target < snapshot.len() {
                let mut next = snapshot.as_ref().clone();
                let item = next.remove(current);
                next.insert(target, item);
                items.set(next);
            } else {
                log::warn!(
                    "drag: slot {} -> {} outside backing vector of {} items",
                    current,
                    target,
                    snapshot.len()
                );
            }
            stage.dispatch(element, &Event::MoveItem { old_index: current, new_index: target });
            stage.dispatch(siblings[target], &Event::MoveItem { old_index: target, new_index: current });
            state.borrow_mut().index = Some(target);
            log::debug!("drag: {:?} moved from slot {} to {}", element, current, target);
        }
    }
    if !state.borrow().active {
        return;
    }

    let top = page_y - band_top(&stage.document, element) - grab_offset;
    stage.document.style_mut(element).top = top;
    let step = scroll_step(stage, client_y);
    let mut st = state.borrow_mut();
    st.element_y = Some(top);
    st.scroll_step = step;
}

/// Linear ramp from zero at the band edge to the maximum at the viewport
/// edge.
fn scroll_step(stage: &Stage, client_y: f64) -> f64 {
    let height = stage.viewport.inner_height;
    let bands = &stage.config.auto_scroll;
    let scroll_up = height * bands.upper_band;
    let scroll_down = height * bands.lower_band;
    if client_y > scroll_down {
        (client_y - scroll_down) / (height - scroll_down) * bands.max_step
    } else if client_y < scroll_up {
        -((scroll_up - client_y) / scroll_up * bands.max_step)
    } else {
        0.0
    }
}

fn auto_scroll_tick<T>(stage: &mut Stage, state: &SharedState<T>) {
    let (element, element_y, step, scrollable) = {
        let st = state.borrow();
        (st.element, st.element_y, st.scroll_step, st.scrollable)
    };
    let (Some(element_y), Some(scrollable)) = (element_y, scrollable) else {
        return;
    };
    if step == 0.0 {
        return;
    }
    let max_scroll = stage.document.offset_height(scrollable) - stage.viewport.inner_height;
    let scroll_y = (stage.viewport.scroll_y + step).min(max_scroll).max(0.0).floor();
    let delta = scroll_y - stage.viewport.scroll_y;
    stage.scroll_to(stage.viewport.scroll_x, scroll_y);

    let element_y = element_y + delta.floor();
    state.borrow_mut().element_y = Some(element_y);
    stage.document.style_mut(element).top = element_y;
    log::trace!("drag: auto-scroll to {} (step {})", scroll_y, step);
}

fn release<T>(stage: &mut Stage, state: &SharedState<T>) {
    let (element, interval, listeners) = {
        let mut st = state.borrow_mut();
        if !st.active {
            return;
        }
        st.active = false;
        (st.element, st.interval.take(), std::mem::take(&mut st.listeners))
    };
    if let Some(interval) = interval {
        stage.scheduler.clear(interval);
    }
    for listener in listeners {
        stage.off(listener);
    }
    let classes = stage.config.classes.clone();
    stage.document.remove_class(element, &classes.dragging);
    stage.document.add_class(element, &classes.moved);
    stage.dispatch(element, &Event::DragEnd);

    let delay = stage.config.timings.release_reset_delay;
    stage.scheduler.set_timeout(delay, move |stage| stage.document.style_mut(element).top = 0.0);
    log::debug!("drag: {:?} released", element);
}

// -------------------------------------------------------------------------
// Press and hold
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPhase {
    Idle,
    Armed,
    Dragging,
}

enum Hold<T> {
    Idle,
    Armed { timer: TimerId, listeners: Vec<ListenerId> },
    Dragging(DragSession<T>),
}

struct HoldState<T> {
    items: Rc<Observable<Vec<T>>>,
    element: NodeId,
    delay: u64,
    /// Latest `(client_y, page_y)` seen while armed.
    coordinates: Option<(f64, f64)>,
    hold: Hold<T>,
}

/// Press handler that starts a drag once the pointer has been held down on
/// the element for the configured delay.
pub struct DragOnHold<T> {
    inner: Rc<RefCell<HoldState<T>>>,
}

impl<T> Clone for DragOnHold<T> {
    fn clone(&self) -> Self {
        DragOnHold { inner: Rc::clone(&self.inner) }
    }
}

impl<T: Clone + 'static> DragOnHold<T> {
    pub fn phase(&self) -> HoldPhase {
        match &self.inner.borrow().hold {
            Hold::Idle => HoldPhase::Idle,
            Hold::Armed { .. } => HoldPhase::Armed,
            Hold::Dragging(session) if session.is_active() => HoldPhase::Dragging,
            Hold::Dragging(_) => HoldPhase::Idle,
        }
    }

    /// The session started by the last completed hold, if any.
    pub fn session(&self) -> Option<DragSession<T>> {
        match &self.inner.borrow().hold {
            Hold::Dragging(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Arm the hold timer on a press. Other events are ignored.
    pub fn handle_press(&self, stage: &mut Stage, event: &Event) {
        let Event::PointerDown(pointer) = event else {
            return;
        };
        if self.phase() == HoldPhase::Dragging {
            return;
        }
        self.disarm(stage);

        let element = {
            let mut st = self.inner.borrow_mut();
            st.coordinates = PRESS_KINDS
                .contains(pointer.kind.as_str())
                .then_some((pointer.client_y, pointer.page_y));
            st.element
        };

        let handle = self.clone();
        let on_move = stage.on(element, EventType::PointerMove, move |_, event| {
            if let Event::PointerMove(pointer) = event {
                handle.inner.borrow_mut().coordinates = Some((pointer.client_y, pointer.page_y));
            }
        });
        let handle = self.clone();
        let on_up = stage.on(element, EventType::PointerUp, move |stage, _| handle.disarm(stage));
        let handle = self.clone();
        let on_leave = stage.on(element, EventType::PointerLeave, move |stage, _| handle.disarm(stage));

        let handle = self.clone();
        let delay = self.inner.borrow().delay;
        let timer = stage.scheduler.set_timeout(delay, move |stage| handle.fire(stage));
        self.inner.borrow_mut().hold = Hold::Armed { timer, listeners: vec![on_move, on_up, on_leave] };
    }

    /// Cancel a pending hold.
    fn disarm(&self, stage: &mut Stage) {
        let previous = {
            let mut st = self.inner.borrow_mut();
            match std::mem::replace(&mut st.hold, Hold::Idle) {
                Hold::Armed { timer, listeners } => Some((timer, listeners)),
                other => {
                    st.hold = other;
                    None
                }
            }
        };
        if let Some((timer, listeners)) = previous {
            stage.scheduler.clear(timer);
            for listener in listeners {
                stage.off(listener);
            }
        }
    }

    fn fire(&self, stage: &mut Stage) {
        let (items, element, coordinates, listeners) = {
            let mut st = self.inner.borrow_mut();
            let listeners = match std::mem::replace(&mut st.hold, Hold::Idle) {
                Hold::Armed { listeners, .. } => listeners,
                _ => Vec::new(),
            };
            (Rc::clone(&st.items), st.element, st.coordinates, listeners)
        };
        for listener in listeners {
            stage.off(listener);
        }
        let Some((client_y, page_y)) = coordinates else {
            log::warn!("drag_on_hold: hold on {:?} elapsed without pointer coordinates", element);
            return;
        };
        match start_drag(stage, items, element, DragStart::Options { client_y, page_y }) {
            Ok(session) => self.inner.borrow_mut().hold = Hold::Dragging(session),
            Err(err) => log::warn!("drag_on_hold: could not start drag on {:?}: {}", element, err),
        }
    }
}

/// Build a hold-to-drag press handler for `element` without registering it.
pub fn make_drag_on_hold<T: Clone + 'static>(
    items: Rc<Observable<Vec<T>>>,
    element: NodeId,
    delay: u64,
) -> DragOnHold<T> {
    DragOnHold {
        inner: Rc::new(RefCell::new(HoldState { items, element, delay, coordinates: None, hold: Hold::Idle })),
    }
}

/// Register a hold-to-drag press handler on `element` using the configured
/// hold delay.
pub fn drag_on_hold<T: Clone + 'static>(
    stage: &mut Stage,
    items: Rc<Observable<Vec<T>>>,
    element: NodeId,
) -> DragOnHold<T> {
    let handler = make_drag_on_hold(items, element, stage.config.timings.hold_delay);
    let handle = handler.clone();
    stage.on(element, EventType::PointerDown, move |stage, event| handle.handle_press(stage, event));
    handler
}
