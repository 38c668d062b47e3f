//! Observable cells and the bindings that follow them.
//!
//! An [`Observable`] holds its value behind an `Rc`, so readers share an
//! immutable snapshot and every change goes through [`Observable::set`].
//! Nested interior mutability inside `T` is not tracked.
use crate::dom::NodeId;
use crate::stage::{EventType, ListenerId, Stage};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Called with `(new, old)`; `old` is `None` only for the initial call made
/// by [`bind`].
pub type Callback<T> = Rc<dyn Fn(&Rc<T>, Option<&Rc<T>>)>;

pub struct Observable<T> {
    value: RefCell<Rc<T>>,
    listeners: RefCell<IndexMap<SubscriptionId, Callback<T>>>,
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value.borrow())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Observable { value: RefCell::new(Rc::new(value)), listeners: RefCell::new(IndexMap::new()) }
    }

    pub fn get(&self) -> Rc<T> {
        Rc::clone(&self.value.borrow())
    }

    /// Replace the value and notify every subscriber in subscription order.
    /// Subscribers may read, write or unsubscribe from inside the callback.
    pub fn set(&self, value: T) {
        let new = Rc::new(value);
        let old = self.value.replace(Rc::clone(&new));
        let listeners: Vec<Callback<T>> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(&new, Some(&old));
        }
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.get());
        self.set(next);
    }

    pub fn subscribe(&self, callback: impl Fn(&Rc<T>, Option<&Rc<T>>) + 'static) -> SubscriptionId {
        self.subscribe_rc(Rc::new(callback))
    }

    fn subscribe_rc(&self, callback: Callback<T>) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.listeners.borrow_mut().insert(id, callback);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().shift_remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Type-erased handle used by [`Binding`] to detach from any cell.
trait Subscribable {
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl<T> Subscribable for Observable<T> {
    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        Observable::unsubscribe(self, id)
    }
}

/// One subscription of one callback to one cell. Holds the cell weakly.
#[derive(Clone)]
pub struct Binding {
    cell: Weak<dyn Subscribable>,
    id: SubscriptionId,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").field("id", &self.id).finish()
    }
}

impl Binding {
    fn new<T: 'static>(cell: &Rc<Observable<T>>, id: SubscriptionId) -> Self {
        let cell: Rc<dyn Subscribable> = Rc::clone(cell) as Rc<dyn Subscribable>;
        Binding { cell: Rc::downgrade(&cell), id }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Subscribe `f` to `cell` and call it right away with the current value.
pub fn bind<T: 'static>(cell: &Rc<Observable<T>>, f: impl Fn(&Rc<T>, Option<&Rc<T>>) + 'static) -> Binding {
    let callback: Callback<T> = Rc::new(f);
    let binding = Binding::new(cell, cell.subscribe_rc(Rc::clone(&callback)));
    callback(&cell.get(), None);
    binding
}

/// Subscribe one callback to several cells. It is called once right away
/// with the first cell's value.
pub fn bind_many<T: 'static>(
    cells: &[Rc<Observable<T>>],
    f: impl Fn(&Rc<T>, Option<&Rc<T>>) + 'static,
) -> Vec<Binding> {
    let callback: Callback<T> = Rc::new(f);
    let bindings: Vec<Binding> = cells
        .iter()
        .map(|cell| Binding::new(cell, cell.subscribe_rc(Rc::clone(&callback))))
        .collect();
    if let Some(first) = cells.first() {
        callback(&first.get(), None);
    }
    bindings
}

pub fn unbind(bindings: &[Binding]) {
    for binding in bindings {
        match binding.cell.upgrade() {
            Some(cell) => {
                if !cell.unsubscribe(binding.id) {
                    log::debug!("unbind: subscription {} was already removed", binding.id);
                }
            }
            None => log::debug!("unbind: cell for subscription {} is gone", binding.id),
        }
    }
}

/// Drop `bindings` when `node` fires `destroy`.
pub fn unbind_on_destroy(stage: &mut Stage, node: NodeId, bindings: Vec<Binding>) -> ListenerId {
    stage.on(node, EventType::Destroy, move |_, _| unbind(&bindings))
}
