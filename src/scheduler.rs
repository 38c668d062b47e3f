//! Virtual-time timer queue.
//!
//! Timers fire in `(due, registration order)` order, so two callbacks with
//! the same due time run first-in first-out. Time only moves when the host
//! advances it through [`Stage::advance_by`](crate::stage::Stage::advance_by).
use crate::stage::Stage;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

pub type OnceTask = Box<dyn FnOnce(&mut Stage)>;
pub type RepeatTask = Rc<dyn Fn(&mut Stage)>;

enum Callback {
    Once(OnceTask),
    Repeat { period: u64, task: RepeatTask },
}

struct Timer {
    id: TimerId,
    callback: Callback,
}

/// A timer callback ready to run.
pub enum Due {
    Once(OnceTask),
    Repeat(RepeatTask),
}

#[derive(Default)]
pub struct Scheduler {
    now: u64,
    sequence: u64,
    timers: BTreeMap<(u64, u64), Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.values().any(|t| t.id == id)
    }

    pub fn set_timeout(&mut self, delay: u64, task: impl FnOnce(&mut Stage) + 'static) -> TimerId {
        let id = TimerId(self.next_sequence());
        self.push(self.now + delay, Timer { id, callback: Callback::Once(Box::new(task)) });
        id
    }

    /// Repeat `task` every `period` ms until cleared. A zero period is
    /// treated as one ms.
    pub fn set_interval(&mut self, period: u64, task: impl Fn(&mut Stage) + 'static) -> TimerId {
        let period = period.max(1);
        let id = TimerId(self.next_sequence());
        let callback = Callback::Repeat { period, task: Rc::new(task) };
        self.push(self.now + period, Timer { id, callback });
        id
    }

    /// Cancel a timeout or interval. Unknown or already fired ids are ignored.
    pub fn clear(&mut self, id: TimerId) {
        self.timers.retain(|_, timer| timer.id != id);
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.keys().next().map(|&(due, _)| due)
    }

    /// Remove the earliest timer due at or before `until` and move the clock
    /// to its due time. Intervals are rescheduled before being handed out so
    /// their own callback may clear them.
    pub(crate) fn pop_due(&mut self, until: u64) -> Option<Due> {
        let (&(due, seq), _) = self.timers.iter().next()?;
        if due > until {
            return None;
        }
        let timer = self.timers.remove(&(due, seq))?;
        self.now = self.now.max(due);
        log::trace!("Scheduler: firing timer {:?} at {}", timer.id, self.now);
        match timer.callback {
            Callback::Once(task) => Some(Due::Once(task)),
            Callback::Repeat { period, task } => {
                let again = Timer {
                    id: timer.id,
                    callback: Callback::Repeat { period, task: Rc::clone(&task) },
                };
                self.push(due + period, again);
                Some(Due::Repeat(task))
            }
        }
    }

    pub(crate) fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    fn push(&mut self, due: u64, timer: Timer) {
        let seq = self.next_sequence();
        self.timers.insert((due, seq), timer);
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use crate::stage::Stage;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_equal_delays_fire_fifo() {
        let mut stage = Stage::new();
        let log = recorder();
        for name in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            stage.scheduler.set_timeout(5, move |_| log.borrow_mut().push(name.into()));
        }
        let early = Rc::clone(&log);
        stage.scheduler.set_timeout(1, move |_| early.borrow_mut().push("early".into()));

        stage.advance_by(4);
        assert_eq!(*log.borrow(), vec!["early"]);
        stage.advance_by(1);
        assert_eq!(*log.borrow(), vec!["early", "a", "b", "c"]);
        assert_eq!(stage.scheduler.now(), 5);
    }

    #[test]
    fn test_nested_timeouts_fire_within_same_advance() {
        let mut stage = Stage::new();
        let log = recorder();
        let outer = Rc::clone(&log);
        stage.scheduler.set_timeout(5, move |stage| {
            outer.borrow_mut().push(format!("outer@{}", stage.scheduler.now()));
            let inner = Rc::clone(&outer);
            stage.scheduler.set_timeout(5, move |stage| {
                inner.borrow_mut().push(format!("inner@{}", stage.scheduler.now()));
            });
        });
        stage.advance_by(10);
        assert_eq!(*log.borrow(), vec!["outer@5", "inner@10"]);
    }

    #[test]
    fn test_interval_runs_until_cleared() {
        let mut stage = Stage::new();
        let ticks = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&ticks);
        let id = stage.scheduler.set_interval(10, move |_| *counter.borrow_mut() += 1);

        stage.advance_by(35);
        assert_eq!(*ticks.borrow(), 3);
        assert!(stage.scheduler.is_pending(id));

        stage.scheduler.clear(id);
        stage.advance_by(100);
        assert_eq!(*ticks.borrow(), 3);
        assert_eq!(stage.scheduler.pending(), 0);
    }

    #[test]
    fn test_interval_can_clear_itself() {
        let mut stage = Stage::new();
        let ticks = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&ticks);
        let slot: Rc<RefCell<Option<super::TimerId>>> = Rc::new(RefCell::new(None));
        let own = Rc::clone(&slot);
        let id = stage.scheduler.set_interval(10, move |stage| {
            *counter.borrow_mut() += 1;
            if let Some(id) = *own.borrow() {
                stage.scheduler.clear(id);
            }
        });
        *slot.borrow_mut() = Some(id);
        stage.advance_by(50);
        assert_eq!(*ticks.borrow(), 1);
    }
}
