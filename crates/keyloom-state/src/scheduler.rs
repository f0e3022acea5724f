#![forbid(unsafe_code)]

//! Cooperative tick scheduler.
//!
//! Deferred work — the re-render-and-swap branch of value bindings, and the
//! corrective `set()` after a collection container was replaced by a scalar —
//! is queued here instead of running inside the triggering dispatch round.
//!
//! # Invariants
//!
//! 1. Tasks within one tick run in FIFO order.
//! 2. `run_tick()` drains exactly the tasks queued before the call; a task
//!    deferred while a tick is running lands on the next tick.
//! 3. A panicking task aborts the rest of its tick's batch; the queue
//!    itself stays usable for later ticks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// Cheap-clone handle over a FIFO queue of deferred tasks.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl Scheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` for the next tick.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Number of tasks waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run one tick: every task queued before this call, in FIFO order.
    /// Returns the number of tasks run.
    pub fn run_tick(&self) -> usize {
        let batch: Vec<Task> = self.queue.borrow_mut().drain(..).collect();
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Run ticks until the queue is empty or `max_ticks` is reached.
    /// Returns the total number of tasks run.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_ticks {
            let ran = self.run_tick();
            if ran == 0 {
                break;
            }
            total += ran;
        }
        total
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn fifo_within_a_tick() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            sched.defer(move || log.borrow_mut().push(i));
        }
        assert_eq!(sched.pending(), 3);
        assert_eq!(sched.run_tick(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn mid_tick_defers_land_on_next_tick() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_sched = sched.clone();
        let inner_log = Rc::clone(&log);
        sched.defer(move || {
            inner_log.borrow_mut().push("first");
            let l = Rc::clone(&inner_log);
            inner_sched.defer(move || l.borrow_mut().push("second"));
        });

        assert_eq!(sched.run_tick(), 1);
        assert_eq!(*log.borrow(), vec!["first"]);
        assert_eq!(sched.run_tick(), 1);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn run_until_idle_bounded() {
        let sched = Scheduler::new();
        fn requeue(sched: Scheduler, depth: u32) {
            if depth > 0 {
                let next = sched.clone();
                sched.defer(move || requeue(next.clone(), depth - 1));
            }
        }
        requeue(sched.clone(), 5);
        assert_eq!(sched.run_until_idle(10), 5);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn clones_share_the_queue() {
        let a = Scheduler::new();
        let b = a.clone();
        a.defer(|| {});
        assert_eq!(b.pending(), 1);
        assert_eq!(b.run_tick(), 1);
        assert_eq!(a.pending(), 0);
    }
}
